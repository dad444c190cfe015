//! Periscope Agent - in-process snapshot debugging
//!
//! This library implements the debug-agent engine:
//! - Source scanning and suffix-based path resolution
//! - Side-effect-free compilation of conditions and watch expressions
//! - Breakpoint registry and debug-hook bridging
//! - Bounded capture of frames and variable graphs
//!
//! The control plane that posts breakpoints and ships results, and the
//! runtime that implements [`host::DebugHost`], live outside this crate.

/// Agent version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Public API modules
pub mod agent;
pub mod ast;
pub mod bridge;
pub mod capture;
pub mod error;
pub mod eval;
pub mod host;
pub mod lexer;
pub mod messages;
pub mod parser;
pub mod protocol;
pub mod registry;
pub mod resolver;
pub mod scanner;
pub mod token;
pub mod transform;
pub mod validator;
pub mod value;

// Re-export commonly used types
pub use agent::DebugAgent;
pub use error::AgentError;
pub use host::{BreakEvent, DebugHost, HostFrame, NamedValue};
pub use periscope_config::{AgentConfig, CaptureConfig};
pub use protocol::{
    breakpoint_ref, Action, Breakpoint, BreakpointId, BreakpointRef, Reference, SourceLocation,
    StackFrame, StatusMessage, Variable,
};
pub use scanner::{scan, FileEntry, Inventory};
pub use transform::{SourceTransformer, TransformerRegistry};
pub use value::Value;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smoke() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
    }
}
