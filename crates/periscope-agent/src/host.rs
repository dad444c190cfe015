//! The debug-host abstraction the bridge consumes.
//!
//! The embedding runtime implements [`DebugHost`]: physical break
//! instructions keyed by `(path, line)` and a listener list the runtime
//! fires synchronously when execution reaches an instrumented line. The
//! agent installs at most one listener and must leave every listener it
//! did not install untouched.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use thiserror::Error;

use crate::value::Value;

/// Identifier for a physical break instruction inside the runtime.
pub type NativeBreakId = u64;

/// Identifier for an installed break-event listener.
pub type ListenerId = u64;

/// Error from the runtime debug facility.
#[derive(Debug, Error)]
pub enum HostError {
    /// The runtime refused to place a break at the location.
    #[error("the runtime rejected a breakpoint at {path}:{line}")]
    BreakRejected {
        /// Requested file.
        path: PathBuf,
        /// Requested line.
        line: u32,
    },
}

/// A named value visible in a frame or in the global scope.
#[derive(Debug, Clone)]
pub struct NamedValue {
    /// Binding name.
    pub name: String,
    /// Mirrored value.
    pub value: Value,
}

impl NamedValue {
    /// Convenience constructor.
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// One frame of the paused call stack, as reported by the runtime.
#[derive(Debug, Clone)]
pub struct HostFrame {
    /// Function name, when the runtime knows one.
    pub function: Option<String>,
    /// Absolute path of the executing script.
    pub path: PathBuf,
    /// Current line (1-based).
    pub line: u32,
    /// Receiver (`this`) of the frame, if any.
    pub this: Option<Value>,
    /// Named arguments in declaration order.
    pub arguments: Vec<NamedValue>,
    /// Named locals in declaration order.
    pub locals: Vec<NamedValue>,
}

/// A break event delivered synchronously by the runtime.
#[derive(Debug, Clone)]
pub struct BreakEvent {
    /// File whose instrumented line was reached.
    pub path: PathBuf,
    /// The instrumented line (1-based).
    pub line: u32,
    /// Call stack, innermost frame first.
    pub frames: Vec<HostFrame>,
    /// Global bindings visible to expressions.
    pub globals: Vec<NamedValue>,
}

impl BreakEvent {
    /// The innermost frame, if the stack is non-empty.
    pub fn top_frame(&self) -> Option<&HostFrame> {
        self.frames.first()
    }
}

/// Listener fired on every break event.
pub type BreakListener = Rc<dyn Fn(&BreakEvent)>;

/// The runtime debug facility.
pub trait DebugHost {
    /// Place a physical break instruction; line 1 (top of file) must work.
    fn set_break(&self, path: &Path, line: u32) -> Result<NativeBreakId, HostError>;

    /// Remove a previously placed break instruction.
    fn clear_break(&self, id: NativeBreakId);

    /// Install a break-event listener; the runtime fires all installed
    /// listeners synchronously, in installation order.
    fn add_listener(&self, listener: BreakListener) -> ListenerId;

    /// Remove a listener installed by [`DebugHost::add_listener`].
    fn remove_listener(&self, id: ListenerId);
}
