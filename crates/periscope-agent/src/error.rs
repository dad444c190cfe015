//! Agent error taxonomy and its mapping onto wire statuses.
//!
//! Set-time errors populate the breakpoint's `status` and also reach the
//! `set` callback; hit-time condition failures reach the waiter. Each
//! variant maps onto a `StatusMessage` whose `refers_to` names the part of
//! the breakpoint at fault.

use thiserror::Error;

use crate::host::HostError;
use crate::messages;
use crate::protocol::{BreakpointId, Reference, StatusMessage};

/// Everything `set`, `clear`, and hit dispatch can report.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The breakpoint is structurally invalid (e.g. line 0).
    #[error("invalid breakpoint request")]
    InvalidBreakpoint,

    /// The resolver found no matching inventory entry.
    #[error("source file not found: {path}")]
    PathNotFound {
        /// The user-supplied path hint.
        path: String,
    },

    /// The resolver found more than one matching inventory entry.
    #[error("source path is ambiguous: {path} ({count} matches)")]
    PathAmbiguous {
        /// The user-supplied path hint.
        path: String,
        /// How many entries matched.
        count: usize,
    },

    /// The requested file's extension is not a supported source kind.
    #[error("unsupported source extension: {path}")]
    UnsupportedExtension {
        /// The user-supplied path hint.
        path: String,
    },

    /// The requested line is beyond the end of the resolved file.
    #[error("invalid line {line} in {basename}")]
    InvalidLine {
        /// Basename of the resolved file.
        basename: String,
        /// The requested line.
        line: u32,
    },

    /// The condition failed to compile or validate.
    #[error("error compiling condition: {detail}")]
    ConditionCompile {
        /// The parser/validator/transformer message.
        detail: String,
    },

    /// A watch expression failed to compile or validate.
    #[error("error compiling expression `{expression}`: {detail}")]
    ExpressionCompile {
        /// The offending expression text.
        expression: String,
        /// The parser/validator/transformer message.
        detail: String,
    },

    /// The condition raised an error while being evaluated at a hit.
    #[error("error evaluating condition: {detail}")]
    ConditionRuntime {
        /// The evaluator's message.
        detail: String,
    },

    /// A breakpoint with the same id is already registered.
    #[error("breakpoint {id} is already registered")]
    BreakpointExists {
        /// The duplicate id.
        id: BreakpointId,
    },

    /// The runtime debug facility refused the physical breakpoint.
    #[error(transparent)]
    Host(#[from] HostError),
}

impl AgentError {
    /// The wire status carried on the breakpoint for this error.
    pub fn to_status(&self) -> StatusMessage {
        match self {
            AgentError::InvalidBreakpoint => StatusMessage::error(
                Reference::Unspecified,
                messages::INVALID_BREAKPOINT,
            ),
            AgentError::PathNotFound { .. } => StatusMessage::error(
                Reference::BreakpointSourceLocation,
                messages::SOURCE_FILE_NOT_FOUND,
            ),
            AgentError::PathAmbiguous { .. } => StatusMessage::error(
                Reference::BreakpointSourceLocation,
                messages::SOURCE_FILE_AMBIGUOUS,
            ),
            AgentError::UnsupportedExtension { .. } => StatusMessage::error(
                Reference::BreakpointSourceLocation,
                messages::UNSUPPORTED_EXTENSION,
            ),
            AgentError::InvalidLine { basename, line } => StatusMessage::error(
                Reference::BreakpointSourceLocation,
                format!("{}{basename}:{line}", messages::INVALID_LINE_NUMBER),
            ),
            AgentError::ConditionCompile { detail } => StatusMessage::error(
                Reference::BreakpointCondition,
                messages::ERROR_COMPILING_CONDITION,
            )
            .with_parameters(vec![detail.clone()]),
            AgentError::ExpressionCompile { detail, .. } => StatusMessage::error(
                Reference::BreakpointExpression,
                format!("{}: {detail}", messages::ERROR_COMPILING_EXPRESSION),
            ),
            AgentError::ConditionRuntime { detail } => StatusMessage::error(
                Reference::BreakpointCondition,
                format!("{}: {detail}", messages::ERROR_EVALUATING_CONDITION),
            ),
            AgentError::BreakpointExists { .. } => StatusMessage::error(
                Reference::Unspecified,
                messages::BREAKPOINT_EXISTS,
            ),
            AgentError::Host(err) => StatusMessage::error(
                Reference::BreakpointSourceLocation,
                err.to_string(),
            ),
        }
    }
}
