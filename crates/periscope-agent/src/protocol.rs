//! Breakpoint wire format - the types exchanged with the control plane.
//!
//! All types are serde-serializable to the camelCase JSON the control plane
//! consumes, and back. Output fields stay empty until a snapshot completes.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

// ── BreakpointId ─────────────────────────────────────────────────────────────

/// Opaque breakpoint identifier assigned by the control plane.
///
/// Any JSON scalar is accepted; the integer zero is a valid, distinct key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BreakpointId {
    /// Numeric id.
    Number(i64),
    /// String id.
    Text(String),
}

impl fmt::Display for BreakpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakpointId::Number(n) => write!(f, "{n}"),
            BreakpointId::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for BreakpointId {
    fn from(n: i64) -> Self {
        BreakpointId::Number(n)
    }
}

impl From<&str> for BreakpointId {
    fn from(s: &str) -> Self {
        BreakpointId::Text(s.to_string())
    }
}

// ── SourceLocation ───────────────────────────────────────────────────────────

/// A position in a source file (1-based line, optional 1-based column).
///
/// `path` starts as a user-supplied hint; after a successful `set` it is
/// rewritten to the resolved inventory entry's absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Source file path or path suffix.
    pub path: String,
    /// Line number (1-based, signed-32-bit range).
    pub line: u32,
    /// Column number (1-based), when the control plane supplies one.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub column: Option<u32>,
}

impl SourceLocation {
    /// Create a location without a column.
    pub fn new(path: impl Into<String>, line: u32) -> Self {
        Self {
            path: path.into(),
            line,
            column: None,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.column {
            Some(col) => write!(f, "{}:{}:{}", self.path, self.line, col),
            None => write!(f, "{}:{}", self.path, self.line),
        }
    }
}

// ── StatusMessage ────────────────────────────────────────────────────────────

/// What part of the breakpoint a status message refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reference {
    /// No specific part.
    #[default]
    Unspecified,
    /// The requested source location.
    BreakpointSourceLocation,
    /// The breakpoint condition.
    BreakpointCondition,
    /// A watch expression.
    BreakpointExpression,
    /// A variable's name.
    VariableName,
    /// A variable's value.
    VariableValue,
}

/// A parameterized human-readable message (`$0`…`$N` placeholders).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatMessage {
    /// Format string with `$N` placeholders.
    pub format: String,
    /// Positional parameters substituted into `format`.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub parameters: Vec<String>,
}

/// Status carried on a breakpoint (set-time failures) or on an individual
/// variable (capture-time failures and truncations).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusMessage {
    /// Whether this status reports an error (vs. an informational note).
    pub is_error: bool,
    /// The part of the breakpoint the status refers to.
    pub refers_to: Reference,
    /// Human-readable description.
    pub description: FormatMessage,
}

impl StatusMessage {
    /// Build an error status.
    pub fn error(refers_to: Reference, format: impl Into<String>) -> Self {
        Self {
            is_error: true,
            refers_to,
            description: FormatMessage {
                format: format.into(),
                parameters: Vec::new(),
            },
        }
    }

    /// Build a non-error (informational) status.
    pub fn info(refers_to: Reference, format: impl Into<String>) -> Self {
        Self {
            is_error: false,
            refers_to,
            description: FormatMessage {
                format: format.into(),
                parameters: Vec::new(),
            },
        }
    }

    /// Attach positional parameters.
    pub fn with_parameters(mut self, parameters: Vec<String>) -> Self {
        self.description.parameters = parameters;
        self
    }
}

// ── Variable ─────────────────────────────────────────────────────────────────

/// A captured variable, watch-expression result, or variable-table entry.
///
/// Scalar values carry `value` inline; compound values carry
/// `var_table_index` into the snapshot's variable table instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    /// Variable name, member name, or watch-expression text.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    /// Rendered scalar value (absent for compounds and refused values).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub value: Option<String>,
    /// Runtime type name.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none", default)]
    pub type_name: Option<String>,
    /// Child members (populated on variable-table entries).
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub members: Vec<Variable>,
    /// Index into the snapshot's variable table, for compound values.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub var_table_index: Option<u32>,
    /// Per-variable status (errors and truncation notes).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status: Option<StatusMessage>,
}

impl Variable {
    /// A named scalar variable.
    pub fn scalar(
        name: impl Into<String>,
        value: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            value: Some(value.into()),
            type_name: Some(type_name.into()),
            ..Self::default()
        }
    }

    /// A named reference into the variable table.
    pub fn table_ref(name: impl Into<String>, index: u32) -> Self {
        Self {
            name: Some(name.into()),
            var_table_index: Some(index),
            ..Self::default()
        }
    }
}

// ── StackFrame ───────────────────────────────────────────────────────────────

/// One frame of the captured call stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    /// Best-known function name, or the anonymous marker.
    pub function: String,
    /// Source location of the frame.
    pub location: SourceLocation,
    /// Function arguments.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub arguments: Vec<Variable>,
    /// Local variables.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub locals: Vec<Variable>,
}

// ── Breakpoint ───────────────────────────────────────────────────────────────

/// What to do when the breakpoint location is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Capture a full stack/variable snapshot.
    #[default]
    Capture,
    /// Expand `log_message_format` and emit a log line; no snapshot.
    Log,
}

/// A snapshot request plus its output slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakpoint {
    /// Control-plane-assigned identifier.
    pub id: BreakpointId,
    /// CAPTURE or LOG.
    #[serde(default)]
    pub action: Action,
    /// Where to break.
    pub location: SourceLocation,
    /// Optional condition; empty means "always true".
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub condition: Option<String>,
    /// Watch expressions evaluated on hit, in order.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub expressions: Vec<String>,
    /// Logpoint message template with `$0`…`$N` expression references.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub log_message_format: Option<String>,

    // Output fields, populated on hit.
    /// Captured call stack.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub stack_frames: Vec<StackFrame>,
    /// Interned compound values referenced by `var_table_index`.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub variable_table: Vec<Variable>,
    /// Watch-expression results, in request order.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub evaluated_expressions: Vec<Variable>,
    /// Expanded logpoint message (LOG action only).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub log_message: Option<String>,
    /// Set-time or hit-time status.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status: Option<StatusMessage>,
}

impl Breakpoint {
    /// Create a CAPTURE breakpoint with no condition or expressions.
    pub fn new(id: impl Into<BreakpointId>, location: SourceLocation) -> Self {
        Self {
            id: id.into(),
            action: Action::Capture,
            location,
            condition: None,
            expressions: Vec::new(),
            log_message_format: None,
            stack_frames: Vec::new(),
            variable_table: Vec::new(),
            evaluated_expressions: Vec::new(),
            log_message: None,
            status: None,
        }
    }
}

/// Shared breakpoint handle: the caller and the registry both read and
/// write the same record, like the control-plane glue does.
pub type BreakpointRef = Rc<RefCell<Breakpoint>>;

/// Wrap a breakpoint in a shared handle.
pub fn breakpoint_ref(bp: Breakpoint) -> BreakpointRef {
    Rc::new(RefCell::new(bp))
}
