//! State capture - bounded snapshots of the paused program state.
//!
//! Walks frames and values into the flattened wire format: scalars inline,
//! compounds interned into the per-snapshot variable table by object
//! identity (which also terminates cycles), truncations and refusals
//! recorded as per-variable statuses. A capture never runs user code: data
//! slots are read, accessor slots are reported and skipped.

use std::collections::HashMap;

use log::debug;
use periscope_config::CaptureConfig;

use crate::eval::{evaluate, Scope};
use crate::host::BreakEvent;
use crate::messages;
use crate::protocol::{Reference, SourceLocation, StackFrame, StatusMessage, Variable};
use crate::registry::WatchExpression;
use crate::value::{PropertySlot, Value};

/// Marker used when the runtime has no name for a frame's function.
pub const ANONYMOUS_FUNCTION: &str = "<anonymous>";

/// Output of one capture: the breakpoint's output fields.
#[derive(Debug, Default)]
pub struct Snapshot {
    /// Captured call stack.
    pub stack_frames: Vec<StackFrame>,
    /// Interned compound values.
    pub variable_table: Vec<Variable>,
    /// Watch-expression results, in request order.
    pub evaluated_expressions: Vec<Variable>,
    /// Expanded logpoint message (LOG action only).
    pub log_message: Option<String>,
}

/// Capture a full stack/variable snapshot under the configured bounds.
pub fn capture_snapshot(
    event: &BreakEvent,
    config: &CaptureConfig,
    expressions: &[WatchExpression],
) -> Snapshot {
    let mut capturer = Capturer::new(config);

    let mut stack_frames = Vec::new();
    for (index, frame) in event.frames.iter().take(config.max_frames).enumerate() {
        let (arguments, locals) = if index < config.max_expand_frames {
            (
                frame
                    .arguments
                    .iter()
                    .map(|nv| capturer.resolve(Some(nv.name.clone()), &nv.value))
                    .collect(),
                frame
                    .locals
                    .iter()
                    .map(|nv| capturer.resolve(Some(nv.name.clone()), &nv.value))
                    .collect(),
            )
        } else {
            let table_index = capturer.frame_not_expanded_entry();
            (
                vec![Variable {
                    var_table_index: Some(table_index),
                    ..Variable::default()
                }],
                vec![Variable {
                    var_table_index: Some(table_index),
                    ..Variable::default()
                }],
            )
        };
        stack_frames.push(StackFrame {
            function: frame
                .function
                .clone()
                .unwrap_or_else(|| ANONYMOUS_FUNCTION.to_string()),
            location: SourceLocation::new(frame.path.display().to_string(), frame.line),
            arguments,
            locals,
        });
    }

    let evaluated_expressions = capturer.evaluate_watches(event, expressions);

    debug!(
        "captured {} frames, {} table entries, {} expressions",
        stack_frames.len(),
        capturer.table.len(),
        evaluated_expressions.len()
    );
    Snapshot {
        stack_frames,
        variable_table: capturer.table,
        evaluated_expressions,
        log_message: None,
    }
}

/// Expand a logpoint message; frames and table stay empty.
pub fn capture_log(
    event: &BreakEvent,
    config: &CaptureConfig,
    expressions: &[WatchExpression],
    message_format: &str,
) -> Snapshot {
    let scope = Scope::new(event.top_frame(), &event.globals);
    let parameters: Vec<String> = expressions
        .iter()
        .map(|watch| match &watch.expr {
            None => "undefined".to_string(),
            Some(expr) => match evaluate(expr, &scope) {
                Ok(value) => preview(&value, config),
                Err(err) => format!("<error: {}>", err.message),
            },
        })
        .collect();

    Snapshot {
        log_message: Some(messages::expand(message_format, &parameters)),
        ..Snapshot::default()
    }
}

// ── Capturer ─────────────────────────────────────────────────────────────────

/// Per-snapshot capture state: the variable table and the identity map.
struct Capturer<'a> {
    config: &'a CaptureConfig,
    table: Vec<Variable>,
    interned: HashMap<usize, u32>,
    frame_not_expanded: Option<u32>,
}

impl<'a> Capturer<'a> {
    fn new(config: &'a CaptureConfig) -> Self {
        Self {
            config,
            table: Vec::new(),
            interned: HashMap::new(),
            frame_not_expanded: None,
        }
    }

    /// Turn a mirrored value into a wire variable: scalars inline,
    /// compounds as table references.
    fn resolve(&mut self, name: Option<String>, value: &Value) -> Variable {
        if let Some(key) = value.identity() {
            return Variable {
                name,
                var_table_index: Some(self.intern(key, value)),
                ..Variable::default()
            };
        }
        let (rendered, status) = self.render_scalar(value);
        Variable {
            name,
            value: Some(rendered),
            type_name: Some(value.type_name()),
            status,
            ..Variable::default()
        }
    }

    /// Intern a compound value, reserving its index before materializing
    /// members so cyclic graphs terminate.
    fn intern(&mut self, key: usize, value: &Value) -> u32 {
        if let Some(&index) = self.interned.get(&key) {
            return index;
        }
        let index = self.table.len() as u32;
        self.table.push(Variable::default());
        self.interned.insert(key, index);
        let entry = self.materialize(value);
        self.table[index as usize] = entry;
        index
    }

    fn materialize(&mut self, value: &Value) -> Variable {
        match value {
            Value::Array(elements) => {
                let total = elements.borrow().len();
                let kept: Vec<Value> = elements
                    .borrow()
                    .iter()
                    .take(self.config.max_properties)
                    .cloned()
                    .collect();
                let members = kept
                    .iter()
                    .enumerate()
                    .map(|(i, element)| self.resolve(Some(i.to_string()), element))
                    .collect();
                Variable {
                    type_name: Some("array".to_string()),
                    members,
                    status: self.truncation_status(total),
                    ..Variable::default()
                }
            }
            Value::Object(data) => {
                let properties = data.properties();
                let total = properties.len();
                let members = properties
                    .into_iter()
                    .take(self.config.max_properties)
                    .map(|property| match property.slot {
                        PropertySlot::Data(value) => self.resolve(Some(property.name), &value),
                        PropertySlot::Accessor => Variable {
                            name: Some(property.name),
                            status: Some(StatusMessage::error(
                                Reference::VariableValue,
                                messages::VALUE_NOT_CAPTURED,
                            )),
                            ..Variable::default()
                        },
                    })
                    .collect();
                Variable {
                    type_name: Some(data.class_name.clone()),
                    members,
                    status: self.truncation_status(total),
                    ..Variable::default()
                }
            }
            Value::Function(data) => Variable {
                value: Some(format!(
                    "function {}()",
                    data.name.as_deref().unwrap_or(ANONYMOUS_FUNCTION)
                )),
                type_name: Some("function".to_string()),
                ..Variable::default()
            },
            // Scalars are inlined by `resolve` and never interned
            _ => self.resolve(None, value),
        }
    }

    fn truncation_status(&self, total: usize) -> Option<StatusMessage> {
        if total <= self.config.max_properties {
            return None;
        }
        Some(
            StatusMessage::info(Reference::Unspecified, messages::TRUNCATED_PROPERTIES)
                .with_parameters(vec![self.config.max_properties.to_string()]),
        )
    }

    fn render_scalar(&self, value: &Value) -> (String, Option<StatusMessage>) {
        let rendered = value.render_scalar().unwrap_or_default();
        if matches!(value, Value::String(_)) {
            let limit = self.config.max_string_length;
            if rendered.chars().count() > limit {
                let truncated: String = rendered.chars().take(limit).collect();
                let status =
                    StatusMessage::info(Reference::Unspecified, messages::TRUNCATED_STRING)
                        .with_parameters(vec![limit.to_string()]);
                return (format!("{truncated}..."), Some(status));
            }
        }
        (rendered, None)
    }

    /// The shared "frame not expanded" table entry.
    fn frame_not_expanded_entry(&mut self) -> u32 {
        if let Some(index) = self.frame_not_expanded {
            return index;
        }
        let index = self.table.len() as u32;
        self.table.push(Variable {
            status: Some(
                StatusMessage::error(Reference::Unspecified, messages::FRAME_NOT_EXPANDED)
                    .with_parameters(vec![self.config.max_expand_frames.to_string()]),
            ),
            ..Variable::default()
        });
        self.frame_not_expanded = Some(index);
        index
    }

    fn evaluate_watches(
        &mut self,
        event: &BreakEvent,
        expressions: &[WatchExpression],
    ) -> Vec<Variable> {
        let scope = Scope::new(event.top_frame(), &event.globals);
        expressions
            .iter()
            .map(|watch| match &watch.expr {
                None => Variable::scalar(watch.text.clone(), "undefined", "undefined"),
                Some(expr) => match evaluate(expr, &scope) {
                    Ok(value) => self.resolve(Some(watch.text.clone()), &value),
                    Err(err) => Variable {
                        name: Some(watch.text.clone()),
                        status: Some(StatusMessage::error(
                            Reference::VariableValue,
                            err.message,
                        )),
                        ..Variable::default()
                    },
                },
            })
            .collect()
    }
}

// ── Logpoint previews ────────────────────────────────────────────────────────

/// Compact one-line rendering for logpoint parameters.
fn preview(value: &Value, config: &CaptureConfig) -> String {
    match value {
        Value::String(_) => {
            // Top-level strings appear raw in the log line
            let capturer = Capturer::new(config);
            capturer.render_scalar(value).0
        }
        _ => preview_nested(value, 0, config),
    }
}

fn preview_nested(value: &Value, depth: usize, config: &CaptureConfig) -> String {
    if depth > 2 {
        return "...".to_string();
    }
    match value {
        Value::String(s) => format!("\"{s}\""),
        Value::Array(elements) => {
            let elements = elements.borrow();
            let parts: Vec<String> = elements
                .iter()
                .take(config.max_properties)
                .map(|e| preview_nested(e, depth + 1, config))
                .collect();
            if elements.len() > config.max_properties {
                format!("[{}, ...]", parts.join(", "))
            } else {
                format!("[{}]", parts.join(", "))
            }
        }
        Value::Object(data) => {
            let properties = data.properties();
            let total = properties.len();
            let parts: Vec<String> = properties
                .into_iter()
                .take(config.max_properties)
                .map(|p| match p.slot {
                    PropertySlot::Data(v) => {
                        format!("{}: {}", p.name, preview_nested(&v, depth + 1, config))
                    }
                    PropertySlot::Accessor => format!("{}: <getter>", p.name),
                })
                .collect();
            if total > config.max_properties {
                format!("{{{}, ...}}", parts.join(", "))
            } else {
                format!("{{{}}}", parts.join(", "))
            }
        }
        Value::Function(data) => format!(
            "function {}()",
            data.name.as_deref().unwrap_or(ANONYMOUS_FUNCTION)
        ),
        scalar => scalar.render_scalar().unwrap_or_default(),
    }
}
