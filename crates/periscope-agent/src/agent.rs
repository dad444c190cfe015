//! Public facade of the debug agent.
//!
//! `set` validates, resolves, compiles, and registers a snapshot request;
//! `wait` installs the one-shot waiter; `clear` tears the request down.
//! The control context and the host's break-event context are funneled
//! through one thread; the interior `RefCell` borrow is always released
//! before waiters fire, so `clear` is safe inside a `wait` callback.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use log::{info, warn};
use periscope_config::AgentConfig;

use crate::ast::Expr;
use crate::bridge::HookBridge;
use crate::capture::{capture_log, capture_snapshot};
use crate::error::AgentError;
use crate::eval::{evaluate, Scope};
use crate::host::{BreakEvent, BreakListener, DebugHost};
use crate::parser::parse_source;
use crate::protocol::{Action, BreakpointRef};
use crate::registry::{
    ActiveBreakpoint, BreakpointRegistry, WaitCallback, WatchExpression,
};
use crate::resolver::{self, ResolveError};
use crate::scanner::Inventory;
use crate::transform::TransformerRegistry;
use crate::validator::validate_program;

/// The in-process snapshot debugger agent.
///
/// Cheap to clone by handle; all clones share the same registry and
/// bridge. The agent is single-threaded by design.
#[derive(Clone)]
pub struct DebugAgent {
    inner: Rc<AgentInner>,
}

struct AgentInner {
    config: AgentConfig,
    inventory: Inventory,
    host: Rc<dyn DebugHost>,
    transformers: TransformerRegistry,
    /// Supported source extensions, derived from the transformer registry.
    extensions: Vec<String>,
    state: RefCell<AgentState>,
}

#[derive(Default)]
struct AgentState {
    registry: BreakpointRegistry,
    bridge: HookBridge,
}

impl DebugAgent {
    /// Create an agent over a scanned inventory and a host runtime.
    /// Performs no I/O.
    pub fn create(config: AgentConfig, inventory: Inventory, host: Rc<dyn DebugHost>) -> Self {
        Self::with_transformers(config, inventory, host, TransformerRegistry::new())
    }

    /// Create an agent with a custom transformer registry (transpiled
    /// dialects beyond the defaults).
    pub fn with_transformers(
        config: AgentConfig,
        inventory: Inventory,
        host: Rc<dyn DebugHost>,
        transformers: TransformerRegistry,
    ) -> Self {
        let extensions = transformers.extensions();
        Self {
            inner: Rc::new(AgentInner {
                config,
                inventory,
                host,
                transformers,
                extensions,
                state: RefCell::new(AgentState::default()),
            }),
        }
    }

    /// Register a snapshot request.
    ///
    /// On failure the breakpoint's `status` is populated and the same
    /// error reaches the callback. Completion may be synchronous; callers
    /// must tolerate out-of-order completions across breakpoints.
    pub fn set(&self, bp: &BreakpointRef, cb: impl FnOnce(Result<(), AgentError>)) {
        let result = self.set_internal(bp);
        if let Err(err) = &result {
            warn!("failed to set breakpoint {}: {err}", bp.borrow().id);
            bp.borrow_mut().status = Some(err.to_status());
        }
        cb(result);
    }

    /// Remove a snapshot request. Synchronous, idempotent, and safe to
    /// call from inside a `wait` callback. A dropped waiter never fires.
    pub fn clear(&self, bp: &BreakpointRef) {
        let id = bp.borrow().id.clone();
        let mut state = self.inner.state.borrow_mut();
        if let Some(active) = state.registry.remove(&id) {
            state.bridge.unregister(
                self.inner.host.as_ref(),
                &id,
                &active.resolved_path,
                active.line,
            );
            info!("breakpoint {id} cleared");
        }
    }

    /// Install the waiter fired once when the breakpoint is captured (or
    /// its condition fails at a hit). One waiter per breakpoint.
    pub fn wait(&self, bp: &BreakpointRef, cb: impl FnOnce(Result<(), AgentError>) + 'static) {
        let id = bp.borrow().id.clone();
        self.inner
            .state
            .borrow_mut()
            .registry
            .install_waiter(&id, Box::new(cb));
    }

    /// Number of live breakpoints (health checks and tests).
    pub fn num_breakpoints(&self) -> usize {
        self.inner.state.borrow().registry.count()
    }

    /// Number of installed, unfired waiters (health checks and tests).
    pub fn num_listeners(&self) -> usize {
        self.inner.state.borrow().registry.waiter_count()
    }

    // ── Set pipeline ─────────────────────────────────────────────────────────

    fn set_internal(&self, bp: &BreakpointRef) -> Result<(), AgentError> {
        let (id, hint, line, condition_text, expression_texts) = {
            let b = bp.borrow();
            (
                b.id.clone(),
                b.location.path.clone(),
                b.location.line,
                b.condition.clone(),
                b.expressions.clone(),
            )
        };
        if line < 1 {
            return Err(AgentError::InvalidBreakpoint);
        }

        let entry = resolver::resolve(&self.inner.inventory, &hint, &self.inner.extensions)
            .map_err(|err| match err {
                ResolveError::NotFound { path } => AgentError::PathNotFound { path },
                ResolveError::Ambiguous { path, matches } => AgentError::PathAmbiguous {
                    path,
                    count: matches.len(),
                },
                ResolveError::UnsupportedExtension { path } => {
                    AgentError::UnsupportedExtension { path }
                }
            })?;
        if line > entry.lines {
            return Err(AgentError::InvalidLine {
                basename: entry
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                line,
            });
        }
        let resolved_path = entry.path.clone();
        let extension = resolved_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_string();

        let condition = self.compile_condition(&extension, condition_text.as_deref())?;
        let mut expressions = Vec::with_capacity(expression_texts.len());
        for text in &expression_texts {
            expressions.push(self.compile_expression(&extension, text)?);
        }

        let mut state = self.inner.state.borrow_mut();
        if state.registry.contains(&id) {
            return Err(AgentError::BreakpointExists { id });
        }
        let weak = Rc::downgrade(&self.inner);
        state.bridge.register(
            self.inner.host.as_ref(),
            || make_listener(weak),
            id.clone(),
            &resolved_path,
            line,
        )?;
        if let Err(err) = state.registry.insert(
            id.clone(),
            ActiveBreakpoint {
                bp: bp.clone(),
                resolved_path: resolved_path.clone(),
                line,
                condition,
                expressions,
                completed: false,
                waiter: None,
            },
        ) {
            state
                .bridge
                .unregister(self.inner.host.as_ref(), &id, &resolved_path, line);
            return Err(err);
        }
        drop(state);

        // The control plane sees the concrete file the hint resolved to
        bp.borrow_mut().location.path = resolved_path.display().to_string();
        info!("breakpoint {id} set at {}:{line}", resolved_path.display());
        Ok(())
    }

    fn compile_condition(
        &self,
        extension: &str,
        text: Option<&str>,
    ) -> Result<Option<Rc<Expr>>, AgentError> {
        let Some(text) = text else {
            return Ok(None);
        };
        let native = self
            .inner
            .transformers
            .transpile_for(extension, text)
            .map_err(|err| AgentError::ConditionCompile {
                detail: err.message,
            })?;
        let program = parse_source(&native).map_err(|err| AgentError::ConditionCompile {
            detail: err.message,
        })?;
        let expr = validate_program(program).map_err(|err| AgentError::ConditionCompile {
            detail: err.message,
        })?;
        Ok(expr.map(Rc::new))
    }

    fn compile_expression(
        &self,
        extension: &str,
        text: &str,
    ) -> Result<WatchExpression, AgentError> {
        let compile = |detail: String| AgentError::ExpressionCompile {
            expression: text.to_string(),
            detail,
        };
        let native = self
            .inner
            .transformers
            .transpile_for(extension, text)
            .map_err(|err| compile(err.message))?;
        let program = parse_source(&native).map_err(|err| compile(err.message))?;
        let expr = validate_program(program).map_err(|err| compile(err.message))?;
        Ok(WatchExpression {
            text: text.to_string(),
            expr: expr.map(Rc::new),
        })
    }
}

fn make_listener(weak: Weak<AgentInner>) -> BreakListener {
    Rc::new(move |event: &BreakEvent| {
        if let Some(inner) = weak.upgrade() {
            AgentInner::on_break(&inner, event);
        }
    })
}

impl AgentInner {
    /// Break-event dispatch: match registered breakpoints, filter by
    /// condition, capture, then fire waiters with the state borrow
    /// released (waiters may call `clear`).
    fn on_break(inner: &Rc<AgentInner>, event: &BreakEvent) {
        let mut fired: Vec<(WaitCallback, Result<(), AgentError>)> = Vec::new();
        {
            let mut state = inner.state.borrow_mut();
            let ids = state.bridge.ids_at(&event.path, event.line);
            for id in ids {
                let Some(active) = state.registry.get(&id) else {
                    continue;
                };
                if active.completed {
                    continue;
                }
                let bp = active.bp.clone();
                let condition = active.condition.clone();
                let expressions = active.expressions.clone();

                let verdict = match &condition {
                    None => Ok(true),
                    Some(expr) => {
                        let scope = Scope::new(event.top_frame(), &event.globals);
                        evaluate(expr, &scope).map(|value| value.is_truthy())
                    }
                };

                match verdict {
                    Ok(false) => continue,
                    Ok(true) => {
                        if let Some(active) = state.registry.get_mut(&id) {
                            active.completed = true;
                        }
                        let (action, log_format) = {
                            let b = bp.borrow();
                            (b.action, b.log_message_format.clone())
                        };
                        let snapshot = match action {
                            Action::Capture => {
                                capture_snapshot(event, &inner.config.capture, &expressions)
                            }
                            Action::Log => capture_log(
                                event,
                                &inner.config.capture,
                                &expressions,
                                log_format.as_deref().unwrap_or_default(),
                            ),
                        };
                        let log_message = snapshot.log_message.clone();
                        {
                            let mut b = bp.borrow_mut();
                            b.stack_frames = snapshot.stack_frames;
                            b.variable_table = snapshot.variable_table;
                            b.evaluated_expressions = snapshot.evaluated_expressions;
                            b.log_message = snapshot.log_message;
                        }
                        if let Some(message) = log_message {
                            info!("logpoint {id}: {message}");
                        }
                        if let Some(waiter) = state.registry.take_waiter(&id) {
                            fired.push((waiter, Ok(())));
                        }
                    }
                    Err(err) => {
                        if let Some(active) = state.registry.get_mut(&id) {
                            active.completed = true;
                        }
                        let agent_err = AgentError::ConditionRuntime {
                            detail: err.message,
                        };
                        bp.borrow_mut().status = Some(agent_err.to_status());
                        warn!("condition for breakpoint {id} failed at a hit: {agent_err}");
                        if let Some(waiter) = state.registry.take_waiter(&id) {
                            fired.push((waiter, Err(agent_err)));
                        }
                    }
                }
            }
        }
        // Borrow released: waiters may panic or call back into the agent
        for (waiter, result) in fired {
            waiter(result);
        }
    }
}
