//! Breakpoint registry - the set of live snapshot requests.
//!
//! Keyed by the control plane's opaque id (zero included). Each record
//! pairs the shared breakpoint handle with its compiled condition and
//! expressions, the one-shot completion flag, and the waiter installed by
//! `wait`. The registry's two counters (`count`, `waiter_count`) are the
//! test-observable cleanness invariant.

use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use crate::ast::Expr;
use crate::error::AgentError;
use crate::protocol::{BreakpointId, BreakpointRef};

/// Callback installed by `wait`, fired at most once.
pub type WaitCallback = Box<dyn FnOnce(Result<(), AgentError>)>;

/// A compiled watch expression: the original text plus its expression
/// (`None` when the text was empty).
#[derive(Clone)]
pub struct WatchExpression {
    /// The expression text as requested.
    pub text: String,
    /// Compiled form; `None` evaluates to `undefined`.
    pub expr: Option<Rc<Expr>>,
}

/// A live breakpoint record.
pub struct ActiveBreakpoint {
    /// Shared handle; output fields are written through it on capture.
    pub bp: BreakpointRef,
    /// Resolved absolute path of the target file.
    pub resolved_path: PathBuf,
    /// Requested line.
    pub line: u32,
    /// Compiled condition; `None` means "always true".
    pub condition: Option<Rc<Expr>>,
    /// Compiled watch expressions, in request order.
    pub expressions: Vec<WatchExpression>,
    /// Set once the first hit has been reported; later hits are suppressed.
    pub completed: bool,
    /// Waiter installed by `wait`, if any.
    pub waiter: Option<WaitCallback>,
}

/// id → live record map plus waiter bookkeeping.
#[derive(Default)]
pub struct BreakpointRegistry {
    active: HashMap<BreakpointId, ActiveBreakpoint>,
}

impl BreakpointRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record; a live duplicate id is an error.
    pub fn insert(&mut self, id: BreakpointId, record: ActiveBreakpoint) -> Result<(), AgentError> {
        if self.active.contains_key(&id) {
            return Err(AgentError::BreakpointExists { id });
        }
        self.active.insert(id, record);
        Ok(())
    }

    /// Remove a record. Idempotent: removing an unknown id returns `None`.
    ///
    /// The returned record still owns its waiter; dropping it drops the
    /// waiter without firing.
    pub fn remove(&mut self, id: &BreakpointId) -> Option<ActiveBreakpoint> {
        self.active.remove(id)
    }

    /// Whether a record with this id is live.
    pub fn contains(&self, id: &BreakpointId) -> bool {
        self.active.contains_key(id)
    }

    /// Look up a record.
    pub fn get(&self, id: &BreakpointId) -> Option<&ActiveBreakpoint> {
        self.active.get(id)
    }

    /// Look up a record mutably.
    pub fn get_mut(&mut self, id: &BreakpointId) -> Option<&mut ActiveBreakpoint> {
        self.active.get_mut(id)
    }

    /// Number of live breakpoints.
    pub fn count(&self) -> usize {
        self.active.len()
    }

    /// Number of installed, unfired waiters.
    pub fn waiter_count(&self) -> usize {
        self.active.values().filter(|a| a.waiter.is_some()).count()
    }

    /// Install the waiter for a breakpoint.
    ///
    /// Installing on an unknown breakpoint, or twice before the first
    /// waiter fires, is a programmer error.
    pub fn install_waiter(&mut self, id: &BreakpointId, waiter: WaitCallback) {
        let active = self
            .active
            .get_mut(id)
            .unwrap_or_else(|| panic!("wait() on unregistered breakpoint {id}"));
        assert!(
            active.waiter.is_none(),
            "wait() already installed for breakpoint {id}"
        );
        active.waiter = Some(waiter);
    }

    /// Detach the waiter for firing, if one is installed.
    pub fn take_waiter(&mut self, id: &BreakpointId) -> Option<WaitCallback> {
        self.active.get_mut(id).and_then(|a| a.waiter.take())
    }
}
