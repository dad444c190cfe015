//! Debug-hook bridge - one physical listener, many logical breakpoints.
//!
//! The bridge owns the agent's single listener registration with the host
//! runtime and a reference-counted physical break per distinct resolved
//! `(path, line)`. The listener is installed with the first logical
//! breakpoint and removed with the last; listeners the agent did not
//! install are never touched.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::debug;

use crate::host::{BreakListener, DebugHost, HostError, ListenerId, NativeBreakId};
use crate::protocol::BreakpointId;

struct PhysicalBreak {
    native: NativeBreakId,
    refs: Vec<BreakpointId>,
}

/// Bridge state: listener handle plus the physical-break table.
#[derive(Default)]
pub struct HookBridge {
    listener: Option<ListenerId>,
    physical: HashMap<(PathBuf, u32), PhysicalBreak>,
}

impl HookBridge {
    /// Create a detached bridge.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the agent's listener is currently installed.
    pub fn is_attached(&self) -> bool {
        self.listener.is_some()
    }

    /// Register a logical breakpoint at a resolved location.
    ///
    /// Installs the dispatch listener on the first registration (the
    /// `make_listener` closure is only invoked then) and places a physical
    /// break the first time a location is seen.
    pub fn register(
        &mut self,
        host: &dyn DebugHost,
        make_listener: impl FnOnce() -> BreakListener,
        id: BreakpointId,
        path: &Path,
        line: u32,
    ) -> Result<(), HostError> {
        if self.listener.is_none() {
            self.listener = Some(host.add_listener(make_listener()));
        }

        let key = (path.to_path_buf(), line);
        if let Some(physical) = self.physical.get_mut(&key) {
            physical.refs.push(id);
            return Ok(());
        }

        let native = match host.set_break(path, line) {
            Ok(native) => native,
            Err(err) => {
                // Roll the listener back if this was the only registration
                self.detach_if_idle(host);
                return Err(err);
            }
        };
        debug!("physical break {native} set at {}:{line}", path.display());
        self.physical.insert(
            key,
            PhysicalBreak {
                native,
                refs: vec![id],
            },
        );
        Ok(())
    }

    /// Unregister a logical breakpoint; clears the physical break when its
    /// last reference goes, and detaches the listener when the last
    /// physical break goes.
    pub fn unregister(&mut self, host: &dyn DebugHost, id: &BreakpointId, path: &Path, line: u32) {
        let key = (path.to_path_buf(), line);
        if let Some(physical) = self.physical.get_mut(&key) {
            physical.refs.retain(|r| r != id);
            if physical.refs.is_empty() {
                let native = physical.native;
                self.physical.remove(&key);
                host.clear_break(native);
                debug!("physical break {native} cleared at {}:{line}", path.display());
            }
        }
        self.detach_if_idle(host);
    }

    /// Logical breakpoints registered at a location.
    pub fn ids_at(&self, path: &Path, line: u32) -> Vec<BreakpointId> {
        self.physical
            .get(&(path.to_path_buf(), line))
            .map(|p| p.refs.clone())
            .unwrap_or_default()
    }

    fn detach_if_idle(&mut self, host: &dyn DebugHost) {
        if self.physical.is_empty() {
            if let Some(listener) = self.listener.take() {
                host.remove_listener(listener);
            }
        }
    }
}
