use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Where a plugin session stands, as the host's bridge client sees it.
///
/// Sessions move strictly forward: `Registered` → `Handshaking` →
/// `Connected` → `Authenticated` → `Stopped`, with `Failed` reachable from
/// anywhere. `Stopped` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginState {
    /// Known to the host, no channel open yet.
    Registered,
    /// Hello exchange in progress.
    Handshaking,
    /// Handshake validated; no token presented yet.
    Connected,
    /// Token accepted; contract calls may flow.
    Authenticated,
    /// Channel closed cleanly.
    Stopped,
    /// Handshake rejection or transport fault.
    Failed,
}

impl PluginState {
    fn can_advance_to(self, next: PluginState) -> bool {
        matches!(
            (self, next),
            (Self::Registered, Self::Handshaking)
                | (Self::Handshaking, Self::Connected)
                | (Self::Connected, Self::Authenticated)
                | (Self::Connected, Self::Stopped)
                | (Self::Authenticated, Self::Stopped)
        )
    }

    /// Whether the session can still carry calls.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Connected | Self::Authenticated)
    }
}

/// One recorded state change for a plugin session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub plugin_name: String,
    pub from_state: PluginState,
    pub to_state: PluginState,
    pub timestamp: String,
    pub error: Option<String>,
}

/// Tracks plugin session states and keeps the transition history.
///
/// Driven by the host side of the bridge: connect advances through
/// `Handshaking` and `Connected`, a successful authenticate reaches
/// `Authenticated`, and a transport fault lands in `Failed` with its cause.
#[derive(Debug, Clone, Default)]
pub struct LifecycleTracker {
    states: HashMap<String, PluginState>,
    history: Vec<LifecycleEvent>,
}

impl LifecycleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move a session forward. Re-asserting the current state is a no-op;
    /// anything else outside the forward path is rejected.
    pub fn advance(&mut self, plugin_name: &str, to_state: PluginState) -> Result<(), String> {
        let from_state = self.state_of(plugin_name);
        if from_state == to_state {
            return Ok(());
        }
        if !from_state.can_advance_to(to_state) {
            return Err(format!(
                "plugin '{plugin_name}' cannot move from {from_state:?} to {to_state:?}"
            ));
        }
        self.record(plugin_name, from_state, to_state, None);
        Ok(())
    }

    /// Mark a session [`PluginState::Failed`], recording the cause. Allowed
    /// from any state; failing an already-failed session is a no-op.
    pub fn fail(&mut self, plugin_name: &str, cause: &str) {
        let from_state = self.state_of(plugin_name);
        if from_state == PluginState::Failed {
            return;
        }
        self.record(plugin_name, from_state, PluginState::Failed, Some(cause.into()));
    }

    fn record(
        &mut self,
        plugin_name: &str,
        from_state: PluginState,
        to_state: PluginState,
        error: Option<String>,
    ) {
        self.states.insert(plugin_name.to_string(), to_state);
        self.history.push(LifecycleEvent {
            plugin_name: plugin_name.into(),
            from_state,
            to_state,
            timestamp: chrono::Utc::now().to_rfc3339(),
            error,
        });
    }

    /// Sessions never seen before report as [`PluginState::Registered`].
    pub fn state_of(&self, plugin_name: &str) -> PluginState {
        self.states
            .get(plugin_name)
            .copied()
            .unwrap_or(PluginState::Registered)
    }

    pub fn history_for(&self, plugin_name: &str) -> Vec<&LifecycleEvent> {
        self.history
            .iter()
            .filter(|e| e.plugin_name == plugin_name)
            .collect()
    }

    /// Names of sessions that can still carry calls.
    pub fn live_plugins(&self) -> Vec<&str> {
        self.states
            .iter()
            .filter(|(_, s)| s.is_live())
            .map(|(name, _)| name.as_str())
            .collect()
    }
}
