use serde::{Deserialize, Serialize};

/// Capabilities a plugin can advertise at handshake time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginCapability {
    /// Token validation before any data-handling call.
    Authenticate,
    /// Message processing that yields loggable events.
    ProcessMessage,
    /// Initialize/shutdown lifecycle hooks.
    Lifecycle,
    /// Accepts fire-and-forget error notifications.
    ErrorNotification,
    /// Accepts stream start/end/error notifications.
    StreamEvents,
}

/// The contract level a plugin implements. Exactly one is advertised; the
/// two method sets are never mixed without an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractLevel {
    /// Authenticate + process-message + metadata.
    Minimal,
    /// Full lifecycle with error and stream-event hooks.
    Full,
}

impl ContractLevel {
    /// The capability set implied by this contract level.
    pub fn capabilities(self) -> Vec<PluginCapability> {
        match self {
            Self::Minimal => vec![
                PluginCapability::Authenticate,
                PluginCapability::ProcessMessage,
            ],
            Self::Full => vec![
                PluginCapability::Authenticate,
                PluginCapability::ProcessMessage,
                PluginCapability::Lifecycle,
                PluginCapability::ErrorNotification,
                PluginCapability::StreamEvents,
            ],
        }
    }
}

/// Outcome of negotiating one requested capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityGrant {
    pub capability: PluginCapability,
    pub granted: bool,
    pub reason: Option<String>,
}

/// Decide which of the capabilities a plugin advertised the host will grant.
///
/// Runs at handshake time, before the first contract call.
pub fn negotiate_capabilities(
    requested: &[PluginCapability],
    allowed: &[PluginCapability],
) -> Vec<CapabilityGrant> {
    requested
        .iter()
        .map(|cap| {
            let granted = allowed.contains(cap);
            CapabilityGrant {
                capability: *cap,
                granted,
                reason: if granted {
                    None
                } else {
                    Some("not permitted by host policy".into())
                },
            }
        })
        .collect()
}
