use serde::{Deserialize, Serialize};

/// The only error shape that survives the process boundary.
///
/// Errors raised inside a plugin are reduced to a message and an optional
/// code before crossing; the host reconstructs this shape, never the original
/// error type. Equality checks on a reconstructed error must use the code and
/// message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl PluginError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(code.into()),
        }
    }

    /// Canonical error for a rejected token.
    pub fn unauthorized() -> Self {
        Self::new("unauthorized")
    }

    /// Canonical error for configuration the plugin cannot accept.
    pub fn invalid_config() -> Self {
        Self::new("invalid config")
    }

    /// Canonical error for a call made before `initialize`.
    pub fn not_initialized() -> Self {
        Self::new("plugin not initialized")
    }
}

impl std::fmt::Display for PluginError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{code}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for PluginError {}
