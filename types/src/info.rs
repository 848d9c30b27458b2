use serde::{Deserialize, Serialize};

/// Subscription level gating which plugin features may be exercised.
///
/// Ordered: `Free < Pro < Enterprise`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    #[default]
    Free,
    Pro,
    Enterprise,
}

impl std::fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Free => write!(f, "free"),
            Self::Pro => write!(f, "pro"),
            Self::Enterprise => write!(f, "enterprise"),
        }
    }
}

impl std::str::FromStr for SubscriptionTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "pro" => Ok(Self::Pro),
            "enterprise" => Ok(Self::Enterprise),
            other => Err(format!("unknown subscription tier '{other}'")),
        }
    }
}

/// Immutable plugin metadata, returned on demand.
///
/// The extended fields (`author`, CLI version bounds, `platforms`) are only
/// populated for distributable-package metadata and stay `None` elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required_tier: SubscriptionTier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cli_version_min: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cli_version_max: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platforms: Option<Vec<String>>,
}

impl PluginInfo {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: String::new(),
            required_tier: SubscriptionTier::default(),
            author: None,
            cli_version_min: None,
            cli_version_max: None,
            platforms: None,
        }
    }

    /// Sentinel returned when metadata cannot be fetched. Metadata display
    /// must never take the host down, so callers get this instead of an
    /// error.
    pub fn unknown() -> Self {
        Self::new("unknown", "unknown")
    }
}
