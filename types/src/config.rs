use serde::{Deserialize, Serialize};

/// Feature flag enabling delivery of collected events to the API.
pub const FEATURE_API_LOGGING: &str = "api_logging";

/// Host-supplied configuration handed to a plugin at initialization.
///
/// The bridge passes this through opaquely; it does not validate any field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginConfig {
    pub api_endpoint: String,
    pub debug: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Feature flags enabled for this installation.
    #[serde(default)]
    pub features: Vec<String>,
}

impl PluginConfig {
    pub fn new(api_endpoint: &str) -> Self {
        Self {
            api_endpoint: api_endpoint.into(),
            debug: false,
            api_key: None,
            features: Vec::new(),
        }
    }

    pub fn with_feature(mut self, feature: &str) -> Self {
        self.features.push(feature.into());
        self
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn feature_lookup() {
        let config =
            PluginConfig::new("https://api.kilometers.ai").with_feature(FEATURE_API_LOGGING);
        assert!(config.has_feature(FEATURE_API_LOGGING));
        assert!(!config.has_feature("telemetry"));
    }

    #[test]
    fn serializes_without_empty_optionals() {
        let json = serde_json::to_value(PluginConfig::new("https://api.kilometers.ai")).unwrap();
        assert!(json.get("api_key").is_none());
        assert_eq!(json["debug"], false);
        assert_eq!(json["features"], serde_json::json!([]));
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: PluginConfig =
            serde_json::from_str(r#"{"api_endpoint":"http://localhost:5194","debug":true}"#)
                .unwrap();
        assert!(config.debug);
        assert!(config.features.is_empty());
    }
}
