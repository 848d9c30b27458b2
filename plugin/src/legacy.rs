use std::sync::Arc;

use async_trait::async_trait;
use km_types::{
    Direction, FEATURE_API_LOGGING, PluginConfig, PluginError, PluginInfo, StreamEvent,
    SubscriptionTier,
};

use crate::contract::Plugin;

/// Version reported for plugins that predate versioned metadata.
pub const LEGACY_PLUGIN_VERSION: &str = "1.0.0";

/// The older plugin contract: metadata via accessors, dependencies injected
/// as a bundle, no separate authenticate step, no correlation IDs.
#[async_trait]
pub trait LegacyPlugin: Send + Sync {
    fn name(&self) -> String;
    fn required_feature(&self) -> String;
    fn required_tier(&self) -> SubscriptionTier;

    async fn initialize(&self, deps: LegacyDependencies) -> Result<(), PluginError>;
    async fn shutdown(&self) -> Result<(), PluginError>;

    async fn handle_message(&self, data: &[u8], direction: Direction) -> Result<(), PluginError>;
    async fn handle_error(&self, err: PluginError);
    async fn handle_stream_event(&self, event: StreamEvent);
}

/// Dependency bundle handed to a legacy plugin at initialization.
#[derive(Clone)]
pub struct LegacyDependencies {
    pub config: PluginConfig,
    pub auth: Arc<dyn AuthManager>,
}

/// Authentication and feature checks in the shape legacy plugins expect.
pub trait AuthManager: Send + Sync {
    fn is_feature_enabled(&self, feature: &str) -> bool;
    fn subscription_tier(&self) -> SubscriptionTier;
}

/// Auth manager synthesized from the host config's feature-flag set.
pub struct FeatureAuthManager {
    features: Vec<String>,
}

impl FeatureAuthManager {
    pub fn new(features: Vec<String>) -> Self {
        Self { features }
    }
}

impl AuthManager for FeatureAuthManager {
    fn is_feature_enabled(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }

    /// Tier heuristic carried over from the legacy SDK: the `api_logging`
    /// flag was only sold on Pro, so its presence implies that tier. Not an
    /// authoritative tier source.
    fn subscription_tier(&self) -> SubscriptionTier {
        if self.is_feature_enabled(FEATURE_API_LOGGING) {
            SubscriptionTier::Pro
        } else {
            SubscriptionTier::Free
        }
    }
}

/// Wraps a [`LegacyPlugin`] so it satisfies the current [`Plugin`] contract
/// without modification.
pub struct LegacyAdapter<P> {
    legacy: P,
}

impl<P: LegacyPlugin> LegacyAdapter<P> {
    pub fn new(legacy: P) -> Self {
        Self { legacy }
    }
}

#[async_trait]
impl<P: LegacyPlugin> Plugin for LegacyAdapter<P> {
    /// Legacy plugins fold authentication into `initialize`, so this always
    /// succeeds immediately.
    async fn authenticate(&self, _token: &str) -> Result<(), PluginError> {
        Ok(())
    }

    async fn initialize(&self, config: PluginConfig) -> Result<(), PluginError> {
        let auth = Arc::new(FeatureAuthManager::new(config.features.clone()));
        self.legacy
            .initialize(LegacyDependencies { config, auth })
            .await
    }

    async fn shutdown(&self) -> Result<(), PluginError> {
        self.legacy.shutdown().await
    }

    async fn handle_message(
        &self,
        data: &[u8],
        direction: Direction,
        _correlation_id: &str,
    ) -> Result<(), PluginError> {
        // Legacy handlers are not correlation-aware; the ID is dropped.
        self.legacy.handle_message(data, direction).await
    }

    async fn handle_error(&self, err: PluginError) {
        self.legacy.handle_error(err).await;
    }

    async fn handle_stream_event(&self, event: StreamEvent) {
        self.legacy.handle_stream_event(event).await;
    }

    fn info(&self) -> PluginInfo {
        let name = self.legacy.name();
        PluginInfo {
            description: format!("Legacy plugin: {name}"),
            required_tier: self.legacy.required_tier(),
            ..PluginInfo::new(&name, LEGACY_PLUGIN_VERSION)
        }
    }
}
