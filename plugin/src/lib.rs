pub mod capability;
pub mod contract;
pub mod legacy;
pub mod lifecycle;
pub mod registry;

// Re-export key types for convenience.
pub use capability::{CapabilityGrant, ContractLevel, PluginCapability, negotiate_capabilities};
pub use contract::{MessagePlugin, Plugin};
pub use legacy::{
    AuthManager, FeatureAuthManager, LEGACY_PLUGIN_VERSION, LegacyAdapter, LegacyDependencies,
    LegacyPlugin,
};
pub use lifecycle::{LifecycleEvent, LifecycleTracker, PluginState};
pub use registry::{PluginRegistry, RegisteredPlugin};
