use km_types::{PluginInfo, SubscriptionTier};
use serde::{Deserialize, Serialize};

use crate::capability::{ContractLevel, PluginCapability};

/// Host-side record of a known plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredPlugin {
    pub info: PluginInfo,
    pub contract_level: ContractLevel,
    pub capabilities: Vec<PluginCapability>,
    pub enabled: bool,
}

impl RegisteredPlugin {
    pub fn new(info: PluginInfo, contract_level: ContractLevel) -> Self {
        Self {
            info,
            contract_level,
            capabilities: contract_level.capabilities(),
            enabled: true,
        }
    }
}

/// Registry of plugins the host knows about.
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    plugins: Vec<RegisteredPlugin>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin. Names are unique; a second registration under the
    /// same name is rejected.
    pub fn register(&mut self, plugin: RegisteredPlugin) -> Result<(), String> {
        if self.plugins.iter().any(|p| p.info.name == plugin.info.name) {
            return Err(format!("plugin '{}' already registered", plugin.info.name));
        }
        self.plugins.push(plugin);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredPlugin> {
        self.plugins.iter().find(|p| p.info.name == name)
    }

    pub fn list_enabled(&self) -> Vec<&RegisteredPlugin> {
        self.plugins.iter().filter(|p| p.enabled).collect()
    }

    pub fn list_by_capability(&self, cap: PluginCapability) -> Vec<&RegisteredPlugin> {
        self.plugins
            .iter()
            .filter(|p| p.capabilities.contains(&cap))
            .collect()
    }

    /// Plugins usable at the given subscription tier.
    pub fn list_for_tier(&self, tier: SubscriptionTier) -> Vec<&RegisteredPlugin> {
        self.plugins
            .iter()
            .filter(|p| p.info.required_tier <= tier)
            .collect()
    }

    pub fn all(&self) -> &[RegisteredPlugin] {
        &self.plugins
    }
}
