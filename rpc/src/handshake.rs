use km_plugin::{ContractLevel, PluginCapability};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RpcError};

/// Bridge protocol version. A mismatch at startup is fatal to the plugin
/// process.
pub const PROTOCOL_VERSION: u32 = 1;

/// Environment variable a launched plugin checks before serving.
pub const MAGIC_COOKIE_KEY: &str = "KM_PLUGIN_MAGIC_COOKIE";

/// Expected value of the magic cookie.
pub const MAGIC_COOKIE_VALUE: &str = "kilometers-plugin-magic-cookie-v1";

/// Logical service name the server stub registers under.
pub const SERVICE_NAME: &str = "kilometers";

/// First frame on the wire, host to plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostHello {
    pub protocol_version: u32,
    pub cookie_key: String,
    pub cookie_value: String,
}

impl HostHello {
    /// The hello for this build of the protocol.
    pub fn current() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            cookie_key: MAGIC_COOKIE_KEY.into(),
            cookie_value: MAGIC_COOKIE_VALUE.into(),
        }
    }
}

/// Reply frame, plugin to host, advertising the contract level so the host
/// can negotiate capabilities before the first contract call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginHello {
    pub protocol_version: u32,
    pub service: String,
    pub contract_level: ContractLevel,
    pub capabilities: Vec<PluginCapability>,
}

impl PluginHello {
    pub fn for_level(contract_level: ContractLevel) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            service: SERVICE_NAME.into(),
            contract_level,
            capabilities: contract_level.capabilities(),
        }
    }
}

/// Plugin-side validation of the host's hello.
pub fn check_host_hello(hello: &HostHello) -> Result<()> {
    if hello.protocol_version != PROTOCOL_VERSION {
        return Err(RpcError::Handshake(format!(
            "protocol version mismatch: host speaks {}, plugin speaks {PROTOCOL_VERSION}",
            hello.protocol_version
        )));
    }
    if hello.cookie_key != MAGIC_COOKIE_KEY || hello.cookie_value != MAGIC_COOKIE_VALUE {
        return Err(RpcError::Handshake("magic cookie mismatch".into()));
    }
    Ok(())
}

/// Host-side validation of the plugin's hello.
pub fn check_plugin_hello(hello: &PluginHello) -> Result<()> {
    if hello.protocol_version != PROTOCOL_VERSION {
        return Err(RpcError::Handshake(format!(
            "protocol version mismatch: plugin speaks {}, host speaks {PROTOCOL_VERSION}",
            hello.protocol_version
        )));
    }
    if hello.service != SERVICE_NAME {
        return Err(RpcError::Handshake(format!(
            "unexpected service '{}'",
            hello.service
        )));
    }
    Ok(())
}
