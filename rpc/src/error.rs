use km_types::PluginError;

/// Errors surfaced by the remote-call bridge.
///
/// Two distinct families cross here: transport faults (`Io`, `Codec`,
/// `Closed`, `Remote`, `Handshake`) which make the in-flight call fail and
/// mark the plugin process unhealthy, and [`RpcError::Plugin`] which is an
/// application error the plugin reported as data. Only the latter is
/// recoverable per call.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("channel closed")]
    Closed,

    #[error("handshake: {0}")]
    Handshake(String),

    /// The server stub could not dispatch the call (unknown method, bad
    /// params). Reported at the frame level, not inside a method envelope.
    #[error("remote dispatch fault: {0}")]
    Remote(String),

    /// An error the plugin raised, reconstructed from its wire form.
    #[error(transparent)]
    Plugin(#[from] PluginError),
}

impl RpcError {
    /// Whether this is an application error rather than a transport fault.
    pub fn is_plugin_error(&self) -> bool {
        matches!(self, Self::Plugin(_))
    }
}

pub type Result<T> = std::result::Result<T, RpcError>;
