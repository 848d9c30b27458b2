use async_trait::async_trait;
use km_types::{Direction, Event, PluginConfig, PluginError, PluginInfo, StreamEvent};

/// The minimal plugin contract: authenticate, process messages, report
/// metadata. This is the capability level that crosses the remote-call
/// bridge.
#[async_trait]
pub trait MessagePlugin: Send + Sync {
    /// Validate the host-provided token or API key.
    ///
    /// Must be idempotent: repeating the call with the same token yields the
    /// same result, with no hidden state advance on success.
    async fn authenticate(&self, token: &str) -> Result<(), PluginError>;

    /// Handle an intercepted MCP message and return any events to log.
    async fn process_message(
        &self,
        message: &[u8],
        direction: Direction,
    ) -> Result<Vec<Event>, PluginError>;

    /// Plugin metadata for discovery and display.
    ///
    /// Callable before any other method and infallible; a plugin with
    /// incomplete metadata returns best-effort defaults, never an error.
    fn info(&self) -> PluginInfo;
}

/// The full lifecycle contract for host-local plugins.
///
/// A concrete plugin implements exactly one of [`MessagePlugin`] or
/// [`Plugin`]; implementations own their internal synchronization, since
/// calls may arrive concurrently.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Validate the host-provided token or API key.
    async fn authenticate(&self, token: &str) -> Result<(), PluginError>;

    /// Receive host configuration and prepare for message handling.
    async fn initialize(&self, config: PluginConfig) -> Result<(), PluginError>;

    /// Release resources.
    async fn shutdown(&self) -> Result<(), PluginError>;

    /// Called for each intercepted MCP message. The correlation ID ties a
    /// request to its eventual response.
    async fn handle_message(
        &self,
        data: &[u8],
        direction: Direction,
        correlation_id: &str,
    ) -> Result<(), PluginError>;

    /// Notification of a non-fatal error in the host pipeline. No return
    /// channel.
    async fn handle_error(&self, err: PluginError);

    /// Notification of a stream lifecycle event. No return channel.
    async fn handle_stream_event(&self, event: StreamEvent);

    /// Plugin metadata for discovery and display. Infallible.
    fn info(&self) -> PluginInfo;
}
