//! End-to-end bridge tests over an in-process duplex transport.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use km_plugin::{ContractLevel, MessagePlugin, PluginState, negotiate_capabilities};
use km_rpc::{PluginHello, RpcError, RpcPluginClient, serve};
use km_types::{Direction, Event, PluginError, PluginInfo, SubscriptionTier};
use pretty_assertions::assert_eq;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Test plugin that echoes each message back as a single event.
struct EchoPlugin {
    auth_failure: Option<PluginError>,
    process_failure: Option<PluginError>,
}

impl EchoPlugin {
    fn new() -> Self {
        Self {
            auth_failure: None,
            process_failure: None,
        }
    }

    fn failing_process(err: PluginError) -> Self {
        Self {
            process_failure: Some(err),
            ..Self::new()
        }
    }

    fn failing_auth(err: PluginError) -> Self {
        Self {
            auth_failure: Some(err),
            ..Self::new()
        }
    }
}

#[async_trait]
impl MessagePlugin for EchoPlugin {
    async fn authenticate(&self, _token: &str) -> Result<(), PluginError> {
        match &self.auth_failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn process_message(
        &self,
        message: &[u8],
        direction: Direction,
    ) -> Result<Vec<Event>, PluginError> {
        if let Some(err) = &self.process_failure {
            return Err(err.clone());
        }
        // Vary completion order so correlation is actually exercised.
        tokio::time::sleep(Duration::from_millis((message.len() % 7) as u64)).await;
        let mut data = HashMap::new();
        data.insert(
            "payload".to_string(),
            serde_json::json!(String::from_utf8_lossy(message)),
        );
        data.insert("direction".to_string(), serde_json::json!(direction.to_string()));
        Ok(vec![Event::new("echo", data)])
    }

    fn info(&self) -> PluginInfo {
        let mut info = PluginInfo::new("echo", "0.3.0");
        info.description = "echoes messages".into();
        info.required_tier = SubscriptionTier::Pro;
        info
    }
}

/// Serve `plugin` on one end of a duplex pipe and connect a client to the
/// other.
async fn start(plugin: EchoPlugin) -> RpcPluginClient {
    let (host_io, plugin_io) = tokio::io::duplex(64 * 1024);
    let (host_r, host_w) = tokio::io::split(host_io);
    let (plugin_r, plugin_w) = tokio::io::split(plugin_io);
    tokio::spawn(async move {
        let _ = serve(plugin, plugin_r, plugin_w).await;
    });
    RpcPluginClient::connect(host_r, host_w)
        .await
        .expect("handshake should succeed")
}

#[tokio::test]
async fn process_message_matches_direct_call() {
    let direct = EchoPlugin::new()
        .process_message(b"hello", Direction::Inbound)
        .await
        .unwrap();

    let client = start(EchoPlugin::new()).await;
    let bridged = client
        .process_message(b"hello", Direction::Inbound)
        .await
        .unwrap();

    assert_eq!(bridged.len(), direct.len());
    assert_eq!(bridged[0].event_type, direct[0].event_type);
    assert_eq!(bridged[0].data, direct[0].data);
}

#[tokio::test]
async fn get_info_round_trips() {
    let client = start(EchoPlugin::new()).await;
    let info = client.get_info().await;
    assert_eq!(info.name, "echo");
    assert_eq!(info.version, "0.3.0");
    assert_eq!(info.required_tier, SubscriptionTier::Pro);
}

#[tokio::test]
async fn get_info_swallows_transport_failure() {
    // A peer that completes the handshake and then vanishes.
    let (host_io, plugin_io) = tokio::io::duplex(4096);
    tokio::spawn(async move {
        let mut reader = BufReader::new(plugin_io);
        let mut line = String::new();
        reader.read_line(&mut line).await.expect("host hello");

        let hello = PluginHello::for_level(ContractLevel::Minimal);
        let mut reply = serde_json::to_vec(&hello).expect("encode hello");
        reply.push(b'\n');
        let mut plugin_io = reader.into_inner();
        plugin_io.write_all(&reply).await.expect("send hello");
        plugin_io.flush().await.expect("flush hello");
        // Dropping the stream here kills the transport under the client.
    });

    let (host_r, host_w) = tokio::io::split(host_io);
    let client = RpcPluginClient::connect(host_r, host_w).await.expect("handshake");
    tokio::time::sleep(Duration::from_millis(20)).await;

    let info = client.get_info().await;
    assert_eq!(info, PluginInfo::unknown());
    assert_eq!(client.state(), PluginState::Failed);
}

/// Writer that lets the handshake hello through, then reports a broken pipe
/// on every later write.
struct BreakAfterFirstFlush<W> {
    inner: W,
    flushed: bool,
}

impl<W: AsyncWrite + Unpin> AsyncWrite for BreakAfterFirstFlush<W> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        let this = self.get_mut();
        if this.flushed {
            return Poll::Ready(Err(std::io::ErrorKind::BrokenPipe.into()));
        }
        Pin::new(&mut this.inner).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        let poll = Pin::new(&mut this.inner).poll_flush(cx);
        if matches!(poll, Poll::Ready(Ok(()))) {
            this.flushed = true;
        }
        poll
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

#[tokio::test]
async fn write_failure_fails_calls_in_flight() {
    let (host_io, plugin_io) = tokio::io::duplex(4096);
    let (plugin_r, plugin_w) = tokio::io::split(plugin_io);
    tokio::spawn(async move {
        let _ = serve(EchoPlugin::new(), plugin_r, plugin_w).await;
    });

    let (host_r, host_w) = tokio::io::split(host_io);
    let host_w = BreakAfterFirstFlush {
        inner: host_w,
        flushed: false,
    };
    let client = RpcPluginClient::connect(host_r, host_w).await.expect("handshake");

    // The request frame never reaches the plugin; the caller must get a
    // transport error instead of waiting forever.
    let outcome = tokio::time::timeout(Duration::from_secs(2), client.authenticate("jwt-abc"))
        .await
        .expect("call must fail, not hang, once the channel breaks");
    assert!(matches!(outcome, Err(RpcError::Closed)));
    assert_eq!(client.state(), PluginState::Failed);

    // The channel stays closed for later calls.
    let err = client.authenticate("jwt-abc").await.unwrap_err();
    assert!(matches!(err, RpcError::Closed));
}

#[tokio::test]
async fn plugin_error_with_code_round_trips() {
    let client = start(EchoPlugin::failing_process(PluginError::with_code(
        "disk full",
        "E_IO",
    )))
    .await;

    let err = client
        .process_message(b"x", Direction::Outbound)
        .await
        .unwrap_err();
    match &err {
        RpcError::Plugin(plugin_err) => {
            assert_eq!(plugin_err.message, "disk full");
            assert_eq!(plugin_err.code.as_deref(), Some("E_IO"));
        }
        other => panic!("expected a plugin error, got {other:?}"),
    }
    assert_eq!(err.to_string(), "E_IO: disk full");
}

#[tokio::test]
async fn plugin_error_without_code_round_trips() {
    let client = start(EchoPlugin::failing_auth(PluginError::new("disk full"))).await;
    let err = client.authenticate("token").await.unwrap_err();
    assert!(err.is_plugin_error());
    assert_eq!(err.to_string(), "disk full");
}

#[tokio::test]
async fn authenticate_is_idempotent() {
    let client = start(EchoPlugin::new()).await;
    client.authenticate("jwt-abc").await.unwrap();
    client.authenticate("jwt-abc").await.unwrap();
}

#[tokio::test]
async fn rejected_token_reports_unauthorized() {
    let client = start(EchoPlugin::failing_auth(PluginError::unauthorized())).await;
    let err = client.authenticate("bad").await.unwrap_err();
    assert_eq!(err.to_string(), "unauthorized");
}

#[tokio::test]
async fn concurrent_callers_get_their_own_responses() {
    let client = Arc::new(start(EchoPlugin::new()).await);

    let mut tasks = Vec::new();
    for i in 0..16u32 {
        let client = Arc::clone(&client);
        tasks.push(tokio::spawn(async move {
            let payload = format!("correlation-{i}-{}", "x".repeat((i % 5) as usize));
            let events = client
                .process_message(payload.as_bytes(), Direction::Inbound)
                .await
                .expect("bridged call");
            (payload, events)
        }));
    }

    for task in tasks {
        let (payload, events) = task.await.expect("task");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data["payload"], serde_json::json!(payload));
    }
}

#[tokio::test]
async fn session_lifecycle_is_tracked() {
    let client = start(EchoPlugin::new()).await;
    assert_eq!(client.state(), PluginState::Connected);

    client.authenticate("jwt-abc").await.unwrap();
    assert_eq!(client.state(), PluginState::Authenticated);

    client.shutdown().await;
    assert_eq!(client.state(), PluginState::Stopped);

    let transitions: Vec<_> = client
        .lifecycle_history()
        .iter()
        .map(|event| event.to_state)
        .collect();
    assert_eq!(
        transitions,
        vec![
            PluginState::Handshaking,
            PluginState::Connected,
            PluginState::Authenticated,
            PluginState::Stopped,
        ]
    );
}

#[tokio::test]
async fn rejected_token_leaves_session_connected() {
    let client = start(EchoPlugin::failing_auth(PluginError::unauthorized())).await;
    let _ = client.authenticate("bad").await.unwrap_err();
    assert_eq!(client.state(), PluginState::Connected);
}

#[tokio::test]
async fn handshake_advertises_negotiable_capabilities() {
    let client = start(EchoPlugin::new()).await;
    let hello = client.plugin_hello();
    assert_eq!(hello.contract_level, ContractLevel::Minimal);

    let grants = negotiate_capabilities(
        &hello.capabilities,
        &ContractLevel::Full.capabilities(),
    );
    assert!(grants.iter().all(|g| g.granted));
}
