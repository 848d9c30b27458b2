use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use km_plugin::{LifecycleEvent, LifecycleTracker, PluginState};
use km_types::{Direction, Event, PluginInfo};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{Result, RpcError};
use crate::frame::{
    AuthenticateParams, AuthenticateResponse, METHOD_AUTHENTICATE, METHOD_GET_INFO,
    METHOD_PROCESS_MESSAGE, ProcessMessageParams, ProcessMessageResponse, RequestFrame,
    ResponseFrame, read_frame, write_frame,
};
use crate::handshake::{self, HostHello, PluginHello};

/// Calls waiting for their response frames, keyed by sequence number.
#[derive(Default)]
struct Pending {
    waiters: HashMap<u64, oneshot::Sender<ResponseFrame>>,
    closed: bool,
}

/// State shared between the client handle and its background tasks.
struct Shared {
    pending: Mutex<Pending>,
    lifecycle: std::sync::Mutex<LifecycleTracker>,
    service: String,
}

/// Host-side stub realizing the plugin contract over a transport.
///
/// Each call is synchronous from the caller's point of view; multiple calls
/// from independent tasks are multiplexed over the one channel and correlated
/// by sequence number. Cancellation is not propagated: a caller that stops
/// waiting leaves the call running plugin-side, and its response is discarded
/// on arrival.
///
/// The client keeps a [`LifecycleTracker`] for its session: `Connected` after
/// the handshake, `Authenticated` once a token is accepted, `Failed` with the
/// cause when either channel direction breaks.
pub struct RpcPluginClient {
    writer_tx: mpsc::Sender<RequestFrame>,
    shared: Arc<Shared>,
    seq: AtomicU64,
    hello: PluginHello,
    reader_handle: JoinHandle<()>,
    writer_handle: JoinHandle<()>,
}

impl RpcPluginClient {
    /// Connect over a transport: send the host hello, validate the plugin's
    /// reply, then start the background reader and writer tasks.
    pub async fn connect<R, W>(reader: R, writer: W) -> Result<Self>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let mut reader = BufReader::new(reader);
        let mut writer = writer;

        write_frame(&mut writer, &HostHello::current()).await?;
        let hello: PluginHello = read_frame(&mut reader).await?.ok_or(RpcError::Closed)?;
        handshake::check_plugin_hello(&hello)?;
        tracing::debug!(
            service = %hello.service,
            contract_level = ?hello.contract_level,
            "plugin handshake complete"
        );

        let shared = Arc::new(Shared {
            pending: Mutex::new(Pending::default()),
            lifecycle: std::sync::Mutex::new(LifecycleTracker::new()),
            service: hello.service.clone(),
        });
        advance_lifecycle(&shared, PluginState::Handshaking);
        advance_lifecycle(&shared, PluginState::Connected);

        let (writer_tx, writer_rx) = mpsc::channel(64);
        let writer_handle = tokio::spawn(writer_loop(writer, writer_rx, Arc::clone(&shared)));
        let reader_handle = tokio::spawn(reader_loop(reader, Arc::clone(&shared)));

        Ok(Self {
            writer_tx,
            shared,
            seq: AtomicU64::new(1),
            hello,
            reader_handle,
            writer_handle,
        })
    }

    /// What the plugin advertised at handshake time.
    pub fn plugin_hello(&self) -> &PluginHello {
        &self.hello
    }

    /// Current lifecycle state of this session.
    pub fn state(&self) -> PluginState {
        lock_lifecycle(&self.shared).state_of(&self.shared.service)
    }

    /// Recorded lifecycle transitions for this session, oldest first.
    pub fn lifecycle_history(&self) -> Vec<LifecycleEvent> {
        lock_lifecycle(&self.shared)
            .history_for(&self.shared.service)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Remote `Plugin.Authenticate`. An application error from the plugin
    /// comes back as [`RpcError::Plugin`].
    pub async fn authenticate(&self, token: &str) -> Result<()> {
        let params = serde_json::to_value(AuthenticateParams {
            token: token.into(),
        })?;
        let result = self.call(METHOD_AUTHENTICATE, params).await?;
        let resp: AuthenticateResponse = serde_json::from_value(result)?;
        match resp.error {
            Some(err) => Err(RpcError::Plugin(err)),
            None => {
                advance_lifecycle(&self.shared, PluginState::Authenticated);
                Ok(())
            }
        }
    }

    /// Remote `Plugin.ProcessMessage`.
    pub async fn process_message(
        &self,
        message: &[u8],
        direction: Direction,
    ) -> Result<Vec<Event>> {
        let params = serde_json::to_value(ProcessMessageParams {
            message: message.to_vec(),
            direction,
        })?;
        let result = self.call(METHOD_PROCESS_MESSAGE, params).await?;
        let resp: ProcessMessageResponse = serde_json::from_value(result)?;
        match resp.error {
            Some(err) => Err(RpcError::Plugin(err)),
            None => Ok(resp.events),
        }
    }

    /// Remote `Plugin.GetInfo`. Failure is fully absorbed: metadata display
    /// must never take the host down, so any transport fault yields
    /// [`PluginInfo::unknown`].
    pub async fn get_info(&self) -> PluginInfo {
        match self.try_get_info().await {
            Ok(info) => info,
            Err(err) => {
                tracing::debug!(error = %err, "get_info failed, returning sentinel");
                PluginInfo::unknown()
            }
        }
    }

    async fn try_get_info(&self) -> Result<PluginInfo> {
        let result = self
            .call(METHOD_GET_INFO, Value::Object(serde_json::Map::new()))
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Close the session cleanly. Calls still in flight fail with
    /// [`RpcError::Closed`], and later calls are rejected immediately.
    pub async fn shutdown(&self) {
        {
            let mut pending = self.shared.pending.lock().await;
            pending.closed = true;
            pending.waiters.clear();
        }
        if self.state().is_live() {
            advance_lifecycle(&self.shared, PluginState::Stopped);
        }
    }

    /// Issue one sequence-tagged call and wait for its response frame.
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.shared.pending.lock().await;
            if pending.closed {
                return Err(RpcError::Closed);
            }
            pending.waiters.insert(seq, tx);
        }

        let frame = RequestFrame {
            seq,
            method: method.into(),
            params,
        };
        if self.writer_tx.send(frame).await.is_err() {
            self.shared.pending.lock().await.waiters.remove(&seq);
            return Err(RpcError::Closed);
        }

        let response = rx.await.map_err(|_| RpcError::Closed)?;
        if let Some(fault) = response.error {
            return Err(RpcError::Remote(fault));
        }
        Ok(response.result.unwrap_or(Value::Null))
    }
}

impl Drop for RpcPluginClient {
    fn drop(&mut self) {
        self.reader_handle.abort();
        self.writer_handle.abort();
    }
}

fn lock_lifecycle(shared: &Shared) -> std::sync::MutexGuard<'_, LifecycleTracker> {
    shared
        .lifecycle
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn advance_lifecycle(shared: &Shared, to_state: PluginState) {
    if let Err(err) = lock_lifecycle(shared).advance(&shared.service, to_state) {
        tracing::warn!(error = %err, "lifecycle bookkeeping out of step");
    }
}

/// Forwards request frames onto the wire. A write failure fails every pending
/// call; stranding their callers on a channel nobody writes to anymore would
/// hang them forever.
async fn writer_loop<W: AsyncWrite + Unpin>(
    mut writer: W,
    mut rx: mpsc::Receiver<RequestFrame>,
    shared: Arc<Shared>,
) {
    while let Some(frame) = rx.recv().await {
        if let Err(err) = write_frame(&mut writer, &frame).await {
            tracing::warn!(error = %err, "bridge write failed");
            fail_all(&shared, &format!("write failed: {err}")).await;
            return;
        }
    }
    fail_all(&shared, "request channel closed").await;
}

/// Routes response frames to their waiters. On EOF or a decode failure every
/// pending call fails with a transport error.
async fn reader_loop<R: AsyncRead + Unpin>(mut reader: BufReader<R>, shared: Arc<Shared>) {
    loop {
        match read_frame::<_, ResponseFrame>(&mut reader).await {
            Ok(Some(frame)) => {
                let waiter = shared.pending.lock().await.waiters.remove(&frame.seq);
                match waiter {
                    // A dead receiver means the caller gave up; the response
                    // is discarded here.
                    Some(tx) => {
                        let _ = tx.send(frame);
                    }
                    None => {
                        tracing::warn!(seq = frame.seq, "response frame with no pending call");
                    }
                }
            }
            Ok(None) => {
                tracing::debug!("plugin closed the channel");
                fail_all(&shared, "plugin closed the channel").await;
                break;
            }
            Err(err) => {
                tracing::warn!(error = %err, "bridge read failed");
                fail_all(&shared, &format!("read failed: {err}")).await;
                break;
            }
        }
    }
}

/// Mark the session closed and wake every waiter with a transport error.
/// Idempotent; only the first caller records the failure cause.
async fn fail_all(shared: &Shared, cause: &str) {
    let mut pending = shared.pending.lock().await;
    if pending.closed {
        return;
    }
    pending.closed = true;
    lock_lifecycle(shared).fail(&shared.service, cause);
    // Dropping the senders wakes every waiter with a channel-closed error.
    pending.waiters.clear();
}
