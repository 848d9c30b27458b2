use std::sync::Arc;

use km_plugin::MessagePlugin;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::frame::{
    AuthenticateParams, AuthenticateResponse, METHOD_AUTHENTICATE, METHOD_GET_INFO,
    METHOD_PROCESS_MESSAGE, ProcessMessageParams, ProcessMessageResponse, RequestFrame,
    ResponseFrame, read_frame, write_frame,
};

/// Plugin-side stub: receives forwarded calls and dispatches them to the
/// concrete implementation.
///
/// Every request gets a well-formed response frame. An error raised by the
/// implementation is reduced to its wire form inside the method envelope;
/// the round trip itself reports success. Requests are dispatched on spawned
/// tasks, so calls in flight concurrently are served concurrently.
pub struct RpcPluginServer<P> {
    plugin: Arc<P>,
}

impl<P: MessagePlugin + 'static> RpcPluginServer<P> {
    pub fn new(plugin: P) -> Self {
        Self {
            plugin: Arc::new(plugin),
        }
    }

    /// Run the dispatch loop until the host closes the channel.
    pub async fn run<R, W>(self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let mut reader = BufReader::new(reader);
        let (response_tx, mut response_rx) = mpsc::channel::<ResponseFrame>(64);

        let writer_handle = tokio::spawn(async move {
            let mut writer = writer;
            while let Some(frame) = response_rx.recv().await {
                if let Err(err) = write_frame(&mut writer, &frame).await {
                    tracing::warn!(error = %err, "server stub write failed");
                    break;
                }
            }
        });

        while let Some(request) = read_frame::<_, RequestFrame>(&mut reader).await? {
            tracing::debug!(seq = request.seq, method = %request.method, "dispatching call");
            let plugin = Arc::clone(&self.plugin);
            let response_tx = response_tx.clone();
            tokio::spawn(async move {
                let response = dispatch(plugin.as_ref(), request).await;
                let _ = response_tx.send(response).await;
            });
        }

        drop(response_tx);
        let _ = writer_handle.await;
        Ok(())
    }
}

/// Invoke the requested method and fold the outcome into a response frame.
async fn dispatch<P: MessagePlugin>(plugin: &P, request: RequestFrame) -> ResponseFrame {
    let seq = request.seq;
    match request.method.as_str() {
        METHOD_AUTHENTICATE => match serde_json::from_value::<AuthenticateParams>(request.params) {
            Ok(params) => {
                let envelope = AuthenticateResponse {
                    error: plugin.authenticate(&params.token).await.err(),
                };
                ok_frame(seq, &envelope)
            }
            Err(err) => {
                fault_frame(seq, format!("invalid params for {METHOD_AUTHENTICATE}: {err}"))
            }
        },
        METHOD_PROCESS_MESSAGE => {
            match serde_json::from_value::<ProcessMessageParams>(request.params) {
                Ok(params) => {
                    let envelope =
                        match plugin.process_message(&params.message, params.direction).await {
                            Ok(events) => ProcessMessageResponse {
                                events,
                                error: None,
                            },
                            Err(err) => ProcessMessageResponse {
                                events: Vec::new(),
                                error: Some(err),
                            },
                        };
                    ok_frame(seq, &envelope)
                }
                Err(err) => {
                    fault_frame(seq, format!("invalid params for {METHOD_PROCESS_MESSAGE}: {err}"))
                }
            }
        }
        METHOD_GET_INFO => ok_frame(seq, &plugin.info()),
        other => fault_frame(seq, format!("unknown method '{other}'")),
    }
}

fn ok_frame<T: Serialize>(seq: u64, envelope: &T) -> ResponseFrame {
    match serde_json::to_value(envelope) {
        Ok(result) => ResponseFrame {
            seq,
            result: Some(result),
            error: None,
        },
        Err(err) => fault_frame(seq, format!("encode response: {err}")),
    }
}

fn fault_frame(seq: u64, message: String) -> ResponseFrame {
    ResponseFrame {
        seq,
        result: None,
        error: Some(message),
    }
}
