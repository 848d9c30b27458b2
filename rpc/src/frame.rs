use km_types::{Direction, Event, PluginError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::Result;

/// RPC method names exposed by the server stub.
pub const METHOD_AUTHENTICATE: &str = "Plugin.Authenticate";
pub const METHOD_PROCESS_MESSAGE: &str = "Plugin.ProcessMessage";
pub const METHOD_GET_INFO: &str = "Plugin.GetInfo";

/// One remote call. Sequence-tagged so that concurrent callers can share the
/// channel and responses can be correlated back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestFrame {
    pub seq: u64,
    pub method: String,
    pub params: Value,
}

/// Response to one call.
///
/// `error` is reserved for dispatch faults (unknown method, malformed
/// params). Application errors travel inside `result` as envelope data, so a
/// well-formed call always reports success at this layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseFrame {
    pub seq: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Arguments for `Plugin.Authenticate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticateParams {
    pub token: String,
}

/// Envelope returned by `Plugin.Authenticate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthenticateResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<PluginError>,
}

/// Arguments for `Plugin.ProcessMessage`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessMessageParams {
    pub message: Vec<u8>,
    pub direction: Direction,
}

/// Envelope returned by `Plugin.ProcessMessage`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessMessageResponse {
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<PluginError>,
}

/// Write one newline-delimited JSON frame and flush it.
pub(crate) async fn write_frame<W, T>(writer: &mut W, frame: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_vec(frame)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}

/// Read the next newline-delimited JSON frame. `None` means the peer closed
/// the channel. Blank lines are skipped.
pub(crate) async fn read_frame<R, T>(reader: &mut R) -> Result<Option<T>>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    let mut line = String::new();
    loop {
        line.clear();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            return Ok(None);
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        return Ok(Some(serde_json::from_str(trimmed)?));
    }
}
