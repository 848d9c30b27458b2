use km_plugin::{ContractLevel, MessagePlugin};
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

use crate::error::{Result, RpcError};
use crate::frame::{read_frame, write_frame};
use crate::handshake::{
    self, HostHello, MAGIC_COOKIE_KEY, MAGIC_COOKIE_VALUE, PluginHello, SERVICE_NAME,
};
use crate::server::RpcPluginServer;

/// Launch gate: a plugin binary run by hand, without the host's magic cookie
/// in the environment, should fail fast instead of reading from stdin.
pub fn check_magic_cookie() -> Result<()> {
    match std::env::var(MAGIC_COOKIE_KEY) {
        Ok(value) if value == MAGIC_COOKIE_VALUE => Ok(()),
        _ => Err(RpcError::Handshake(
            "this binary is a kilometers plugin and must be launched by the host".into(),
        )),
    }
}

/// Plugin-process entry point: perform the plugin side of the wire handshake,
/// then serve the contract until the host closes the channel. Blocks for the
/// process lifetime.
pub async fn serve<P, R, W>(plugin: P, reader: R, writer: W) -> Result<()>
where
    P: MessagePlugin + 'static,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut reader = BufReader::new(reader);
    let mut writer = writer;

    let host_hello: HostHello = read_frame(&mut reader).await?.ok_or(RpcError::Closed)?;
    handshake::check_host_hello(&host_hello)?;
    write_frame(&mut writer, &PluginHello::for_level(ContractLevel::Minimal)).await?;
    tracing::debug!(service = SERVICE_NAME, "handshake complete, serving");

    RpcPluginServer::new(plugin).run(reader, writer).await
}

/// Serve over the process's stdio, the standard transport for launched
/// plugins. Checks the magic cookie before touching the pipes.
pub async fn serve_stdio<P: MessagePlugin + 'static>(plugin: P) -> Result<()> {
    check_magic_cookie()?;
    serve(plugin, tokio::io::stdin(), tokio::io::stdout()).await
}
