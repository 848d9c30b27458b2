pub mod client;
pub mod error;
pub mod frame;
pub mod handshake;
pub mod serve;
pub mod server;

// Re-export key types for convenience.
pub use client::RpcPluginClient;
pub use error::{Result, RpcError};
pub use frame::{
    AuthenticateParams, AuthenticateResponse, ProcessMessageParams, ProcessMessageResponse,
    RequestFrame, ResponseFrame,
};
pub use handshake::{
    HostHello, MAGIC_COOKIE_KEY, MAGIC_COOKIE_VALUE, PROTOCOL_VERSION, PluginHello, SERVICE_NAME,
};
pub use serve::{check_magic_cookie, serve, serve_stdio};
pub use server::RpcPluginServer;
