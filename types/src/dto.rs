use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PluginError;
use crate::event::Direction;

/// One intercepted MCP event, shaped for the collection API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpEventDto {
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub correlation_id: String,
    pub event_type: String,
    pub direction: String,
    /// Base64-encoded raw payload.
    pub data: String,
    /// Payload size in bytes before encoding.
    pub size: usize,
    pub cli_version: String,
}

impl McpEventDto {
    /// Build a DTO from a raw payload, encoding it and recording its size.
    pub fn from_payload(
        session_id: &str,
        correlation_id: &str,
        event_type: &str,
        direction: Direction,
        payload: &[u8],
        cli_version: &str,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            session_id: session_id.into(),
            correlation_id: correlation_id.into(),
            event_type: event_type.into(),
            direction: direction.to_string(),
            data: BASE64.encode(payload),
            size: payload.len(),
            cli_version: cli_version.into(),
        }
    }

    /// Decode the payload back to its raw bytes.
    pub fn decode_payload(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64.decode(&self.data)
    }
}

/// A batch of events bound for the collection API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEventDto {
    pub events: Vec<McpEventDto>,
    pub timestamp: DateTime<Utc>,
    pub batch_size: usize,
}

impl BatchEventDto {
    pub fn new(events: Vec<McpEventDto>) -> Self {
        Self {
            batch_size: events.len(),
            timestamp: Utc::now(),
            events,
        }
    }
}

/// Request body wrapping one or more batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub events: Vec<BatchEventDto>,
}

impl BatchRequest {
    pub fn new(events: Vec<BatchEventDto>) -> Self {
        Self { events }
    }
}

/// Delivery transport for collected events, implemented by the host.
///
/// A plain request/response HTTP-shaped call; the bridge never constructs
/// batches itself, it only produces the `Event` values a collaborator later
/// packages into this shape.
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn send_batch_events(&self, request: BatchRequest) -> Result<(), PluginError>;
}
