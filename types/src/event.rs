use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Which side of an MCP conversation a message came from.
///
/// Older plugins spelled these `request`/`response`; the aliases keep their
/// serialized form readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Traffic flowing from the client toward the MCP server.
    #[serde(alias = "request")]
    Inbound,
    /// Traffic flowing from the MCP server back to the client.
    #[serde(alias = "response")]
    Outbound,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inbound => write!(f, "inbound"),
            Self::Outbound => write!(f, "outbound"),
        }
    }
}

/// A logged event produced by a plugin while processing a message.
///
/// Opaque to the bridge beyond serialization; whatever the plugin puts in
/// `data` is copied across the boundary untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    /// RFC 3339 timestamp recorded by the producing plugin.
    pub timestamp: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
}

impl Event {
    /// Create an event with a fresh ID and the current timestamp.
    pub fn new(event_type: &str, data: HashMap<String, serde_json::Value>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            event_type: event_type.into(),
            data,
        }
    }
}

/// Kind of stream lifecycle notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamEventType {
    Start,
    End,
    Error,
}

/// Out-of-band stream lifecycle notification.
///
/// Not a request/response pair: delivery is fire-and-forget and there is no
/// return value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    #[serde(rename = "type")]
    pub event_type: StreamEventType,
    pub timestamp: String,
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StreamEvent {
    pub fn new(event_type: StreamEventType) -> Self {
        Self {
            event_type,
            timestamp: chrono::Utc::now().to_rfc3339(),
            data: HashMap::new(),
            message: None,
        }
    }

    /// An error notification carrying a human-readable message.
    pub fn error(message: &str) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::new(StreamEventType::Error)
        }
    }
}
