pub mod config;
pub mod dto;
pub mod error;
pub mod event;
pub mod info;

// Re-export key types for convenience.
pub use config::{FEATURE_API_LOGGING, PluginConfig};
pub use dto::{ApiClient, BatchEventDto, BatchRequest, McpEventDto};
pub use error::PluginError;
pub use event::{Direction, Event, StreamEvent, StreamEventType};
pub use info::{PluginInfo, SubscriptionTier};
