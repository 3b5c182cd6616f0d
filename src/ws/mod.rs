//! Streaming session management for the venue WebSocket feed.

mod backoff;
pub mod message_types;
mod stream_manager;
mod subscriptions;

pub use message_types::InboundMessage;
pub use stream_manager::{ConnectionState, StreamConfig, StreamManager};
pub use subscriptions::Subscription;
