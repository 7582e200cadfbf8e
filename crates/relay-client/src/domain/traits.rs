use async_trait::async_trait;
use std::sync::Arc;

use super::error::ClientError;
use super::message::RelayMessage;

/// Trait for fetching new messages on a relay topic
///
/// The poller depends on this abstraction; the client implements it on top
/// of `get_messages`.
#[async_trait]
pub trait MessageFetcher: Send + Sync {
    async fn fetch_messages(&self, topic: &str) -> Result<Vec<RelayMessage>, ClientError>;
}

/// Callback invoked with each non-empty batch of messages for a topic
pub type TopicListener = Arc<dyn Fn(Vec<RelayMessage>) + Send + Sync>;
