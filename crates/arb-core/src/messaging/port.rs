use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    Result,
};

/// Outbound messenger port.
///
/// Telegram is the only implementation; the router talks to it through this
/// trait so handlers can be exercised without a network.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    /// Send a plain text message to `chat_id`.
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef>;

    /// Copy `source` into `chat_id` without the "forwarded from" header.
    async fn copy_message(&self, chat_id: ChatId, source: MessageRef) -> Result<MessageRef>;
}
