use anyhow::Result;
use async_trait::async_trait;

use crate::state::PeerId;

/// Network collaborator: peer-to-peer message exchange, acknowledgement and
/// typing-notification delivery. Implementations own transport reliability
/// and retry policy; this core only awaits completion or cancels the task
/// around the call.
#[async_trait]
pub trait NetworkService: Send + Sync + 'static {
    /// Idempotent catalog refresh (emoticons and stickers).
    async fn refresh_emoticon_catalog(&self) -> Result<()>;

    async fn refresh_recent_messages(&self, peer: PeerId) -> Result<()>;

    async fn acknowledge_received(&self, peer: PeerId) -> Result<()>;

    /// Completion means the notification was handed off for delivery.
    async fn send_typing_notification(&self, peer: PeerId) -> Result<()>;

    async fn send_message(&self, peer: PeerId, content: String) -> Result<()>;
}
