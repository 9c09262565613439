use async_trait::async_trait;

use crate::{
    domain::{ChannelId, MessageTs, ThreadMessage, UserId},
    Result,
};

/// Outbound chat-channel port.
///
/// Slack is the first implementation; the surface is the minimum the
/// notify/ask flows need so another chat backend can sit behind the same
/// trait. Every call is attempted once; retry policy, if any, belongs to
/// the caller of the whole ask.
#[async_trait]
pub trait ChannelPort: Send + Sync {
    /// Post `text` to `channel`; the returned timestamp anchors the thread.
    async fn post_message(&self, channel: &ChannelId, text: &str) -> Result<MessageTs>;

    /// The id of the account this client posts as.
    async fn identify(&self) -> Result<UserId>;

    /// All messages in the thread anchored at `ts`, oldest first. The first
    /// entry is the original post itself.
    async fn thread_replies(
        &self,
        channel: &ChannelId,
        ts: &MessageTs,
    ) -> Result<Vec<ThreadMessage>>;
}
