//! Fire-and-forget notification.

use std::sync::Arc;

use crate::{
    config::Resolver,
    domain::MessageTs,
    formatting::format_body,
    port::ChannelPort,
    Result,
};

/// One outgoing notification. Subject and sender decorate the body (see
/// [`format_body`]); `channel` overrides the process default for this call
/// only.
#[derive(Clone, Debug, Default)]
pub struct NotifyRequest {
    pub message: String,
    pub subject: Option<String>,
    pub sender: Option<String>,
    pub channel: Option<String>,
}

/// Formats and posts a one-shot message, returning its thread anchor.
pub struct Notifier {
    port: Arc<dyn ChannelPort>,
    resolver: Arc<Resolver>,
}

impl Notifier {
    pub fn new(port: Arc<dyn ChannelPort>, resolver: Arc<Resolver>) -> Self {
        Self { port, resolver }
    }

    pub async fn notify(&self, req: &NotifyRequest) -> Result<MessageTs> {
        let channel = self.resolver.channel(req.channel.as_deref())?;
        let body = format_body(&req.message, req.subject.as_deref(), req.sender.as_deref());
        let ts = self.port.post_message(&channel, &body).await?;
        tracing::debug!(channel = %channel.0, ts = %ts.0, "posted message");
        Ok(ts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::{
        domain::{ChannelId, ThreadMessage, UserId},
        Error,
    };

    struct RecordingPort {
        posted: Mutex<Vec<(ChannelId, String)>>,
    }

    #[async_trait]
    impl ChannelPort for RecordingPort {
        async fn post_message(&self, channel: &ChannelId, text: &str) -> Result<MessageTs> {
            self.posted
                .lock()
                .unwrap()
                .push((channel.clone(), text.to_string()));
            Ok(MessageTs("1700000000.000100".to_string()))
        }

        async fn identify(&self) -> Result<UserId> {
            Err(Error::Transport("identify not expected here".to_string()))
        }

        async fn thread_replies(
            &self,
            _channel: &ChannelId,
            _ts: &MessageTs,
        ) -> Result<Vec<ThreadMessage>> {
            Err(Error::Transport("fetch not expected here".to_string()))
        }
    }

    #[tokio::test]
    async fn posts_raw_message_to_explicit_channel() {
        let port = Arc::new(RecordingPort {
            posted: Mutex::new(Vec::new()),
        });
        let resolver = Arc::new(Resolver::with_vars("CSN_NOTIFY_TOK", "CSN_NOTIFY_CHAN"));
        let notifier = Notifier::new(port.clone(), resolver);

        let req = NotifyRequest {
            message: "deploy finished".to_string(),
            channel: Some("C42".to_string()),
            ..Default::default()
        };
        let ts = notifier.notify(&req).await.unwrap();
        assert_eq!(ts.0, "1700000000.000100");

        let posted = port.posted.lock().unwrap();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].0, ChannelId("C42".to_string()));
        assert_eq!(posted[0].1, "deploy finished");
    }

    #[tokio::test]
    async fn missing_channel_fails_before_any_send() {
        let port = Arc::new(RecordingPort {
            posted: Mutex::new(Vec::new()),
        });
        let resolver = Arc::new(Resolver::with_vars(
            "CSN_NOTIFY_TOK2",
            "CSN_NOTIFY_CHAN_UNSET",
        ));
        let notifier = Notifier::new(port.clone(), resolver);

        let req = NotifyRequest {
            message: "hello".to_string(),
            ..Default::default()
        };
        let err = notifier.notify(&req).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(port.posted.lock().unwrap().is_empty());
    }
}
