//! Ask protocol: post a message, then wait for a human reply in its thread.
//!
//! The poll loop is an explicit timed loop with one suspension point per
//! iteration, so cancellation (dropping the future) takes effect at the
//! next sleep or fetch rather than running out the deadline.

use std::{sync::Arc, time::Duration};

use tokio::time::{sleep, Instant};

use crate::{
    config::Resolver,
    domain::{ThreadMessage, UserId},
    errors::Error,
    notify::{Notifier, NotifyRequest},
    port::ChannelPort,
    Result,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1800);

/// One ask: what to post, how often to look for an answer, and how long to
/// keep looking. Lives for a single [`Asker::ask`] call.
#[derive(Clone, Debug)]
pub struct AskRequest {
    pub notify: NotifyRequest,
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl AskRequest {
    pub fn new(notify: NotifyRequest) -> Self {
        Self {
            notify,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Posts a message and polls its thread until someone other than the bot
/// answers, or the deadline passes.
pub struct Asker {
    port: Arc<dyn ChannelPort>,
    resolver: Arc<Resolver>,
    notifier: Notifier,
}

impl Asker {
    pub fn new(port: Arc<dyn ChannelPort>, resolver: Arc<Resolver>) -> Self {
        let notifier = Notifier::new(port.clone(), resolver.clone());
        Self {
            port,
            resolver,
            notifier,
        }
    }

    /// Run one ask to completion.
    ///
    /// Failures are terminal for this ask: a failed send, identity lookup
    /// or reply fetch surfaces immediately instead of silently waiting out
    /// the deadline on a broken channel.
    pub async fn ask(&self, req: &AskRequest) -> Result<String> {
        let channel = self.resolver.channel(req.notify.channel.as_deref())?;
        let anchor = self.notifier.notify(&req.notify).await?;
        let self_id = self.port.identify().await?;

        let deadline = Instant::now() + req.timeout;
        while Instant::now() < deadline {
            // Sleep before every fetch, including the first: the earliest
            // check happens one interval after posting.
            sleep(req.poll_interval).await;

            let messages = self.port.thread_replies(&channel, &anchor).await?;
            if let Some(reply) = first_reply(&messages, &self_id) {
                tracing::debug!(ts = %anchor.0, "got reply");
                return Ok(reply);
            }
            tracing::debug!(ts = %anchor.0, "no reply yet");
        }

        Err(Error::Timeout(req.timeout))
    }
}

/// The earliest thread entry not authored by `self_id`.
///
/// Index 0 is the original post and is skipped unconditionally. Entries
/// without an author count as answers, and so does empty text: content is
/// not filtered.
fn first_reply(messages: &[ThreadMessage], self_id: &UserId) -> Option<String> {
    messages
        .iter()
        .skip(1)
        .find(|m| m.user.as_ref() != Some(self_id))
        .map(|m| m.text.clone())
}
