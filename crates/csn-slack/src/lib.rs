//! Slack Web API adapter.
//!
//! Implements [`ChannelPort`] over `chat.postMessage`, `auth.test` and
//! `conversations.replies`. Slack answers most app-level failures with HTTP
//! 200 and `ok: false`, so both the HTTP status and the `ok` field are
//! checked and map to the same transport error kind.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::OnceCell;

use csn_core::{
    config::Resolver,
    domain::{ChannelId, MessageTs, ThreadMessage, UserId},
    port::ChannelPort,
    Error, Result,
};

const SLACK_API: &str = "https://slack.com/api";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    ts: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthTestResponse {
    ok: bool,
    user_id: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RepliesResponse {
    ok: bool,
    #[serde(default)]
    messages: Vec<WireMessage>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    user: Option<String>,
    #[serde(default)]
    text: String,
}

impl From<WireMessage> for ThreadMessage {
    fn from(m: WireMessage) -> Self {
        Self {
            user: m.user.map(UserId),
            text: m.text,
        }
    }
}

/// HTTP client for the Slack Web API.
///
/// The token is resolved lazily per request, so a missing credential
/// surfaces as a config error before any network I/O. The bot's own user id
/// is looked up once and cached for the process lifetime; a failed lookup
/// is not cached and the next ask retries it.
pub struct SlackClient {
    http: reqwest::Client,
    resolver: Arc<Resolver>,
    identity: OnceCell<UserId>,
}

impl SlackClient {
    pub fn new(resolver: Arc<Resolver>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client build");
        Self {
            http,
            resolver,
            identity: OnceCell::new(),
        }
    }

    async fn auth_test(&self) -> Result<UserId> {
        let token = self.resolver.token()?;
        let resp = self
            .http
            .post(format!("{SLACK_API}/auth.test"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("slack auth.test request error: {e}")))?;
        let resp = ensure_success("auth.test", resp).await?;

        let data: AuthTestResponse = resp
            .json()
            .await
            .map_err(|e| Error::Transport(format!("slack auth.test json error: {e}")))?;
        if !data.ok {
            return Err(api_error("auth.test", data.error));
        }
        data.user_id
            .map(UserId)
            .ok_or_else(|| Error::Transport("slack auth.test response missing user_id".to_string()))
    }
}

#[async_trait]
impl ChannelPort for SlackClient {
    async fn post_message(&self, channel: &ChannelId, text: &str) -> Result<MessageTs> {
        let token = self.resolver.token()?;
        let body = serde_json::json!({ "channel": channel.0, "text": text });

        let resp = self
            .http
            .post(format!("{SLACK_API}/chat.postMessage"))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("slack chat.postMessage request error: {e}")))?;
        let resp = ensure_success("chat.postMessage", resp).await?;

        let data: PostMessageResponse = resp
            .json()
            .await
            .map_err(|e| Error::Transport(format!("slack chat.postMessage json error: {e}")))?;
        if !data.ok {
            return Err(api_error("chat.postMessage", data.error));
        }
        data.ts.map(MessageTs).ok_or_else(|| {
            Error::Transport("slack chat.postMessage response missing ts".to_string())
        })
    }

    async fn identify(&self) -> Result<UserId> {
        let id = self
            .identity
            .get_or_try_init(|| self.auth_test())
            .await?;
        Ok(id.clone())
    }

    async fn thread_replies(
        &self,
        channel: &ChannelId,
        ts: &MessageTs,
    ) -> Result<Vec<ThreadMessage>> {
        let token = self.resolver.token()?;

        let resp = self
            .http
            .get(format!("{SLACK_API}/conversations.replies"))
            .bearer_auth(token)
            .query(&[("channel", channel.0.as_str()), ("ts", ts.0.as_str())])
            .send()
            .await
            .map_err(|e| {
                Error::Transport(format!("slack conversations.replies request error: {e}"))
            })?;
        let resp = ensure_success("conversations.replies", resp).await?;

        let data: RepliesResponse = resp.json().await.map_err(|e| {
            Error::Transport(format!("slack conversations.replies json error: {e}"))
        })?;
        if !data.ok {
            return Err(api_error("conversations.replies", data.error));
        }
        Ok(data.messages.into_iter().map(ThreadMessage::from).collect())
    }
}

async fn ensure_success(call: &str, resp: reqwest::Response) -> Result<reqwest::Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    tracing::warn!(%status, call, "slack api returned non-success status");
    Err(Error::Transport(format!(
        "slack {call} failed: {status} {}",
        body.chars().take(200).collect::<String>()
    )))
}

fn api_error(call: &str, error: Option<String>) -> Error {
    Error::Transport(format!(
        "slack {call} failed: {}",
        error.unwrap_or_else(|| "unknown".to_string())
    ))
}
