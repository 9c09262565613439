//! Slack notify MCP server.
//!
//! - JSON-RPC over stdio (newline-delimited)
//! - Exposes two tools: `slack_notify` (fire-and-forget) and `slack_ask`
//!   (post, then wait for a threaded human reply)
//! - Tool calls run on their own tasks: an ask can wait minutes for a
//!   reply without blocking other requests, and responses may complete out
//!   of order.

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use csn_core::{
    ask::{AskRequest, Asker, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT},
    config::Resolver,
    notify::{Notifier, NotifyRequest},
    Error,
};
use csn_slack::SlackClient;

const SERVER_NAME: &str = "slack-notify";

const INSTRUCTIONS: &str = "Slack notification tools. Use slack_notify for fire-and-forget \
     messages. Use slack_ask when you need a human response - it posts a message and waits \
     for a threaded reply.";

#[derive(Debug, Deserialize)]
struct RpcRequest {
    #[allow(dead_code)]
    jsonrpc: Option<String>,
    id: Option<serde_json::Value>,
    method: String,
    params: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct RpcResponse<'a> {
    jsonrpc: &'a str,
    id: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<serde_json::Value>,
}

fn respond_ok(id: serde_json::Value, result: serde_json::Value) -> RpcResponse<'static> {
    RpcResponse {
        jsonrpc: "2.0",
        id,
        result: Some(result),
        error: None,
    }
}

fn respond_err(id: serde_json::Value, code: i64, message: &str) -> RpcResponse<'static> {
    RpcResponse {
        jsonrpc: "2.0",
        id,
        result: None,
        error: Some(json!({ "code": code, "message": message })),
    }
}

/// Map the core error taxonomy onto JSON-RPC codes, so the host can branch
/// on the kind without parsing message text.
fn respond_core_err(id: serde_json::Value, err: Error) -> RpcResponse<'static> {
    let code = match &err {
        Error::Config(_) => -32602,
        Error::Timeout(_) => -32001,
        Error::Transport(_) => -32000,
    };
    respond_err(id, code, &err.to_string())
}

fn tool_text(text: &str) -> serde_json::Value {
    json!({ "content": [ { "type": "text", "text": text } ] })
}

// === Tool arguments ===

#[derive(Debug, Deserialize)]
struct NotifyArgs {
    message: String,
    subject: Option<String>,
    sender: Option<String>,
    channel: Option<String>,
}

impl NotifyArgs {
    fn into_request(self) -> NotifyRequest {
        NotifyRequest {
            message: self.message,
            subject: self.subject,
            sender: self.sender,
            channel: self.channel,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AskArgs {
    message: String,
    subject: Option<String>,
    sender: Option<String>,
    channel: Option<String>,
    poll_interval: Option<f64>,
    timeout: Option<f64>,
}

/// Seconds-as-JSON-number to Duration; rejects negative and non-finite
/// values instead of panicking on them.
fn seconds(value: Option<f64>, default: Duration) -> Result<Duration, String> {
    match value {
        None => Ok(default),
        Some(s) => {
            Duration::try_from_secs_f64(s).map_err(|_| format!("invalid duration in seconds: {s}"))
        }
    }
}

// === Routing ===

enum Routed {
    Reply(RpcResponse<'static>),
    Tool {
        id: serde_json::Value,
        name: String,
        args: serde_json::Value,
    },
    Ignore,
}

fn route(req: RpcRequest) -> Routed {
    // Notifications have no id => no response.
    let Some(id) = req.id else {
        return Routed::Ignore;
    };

    match req.method.as_str() {
        "initialize" => {
            let proto = req
                .params
                .as_ref()
                .and_then(|p| p.get("protocolVersion"))
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");

            Routed::Reply(respond_ok(
                id,
                json!({
                  "protocolVersion": proto,
                  "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") },
                  "capabilities": { "tools": {} },
                  "instructions": INSTRUCTIONS,
                }),
            ))
        }

        "tools/list" => Routed::Reply(respond_ok(id, tools_list())),

        "tools/call" => {
            let Some(params) = req.params else {
                return Routed::Reply(respond_err(id, -32602, "Missing params"));
            };

            let name = params
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            if name != "slack_notify" && name != "slack_ask" {
                return Routed::Reply(respond_err(id, -32602, "Unknown tool"));
            }

            let args = params
                .get("arguments")
                .cloned()
                .unwrap_or(serde_json::Value::Null);
            Routed::Tool { id, name, args }
        }

        _ => Routed::Reply(respond_err(id, -32601, "Method not found")),
    }
}

fn tools_list() -> serde_json::Value {
    json!({
      "tools": [
        {
          "name": "slack_notify",
          "description": "Post a message to Slack. Fire-and-forget.",
          "inputSchema": {
            "type": "object",
            "properties": {
              "message": { "type": "string", "description": "The message body." },
              "subject": { "type": "string", "description": "Optional subject line (rendered bold)." },
              "sender": {
                "type": "string",
                "description": "Optional sender name (e.g. \"ci-bot\", \"release-agent\"). Displayed as a prefix so the reader can identify which agent sent it."
              },
              "channel": { "type": "string", "description": "Optional channel override; defaults to SLACK_CHANNEL." }
            },
            "required": ["message"]
          }
        },
        {
          "name": "slack_ask",
          "description": "Post a message to Slack, then wait for a human reply in the thread.",
          "inputSchema": {
            "type": "object",
            "properties": {
              "message": { "type": "string", "description": "The message body." },
              "subject": { "type": "string", "description": "Optional subject line (rendered bold)." },
              "sender": {
                "type": "string",
                "description": "Optional sender name (e.g. \"ci-bot\", \"release-agent\"). Displayed as a prefix so the reader can identify which agent sent it."
              },
              "channel": { "type": "string", "description": "Optional channel override; defaults to SLACK_CHANNEL." },
              "poll_interval": { "type": "number", "description": "Seconds between polls (default 10)." },
              "timeout": { "type": "number", "description": "Max seconds to wait (default 1800 = 30min)." }
            },
            "required": ["message"]
          }
        }
      ]
    })
}

// === Tool execution ===

struct App {
    notifier: Notifier,
    asker: Asker,
}

async fn run_tool(
    app: Arc<App>,
    id: serde_json::Value,
    name: String,
    args: serde_json::Value,
) -> RpcResponse<'static> {
    match name.as_str() {
        "slack_notify" => call_notify(&app, id, args).await,
        "slack_ask" => call_ask(&app, id, args).await,
        _ => respond_err(id, -32602, "Unknown tool"),
    }
}

async fn call_notify(
    app: &App,
    id: serde_json::Value,
    args: serde_json::Value,
) -> RpcResponse<'static> {
    let args: NotifyArgs = match serde_json::from_value(args) {
        Ok(v) => v,
        Err(e) => return respond_err(id, -32602, &format!("invalid arguments: {e}")),
    };
    if args.message.trim().is_empty() {
        return respond_err(id, -32602, "message is required");
    }

    match app.notifier.notify(&args.into_request()).await {
        Ok(ts) => respond_ok(id, tool_text(&format!("Posted (ts: {})", ts.0))),
        Err(e) => respond_core_err(id, e),
    }
}

async fn call_ask(
    app: &App,
    id: serde_json::Value,
    args: serde_json::Value,
) -> RpcResponse<'static> {
    let args: AskArgs = match serde_json::from_value(args) {
        Ok(v) => v,
        Err(e) => return respond_err(id, -32602, &format!("invalid arguments: {e}")),
    };
    if args.message.trim().is_empty() {
        return respond_err(id, -32602, "message is required");
    }

    let poll_interval = match seconds(args.poll_interval, DEFAULT_POLL_INTERVAL) {
        Ok(v) => v,
        Err(e) => return respond_err(id, -32602, &e),
    };
    let timeout = match seconds(args.timeout, DEFAULT_TIMEOUT) {
        Ok(v) => v,
        Err(e) => return respond_err(id, -32602, &e),
    };

    let req = AskRequest {
        notify: NotifyRequest {
            message: args.message,
            subject: args.subject,
            sender: args.sender,
            channel: args.channel,
        },
        poll_interval,
        timeout,
    };

    match app.asker.ask(&req).await {
        Ok(reply) => respond_ok(id, tool_text(&reply)),
        Err(e) => respond_core_err(id, e),
    }
}

async fn send_response(tx: &mpsc::Sender<String>, resp: RpcResponse<'_>) {
    match serde_json::to_string(&resp) {
        Ok(line) => {
            let _ = tx.send(line).await;
        }
        Err(e) => tracing::warn!("failed to serialize rpc response: {e}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    csn_core::logging::init("csn_mcp")?;
    tracing::info!("slack-notify MCP server running on stdio");

    let resolver = Arc::new(Resolver::from_env());
    let slack = Arc::new(SlackClient::new(resolver.clone()));
    let app = Arc::new(App {
        notifier: Notifier::new(slack.clone(), resolver.clone()),
        asker: Asker::new(slack, resolver),
    });

    // Single writer task; tool tasks funnel their responses through it so
    // concurrent completions never interleave bytes on stdout.
    let (tx, mut rx) = mpsc::channel::<String>(64);
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = rx.recv().await {
            if stdout.write_all(line.as_bytes()).await.is_err() {
                break;
            }
            if stdout.write_all(b"\n").await.is_err() {
                break;
            }
            if stdout.flush().await.is_err() {
                break;
            }
        }
    });

    let cancel = CancellationToken::new();
    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let req = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(v) => v,
            Err(_) => continue,
        };

        match route(req) {
            Routed::Ignore => {}
            Routed::Reply(resp) => send_response(&tx, resp).await,
            Routed::Tool { id, name, args } => {
                let app = app.clone();
                let tx = tx.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        resp = run_tool(app, id, name, args) => {
                            send_response(&tx, resp).await;
                        }
                    }
                });
            }
        }
    }

    // Host hung up: stop in-flight asks at their next suspension point and
    // let the writer drain.
    cancel.cancel();
    drop(tx);
    let _ = writer.await;

    Ok(())
}
