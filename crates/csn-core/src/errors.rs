use std::time::Duration;

/// Core error type.
///
/// The three kinds mirror the three ways a notify/ask can fail, and callers
/// branch on the variant rather than parsing message text:
/// - `Config` is permanent (missing credential/channel) and surfaces at
///   first use, not process start.
/// - `Transport` is any failed send/identify/fetch; this layer never
///   retries, the caller may retry the whole ask.
/// - `Timeout` is the expected no-reply outcome of an ask, carrying the
///   configured wait.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("no reply received within {}s", .0.as_secs())]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, Error>;
