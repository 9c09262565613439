/// Slack user id (e.g. `U0123ABCD`). The bot's own id is used to tell
/// self-authored thread entries apart from human replies; comparison is
/// exact string equality.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub String);

/// Slack channel id or name (e.g. `C0123ABCD`, `#deploys`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChannelId(pub String);

/// Slack message timestamp. Returned by a successful post and doubles as
/// the thread anchor for reply polling.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageTs(pub String);

/// One entry of a thread's reply sequence, oldest first. The first entry is
/// always the original posted message. `user` is absent for some system
/// messages.
#[derive(Clone, Debug)]
pub struct ThreadMessage {
    pub user: Option<UserId>,
    pub text: String,
}
