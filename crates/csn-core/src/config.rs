//! Credential and channel resolution.
//!
//! Both values come from the environment and are read lazily at first use,
//! so a misconfigured process fails on the first tool call rather than at
//! startup. Successful reads are cached for the process lifetime; failed
//! reads are not, and a concurrent first use simply re-reads the same
//! value.

use std::{env, sync::OnceLock};

use crate::{domain::ChannelId, errors::Error, Result};

pub const TOKEN_VAR: &str = "SLACK_BOT_TOKEN";
pub const CHANNEL_VAR: &str = "SLACK_CHANNEL";

/// Lazily resolved bot token and default destination channel.
///
/// One instance lives for the whole process (the MCP binary holds it in an
/// `Arc`); the `OnceLock` fields give the at-most-once write semantics the
/// caching needs without a lock around reads.
pub struct Resolver {
    token_var: &'static str,
    channel_var: &'static str,
    token: OnceLock<String>,
    default_channel: OnceLock<ChannelId>,
}

impl Resolver {
    pub fn from_env() -> Self {
        Self::with_vars(TOKEN_VAR, CHANNEL_VAR)
    }

    /// Resolver reading from alternative variable names. Used by tests so
    /// they can exercise caching without fighting over the real variables.
    pub fn with_vars(token_var: &'static str, channel_var: &'static str) -> Self {
        Self {
            token_var,
            channel_var,
            token: OnceLock::new(),
            default_channel: OnceLock::new(),
        }
    }

    /// The bot token, read from the environment once and cached.
    pub fn token(&self) -> Result<&str> {
        if let Some(tok) = self.token.get() {
            return Ok(tok.as_str());
        }

        let raw = env::var(self.token_var).unwrap_or_default();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::Config(format!("{} is not set", self.token_var)));
        }

        let value = trimmed.to_string();
        Ok(self.token.get_or_init(|| value).as_str())
    }

    /// The destination channel for one call.
    ///
    /// A non-empty explicit value always wins and is never cached, so
    /// per-call overrides cannot pollute the shared default. Otherwise the
    /// default is read from the environment once and cached.
    pub fn channel(&self, explicit: Option<&str>) -> Result<ChannelId> {
        if let Some(c) = explicit {
            let c = c.trim();
            if !c.is_empty() {
                return Ok(ChannelId(c.to_string()));
            }
        }

        if let Some(chan) = self.default_channel.get() {
            return Ok(chan.clone());
        }

        let raw = env::var(self.channel_var).unwrap_or_default();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::Config(format!(
                "no channel available: {} is not set and no channel argument was given",
                self.channel_var
            )));
        }

        let value = ChannelId(trimmed.to_string());
        Ok(self.default_channel.get_or_init(|| value).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_channel_wins_without_touching_env() {
        // The env vars behind these names do not exist; an explicit value
        // must succeed anyway and must not populate the default cache.
        let r = Resolver::with_vars("CSN_TEST_TOKEN_A", "CSN_TEST_CHANNEL_A");
        let c = r.channel(Some("C777")).unwrap();
        assert_eq!(c, ChannelId("C777".to_string()));
        assert!(r.default_channel.get().is_none());

        // With no explicit value and no env default, resolution fails.
        let err = r.channel(None).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn empty_explicit_falls_back_to_default() {
        env::set_var("CSN_TEST_CHANNEL_B", "C123");
        let r = Resolver::with_vars("CSN_TEST_TOKEN_B", "CSN_TEST_CHANNEL_B");
        let c = r.channel(Some("   ")).unwrap();
        assert_eq!(c, ChannelId("C123".to_string()));
    }

    #[test]
    fn default_channel_is_cached_for_process_lifetime() {
        env::set_var("CSN_TEST_CHANNEL_C", " C900 ");
        let r = Resolver::with_vars("CSN_TEST_TOKEN_C", "CSN_TEST_CHANNEL_C");
        assert_eq!(r.channel(None).unwrap(), ChannelId("C900".to_string()));

        // Later env changes are invisible once the default is cached.
        env::set_var("CSN_TEST_CHANNEL_C", "C901");
        assert_eq!(r.channel(None).unwrap(), ChannelId("C900".to_string()));

        // An explicit override still wins over the cached default.
        assert_eq!(
            r.channel(Some("C555")).unwrap(),
            ChannelId("C555".to_string())
        );
    }

    #[test]
    fn missing_or_blank_token_is_a_config_error() {
        let r = Resolver::with_vars("CSN_TEST_TOKEN_D", "CSN_TEST_CHANNEL_D");
        assert!(matches!(r.token(), Err(Error::Config(_))));

        env::set_var("CSN_TEST_TOKEN_D2", "   ");
        let r2 = Resolver::with_vars("CSN_TEST_TOKEN_D2", "CSN_TEST_CHANNEL_D");
        assert!(matches!(r2.token(), Err(Error::Config(_))));
    }

    #[test]
    fn token_is_trimmed_and_cached() {
        env::set_var("CSN_TEST_TOKEN_E", " xoxb-abc \n");
        let r = Resolver::with_vars("CSN_TEST_TOKEN_E", "CSN_TEST_CHANNEL_E");
        assert_eq!(r.token().unwrap(), "xoxb-abc");

        env::set_var("CSN_TEST_TOKEN_E", "xoxb-other");
        assert_eq!(r.token().unwrap(), "xoxb-abc");
    }

    #[test]
    fn failed_token_read_is_retried() {
        let r = Resolver::with_vars("CSN_TEST_TOKEN_F", "CSN_TEST_CHANNEL_F");
        assert!(r.token().is_err());

        // The failure was not cached; once the variable appears the next
        // read succeeds.
        env::set_var("CSN_TEST_TOKEN_F", "xoxb-late");
        assert_eq!(r.token().unwrap(), "xoxb-late");
    }
}
