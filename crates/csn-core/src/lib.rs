//! Core domain + application logic for the Slack notify/ask tools.
//!
//! This crate is intentionally transport-agnostic. The Slack Web API and the
//! MCP stdio surface live behind ports implemented in the adapter crates.

pub mod ask;
pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod notify;
pub mod port;

pub use errors::{Error, Result};
