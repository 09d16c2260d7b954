//! exabgp-notify: route change notifications from ExaBGP logs.
//!
//! Reads ExaBGP log lines (typically `tail -F` piped into stdin), extracts
//! "route added/removed" events, suppresses duplicates and bursts, and sends
//! Telegram and/or email notifications. Decoupled from ExaBGP itself.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// `KEY=VALUE` configuration file and layered settings resolution.
pub mod config;
/// Route events and notification rendering.
pub mod event;
/// Stderr logging setup.
pub mod logging;
/// Log line pattern matching.
pub mod matcher;
/// Deduplication and rate limiting.
pub mod noise;
/// Telegram and SMTP senders.
pub mod notify;
/// Stdin processing loop.
pub mod pipeline;
