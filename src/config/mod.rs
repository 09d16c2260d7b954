//! Configuration loading and resolution.
//!
//! Settings come from a `KEY=VALUE` file (default
//! [`DEFAULT_CONFIG_PATH`], overridable with `--config`), then from the
//! process environment, then from hard-coded defaults.
//!
//! Precedence: config file > env vars > defaults.

pub mod file;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::event::RouteAction;

pub use file::{load_env_file, parse_env_file};

/// Config file used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/exabgp-notify/exabgp-notify.cfg";

/// Errors raised while loading configuration at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
}

/// A value that could not be used and was replaced by its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    /// Config key.
    pub key: &'static str,
    /// Offending value.
    pub value: String,
    /// What happened instead.
    pub reason: &'static str,
}

// ── Layered lookup ──────────────────────────────────────────────

/// File → environment → default lookup.
///
/// A key present in the file shadows the environment even when its value is
/// empty. Every returned value is trimmed.
pub struct ConfigLayers<'a, E> {
    file: &'a BTreeMap<String, String>,
    env: E,
    warnings: Vec<ConfigWarning>,
}

impl<'a, E> ConfigLayers<'a, E>
where
    E: Fn(&str) -> Option<String>,
{
    /// Build a lookup over parsed file entries and an env resolver.
    pub fn new(file: &'a BTreeMap<String, String>, env: E) -> Self {
        Self {
            file,
            env,
            warnings: Vec::new(),
        }
    }

    /// Raw lookup without a default.
    pub fn lookup(&self, key: &str) -> Option<String> {
        self.file
            .get(key)
            .cloned()
            .or_else(|| (self.env)(key))
            .map(|v| v.trim().to_owned())
    }

    /// String value, or `default`.
    pub fn string(&self, key: &str, default: &str) -> String {
        self.lookup(key).unwrap_or_else(|| default.to_owned())
    }

    /// Integer value; unparseable values fall back to `default` with a warning.
    pub fn int<T>(&mut self, key: &'static str, default: T) -> T
    where
        T: std::str::FromStr,
    {
        let Some(raw) = self.lookup(key) else {
            return default;
        };
        match raw.parse() {
            Ok(v) => v,
            Err(_) => {
                self.warnings.push(ConfigWarning {
                    key,
                    value: raw,
                    reason: "not a valid integer, using default",
                });
                default
            }
        }
    }

    /// Boolean value: `1`, `true`, `yes`, `on` (any case) are true, any other
    /// present value is false.
    pub fn bool(&self, key: &str, default: bool) -> bool {
        match self.lookup(key) {
            Some(raw) => matches!(raw.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
            None => default,
        }
    }

    /// Record a warning for a value that was ignored.
    pub fn warn(&mut self, key: &'static str, value: String, reason: &'static str) {
        self.warnings.push(ConfigWarning { key, value, reason });
    }

    /// Warnings collected so far.
    pub fn into_warnings(self) -> Vec<ConfigWarning> {
        self.warnings
    }
}

// ── Settings ────────────────────────────────────────────────────

/// Fully resolved, immutable runtime configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Actions that are forwarded to noise control.
    pub only_actions: BTreeSet<RouteAction>,
    /// Rate limiter and deduplicator parameters.
    pub noise: NoiseSettings,
    /// Replace dispatch with a trace.
    pub dry_run: bool,
    /// Debug-level diagnostics.
    pub verbose: bool,
    /// Telegram channel, when both token and chat are set.
    pub telegram: Option<TelegramSettings>,
    /// Mail channel, when host, sender and recipients are set.
    pub smtp: Option<SmtpSettings>,
    /// Values that were ignored during resolution.
    pub warnings: Vec<ConfigWarning>,
}

/// Noise-control parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoiseSettings {
    /// `THROTTLE_WINDOW_SEC`.
    pub throttle_window_secs: i64,
    /// `THROTTLE_MAX`.
    pub throttle_max: usize,
    /// `DEDUP_TTL_SEC`.
    pub dedup_ttl_secs: i64,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            throttle_window_secs: 60,
            throttle_max: 30,
            dedup_ttl_secs: 60,
        }
    }
}

/// Telegram bot settings.
#[derive(Clone)]
pub struct TelegramSettings {
    /// Bot API token.
    pub bot_token: String,
    /// Target chat or channel identifier.
    pub chat_id: String,
}

impl std::fmt::Debug for TelegramSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramSettings")
            .field("bot_token", &"__REDACTED__")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

/// SMTP settings.
#[derive(Clone)]
pub struct SmtpSettings {
    /// Server host name.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Login user; authentication happens only with a password too.
    pub user: String,
    /// Login password.
    pub password: String,
    /// `From` mailbox.
    pub from: String,
    /// Raw recipient entries (display names allowed).
    pub to: Vec<String>,
    /// Implicit TLS (SMTPS).
    pub ssl: bool,
    /// Upgrade a plain connection with STARTTLS.
    pub starttls: bool,
}

impl SmtpSettings {
    /// Credentials to authenticate with, if both user and password are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        (!self.user.is_empty() && !self.password.is_empty())
            .then_some((self.user.as_str(), self.password.as_str()))
    }
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"__REDACTED__")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("ssl", &self.ssl)
            .field("starttls", &self.starttls)
            .finish()
    }
}

impl Settings {
    /// Load the config file at `path` and resolve against the process env.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = load_env_file(path)?;
        Ok(Self::resolve(&file, |key| std::env::var(key).ok()))
    }

    /// Resolve settings from parsed file entries and an env resolver.
    ///
    /// Takes a resolver function for testability (avoids `set_var` in tests).
    pub fn resolve(file: &BTreeMap<String, String>, env: impl Fn(&str) -> Option<String>) -> Self {
        let mut layers = ConfigLayers::new(file, env);

        let only_actions = parse_actions(&mut layers);

        let defaults = NoiseSettings::default();
        let noise = NoiseSettings {
            throttle_window_secs: layers.int("THROTTLE_WINDOW_SEC", defaults.throttle_window_secs),
            throttle_max: layers.int("THROTTLE_MAX", defaults.throttle_max),
            dedup_ttl_secs: layers.int("DEDUP_TTL_SEC", defaults.dedup_ttl_secs),
        };

        let dry_run = layers.bool("DRY_RUN", false);
        let verbose = layers.bool("VERBOSE", false);

        let bot_token = layers.string("TELEGRAM_BOT_TOKEN", "");
        let chat_id = layers.string("TELEGRAM_CHAT_ID", "");
        let telegram = (!bot_token.is_empty() && !chat_id.is_empty())
            .then_some(TelegramSettings { bot_token, chat_id });

        let smtp = resolve_smtp(&mut layers);

        Self {
            only_actions,
            noise,
            dry_run,
            verbose,
            telegram,
            smtp,
            warnings: layers.into_warnings(),
        }
    }

    /// Whether events with `action` are forwarded.
    pub fn wants(&self, action: RouteAction) -> bool {
        self.only_actions.contains(&action)
    }
}

fn parse_actions<E>(layers: &mut ConfigLayers<'_, E>) -> BTreeSet<RouteAction>
where
    E: Fn(&str) -> Option<String>,
{
    let raw = layers.string("ONLY_ACTIONS", "added,removed");
    let mut actions = BTreeSet::new();
    for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match token.parse::<RouteAction>() {
            Ok(action) => {
                actions.insert(action);
            }
            Err(_) => layers.warn("ONLY_ACTIONS", token.to_owned(), "unknown action ignored"),
        }
    }
    actions
}

fn resolve_smtp<E>(layers: &mut ConfigLayers<'_, E>) -> Option<SmtpSettings>
where
    E: Fn(&str) -> Option<String>,
{
    let host = layers.string("SMTP_HOST", "");
    let port: u16 = layers.int("SMTP_PORT", 587);
    let user = layers.string("SMTP_USER", "");
    let password = layers.string("SMTP_PASS", "");
    let from = layers.string("MAIL_FROM", "");
    let to = split_recipients(&layers.string("MAIL_TO", ""));
    let ssl = layers.bool("SMTP_SSL", port == 465);
    let starttls = layers.bool("SMTP_STARTTLS", true);

    if host.is_empty() || from.is_empty() || to.is_empty() {
        return None;
    }
    Some(SmtpSettings {
        host,
        port,
        user,
        password,
        from,
        to,
        ssl,
        starttls,
    })
}

/// Split a `MAIL_TO` value on `,` and `;`, dropping empty entries.
pub fn split_recipients(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

// ── Tests ───────────────────────────────────────────────────────
