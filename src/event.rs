//! Route events extracted from ExaBGP log lines and their notification text.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

/// Strips HTML tags from the Telegram-flavoured body.
static TAG_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<[^>]+>").ok());

/// Whether a route was announced or withdrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RouteAction {
    /// `route added to neighbor ...`
    Added,
    /// `route removed to neighbor ...`
    Removed,
}

impl RouteAction {
    /// Lower-case token as it appears in logs and `ONLY_ACTIONS`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
        }
    }

    /// Upper-case label used in notification text.
    pub fn label(self) -> &'static str {
        match self {
            Self::Added => "ADDED",
            Self::Removed => "REMOVED",
        }
    }
}

impl fmt::Display for RouteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when an action token is neither `added` nor `removed`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown route action: {0:?}")]
pub struct UnknownAction(pub String);

impl FromStr for RouteAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("added") {
            Ok(Self::Added)
        } else if s.eq_ignore_ascii_case("removed") {
            Ok(Self::Removed)
        } else {
            Err(UnknownAction(s.to_owned()))
        }
    }
}

/// An IPv4 destination prefix in CIDR form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ipv4Prefix {
    /// Network address as written in the log.
    pub addr: Ipv4Addr,
    /// Prefix length, at most 32.
    pub len: u8,
}

impl Ipv4Prefix {
    /// Build a prefix, rejecting lengths above 32.
    pub fn new(addr: Ipv4Addr, len: u8) -> Option<Self> {
        (len <= 32).then_some(Self { addr, len })
    }
}

impl fmt::Display for Ipv4Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.len)
    }
}

impl FromStr for Ipv4Prefix {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, len) = s
            .split_once('/')
            .ok_or_else(|| format!("missing prefix length in {s:?}"))?;
        let addr: Ipv4Addr = addr
            .parse()
            .map_err(|e| format!("invalid prefix address in {s:?}: {e}"))?;
        let len: u8 = len
            .parse()
            .map_err(|e| format!("invalid prefix length in {s:?}: {e}"))?;
        Self::new(addr, len).ok_or_else(|| format!("prefix length out of range in {s:?}"))
    }
}

/// A route change parsed from one log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEvent {
    /// Timestamp exactly as written in the log, never re-parsed.
    pub timestamp: String,
    /// Added or removed.
    pub action: RouteAction,
    /// BGP neighbor the route was sent to.
    pub neighbor: Ipv4Addr,
    /// Destination prefix.
    pub prefix: Ipv4Prefix,
    /// Next-hop address.
    pub next_hop: Ipv4Addr,
    /// `local-preference` attribute.
    pub local_preference: u32,
    /// Community token, e.g. `53140:615`.
    pub community: String,
}

impl RouteEvent {
    /// Identity used to recognise repeated events.
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            action: self.action,
            prefix: self.prefix,
            neighbor: self.neighbor,
        }
    }

    /// Render the subject and bodies sent to the notification channels.
    pub fn notification(&self) -> Notification {
        let html = format!(
            "<b>ExaBGP</b>: route <b>{action}</b>\n\
             Prefix: <code>{prefix}</code>\n\
             Next-hop: {next_hop}  LP: {lpref}  Community: {community}\n\
             Neighbor: {neighbor}\n\
             When: {timestamp}",
            action = self.action.label(),
            prefix = self.prefix,
            next_hop = self.next_hop,
            lpref = self.local_preference,
            community = self.community,
            neighbor = self.neighbor,
            timestamp = self.timestamp,
        );
        let plain = strip_tags(&html);
        let subject = format!(
            "ExaBGP: route {action} {prefix} (nh {next_hop})",
            action = self.action.label(),
            prefix = self.prefix,
            next_hop = self.next_hop,
        );
        Notification {
            subject,
            html,
            plain,
        }
    }
}

/// `(action, prefix, neighbor)` identity of a route event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DedupKey {
    /// Normalized action.
    pub action: RouteAction,
    /// Destination prefix.
    pub prefix: Ipv4Prefix,
    /// Neighbor address.
    pub neighbor: Ipv4Addr,
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.action, self.prefix, self.neighbor)
    }
}

/// Rendered notification for one admitted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Mail subject line.
    pub subject: String,
    /// Telegram body (`parse_mode=HTML`).
    pub html: String,
    /// Tag-free body for mail and dry-run traces.
    pub plain: String,
}

/// Remove `<...>` tags from a string.
pub fn strip_tags(text: &str) -> String {
    match TAG_RE.as_ref() {
        Some(re) => re.replace_all(text, "").into_owned(),
        None => text.to_owned(),
    }
}
