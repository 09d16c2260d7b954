//! Extraction of route events from human-readable ExaBGP log lines.
//!
//! Example of a matching line:
//!
//! ```text
//! Thu, 09 Oct 2025 17:21:33 2890183 api           route added to neighbor 172.31.192.1 local-ip 172.31.192.2 ... : 187.120.203.0/24 next-hop 10.0.0.1 local-preference 210 community 53140:615
//! ```
//!
//! The pattern is anchored at the start of the (trimmed) line but not at the
//! end, so trailing text after the community token is ignored. Anything
//! between the neighbor address and the `:` that precedes the prefix is
//! skipped.

use regex::{Captures, Regex};

use crate::event::{Ipv4Prefix, RouteAction, RouteEvent};

const LINE_PATTERN: &str = concat!(
    r"(?i)^(?P<ts>\w{3},\s+[0-9]{2}\s+\w{3}\s+[0-9]{4}\s+[0-9]{2}:[0-9]{2}:[0-9]{2})",
    r".*?\bapi\s+route\s+(?P<action>added|removed)\s+to\s+neighbor\s+",
    r"(?P<neighbor>[0-9]{1,3}(?:\.[0-9]{1,3}){3})",
    r".*?:\s+(?P<prefix>[0-9]{1,3}(?:\.[0-9]{1,3}){3}/[0-9]{1,2})",
    r"\s+next-hop\s+(?P<nexthop>[0-9]{1,3}(?:\.[0-9]{1,3}){3})",
    r"\s+local-preference\s+(?P<lpref>[0-9]+)",
    r"\s+community\s+(?P<comm>[0-9]+:[0-9]+)",
);

/// Stateless matcher turning a log line into a [`RouteEvent`].
#[derive(Debug, Clone)]
pub struct LineMatcher {
    re: Regex,
}

impl LineMatcher {
    /// Compile the route-change pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern fails to compile.
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            re: Regex::new(LINE_PATTERN)?,
        })
    }

    /// Parse one raw line. Returns `None` for anything that is not a
    /// complete, well-formed route change; never a partial event.
    pub fn parse(&self, line: &str) -> Option<RouteEvent> {
        let caps = self.re.captures(line.trim())?;
        build_event(&caps)
    }
}

fn build_event(caps: &Captures<'_>) -> Option<RouteEvent> {
    Some(RouteEvent {
        timestamp: caps.name("ts")?.as_str().to_owned(),
        action: caps.name("action")?.as_str().parse::<RouteAction>().ok()?,
        neighbor: caps.name("neighbor")?.as_str().parse().ok()?,
        prefix: caps.name("prefix")?.as_str().parse::<Ipv4Prefix>().ok()?,
        next_hop: caps.name("nexthop")?.as_str().parse().ok()?,
        local_preference: caps.name("lpref")?.as_str().parse().ok()?,
        community: caps.name("comm")?.as_str().to_owned(),
    })
}
