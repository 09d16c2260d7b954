//! Accept/reject behaviour of `matcher::LineMatcher` on realistic log lines.

use std::net::Ipv4Addr;

use exabgp_notify::event::RouteAction;
use exabgp_notify::matcher::LineMatcher;

const LINE: &str = "Thu, 09 Oct 2025 17:21:33 2890183 api           route added to neighbor 172.31.192.1 local-ip 172.31.192.2 local-as 65000 peer-as 53140 router-id 172.31.192.2 family-allowed in-open : 187.120.203.0/24 next-hop 10.0.0.1 local-preference 210 community 53140:615";

fn matcher() -> LineMatcher {
    LineMatcher::new().expect("pattern compiles")
}

// ── Accepted ────────────────────────────────────────────────────

#[test]
fn removed_action_is_recognised() {
    let line = LINE.replace("route added", "route removed");
    let event = matcher().parse(&line).expect("should match");
    assert_eq!(event.action, RouteAction::Removed);
}

#[test]
fn keywords_are_case_insensitive() {
    let line = LINE
        .replace("api", "API")
        .replace("route added to neighbor", "Route ADDED To Neighbor")
        .replace("next-hop", "Next-Hop")
        .replace("local-preference", "LOCAL-PREFERENCE")
        .replace("community", "Community");
    let event = matcher().parse(&line).expect("should match");
    assert_eq!(event.action, RouteAction::Added);
    assert_eq!(event.local_preference, 210);
}

#[test]
fn trailing_text_after_community_is_ignored() {
    let line = format!("{LINE} community 65000:2 extra garbage");
    let event = matcher().parse(&line).expect("should match");
    assert_eq!(event.community, "53140:615");
}

#[test]
fn minimal_neighbor_section_is_accepted() {
    let line = "Mon, 01 Jan 2024 00:00:00 1 api route removed to neighbor 192.0.2.1 : 0.0.0.0/0 next-hop 192.0.2.254 local-preference 0 community 0:0";
    let event = matcher().parse(line).expect("should match");
    assert_eq!(event.prefix.to_string(), "0.0.0.0/0");
    assert_eq!(event.neighbor, Ipv4Addr::new(192, 0, 2, 1));
    assert_eq!(event.next_hop, Ipv4Addr::new(192, 0, 2, 254));
    assert_eq!(event.local_preference, 0);
}

#[test]
fn host_route_is_accepted() {
    let line = LINE.replace("187.120.203.0/24", "203.0.113.7/32");
    let event = matcher().parse(&line).expect("should match");
    assert_eq!(event.prefix.len, 32);
    assert_eq!(event.prefix.addr, Ipv4Addr::new(203, 0, 113, 7));
}

// ── Rejected ────────────────────────────────────────────────────

#[test]
fn missing_community_is_rejected() {
    let line = LINE.replace(" community 53140:615", "");
    assert!(matcher().parse(&line).is_none());
}

#[test]
fn non_numeric_local_preference_is_rejected() {
    let line = LINE.replace("local-preference 210", "local-preference high");
    assert!(matcher().parse(&line).is_none());
}

#[test]
fn short_addresses_are_rejected() {
    let line = LINE.replace("next-hop 10.0.0.1", "next-hop 10.0.1");
    assert!(matcher().parse(&line).is_none());
}

#[test]
fn out_of_range_octets_are_rejected() {
    for (from, to) in [
        ("next-hop 10.0.0.1", "next-hop 10.0.0.256"),
        ("neighbor 172.31.192.1", "neighbor 172.31.192.300"),
        ("187.120.203.0/24", "187.120.999.0/24"),
    ] {
        let line = LINE.replace(from, to);
        assert!(matcher().parse(&line).is_none(), "accepted: {to}");
    }
}

#[test]
fn attributes_out_of_order_are_rejected() {
    let line = LINE.replace(
        "next-hop 10.0.0.1 local-preference 210",
        "local-preference 210 next-hop 10.0.0.1",
    );
    assert!(matcher().parse(&line).is_none());
}

#[test]
fn unknown_action_is_rejected() {
    let line = LINE.replace("route added", "route withdrawn");
    assert!(matcher().parse(&line).is_none());
}

#[test]
fn missing_api_marker_is_rejected() {
    let line = LINE.replace("api           ", "");
    assert!(matcher().parse(&line).is_none());
}

#[test]
fn missing_timestamp_is_rejected() {
    let line = LINE.replace("Thu, 09 Oct 2025 17:21:33 ", "");
    assert!(matcher().parse(&line).is_none());
}

#[test]
fn unrelated_lines_are_rejected() {
    let m = matcher();
    for line in [
        "",
        "   ",
        "Thu, 09 Oct 2025 17:21:33 2890183 reactor       loaded new configuration successfully",
        "Thu, 09 Oct 2025 17:21:33 2890183 network       peer 172.31.192.1 ASN 53140 established",
        "ルート added to neighbor 172.31.192.1",
    ] {
        assert!(m.parse(line).is_none(), "accepted: {line:?}");
    }
}
