//! Client IP resolution (§4.3.1 step 1): try a fixed, ordered list of proxy
//! headers before falling back to the socket peer. A header is only accepted
//! as a candidate if it parses as a valid IP literal.

use std::net::IpAddr;

/// Headers tried in order. `X-Forwarded-For` is special-cased to take only
/// its first comma-separated value; every other header is used verbatim.
const HEADER_ORDER: &[&str] = &[
    "X-Forwarded-For",
    "X-Real-IP",
    "X-Original-Forwarded-For",
    "CF-Connecting-IP",
    "EO-Connecting-IP",
    "Ali-CDN-Real-IP",
    "True-Client-IP",
    "X-Client-IP",
    "X-Cluster-Client-IP",
    "X-Forwarded",
    "Forwarded-For",
    "Forwarded",
];

/// Resolve the client IP given a case-insensitive header lookup and the
/// socket peer address (used when no header yields a valid IP literal).
pub fn resolve_client_ip(get_header: impl Fn(&str) -> Option<String>, socket_peer: &str) -> String {
    for name in HEADER_ORDER {
        let Some(value) = get_header(name) else {
            continue;
        };
        let candidate = if name.eq_ignore_ascii_case("X-Forwarded-For") {
            value.split(',').next().unwrap_or("").trim()
        } else {
            value.trim()
        };
        if let Ok(ip) = candidate.parse::<IpAddr>() {
            return ip.to_string();
        }
    }
    socket_peer.to_string()
}
