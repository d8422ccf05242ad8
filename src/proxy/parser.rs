//! Proxy parser module for proxy-list bodies and proxy URLs

use crate::proxy::models::{ProxyEndpoint, ProxyType};
use once_cell::sync::Lazy;
use regex::Regex;

/// Matches a leading proxy URL scheme
static SCHEME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i)(https?|socks[45])://").expect("Invalid proxy scheme regex")
});

/// Proxy parser for list bodies and single addresses
pub struct ProxyParser;

impl ProxyParser {
    /// Parse a single list line into a raw `host:port` address
    ///
    /// Lines are trimmed; empty lines, comments and lines lacking either a
    /// colon or a dot are discarded.
    pub fn parse_line(line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        if !line.contains(':') || !line.contains('.') {
            return None;
        }
        Some(line.to_string())
    }

    /// Parse all addresses from a newline-delimited list body
    pub fn parse_string(content: &str) -> Vec<String> {
        content.lines().filter_map(Self::parse_line).collect()
    }

    /// Strip any proxy scheme, leaving the raw address
    pub fn strip_scheme(proxy: &str) -> &str {
        match SCHEME_REGEX.find(proxy) {
            Some(m) => &proxy[m.end()..],
            None => proxy,
        }
    }

    /// Build an endpoint from either a raw address or a full proxy URL.
    ///
    /// A URL keeps its own scheme; a raw address gets `default_type`.
    pub fn parse_endpoint(proxy: &str, default_type: ProxyType) -> ProxyEndpoint {
        let proxy = proxy.trim();
        let proxy_type = SCHEME_REGEX
            .captures(proxy)
            .and_then(|caps| caps[1].parse().ok())
            .unwrap_or(default_type);
        ProxyEndpoint::new(Self::strip_scheme(proxy), proxy_type)
    }

    /// Format a raw address as a proxy URL, leaving existing URLs untouched
    pub fn format_proxy_url(proxy: &str, proxy_type: ProxyType) -> String {
        if SCHEME_REGEX.is_match(proxy) {
            return proxy.to_string();
        }
        format!("{}://{}", proxy_type, proxy)
    }
}
