//! Proxy data models

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Proxy type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ProxyType {
    #[default]
    Http,
    Socks4,
    Socks5,
}

impl ProxyType {
    /// Order in which proxy types are tried when hunting for a working egress
    pub const PRIORITY: [ProxyType; 3] = [ProxyType::Http, ProxyType::Socks5, ProxyType::Socks4];

    /// URL scheme for this proxy type
    pub fn scheme(&self) -> &'static str {
        match self {
            ProxyType::Http => "http",
            ProxyType::Socks4 => "socks4",
            ProxyType::Socks5 => "socks5",
        }
    }
}

impl fmt::Display for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.scheme())
    }
}

impl FromStr for ProxyType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "http" => Ok(ProxyType::Http),
            "socks4" => Ok(ProxyType::Socks4),
            "socks5" => Ok(ProxyType::Socks5),
            _ => Err(anyhow::anyhow!(
                "Invalid proxy type: {}. Use: http, socks4, socks5",
                s
            )),
        }
    }
}

/// A proxy endpoint: a raw `host:port` address plus the scheme to reach it with
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProxyEndpoint {
    pub address: String,
    pub proxy_type: ProxyType,
}

impl ProxyEndpoint {
    pub fn new(address: impl Into<String>, proxy_type: ProxyType) -> Self {
        Self {
            address: address.into(),
            proxy_type,
        }
    }

    /// Get the proxy URL string
    pub fn url(&self) -> String {
        format!("{}://{}", self.proxy_type, self.address)
    }
}

impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url())
    }
}

/// Endpoint handed out by the pool, tagged with whether it passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedProxy {
    pub endpoint: ProxyEndpoint,
    pub validated: bool,
}

/// Result of proxy check operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProxyCheckStatus {
    Working,
    Failed(String),
    Timeout,
}

/// Detailed result of a proxy check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyCheckResult {
    pub endpoint: ProxyEndpoint,
    pub status: ProxyCheckStatus,
    pub response_time_ms: Option<u64>,
}

impl ProxyCheckResult {
    pub fn working(endpoint: ProxyEndpoint, response_time_ms: u64) -> Self {
        Self {
            endpoint,
            status: ProxyCheckStatus::Working,
            response_time_ms: Some(response_time_ms),
        }
    }

    pub fn failed(endpoint: ProxyEndpoint, error: String) -> Self {
        Self {
            endpoint,
            status: ProxyCheckStatus::Failed(error),
            response_time_ms: None,
        }
    }

    pub fn timeout(endpoint: ProxyEndpoint) -> Self {
        Self {
            endpoint,
            status: ProxyCheckStatus::Timeout,
            response_time_ms: None,
        }
    }

    pub fn is_working(&self) -> bool {
        matches!(self.status, ProxyCheckStatus::Working)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url() {
        let endpoint = ProxyEndpoint::new("127.0.0.1:8080", ProxyType::Http);
        assert_eq!(endpoint.url(), "http://127.0.0.1:8080");

        let endpoint = ProxyEndpoint::new("10.1.1.1:1080", ProxyType::Socks4);
        assert_eq!(endpoint.to_string(), "socks4://10.1.1.1:1080");
    }

    #[test]
    fn test_proxy_type_from_str() {
        assert_eq!("SOCKS5".parse::<ProxyType>().unwrap(), ProxyType::Socks5);
        assert_eq!("http".parse::<ProxyType>().unwrap(), ProxyType::Http);
        assert!("ftp".parse::<ProxyType>().is_err());
        // no mirror serves https proxies
        assert!("https".parse::<ProxyType>().is_err());
    }

    #[test]
    fn test_priority_order() {
        assert_eq!(
            ProxyType::PRIORITY,
            [ProxyType::Http, ProxyType::Socks5, ProxyType::Socks4]
        );
    }

    #[test]
    fn test_proxy_check_result() {
        let endpoint = ProxyEndpoint::new("127.0.0.1:8080", ProxyType::Http);

        let result = ProxyCheckResult::working(endpoint.clone(), 100);
        assert!(result.is_working());
        assert_eq!(result.response_time_ms, Some(100));

        let result = ProxyCheckResult::failed(endpoint.clone(), "Connection refused".to_string());
        assert!(!result.is_working());

        let result = ProxyCheckResult::timeout(endpoint);
        assert!(!result.is_working());
    }
}
