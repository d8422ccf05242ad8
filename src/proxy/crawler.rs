//! Proxy crawler module for fetching public proxy lists
//!
//! This module provides functionality for:
//! - The static set of public proxy-list mirrors, per proxy type
//! - Fetching list bodies over HTTP
//! - Crawling every source for a type concurrently, tolerating failures

use crate::proxy::models::ProxyType;
use crate::proxy::parser::ProxyParser;
use crate::Result;
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// Default timeout for list downloads in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Default user agent for HTTP requests
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Result of crawling a single source
#[derive(Debug, Clone)]
pub struct CrawlResult {
    /// The source that was crawled
    pub source: String,
    /// Raw `host:port` addresses extracted from the source
    pub proxies: Vec<String>,
    /// Error message if crawling failed
    pub error: Option<String>,
}

impl CrawlResult {
    pub fn success(source: String, proxies: Vec<String>) -> Self {
        Self {
            source,
            proxies,
            error: None,
        }
    }

    pub fn failure(source: String, error: String) -> Self {
        Self {
            source,
            proxies: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Configuration for proxy crawler
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Timeout for each list download
    pub timeout: Duration,
    /// User agent for HTTP requests
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl CrawlerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// Proxy source representing a plain-text list of `host:port` lines
#[derive(Debug, Clone)]
pub struct ProxySource {
    /// Name of the proxy source
    pub name: String,
    /// URL to fetch proxies from
    pub url: String,
    /// Proxy type for this source
    pub proxy_type: ProxyType,
}

impl ProxySource {
    pub fn new(name: &str, url: &str, proxy_type: ProxyType) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            proxy_type,
        }
    }

    /// Known public mirrors, refreshed by their maintainers hourly or daily
    pub fn defaults() -> Vec<ProxySource> {
        use ProxyType::{Http, Socks4, Socks5};

        vec![
            ProxySource::new("thespeedx-http", "https://raw.githubusercontent.com/TheSpeedX/PROXY-List/master/http.txt", Http),
            ProxySource::new("monosans-http", "https://raw.githubusercontent.com/monosans/proxy-list/main/proxies/http.txt", Http),
            ProxySource::new("clarketm-http", "https://raw.githubusercontent.com/clarketm/proxy-list/master/proxy-list-raw.txt", Http),
            ProxySource::new("shiftytr-http", "https://raw.githubusercontent.com/ShiftyTR/Proxy-List/master/http.txt", Http),
            ProxySource::new("sunny9577-http", "https://raw.githubusercontent.com/sunny9577/proxy-scraper/master/generated/http_proxies.txt", Http),
            ProxySource::new("proxyscrape-http", "https://api.proxyscrape.com/v2/?request=displayproxies&protocol=http&timeout=5000&country=all&ssl=all&anonymity=all", Http),
            ProxySource::new("thespeedx-socks5", "https://raw.githubusercontent.com/TheSpeedX/PROXY-List/master/socks5.txt", Socks5),
            ProxySource::new("monosans-socks5", "https://raw.githubusercontent.com/monosans/proxy-list/main/proxies/socks5.txt", Socks5),
            ProxySource::new("shiftytr-socks5", "https://raw.githubusercontent.com/ShiftyTR/Proxy-List/master/socks5.txt", Socks5),
            ProxySource::new("proxyscrape-socks5", "https://api.proxyscrape.com/v2/?request=displayproxies&protocol=socks5&timeout=5000&country=all", Socks5),
            ProxySource::new("thespeedx-socks4", "https://raw.githubusercontent.com/TheSpeedX/PROXY-List/master/socks4.txt", Socks4),
            ProxySource::new("monosans-socks4", "https://raw.githubusercontent.com/monosans/proxy-list/main/proxies/socks4.txt", Socks4),
            ProxySource::new("proxyscrape-socks4", "https://api.proxyscrape.com/v2/?request=displayproxies&protocol=socks4&timeout=5000&country=all", Socks4),
        ]
    }
}

/// Downloads the body of a proxy list
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Fetch a list body. Non-success statuses are errors.
    async fn fetch_text(&self, url: &str) -> Result<String>;
}

/// Proxy crawler for fetching proxy lists over HTTP
pub struct ProxyCrawler {
    client: Client,
}

impl ProxyCrawler {
    /// Create a new proxy crawler with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(CrawlerConfig::default())
    }

    /// Create a new proxy crawler with custom configuration
    pub fn with_config(config: CrawlerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl SourceFetcher for ProxyCrawler {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

/// Crawl every source concurrently, returning one result per source.
///
/// A failing source yields an empty failure result; it never aborts the
/// others.
pub async fn crawl_sources(fetcher: &dyn SourceFetcher, sources: &[ProxySource]) -> Vec<CrawlResult> {
    let tasks = sources.iter().map(|source| async move {
        match fetcher.fetch_text(&source.url).await {
            Ok(body) => {
                let proxies = ProxyParser::parse_string(&body);
                info!("Fetched {} proxies from {}", proxies.len(), source.name);
                CrawlResult::success(source.name.clone(), proxies)
            }
            Err(e) => {
                debug!("Failed to fetch {}: {}", source.name, e);
                CrawlResult::failure(source.name.clone(), e.to_string())
            }
        }
    });

    join_all(tasks).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::collections::HashMap;

    struct StaticFetcher {
        bodies: HashMap<String, String>,
    }

    #[async_trait]
    impl SourceFetcher for StaticFetcher {
        async fn fetch_text(&self, url: &str) -> Result<String> {
            self.bodies
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow!("HTTP status: 404 Not Found"))
        }
    }

    #[test]
    fn test_crawler_config_builder() {
        let config = CrawlerConfig::new()
            .with_timeout(Duration::from_secs(60))
            .with_user_agent("Custom Agent".to_string());

        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.user_agent, "Custom Agent");
    }

    #[test]
    fn test_crawl_result_failure() {
        let result = CrawlResult::failure("test-source".to_string(), "Connection failed".to_string());
        assert!(!result.is_success());
        assert!(result.proxies.is_empty());
        assert_eq!(result.error, Some("Connection failed".to_string()));
    }

    #[test]
    fn test_default_sources_cover_every_priority_type() {
        let sources = ProxySource::defaults();
        for proxy_type in ProxyType::PRIORITY {
            assert!(sources.iter().any(|s| s.proxy_type == proxy_type));
        }
        for source in &sources {
            assert!(source.url.starts_with("https://"));
        }
    }

    #[tokio::test]
    async fn test_crawl_sources_tolerates_failures() {
        let sources = vec![
            ProxySource::new("good", "https://lists.test/good.txt", ProxyType::Http),
            ProxySource::new("dead", "https://lists.test/dead.txt", ProxyType::Http),
        ];
        let fetcher = StaticFetcher {
            bodies: HashMap::from([(
                "https://lists.test/good.txt".to_string(),
                "1.1.1.1:80\nnot-a-proxy\n2.2.2.2:8080\n".to_string(),
            )]),
        };

        let results = crawl_sources(&fetcher, &sources).await;
        assert_eq!(results.len(), 2);
        assert!(results[0].is_success());
        assert_eq!(results[0].proxies, vec!["1.1.1.1:80", "2.2.2.2:8080"]);
        assert!(!results[1].is_success());
        assert!(results[1].proxies.is_empty());
    }
}
