//! Proxy checker module for validating a proxy before use

use crate::proxy::models::{ProxyCheckResult, ProxyEndpoint};
use crate::Result;
use async_trait::async_trait;
use reqwest::{Client, Proxy as ReqwestProxy, StatusCode};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Default timeout for proxy checks in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 7;

/// Default URL to test proxies against
const DEFAULT_TEST_URL: &str = "https://httpbin.org/ip";

/// Configuration for proxy checker
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Timeout for each proxy check
    pub timeout: Duration,
    /// URL to test proxies against
    pub test_url: String,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            test_url: DEFAULT_TEST_URL.to_string(),
        }
    }
}

impl CheckerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_test_url(mut self, url: String) -> Self {
        self.test_url = url;
        self
    }
}

/// Decides whether an endpoint can currently carry traffic
#[async_trait]
pub trait ProxyValidator: Send + Sync {
    /// Run one check. No retries.
    async fn check(&self, endpoint: &ProxyEndpoint) -> ProxyCheckResult;

    async fn validate(&self, endpoint: &ProxyEndpoint) -> bool {
        self.check(endpoint).await.is_working()
    }
}

/// Proxy checker that issues one GET through the proxy to an echo endpoint
#[derive(Clone)]
pub struct ProxyChecker {
    config: CheckerConfig,
}

impl ProxyChecker {
    /// Create a new proxy checker with default configuration
    pub fn new() -> Self {
        Self {
            config: CheckerConfig::default(),
        }
    }

    /// Create a new proxy checker with custom configuration
    pub fn with_config(config: CheckerConfig) -> Self {
        Self { config }
    }

    /// Create a reqwest client with the proxy
    fn create_client(&self, endpoint: &ProxyEndpoint) -> Result<Client> {
        let client = Client::builder()
            .proxy(ReqwestProxy::all(endpoint.url())?)
            .timeout(self.config.timeout)
            // free proxies commonly re-sign TLS
            .danger_accept_invalid_certs(true)
            .build()?;

        Ok(client)
    }
}

impl Default for ProxyChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProxyValidator for ProxyChecker {
    async fn check(&self, endpoint: &ProxyEndpoint) -> ProxyCheckResult {
        let start = Instant::now();

        let client = match self.create_client(endpoint) {
            Ok(client) => client,
            Err(e) => return ProxyCheckResult::failed(endpoint.clone(), e.to_string()),
        };

        match tokio::time::timeout(self.config.timeout, client.get(&self.config.test_url).send()).await {
            Ok(Ok(response)) if accepts(response.status()) => {
                let elapsed = start.elapsed().as_millis() as u64;
                info!("Proxy valid: {} ({}ms)", endpoint, elapsed);
                ProxyCheckResult::working(endpoint.clone(), elapsed)
            }
            Ok(Ok(response)) => {
                debug!("Proxy {} answered {}", endpoint, response.status());
                ProxyCheckResult::failed(endpoint.clone(), format!("HTTP status: {}", response.status()))
            }
            Ok(Err(e)) => {
                debug!("Proxy {} failed: {}", endpoint, e);
                ProxyCheckResult::failed(endpoint.clone(), e.to_string())
            }
            Err(_) => ProxyCheckResult::timeout(endpoint.clone()),
        }
    }
}

/// Only a plain 200 from the echo endpoint counts as a pass
fn accepts(status: StatusCode) -> bool {
    status == StatusCode::OK
}
