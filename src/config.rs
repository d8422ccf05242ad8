//! Environment-driven configuration

use crate::instagram::{Credentials, SessionConfig};
use crate::proxy::{CheckerConfig, CrawlerConfig, PoolConfig};
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables.
/// Every tuning value has a default; only the Instagram account is
/// needed for the automated path.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub credentials: Credentials,
    pub session: SessionConfig,
    pub pool: PoolConfig,
    pub checker: CheckerConfig,
    pub crawler: CrawlerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl AppConfig {
    /// Read `.env` (if present) and the process environment
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|key| std::env::var(key).ok());
        config.log_keys();
        config
    }

    /// Build from any key lookup; missing or unparsable values use defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let secs = |key: &str, default: Duration| {
            parse_var::<u64, _>(&lookup, key)
                .map(Duration::from_secs)
                .unwrap_or(default)
        };
        let count = |key: &str, default: usize| parse_var::<usize, _>(&lookup, key).unwrap_or(default);

        let pool_defaults = PoolConfig::default();
        let checker_defaults = CheckerConfig::default();
        let crawler_defaults = CrawlerConfig::default();
        let session_defaults = SessionConfig::default();

        let pool = PoolConfig::new()
            .with_cache_ttl(secs("PROXY_CACHE_TTL_SECS", pool_defaults.cache_ttl))
            .with_max_test(count("PROXY_MAX_TEST", pool_defaults.max_test))
            .with_max_test_per_type(count("PROXY_MAX_TEST_PER_TYPE", pool_defaults.max_test_per_type));

        let checker = CheckerConfig::new()
            .with_timeout(secs("PROXY_VALIDATE_TIMEOUT_SECS", checker_defaults.timeout))
            .with_test_url(lookup("PROXY_TEST_URL").unwrap_or(checker_defaults.test_url));

        let crawler = CrawlerConfig::new().with_timeout(secs("PROXY_FETCH_TIMEOUT_SECS", crawler_defaults.timeout));

        let session = SessionConfig::new()
            .with_login_attempts(count("IG_LOGIN_ATTEMPTS", session_defaults.login_attempts))
            .with_manual_proxy(lookup("IG_PROXY"));

        Self {
            credentials: Credentials::new(
                lookup("IG_USERNAME").unwrap_or_default(),
                lookup("IG_PASSWORD").unwrap_or_default(),
            ),
            session,
            pool,
            checker,
            crawler,
        }
    }

    fn log_keys(&self) {
        fn preview(val: &str) -> String {
            if val.is_empty() {
                return "<not set>".to_string();
            }
            let head: String = val.chars().take(3).collect();
            format!("{}...({} chars)", head, val.chars().count())
        }

        tracing::info!("Config loaded:");
        tracing::info!("  IG_USERNAME: {}", preview(&self.credentials.username));
        tracing::info!("  IG_PASSWORD: {}", if self.credentials.password.is_empty() { "<not set>" } else { "<set>" });
        tracing::info!("  IG_PROXY: {}", if self.session.manual_proxy.is_some() { "<set>" } else { "<not set>" });
        tracing::info!("  PROXY_CACHE_TTL_SECS: {}", self.pool.cache_ttl.as_secs());
        tracing::info!("  PROXY_VALIDATE_TIMEOUT_SECS: {}", self.checker.timeout.as_secs());
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)?.trim().parse().ok()
}
