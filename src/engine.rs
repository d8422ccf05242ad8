//! Entry point for callers: one request in, one `CheckResult` out

use crate::error::CheckError;
use crate::export::{ExportKind, ExportParser};
use crate::instagram::InstagramService;
use crate::resolver::{CheckResult, FollowSets};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// What the caller supplied
#[derive(Debug, Clone)]
pub enum CheckRequest {
    /// Automated path: a normalized public username
    Username(String),
    /// Manual path: an uploaded data export
    Export { bytes: Vec<u8>, kind: ExportKind },
}

/// Routes a request to its acquisition path and resolves the result
pub struct UnfollowersEngine {
    instagram: Option<Arc<InstagramService>>,
}

impl UnfollowersEngine {
    pub fn new(instagram: Arc<InstagramService>) -> Self {
        Self {
            instagram: Some(instagram),
        }
    }

    /// Engine that only handles uploaded exports
    pub fn export_only() -> Self {
        Self { instagram: None }
    }

    /// Acquire both follow sets for the request
    pub async fn acquire(&self, request: &CheckRequest) -> Result<FollowSets, CheckError> {
        match request {
            CheckRequest::Username(username) => match &self.instagram {
                Some(service) => service.fetch_follow_sets(username).await,
                None => Err(CheckError::Unknown("automated checks are not configured".to_string())),
            },
            CheckRequest::Export { bytes, kind } => match kind {
                ExportKind::Zip => ExportParser::archive_sets(bytes),
                ExportKind::Json => ExportParser::single_file_sets(bytes),
            },
        }
    }

    pub async fn run(&self, request: &CheckRequest) -> CheckResult {
        Ok(self.acquire(request).await?.resolve())
    }

    /// Like `run`, abandoning the request once `limit` elapses
    pub async fn run_with_timeout(&self, request: &CheckRequest, limit: Duration) -> CheckResult {
        match tokio::time::timeout(limit, self.run(request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Check abandoned after {:?}", limit);
                Err(CheckError::Unknown("timed out".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instagram::{ClientError, Credentials, InstagramApi, InstagramConnector, SessionConfig};
    use crate::proxy::{PoolConfig, ProxyChecker, ProxyPool, ProxySource, SourceFetcher};
    use async_trait::async_trait;

    #[tokio::test]
    async fn test_export_request_resolves() {
        let engine = UnfollowersEngine::export_only();
        let request = CheckRequest::Export {
            bytes: br#"{"relationships_followers": ["b"], "relationships_following": ["a", "b", "c"]}"#.to_vec(),
            kind: ExportKind::Json,
        };

        let report = engine.run(&request).await.unwrap();
        assert_eq!(report.unfollowers, vec!["a", "c"]);
        assert_eq!(report.unfollowers_count, 2);
    }

    #[tokio::test]
    async fn test_export_errors_pass_through() {
        let engine = UnfollowersEngine::export_only();
        let request = CheckRequest::Export {
            bytes: b"not a zip".to_vec(),
            kind: ExportKind::Zip,
        };
        assert_eq!(engine.run(&request).await, Err(CheckError::BadArchive));
    }

    struct StalledConnector;

    #[async_trait]
    impl InstagramConnector for StalledConnector {
        async fn login(
            &self,
            _credentials: &Credentials,
            _proxy_url: Option<&str>,
        ) -> Result<Arc<dyn InstagramApi>, ClientError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Err(ClientError::Network("unreachable".to_string()))
        }
    }

    struct NoSources;

    #[async_trait]
    impl SourceFetcher for NoSources {
        async fn fetch_text(&self, _url: &str) -> crate::Result<String> {
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn test_timeout_releases_session_lock() {
        let pool = Arc::new(ProxyPool::new(
            PoolConfig::default(),
            ProxySource::defaults(),
            Arc::new(NoSources),
            Arc::new(ProxyChecker::new()),
        ));
        let service = Arc::new(InstagramService::new(
            SessionConfig::default().with_manual_proxy(Some("http://10.9.9.9:3128".to_string())),
            Credentials::new("bot".to_string(), "pw".to_string()),
            Arc::new(StalledConnector),
            pool,
        ));
        let engine = UnfollowersEngine::new(service.clone());

        let result = engine
            .run_with_timeout(&CheckRequest::Username("someone".to_string()), Duration::from_millis(50))
            .await;
        assert_eq!(result, Err(CheckError::Unknown("timed out".to_string())));

        let authenticated = tokio::time::timeout(Duration::from_secs(1), service.is_authenticated()).await;
        assert_eq!(authenticated, Ok(false));
    }

    #[tokio::test]
    async fn test_username_without_service() {
        let engine = UnfollowersEngine::export_only();
        let result = engine
            .run_with_timeout(&CheckRequest::Username("someone".to_string()), Duration::from_secs(1))
            .await;
        assert!(matches!(result, Err(CheckError::Unknown(_))));
    }
}
