//! Shared Instagram session and the automated unfollowers check

use crate::error::CheckError;
use crate::instagram::client::{ClientError, Credentials, InstagramApi, InstagramConnector};
use crate::proxy::ProxyPool;
use crate::resolver::{CheckResult, FollowSets};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Default number of proxy-backed login attempts
const DEFAULT_LOGIN_ATTEMPTS: usize = 5;

/// Configuration for the session client
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Login attempts, each with a freshly acquired proxy
    pub login_attempts: usize,
    /// Manual proxy URL; when set, the pool is never consulted
    pub manual_proxy: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            login_attempts: DEFAULT_LOGIN_ATTEMPTS,
            manual_proxy: None,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_login_attempts(mut self, attempts: usize) -> Self {
        self.login_attempts = attempts;
        self
    }

    pub fn with_manual_proxy(mut self, proxy: Option<String>) -> Self {
        self.manual_proxy = proxy.filter(|p| !p.trim().is_empty());
        self
    }
}

#[derive(Default)]
struct SessionSlot {
    session: Option<Arc<dyn InstagramApi>>,
    last_failure: Option<CheckError>,
}

/// Owns the single authenticated session of the process.
///
/// The session slot is guarded by an async mutex held for the whole login
/// sequence, so at most one authentication runs at a time. Callers that
/// queued behind an attempt get its outcome, success or failure.
pub struct InstagramService {
    config: SessionConfig,
    credentials: Credentials,
    connector: Arc<dyn InstagramConnector>,
    pool: Arc<ProxyPool>,
    session: Mutex<SessionSlot>,
    // bumped under the slot lock each time a login attempt finishes
    login_generation: AtomicU64,
}

impl InstagramService {
    pub fn new(
        config: SessionConfig,
        credentials: Credentials,
        connector: Arc<dyn InstagramConnector>,
        pool: Arc<ProxyPool>,
    ) -> Self {
        Self {
            config,
            credentials,
            connector,
            pool,
            session: Mutex::new(SessionSlot::default()),
            login_generation: AtomicU64::new(0),
        }
    }

    pub fn pool(&self) -> &Arc<ProxyPool> {
        &self.pool
    }

    /// Whether an authenticated session is currently held
    pub async fn is_authenticated(&self) -> bool {
        self.session.lock().await.session.is_some()
    }

    /// Drop the held session so the next call logs in again
    pub async fn invalidate(&self) {
        let mut slot = self.session.lock().await;
        slot.session = None;
        slot.last_failure = None;
    }

    /// Drop the held session only if it is still the one that failed
    async fn invalidate_if_current(&self, failed: &Arc<dyn InstagramApi>) {
        let mut slot = self.session.lock().await;
        if slot.session.as_ref().is_some_and(|current| Arc::ptr_eq(current, failed)) {
            info!("Invalidating Instagram session");
            slot.session = None;
        }
    }

    /// Return the shared session, authenticating first if there is none
    pub async fn session(&self) -> Result<Arc<dyn InstagramApi>, CheckError> {
        let seen = self.login_generation.load(Ordering::Acquire);
        let mut slot = self.session.lock().await;
        if let Some(session) = slot.session.as_ref() {
            return Ok(session.clone());
        }
        if self.login_generation.load(Ordering::Acquire) != seen {
            if let Some(err) = slot.last_failure.clone() {
                info!("Sharing the outcome of the login attempt that just failed");
                return Err(err);
            }
        }

        let outcome = self.authenticate().await;
        self.login_generation.fetch_add(1, Ordering::AcqRel);
        match outcome {
            Ok(session) => {
                slot.session = Some(session.clone());
                slot.last_failure = None;
                Ok(session)
            }
            Err(err) => {
                slot.last_failure = Some(err.clone());
                Err(err)
            }
        }
    }

    async fn authenticate(&self) -> Result<Arc<dyn InstagramApi>, CheckError> {
        if let Some(proxy) = &self.config.manual_proxy {
            return match self.connector.login(&self.credentials, Some(proxy.as_str())).await {
                Ok(session) => {
                    info!("Instagram login succeeded through the configured proxy");
                    Ok(session)
                }
                Err(e) => {
                    error!("Instagram login through the configured proxy failed: {}", e);
                    Err(login_failure(&e))
                }
            };
        }

        for attempt in 1..=self.config.login_attempts {
            let Some(selected) = self.pool.get_best_proxy().await else {
                warn!("Login attempt {}: no proxy available", attempt);
                continue;
            };

            let proxy_url = selected.endpoint.url();
            info!(
                "Login attempt {}/{} via {} (validated: {})",
                attempt, self.config.login_attempts, proxy_url, selected.validated
            );

            match self.connector.login(&self.credentials, Some(proxy_url.as_str())).await {
                Ok(session) => {
                    info!("Instagram login succeeded via {}", proxy_url);
                    self.pool.promote(selected.endpoint).await;
                    return Ok(session);
                }
                Err(e) => {
                    if e.is_blacklist_or_challenge() {
                        warn!("Proxy {} rejected by Instagram: {}", proxy_url, e);
                    } else {
                        warn!("Login via {} failed: {}", proxy_url, e);
                    }
                    self.pool.blacklist(&proxy_url).await;
                }
            }
        }

        error!(
            "All proxies exhausted after {} login attempts",
            self.config.login_attempts
        );
        Err(CheckError::LoginRequired)
    }

    /// Fetch both follow sets of a public account
    pub async fn fetch_follow_sets(&self, username: &str) -> Result<FollowSets, CheckError> {
        let session = self.session().await?;

        match fetch_sets(session.as_ref(), username).await {
            Ok(sets) => Ok(sets),
            Err(FetchError::Private) => Err(CheckError::PrivateAccount),
            Err(FetchError::Client(e)) => {
                let kind = e.classify();
                match &kind {
                    CheckError::LoginRequired | CheckError::IpBlacklisted => {
                        self.invalidate_if_current(&session).await;
                    }
                    CheckError::Unknown(detail) => {
                        error!("Error checking unfollowers for {}: {}", username, detail);
                    }
                    _ => {}
                }
                Err(kind)
            }
        }
    }

    /// Run the automated check for a username
    pub async fn check_unfollowers(&self, username: &str) -> CheckResult {
        Ok(self.fetch_follow_sets(username).await?.resolve())
    }
}

enum FetchError {
    Private,
    Client(ClientError),
}

impl From<ClientError> for FetchError {
    fn from(err: ClientError) -> Self {
        FetchError::Client(err)
    }
}

async fn fetch_sets(session: &dyn InstagramApi, username: &str) -> Result<FollowSets, FetchError> {
    let user_id = session.user_id_from_username(username).await?;
    let profile = session.user_info(&user_id).await?;
    if profile.is_private {
        return Err(FetchError::Private);
    }

    let followers = session.user_followers(&user_id).await?;
    let following = session.user_following(&user_id).await?;

    Ok(FollowSets {
        followers: followers.into_iter().collect(),
        following: following.into_iter().collect(),
    })
}

/// Map a failed login to what the caller should hear
fn login_failure(err: &ClientError) -> CheckError {
    match err.classify() {
        kind @ (CheckError::IpBlacklisted | CheckError::RateLimited) => kind,
        _ => CheckError::LoginRequired,
    }
}
