//! Boundary to the Instagram private API capability

use crate::error::CheckError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Messages Instagram sends when it refuses the egress address
static BLACKLIST_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)blacklist|change your ip|ip address.*(blocked|flagged)|bad ip")
        .expect("Invalid blacklist regex")
});

static CHALLENGE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)challenge_required|checkpoint_required|login_required")
        .expect("Invalid challenge regex")
});

static RATE_LIMIT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)please wait a few minutes|too many requests").expect("Invalid rate limit regex")
});

/// Structured errors raised by an Instagram API client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("login required")]
    LoginRequired,
    #[error("challenge required")]
    ChallengeRequired,
    #[error("please wait a few minutes before you try again")]
    RateLimited,
    #[error("not found")]
    NotFound,
    #[error("api error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Network(err.to_string())
    }
}

impl ClientError {
    /// Map to the check taxonomy.
    ///
    /// Typed variants decide directly. Free-form messages are inspected
    /// only for the untyped variants.
    pub fn classify(&self) -> CheckError {
        match self {
            ClientError::LoginRequired | ClientError::ChallengeRequired => CheckError::LoginRequired,
            ClientError::RateLimited => CheckError::RateLimited,
            ClientError::NotFound => CheckError::UserNotFound,
            ClientError::Api { message, .. } | ClientError::Network(message) | ClientError::Other(message) => {
                classify_message(message)
            }
        }
    }

    /// Whether the message points at the egress address or a challenge
    pub fn is_blacklist_or_challenge(&self) -> bool {
        match self {
            ClientError::ChallengeRequired | ClientError::LoginRequired => true,
            other => {
                let message = other.to_string();
                BLACKLIST_PATTERN.is_match(&message) || CHALLENGE_PATTERN.is_match(&message)
            }
        }
    }
}

/// Last-resort classification of an untyped error message
pub fn classify_message(message: &str) -> CheckError {
    if BLACKLIST_PATTERN.is_match(message) {
        CheckError::IpBlacklisted
    } else if CHALLENGE_PATTERN.is_match(message) {
        CheckError::LoginRequired
    } else if RATE_LIMIT_PATTERN.is_match(message) {
        CheckError::RateLimited
    } else if message.to_lowercase().contains("not found") {
        CheckError::UserNotFound
    } else {
        CheckError::Unknown(message.to_string())
    }
}

/// Account used to authenticate the automated path
#[derive(Clone, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: String, password: String) -> Self {
        Self { username, password }
    }

    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Profile fields needed to decide whether an account can be inspected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub user_id: String,
    pub username: String,
    pub is_private: bool,
}

/// An authenticated Instagram session
#[async_trait]
pub trait InstagramApi: Send + Sync {
    async fn user_id_from_username(&self, username: &str) -> Result<String, ClientError>;

    async fn user_info(&self, user_id: &str) -> Result<UserProfile, ClientError>;

    /// Every follower username, paging internally
    async fn user_followers(&self, user_id: &str) -> Result<Vec<String>, ClientError>;

    /// Every followed username, paging internally
    async fn user_following(&self, user_id: &str) -> Result<Vec<String>, ClientError>;
}

/// Produces authenticated sessions
#[async_trait]
pub trait InstagramConnector: Send + Sync {
    /// Log in, sending all traffic through `proxy_url` when given
    async fn login(
        &self,
        credentials: &Credentials,
        proxy_url: Option<&str>,
    ) -> Result<Arc<dyn InstagramApi>, ClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_variants_classify_directly() {
        assert_eq!(ClientError::LoginRequired.classify(), CheckError::LoginRequired);
        assert_eq!(ClientError::ChallengeRequired.classify(), CheckError::LoginRequired);
        assert_eq!(ClientError::RateLimited.classify(), CheckError::RateLimited);
        assert_eq!(ClientError::NotFound.classify(), CheckError::UserNotFound);
    }

    #[test]
    fn test_message_fallback_classification() {
        let err = ClientError::Api {
            status: 400,
            message: "The IP address you are using has been flagged as an open proxy".to_string(),
        };
        assert_eq!(err.classify(), CheckError::IpBlacklisted);

        let err = ClientError::Other("Your IP is in a blacklist, change your IP".to_string());
        assert_eq!(err.classify(), CheckError::IpBlacklisted);

        let err = ClientError::Api {
            status: 400,
            message: "User not found".to_string(),
        };
        assert_eq!(err.classify(), CheckError::UserNotFound);

        let err = ClientError::Network("connection reset".to_string());
        assert_eq!(err.classify(), CheckError::Unknown("connection reset".to_string()));
    }

    #[test]
    fn test_blacklist_or_challenge_detection() {
        assert!(ClientError::ChallengeRequired.is_blacklist_or_challenge());
        assert!(ClientError::Other("checkpoint_required".to_string()).is_blacklist_or_challenge());
        assert!(!ClientError::Network("timed out".to_string()).is_blacklist_or_challenge());
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("bot".to_string(), "hunter2".to_string());
        let debug = format!("{:?}", creds);
        assert!(debug.contains("bot"));
        assert!(!debug.contains("hunter2"));
        assert!(creds.is_complete());
        assert!(!Credentials::default().is_complete());
    }
}
