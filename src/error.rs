//! Error types shared by both acquisition paths

use thiserror::Error;

/// Why a check produced no result.
///
/// Every acquisition failure is converted into one of these kinds at the
/// lowest level that can classify it; nothing else escapes a check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    #[error("account is private")]
    PrivateAccount,
    #[error("user not found")]
    UserNotFound,
    #[error("instagram login required")]
    LoginRequired,
    #[error("rate limited by instagram")]
    RateLimited,
    #[error("egress ip blacklisted by instagram")]
    IpBlacklisted,
    #[error("archive is not a valid zip file")]
    BadArchive,
    #[error("export payload is not valid json")]
    InvalidPayload,
    #[error("export contains no followers or following data")]
    EmptyExport,
    #[error("{0}")]
    Unknown(String),
}

impl CheckError {
    /// Stable machine-readable code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            CheckError::PrivateAccount => "private_account",
            CheckError::UserNotFound => "user_not_found",
            CheckError::LoginRequired => "login_required",
            CheckError::RateLimited => "rate_limited",
            CheckError::IpBlacklisted => "ip_blacklisted",
            CheckError::BadArchive => "bad_zip",
            CheckError::InvalidPayload => "invalid_json",
            CheckError::EmptyExport => "file_empty",
            CheckError::Unknown(_) => "unknown",
        }
    }

    /// Whether the same request may succeed later without user changes
    pub fn is_retryable(&self) -> bool {
        matches!(self, CheckError::LoginRequired | CheckError::RateLimited)
    }

    /// Text suitable for the end user. Never contains raw error detail.
    pub fn user_message(&self) -> &'static str {
        match self {
            CheckError::PrivateAccount => {
                "This account is private. Use the manual method: upload your Instagram data export."
            }
            CheckError::UserNotFound => {
                "That username does not exist. Check the spelling and send it without the @."
            }
            CheckError::LoginRequired => {
                "Our Instagram session expired and is being renewed. Please try again in a minute."
            }
            CheckError::RateLimited => {
                "Instagram is limiting our requests. Please wait a few minutes before trying again, or use the manual method."
            }
            CheckError::IpBlacklisted => {
                "Instagram blocked our server's connection. Please use the manual method (upload your data export) or configure a better proxy."
            }
            CheckError::BadArchive => {
                "That ZIP file is damaged or incomplete. Download the archive from Instagram again and upload it unchanged."
            }
            CheckError::InvalidPayload => {
                "That file is not valid JSON. Request your Instagram data in JSON format, not HTML."
            }
            CheckError::EmptyExport => {
                "No followers or following lists were found in that file. Include \"Followers and following\" when requesting your data."
            }
            CheckError::Unknown(_) => "Something went wrong. Please try again later.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_retryable_kinds() {
        assert!(CheckError::LoginRequired.is_retryable());
        assert!(CheckError::RateLimited.is_retryable());
        assert!(!CheckError::PrivateAccount.is_retryable());
        assert!(!CheckError::EmptyExport.is_retryable());
        assert!(!CheckError::Unknown("boom".to_string()).is_retryable());
    }

    #[test]
    fn test_user_message_hides_detail() {
        let err = CheckError::Unknown("socket reset by peer at 10.0.0.1".to_string());
        assert!(!err.user_message().contains("10.0.0.1"));
        assert_eq!(err.code(), "unknown");

        let kinds = [
            CheckError::PrivateAccount,
            CheckError::UserNotFound,
            CheckError::LoginRequired,
            CheckError::RateLimited,
            CheckError::IpBlacklisted,
            CheckError::BadArchive,
            CheckError::InvalidPayload,
            CheckError::EmptyExport,
            err,
        ];
        let messages: HashSet<&str> = kinds.iter().map(CheckError::user_message).collect();
        assert_eq!(messages.len(), kinds.len());
    }

    #[test]
    fn test_blacklist_message_suggests_manual_method() {
        assert!(CheckError::IpBlacklisted.user_message().contains("manual"));
        assert!(CheckError::PrivateAccount.user_message().contains("manual"));
    }
}
