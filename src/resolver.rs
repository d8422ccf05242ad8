//! Follower/following comparison shared by the live and export paths

use crate::error::CheckError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Usernames compared case-sensitively, exactly as the source produced them
pub type UsernameSet = BTreeSet<String>;

/// Outcome of a single unfollowers check
pub type CheckResult = std::result::Result<CheckReport, CheckError>;

/// Counts and the sorted list of accounts that do not follow back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckReport {
    pub followers_count: usize,
    pub following_count: usize,
    pub unfollowers: Vec<String>,
    pub unfollowers_count: usize,
}

impl CheckReport {
    /// Followers per followed account, `∞` when nobody is followed
    pub fn ratio(&self) -> String {
        if self.following_count == 0 {
            return "∞".to_string();
        }
        format!("{:.2}", self.followers_count as f64 / self.following_count as f64)
    }
}

/// Both sides of an account's follow graph, from either acquisition path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FollowSets {
    pub followers: UsernameSet,
    pub following: UsernameSet,
}

impl FollowSets {
    pub fn resolve(&self) -> CheckReport {
        resolve(&self.followers, &self.following)
    }
}

/// Compare the two sets. Never fails; acquisition errors belong upstream.
pub fn resolve(followers: &UsernameSet, following: &UsernameSet) -> CheckReport {
    // BTreeSet iteration is ascending, so the difference is already sorted
    let unfollowers: Vec<String> = following.difference(followers).cloned().collect();

    CheckReport {
        followers_count: followers.len(),
        following_count: following.len(),
        unfollowers_count: unfollowers.len(),
        unfollowers,
    }
}

/// JSON envelope with a `success` flag for machine-readable output
pub fn to_json(result: &CheckResult) -> serde_json::Value {
    match result {
        Ok(report) => serde_json::json!({
            "success": true,
            "followers_count": report.followers_count,
            "following_count": report.following_count,
            "unfollowers": report.unfollowers,
            "unfollowers_count": report.unfollowers_count,
        }),
        Err(err) => serde_json::json!({
            "success": false,
            "error": err.code(),
        }),
    }
}

/// Normalize a caller-supplied username the way the chat front-end does.
///
/// Strips whitespace and a leading `@`, lower-cases, and rejects empty
/// names, names with inner whitespace and names longer than 30 characters.
pub fn normalize_username(input: &str) -> Option<String> {
    let name = input.trim().trim_start_matches('@').to_lowercase();
    if name.is_empty() || name.chars().any(char::is_whitespace) || name.chars().count() > 30 {
        return None;
    }
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> UsernameSet {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_resolve_sorted_difference() {
        let report = resolve(&set(&["b"]), &set(&["c", "a", "b"]));
        assert_eq!(report.unfollowers, vec!["a", "c"]);
        assert_eq!(report.unfollowers_count, 2);
        assert_eq!(report.followers_count, 1);
        assert_eq!(report.following_count, 3);
    }

    #[test]
    fn test_resolve_everyone_follows_back() {
        let both = set(&["alice", "bob"]);
        let report = resolve(&both, &both);
        assert!(report.unfollowers.is_empty());
        assert_eq!(report.unfollowers_count, 0);
    }

    #[test]
    fn test_resolve_is_case_sensitive() {
        let report = resolve(&set(&["Alice"]), &set(&["alice"]));
        assert_eq!(report.unfollowers, vec!["alice"]);
    }

    #[test]
    fn test_resolve_idempotent() {
        let followers = set(&["x", "y"]);
        let following = set(&["y", "z", "w"]);
        assert_eq!(resolve(&followers, &following), resolve(&followers, &following));
    }

    #[test]
    fn test_resolve_invariants_hold() {
        let followers = set(&["a", "c", "e", "g"]);
        let following = set(&["a", "b", "c", "d", "h"]);
        let report = resolve(&followers, &following);
        assert_eq!(report.unfollowers_count, report.unfollowers.len());
        for name in &report.unfollowers {
            assert!(following.contains(name));
            assert!(!followers.contains(name));
        }
        let mut sorted = report.unfollowers.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted, report.unfollowers);
    }

    #[test]
    fn test_ratio() {
        let report = resolve(&set(&["a", "b", "c"]), &set(&["a", "b"]));
        assert_eq!(report.ratio(), "1.50");
        let report = resolve(&set(&["a"]), &UsernameSet::new());
        assert_eq!(report.ratio(), "∞");
    }

    #[test]
    fn test_to_json_failure() {
        let value = to_json(&Err(CheckError::PrivateAccount));
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "private_account");
    }

    #[test]
    fn test_normalize_username() {
        assert_eq!(normalize_username("  @Some.User "), Some("some.user".to_string()));
        assert_eq!(normalize_username("two words"), None);
        assert_eq!(normalize_username("@"), None);
        assert_eq!(normalize_username(&"a".repeat(31)), None);
        assert_eq!(normalize_username(&"a".repeat(30)), Some("a".repeat(30)));
    }
}
