//! Plain-text rendering of check results

use crate::resolver::CheckResult;
use std::path::Path;

/// Unfollowers listed inline before the rest is summarized
pub const MAX_DISPLAY: usize = 50;

/// Number the unfollowers as `N. @name`, summarizing beyond `max_display`
pub fn format_unfollowers_list(unfollowers: &[String], max_display: usize) -> String {
    if unfollowers.is_empty() {
        return String::new();
    }

    let mut lines: Vec<String> = unfollowers
        .iter()
        .take(max_display)
        .enumerate()
        .map(|(i, name)| format!("{}. @{}", i + 1, name))
        .collect();
    if unfollowers.len() > max_display {
        lines.push(format!("\n... and {} more", unfollowers.len() - max_display));
    }
    lines.join("\n")
}

/// Full listing, one numbered line per unfollower
pub fn full_listing(unfollowers: &[String]) -> String {
    format_unfollowers_list(unfollowers, usize::MAX)
}

/// Account label for an uploaded export: the file name without its extension
pub fn account_label(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Human-readable summary of a result for `account`
pub fn render(account: &str, result: &CheckResult) -> String {
    let report = match result {
        Ok(report) => report,
        Err(err) => return err.user_message().to_string(),
    };

    if report.unfollowers.is_empty() {
        return "Everyone you follow follows you back!".to_string();
    }

    format!(
        "Unfollowers check\n\nUsername: {}\nFollowing: {}\nFollowers: {}\nRatio: {}\nNot following back: {}\n\n{}",
        account,
        report.following_count,
        report.followers_count,
        report.ratio(),
        report.unfollowers_count,
        format_unfollowers_list(&report.unfollowers, MAX_DISPLAY)
    )
}
