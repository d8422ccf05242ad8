//! Unfollow Check - Instagram unfollowers resolution engine
//!
//! Compares an account's followers with the accounts it follows, either live
//! through the Instagram API (egress rotated over validated public proxies)
//! or from a "Download Your Information" export.

pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod instagram;
pub mod proxy;
pub mod report;
pub mod resolver;

pub use config::AppConfig;
pub use engine::{CheckRequest, UnfollowersEngine};
pub use error::CheckError;
pub use resolver::{resolve, CheckReport, CheckResult, FollowSets, UsernameSet};

/// Application result type
pub type Result<T> = anyhow::Result<T>;
