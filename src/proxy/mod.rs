//! Proxy module for sourcing and rotating outbound proxies
//!
//! This module provides functionality for:
//! - Fetching public proxy lists from several mirrors per proxy type
//! - Validating a proxy with one request before it is used
//! - Caching proxies that worked and blacklisting ones that did not
//! - Rotating HTTP → SOCKS5 → SOCKS4 until something works

pub mod checker;
pub mod crawler;
pub mod models;
pub mod parser;
pub mod pool;

pub use checker::{CheckerConfig, ProxyChecker, ProxyValidator};
pub use crawler::{CrawlResult, CrawlerConfig, ProxyCrawler, ProxySource, SourceFetcher};
pub use models::{ProxyCheckResult, ProxyCheckStatus, ProxyEndpoint, ProxyType, SelectedProxy};
pub use parser::ProxyParser;
pub use pool::{Blacklist, PoolConfig, PoolStats, ProxyPool};
