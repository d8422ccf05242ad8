//! Proxy pool: candidate cache, working set, blacklist and rotation
//!
//! All mutable state lives behind one async mutex and is never held across
//! a network call, so a dropped caller cannot leave it half-updated.

use crate::proxy::checker::{CheckerConfig, ProxyChecker, ProxyValidator};
use crate::proxy::crawler::{crawl_sources, CrawlerConfig, ProxyCrawler, ProxySource, SourceFetcher};
use crate::proxy::models::{ProxyEndpoint, ProxyType, SelectedProxy};
use crate::proxy::parser::ProxyParser;
use crate::Result;
use chrono::{DateTime, Utc};
use lru::LruCache;
use rand::seq::SliceRandom;
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Default freshness window for fetched candidate lists
const DEFAULT_CACHE_TTL_SECS: u64 = 900;

/// Default number of candidates validated per `get_validated_proxy` call
const DEFAULT_MAX_TEST: usize = 15;

/// Default per-type attempt budget used by `get_best_proxy`
const DEFAULT_MAX_TEST_PER_TYPE: usize = 10;

const MAX_WORKING: usize = 20;
const BLACKLIST_CAPACITY: usize = 500;
const BLACKLIST_RETAIN: usize = 200;

/// Configuration for the proxy pool
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// How long a fetched candidate list stays fresh
    pub cache_ttl: Duration,
    /// Candidates validated per `get_validated_proxy` call
    pub max_test: usize,
    /// Candidates validated per proxy type in `get_best_proxy`
    pub max_test_per_type: usize,
    /// Working set size limit
    pub max_working: usize,
    /// Blacklist size that triggers eviction
    pub blacklist_capacity: usize,
    /// Blacklist entries kept after eviction
    pub blacklist_retain: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            max_test: DEFAULT_MAX_TEST,
            max_test_per_type: DEFAULT_MAX_TEST_PER_TYPE,
            max_working: MAX_WORKING,
            blacklist_capacity: BLACKLIST_CAPACITY,
            blacklist_retain: BLACKLIST_RETAIN,
        }
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_max_test(mut self, max_test: usize) -> Self {
        self.max_test = max_test;
        self
    }

    pub fn with_max_test_per_type(mut self, max_test: usize) -> Self {
        self.max_test_per_type = max_test;
        self
    }
}

/// Addresses that failed validation or authentication, most recent last.
///
/// Once the size exceeds `capacity`, the least recently added entries are
/// dropped until `retain` remain.
pub struct Blacklist {
    entries: LruCache<String, ()>,
    capacity: usize,
    retain: usize,
}

impl Blacklist {
    pub fn new(capacity: usize, retain: usize) -> Self {
        Self {
            entries: LruCache::unbounded(),
            capacity,
            retain: retain.min(capacity),
        }
    }

    /// Record an address; returns the number of evicted entries
    pub fn insert(&mut self, address: &str) -> usize {
        self.entries.put(address.to_string(), ());

        if self.entries.len() <= self.capacity {
            return 0;
        }

        let mut evicted = 0;
        while self.entries.len() > self.retain {
            self.entries.pop_lru();
            evicted += 1;
        }
        evicted
    }

    pub fn contains(&self, address: &str) -> bool {
        self.entries.contains(address)
    }

    pub fn remove(&mut self, address: &str) {
        self.entries.pop(address);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Candidate list fetched for one proxy type
struct CachedList {
    proxies: Vec<String>,
    fetched_at: Instant,
    fetched_at_utc: DateTime<Utc>,
}

struct PoolState {
    cache: HashMap<ProxyType, CachedList>,
    working: VecDeque<ProxyEndpoint>,
    blacklist: Blacklist,
}

/// Snapshot of pool state for operators
#[derive(Debug, Clone, Serialize)]
pub struct PoolStats {
    pub working: usize,
    pub blacklisted: usize,
    pub cached: HashMap<ProxyType, usize>,
    pub last_fetch: HashMap<ProxyType, DateTime<Utc>>,
}

/// Process-wide proxy pool shared by every automated check
pub struct ProxyPool {
    config: PoolConfig,
    sources: Vec<ProxySource>,
    fetcher: Arc<dyn SourceFetcher>,
    validator: Arc<dyn ProxyValidator>,
    state: Mutex<PoolState>,
    // one refetch at a time; concurrent callers then hit the fresh cache
    fetch_lock: Mutex<()>,
}

impl ProxyPool {
    pub fn new(
        config: PoolConfig,
        sources: Vec<ProxySource>,
        fetcher: Arc<dyn SourceFetcher>,
        validator: Arc<dyn ProxyValidator>,
    ) -> Self {
        let blacklist = Blacklist::new(config.blacklist_capacity, config.blacklist_retain);
        Self {
            config,
            sources,
            fetcher,
            validator,
            state: Mutex::new(PoolState {
                cache: HashMap::new(),
                working: VecDeque::new(),
                blacklist,
            }),
            fetch_lock: Mutex::new(()),
        }
    }

    /// Pool over the default public sources using HTTP fetching and validation
    pub fn with_configs(
        config: PoolConfig,
        crawler_config: CrawlerConfig,
        checker_config: CheckerConfig,
    ) -> Result<Self> {
        let fetcher = Arc::new(ProxyCrawler::with_config(crawler_config)?);
        let validator = Arc::new(ProxyChecker::with_config(checker_config));
        Ok(Self::new(config, ProxySource::defaults(), fetcher, validator))
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Candidate raw addresses for a proxy type, in random order.
    ///
    /// Served from cache while fresh; otherwise every source for the type is
    /// fetched concurrently and the union replaces the cache. Blacklisted
    /// addresses are never returned.
    pub async fn fetch_candidates(&self, proxy_type: ProxyType) -> Vec<String> {
        let _guard = self.fetch_lock.lock().await;

        {
            let state = self.state.lock().await;
            if let Some(cached) = state.cache.get(&proxy_type) {
                if cached.fetched_at.elapsed() < self.config.cache_ttl {
                    return cached
                        .proxies
                        .iter()
                        .filter(|p| !state.blacklist.contains(p))
                        .cloned()
                        .collect();
                }
            }
        }

        let mut sources: Vec<ProxySource> = self
            .sources
            .iter()
            .filter(|s| s.proxy_type == proxy_type)
            .cloned()
            .collect();
        if sources.is_empty() {
            sources = self
                .sources
                .iter()
                .filter(|s| s.proxy_type == ProxyType::Http)
                .cloned()
                .collect();
        }

        let results = crawl_sources(self.fetcher.as_ref(), &sources).await;
        let merged: HashSet<String> = results.into_iter().flat_map(|r| r.proxies).collect();

        let mut state = self.state.lock().await;
        let mut proxies: Vec<String> = merged
            .into_iter()
            .filter(|p| !state.blacklist.contains(p))
            .collect();
        proxies.shuffle(&mut rand::thread_rng());

        info!("Total {} proxies available: {}", proxy_type, proxies.len());
        state.cache.insert(
            proxy_type,
            CachedList {
                proxies: proxies.clone(),
                fetched_at: Instant::now(),
                fetched_at_utc: Utc::now(),
            },
        );
        proxies
    }

    /// Check an endpoint once through the configured validator
    pub async fn validate(&self, endpoint: &ProxyEndpoint) -> bool {
        self.validator.validate(endpoint).await
    }

    /// Find a proxy that currently passes validation.
    ///
    /// A random working-set member is tried first. Then up to
    /// `max_attempts` random candidates are validated one at a time; the
    /// first success is promoted to the working set and every failure is
    /// blacklisted.
    pub async fn get_validated_proxy(
        &self,
        proxy_type: ProxyType,
        max_attempts: usize,
    ) -> Option<ProxyEndpoint> {
        let known = {
            let state = self.state.lock().await;
            let working: Vec<&ProxyEndpoint> = state.working.iter().collect();
            working.choose(&mut rand::thread_rng()).map(|p| (*p).clone())
        };

        if let Some(endpoint) = known {
            info!("Trying working proxy: {}", endpoint);
            if self.validate(&endpoint).await {
                return Some(endpoint);
            }
            self.state.lock().await.working.retain(|p| p != &endpoint);
        }

        let candidates = self.fetch_candidates(proxy_type).await;
        if candidates.is_empty() {
            return None;
        }

        let sample: Vec<String> = candidates
            .choose_multiple(&mut rand::thread_rng(), max_attempts.min(candidates.len()))
            .cloned()
            .collect();

        for raw in sample {
            let endpoint = ProxyParser::parse_endpoint(&raw, proxy_type);
            if self.validate(&endpoint).await {
                self.promote(endpoint.clone()).await;
                return Some(endpoint);
            }
            self.blacklist(&raw).await;
        }

        None
    }

    /// Pick one random candidate without validating it
    pub async fn random_proxy(&self, proxy_type: ProxyType) -> Option<ProxyEndpoint> {
        let candidates = self.fetch_candidates(proxy_type).await;
        candidates
            .choose(&mut rand::thread_rng())
            .map(|raw| ProxyParser::parse_endpoint(raw, proxy_type))
    }

    /// Try HTTP, then SOCKS5, then SOCKS4; fall back to an unvalidated HTTP pick
    pub async fn get_best_proxy(&self) -> Option<SelectedProxy> {
        for proxy_type in ProxyType::PRIORITY {
            info!("Looking for a valid {} proxy", proxy_type);
            if let Some(endpoint) = self
                .get_validated_proxy(proxy_type, self.config.max_test_per_type)
                .await
            {
                return Some(SelectedProxy {
                    endpoint,
                    validated: true,
                });
            }
        }

        warn!("No valid proxy found, falling back to an unvalidated pick");
        self.random_proxy(ProxyType::Http)
            .await
            .map(|endpoint| SelectedProxy {
                endpoint,
                validated: false,
            })
    }

    /// Add an endpoint to the working set, dropping the oldest beyond the cap
    pub async fn promote(&self, endpoint: ProxyEndpoint) {
        let mut state = self.state.lock().await;
        state.blacklist.remove(&endpoint.address);
        if state.working.contains(&endpoint) {
            return;
        }
        state.working.push_back(endpoint);
        while state.working.len() > self.config.max_working {
            state.working.pop_front();
        }
    }

    /// Exclude an address (with or without scheme) from future selection
    pub async fn blacklist(&self, proxy: &str) {
        let address = ProxyParser::strip_scheme(proxy.trim()).to_string();
        let mut state = self.state.lock().await;
        state.working.retain(|p| p.address != address);
        let evicted = state.blacklist.insert(&address);
        if evicted > 0 {
            info!(
                "Blacklist trimmed by {}, keeping {} most recent",
                evicted,
                state.blacklist.len()
            );
        }
    }

    pub async fn is_blacklisted(&self, proxy: &str) -> bool {
        let address = ProxyParser::strip_scheme(proxy.trim());
        self.state.lock().await.blacklist.contains(address)
    }

    /// Working set in insertion order, oldest first
    pub async fn working_set(&self) -> Vec<ProxyEndpoint> {
        self.state.lock().await.working.iter().cloned().collect()
    }

    pub async fn stats(&self) -> PoolStats {
        let state = self.state.lock().await;
        PoolStats {
            working: state.working.len(),
            blacklisted: state.blacklist.len(),
            cached: state
                .cache
                .iter()
                .map(|(t, c)| (*t, c.proxies.len()))
                .collect(),
            last_fetch: state
                .cache
                .iter()
                .map(|(t, c)| (*t, c.fetched_at_utc))
                .collect(),
        }
    }
}
