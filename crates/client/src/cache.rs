//! Query cache over the content gateway.
//!
//! Entries are keyed by [`QueryKey`], i.e. `(resource, version?)`. A read
//! is served from cache while the entry is fresh; otherwise one fetch per
//! key is in flight at a time and concurrent readers share its result.
//!
//! Rules applied to every read:
//!
//! - Nothing is fetched while the gateway is not ready.
//! - Reads retry once, except authorization failures and profile reads.
//! - An authorization failure reading published content resolves to
//!   "nothing published" instead of an error.
//!
//! Invalidation never deletes data outright: the entry is marked so the
//! next read goes to the backend, and a fetch that was in flight while
//! its key was invalidated stores its result already marked stale.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use serde::Serialize;
use valentine_core::content::{ContentBundle, PublishStatus};
use valentine_core::roles::{UserProfile, UserRole};
use valentine_core::Version;
use valentine_gateway::{ContentGateway, GatewayError, GatewayResult};

use crate::config::CacheConfig;
use crate::error::{ClientError, ClientResult};
use crate::events::{CacheEvent, CacheEventBus};

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// The kinds of data the cache holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    DraftContent,
    PublishedContent,
    PublishStatus,
    Versions,
    CallerProfile,
    CallerRole,
    IsAdmin,
}

impl ResourceKind {
    pub fn name(self) -> &'static str {
        match self {
            ResourceKind::DraftContent => "draftContent",
            ResourceKind::PublishedContent => "publishedContent",
            ResourceKind::PublishStatus => "publishStatus",
            ResourceKind::Versions => "versions",
            ResourceKind::CallerProfile => "currentUserProfile",
            ResourceKind::CallerRole => "callerUserRole",
            ResourceKind::IsAdmin => "isCallerAdmin",
        }
    }

    /// Extra attempts after a failed read.
    pub fn retries(self) -> u32 {
        match self {
            ResourceKind::CallerProfile => 0,
            _ => 1,
        }
    }

    /// The key for this resource; `version` is ignored for global resources.
    pub fn key(self, version: &Version) -> QueryKey {
        match self {
            ResourceKind::DraftContent => QueryKey::DraftContent(version.clone()),
            ResourceKind::PublishedContent => QueryKey::PublishedContent(version.clone()),
            ResourceKind::PublishStatus => QueryKey::PublishStatus(version.clone()),
            ResourceKind::Versions => QueryKey::Versions,
            ResourceKind::CallerProfile => QueryKey::CallerProfile,
            ResourceKind::CallerRole => QueryKey::CallerRole,
            ResourceKind::IsAdmin => QueryKey::IsAdmin,
        }
    }
}

/// Identity of one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryKey {
    DraftContent(Version),
    PublishedContent(Version),
    PublishStatus(Version),
    Versions,
    CallerProfile,
    CallerRole,
    IsAdmin,
}

impl QueryKey {
    pub fn resource(&self) -> ResourceKind {
        match self {
            QueryKey::DraftContent(_) => ResourceKind::DraftContent,
            QueryKey::PublishedContent(_) => ResourceKind::PublishedContent,
            QueryKey::PublishStatus(_) => ResourceKind::PublishStatus,
            QueryKey::Versions => ResourceKind::Versions,
            QueryKey::CallerProfile => ResourceKind::CallerProfile,
            QueryKey::CallerRole => ResourceKind::CallerRole,
            QueryKey::IsAdmin => ResourceKind::IsAdmin,
        }
    }

    pub fn version(&self) -> Option<&Version> {
        match self {
            QueryKey::DraftContent(v)
            | QueryKey::PublishedContent(v)
            | QueryKey::PublishStatus(v) => Some(v),
            _ => None,
        }
    }

    /// Draft, published, and status keys of one version.
    pub fn version_triplet(version: &Version) -> [QueryKey; 3] {
        [
            QueryKey::DraftContent(version.clone()),
            QueryKey::PublishedContent(version.clone()),
            QueryKey::PublishStatus(version.clone()),
        ]
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version() {
            Some(v) => write!(f, "{}[{v}]", self.resource().name()),
            None => f.write_str(self.resource().name()),
        }
    }
}

// ---------------------------------------------------------------------------
// Data
// ---------------------------------------------------------------------------

/// A cached read result.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryData {
    Content(Option<ContentBundle>),
    Status(PublishStatus),
    Versions(Vec<Version>),
    Profile(Option<UserProfile>),
    Role(UserRole),
    Flag(bool),
}

/// Observable state of one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    /// The gateway is not ready; reads are not attempted.
    Disabled,
    /// Never fetched.
    Empty,
    Fresh,
    /// Past its staleness window; the next read refreshes it.
    Stale,
    /// Discarded by a write or version switch; the next read refreshes it.
    Invalidated,
}

/// Which invalidated keys [`QueryClient::refetch`] re-reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefetchScope {
    /// Keys with at least one live [`ObserverGuard`].
    Active,
    /// Keys that are observed or already have a cache entry.
    Cached,
}

struct CacheEntry {
    data: QueryData,
    fetched_at: Instant,
    invalidated: bool,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<QueryKey, CacheEntry>,
    /// Bumped when a key is invalidated while a fetch for it is pending.
    generations: HashMap<QueryKey, u64>,
    /// Present only while a fetch for the key is running or queued.
    fetch_locks: HashMap<QueryKey, Arc<tokio::sync::Mutex<()>>>,
}

impl CacheState {
    /// Forget a key's fetch bookkeeping once no other reader holds its lock.
    fn release_fetch_lock(&mut self, key: &QueryKey, lock: &Arc<tokio::sync::Mutex<()>>) {
        // one reference in the map, one held by the caller
        if Arc::strong_count(lock) <= 2 {
            self.fetch_locks.remove(key);
            self.generations.remove(key);
        }
    }
}

type ObserverCounts = Arc<Mutex<HashMap<QueryKey, usize>>>;

/// Marks a key as displayed. The key stays active until the guard drops.
#[must_use = "the key is only observed while the guard is alive"]
pub struct ObserverGuard {
    key: QueryKey,
    observers: ObserverCounts,
}

impl ObserverGuard {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }
}

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        let mut counts = self
            .observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(count) = counts.get_mut(&self.key) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                counts.remove(&self.key);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// QueryClient
// ---------------------------------------------------------------------------

/// Shared read cache. Use it via `Arc<QueryClient>`.
pub struct QueryClient {
    gateway: Arc<dyn ContentGateway>,
    config: CacheConfig,
    state: Mutex<CacheState>,
    observers: ObserverCounts,
    events: Arc<CacheEventBus>,
}

impl QueryClient {
    pub fn new(
        gateway: Arc<dyn ContentGateway>,
        config: CacheConfig,
        events: Arc<CacheEventBus>,
    ) -> Self {
        Self {
            gateway,
            config,
            state: Mutex::new(CacheState::default()),
            observers: Arc::new(Mutex::new(HashMap::new())),
            events,
        }
    }

    pub fn gateway(&self) -> &Arc<dyn ContentGateway> {
        &self.gateway
    }

    pub fn events(&self) -> &Arc<CacheEventBus> {
        &self.events
    }

    /// Whether reads are enabled.
    pub fn is_enabled(&self) -> bool {
        self.gateway.is_ready()
    }

    /// Register interest in `key` for eager refetches.
    pub fn observe(&self, key: QueryKey) -> ObserverGuard {
        *self.lock_observers().entry(key.clone()).or_insert(0) += 1;
        ObserverGuard {
            key,
            observers: Arc::clone(&self.observers),
        }
    }

    pub fn is_active(&self, key: &QueryKey) -> bool {
        self.lock_observers().get(key).is_some_and(|n| *n > 0)
    }

    pub fn state(&self, key: &QueryKey) -> QueryState {
        if !self.is_enabled() {
            return QueryState::Disabled;
        }
        let state = self.lock();
        match state.entries.get(key) {
            None => QueryState::Empty,
            Some(entry) if entry.invalidated => QueryState::Invalidated,
            Some(entry) if self.is_stale(key, entry) => QueryState::Stale,
            Some(_) => QueryState::Fresh,
        }
    }

    /// The cached value for `key`, fresh or not, without fetching.
    pub fn peek(&self, key: &QueryKey) -> Option<QueryData> {
        self.lock().entries.get(key).map(|e| e.data.clone())
    }

    /// Read `key`, from cache when fresh and from the backend otherwise.
    pub async fn fetch(&self, key: &QueryKey) -> ClientResult<QueryData> {
        if !self.is_enabled() {
            return Err(GatewayError::NotReady.into());
        }
        if let Some(data) = self.fresh(key) {
            return Ok(data);
        }

        let fetch_lock = self.fetch_lock(key);
        let _in_flight = fetch_lock.lock().await;

        // Another reader may have filled the entry while we waited.
        if let Some(data) = self.fresh(key) {
            self.lock().release_fetch_lock(key, &fetch_lock);
            return Ok(data);
        }

        let generation = self.generation(key);
        tracing::debug!(key = %key, "Fetching");
        let loaded = self.load(key).await;

        let mut state = self.lock();
        if let Ok(data) = &loaded {
            let invalidated = state.generations.get(key).copied().unwrap_or(0) != generation;
            if invalidated {
                tracing::debug!(key = %key, "Invalidated while fetching");
            }
            state.entries.insert(
                key.clone(),
                CacheEntry {
                    data: data.clone(),
                    fetched_at: Instant::now(),
                    invalidated,
                },
            );
        }
        state.release_fetch_lock(key, &fetch_lock);
        loaded
    }

    /// Mark every key in `keys` for re-reading.
    pub fn invalidate(&self, keys: &[QueryKey]) {
        let mut state = self.lock();
        for key in keys {
            if state.fetch_locks.contains_key(key) {
                *state.generations.entry(key.clone()).or_insert(0) += 1;
            }
            if let Some(entry) = state.entries.get_mut(key) {
                entry.invalidated = true;
            }
        }
        drop(state);

        for key in keys {
            tracing::debug!(key = %key, "Invalidated");
            self.events.publish(CacheEvent::Invalidated { key: key.clone() });
        }
    }

    /// Re-read the keys in `scope` whose entries are not fresh.
    ///
    /// Keys are refetched concurrently. Failures are returned, not raised:
    /// the caller's write already succeeded and stale display is the only
    /// consequence.
    pub async fn refetch(
        &self,
        keys: &[QueryKey],
        scope: RefetchScope,
    ) -> Vec<(QueryKey, ClientError)> {
        if !self.is_enabled() {
            return Vec::new();
        }
        let targets: Vec<&QueryKey> = keys
            .iter()
            .filter(|key| match scope {
                RefetchScope::Active => self.is_active(key),
                RefetchScope::Cached => self.is_active(key) || self.peek(key).is_some(),
            })
            .collect();

        let results = futures::future::join_all(targets.iter().map(|key| async move {
            let result = self.fetch(key).await;
            ((*key).clone(), result)
        }))
        .await;

        let mut failures = Vec::new();
        for (key, result) in results {
            match result {
                Ok(_) => self.events.publish(CacheEvent::Refetched { key }),
                Err(err) => {
                    tracing::warn!(key = %key, error = %err, "Refetch failed");
                    failures.push((key, err));
                }
            }
        }
        failures
    }

    // ---- private helpers ----

    #[cfg(test)]
    fn tracked_fetch_keys(&self) -> (usize, usize) {
        let state = self.lock();
        (state.fetch_locks.len(), state.generations.len())
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_observers(&self) -> MutexGuard<'_, HashMap<QueryKey, usize>> {
        self.observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_stale(&self, key: &QueryKey, entry: &CacheEntry) -> bool {
        self.config
            .stale_after(key.resource())
            .is_some_and(|window| entry.fetched_at.elapsed() >= window)
    }

    fn fresh(&self, key: &QueryKey) -> Option<QueryData> {
        let state = self.lock();
        let entry = state.entries.get(key)?;
        if entry.invalidated || self.is_stale(key, entry) {
            return None;
        }
        Some(entry.data.clone())
    }

    fn generation(&self, key: &QueryKey) -> u64 {
        self.lock().generations.get(key).copied().unwrap_or(0)
    }

    fn fetch_lock(&self, key: &QueryKey) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(self.lock().fetch_locks.entry(key.clone()).or_default())
    }

    async fn load(&self, key: &QueryKey) -> ClientResult<QueryData> {
        let retries = key.resource().retries();
        let mut attempt = 0;
        loop {
            match self.load_once(key).await {
                Ok(data) => return Ok(data),
                Err(err) if attempt < retries && is_retryable(&err) => {
                    attempt += 1;
                    tracing::debug!(key = %key, error = %err, attempt, "Retrying read");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn load_once(&self, key: &QueryKey) -> GatewayResult<QueryData> {
        let gw = &self.gateway;
        match key {
            QueryKey::DraftContent(v) => gw.get_draft_content(v).await.map(QueryData::Content),
            QueryKey::PublishedContent(v) => match gw.get_published_content(v).await {
                Ok(content) => Ok(QueryData::Content(content)),
                Err(err) if err.is_authorization() => {
                    tracing::debug!(version = %v, error = %err, "Treating as not published");
                    Ok(QueryData::Content(None))
                }
                Err(err) => Err(err),
            },
            QueryKey::PublishStatus(v) => gw.get_publish_status(v).await.map(QueryData::Status),
            QueryKey::Versions => gw.get_versions().await.map(QueryData::Versions),
            QueryKey::CallerProfile => gw.get_caller_user_profile().await.map(QueryData::Profile),
            QueryKey::CallerRole => gw.get_caller_user_role().await.map(QueryData::Role),
            QueryKey::IsAdmin => gw.is_caller_admin().await.map(QueryData::Flag),
        }
    }
}

fn is_retryable(err: &GatewayError) -> bool {
    !err.is_authorization() && *err != GatewayError::NotReady
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use assert_matches::assert_matches;
    use valentine_core::roles::UserRole;
    use valentine_gateway::MemoryGateway;

    fn v(label: &str) -> Version {
        Version::parse(label).unwrap()
    }

    fn client(gw: &Arc<MemoryGateway>, config: CacheConfig) -> QueryClient {
        QueryClient::new(gw.clone(), config, Arc::new(CacheEventBus::default()))
    }

    #[test]
    fn keys_render_with_their_version() {
        assert_eq!(QueryKey::DraftContent(v("7")).to_string(), "draftContent[7]");
        assert_eq!(QueryKey::Versions.to_string(), "versions");
        assert_eq!(
            ResourceKind::PublishStatus.key(&v("8")),
            QueryKey::PublishStatus(v("8"))
        );
        assert_eq!(ResourceKind::IsAdmin.key(&v("8")), QueryKey::IsAdmin);
    }

    #[tokio::test]
    async fn fresh_entries_are_served_from_cache() {
        let gw = Arc::new(MemoryGateway::default());
        let cache = client(&gw, CacheConfig::default());
        let key = QueryKey::DraftContent(v("7"));

        cache.fetch(&key).await.unwrap();
        cache.fetch(&key).await.unwrap();
        assert_eq!(gw.call_count("getDraftContent"), 1);
        assert_eq!(cache.state(&key), QueryState::Fresh);

        cache.invalidate(std::slice::from_ref(&key));
        assert_eq!(cache.state(&key), QueryState::Invalidated);
        cache.fetch(&key).await.unwrap();
        assert_eq!(gw.call_count("getDraftContent"), 2);
    }

    #[tokio::test]
    async fn zero_window_is_always_stale() {
        let gw = Arc::new(MemoryGateway::default());
        let config = CacheConfig {
            publish_status: Some(Duration::ZERO),
            ..CacheConfig::default()
        };
        let cache = client(&gw, config);
        let key = QueryKey::PublishStatus(v("7"));

        cache.fetch(&key).await.unwrap();
        assert_eq!(cache.state(&key), QueryState::Stale);
        cache.fetch(&key).await.unwrap();
        assert_eq!(gw.call_count("getPublishStatus"), 2);
    }

    #[tokio::test]
    async fn disabled_until_gateway_is_ready() {
        let gw = Arc::new(MemoryGateway::default());
        gw.set_ready(false);
        let cache = client(&gw, CacheConfig::default());
        let key = QueryKey::Versions;

        assert_eq!(cache.state(&key), QueryState::Disabled);
        let err = cache.fetch(&key).await.unwrap_err();
        assert_matches!(err, ClientError::Gateway(GatewayError::NotReady));
        assert!(gw.calls().is_empty());
    }

    #[tokio::test]
    async fn concurrent_reads_share_one_fetch() {
        let gw = Arc::new(MemoryGateway::default());
        let cache = client(&gw, CacheConfig::default());
        let key = QueryKey::Versions;

        let (a, b) = tokio::join!(cache.fetch(&key), cache.fetch(&key));
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(gw.call_count("getVersions"), 1);
    }

    #[tokio::test]
    async fn reads_retry_once_on_network_failure() {
        let gw = Arc::new(MemoryGateway::default());
        gw.fail_next("getVersions", GatewayError::Transport("reset".into()));
        let cache = client(&gw, CacheConfig::default());

        assert_eq!(
            cache.fetch(&QueryKey::Versions).await.unwrap(),
            QueryData::Versions(vec![])
        );
        assert_eq!(gw.call_count("getVersions"), 2);
    }

    #[tokio::test]
    async fn second_failure_is_surfaced() {
        let gw = Arc::new(MemoryGateway::default());
        for _ in 0..2 {
            gw.fail_next("getVersions", GatewayError::Transport("reset".into()));
        }
        let cache = client(&gw, CacheConfig::default());

        let err = cache.fetch(&QueryKey::Versions).await.unwrap_err();
        assert_matches!(err, ClientError::Gateway(GatewayError::Transport(_)));
        assert_eq!(gw.call_count("getVersions"), 2);
    }

    #[tokio::test]
    async fn authorization_and_profile_failures_do_not_retry() {
        let gw = Arc::new(MemoryGateway::anonymous());
        let cache = client(&gw, CacheConfig::default());

        assert!(cache.fetch(&QueryKey::DraftContent(v("7"))).await.is_err());
        assert_eq!(gw.call_count("getDraftContent"), 1);

        gw.set_caller_role(Some(UserRole::User));
        gw.fail_next("getCallerUserProfile", GatewayError::Transport("reset".into()));
        assert!(cache.fetch(&QueryKey::CallerProfile).await.is_err());
        assert_eq!(gw.call_count("getCallerUserProfile"), 1);
    }

    #[tokio::test]
    async fn unpublished_content_reads_as_none_for_visitors() {
        let gw = Arc::new(MemoryGateway::anonymous());
        let cache = client(&gw, CacheConfig::default());

        let data = cache.fetch(&QueryKey::PublishedContent(v("7"))).await.unwrap();
        assert_eq!(data, QueryData::Content(None));
        assert_eq!(gw.call_count("getPublishedContent"), 1);
    }

    #[tokio::test]
    async fn refetch_targets_only_the_requested_scope() {
        let gw = Arc::new(MemoryGateway::default());
        let cache = client(&gw, CacheConfig::default());
        let draft = QueryKey::DraftContent(v("7"));
        let status = QueryKey::PublishStatus(v("7"));
        let versions = QueryKey::Versions;

        let _guard = cache.observe(draft.clone());
        cache.fetch(&status).await.unwrap();
        gw.clear_calls();

        let keys = [draft.clone(), status.clone(), versions.clone()];
        cache.invalidate(&keys);
        assert!(cache.refetch(&keys, RefetchScope::Active).await.is_empty());
        assert_eq!(gw.call_count("getDraftContent"), 1);
        assert_eq!(gw.call_count("getPublishStatus"), 0);

        assert!(cache.refetch(&keys, RefetchScope::Cached).await.is_empty());
        assert_eq!(gw.call_count("getPublishStatus"), 1);
        assert_eq!(gw.call_count("getVersions"), 0);
    }

    #[tokio::test]
    async fn dropping_the_guard_deactivates_the_key() {
        let gw = Arc::new(MemoryGateway::default());
        let cache = client(&gw, CacheConfig::default());
        let key = QueryKey::IsAdmin;

        let first = cache.observe(key.clone());
        let second = cache.observe(key.clone());
        drop(first);
        assert!(cache.is_active(&key));
        drop(second);
        assert!(!cache.is_active(&key));
    }

    #[tokio::test]
    async fn invalidation_during_a_fetch_leaves_the_result_invalidated() {
        let gw = Arc::new(MemoryGateway::default());
        let cache = client(&gw, CacheConfig::default());
        let key = QueryKey::DraftContent(v("7"));
        let held = gw.hold("getDraftContent");

        let read = cache.fetch(&key);
        let interfere = async {
            held.arrived().await;
            cache.invalidate(std::slice::from_ref(&key));
            held.release();
        };
        let (result, ()) = tokio::join!(read, interfere);
        assert_eq!(result.unwrap(), QueryData::Content(None));

        assert_eq!(cache.state(&key), QueryState::Invalidated);
        assert_eq!(gw.call_count("getDraftContent"), 1);
        cache.fetch(&key).await.unwrap();
        assert_eq!(gw.call_count("getDraftContent"), 2);
        assert_eq!(cache.state(&key), QueryState::Fresh);
    }

    #[tokio::test]
    async fn fetch_bookkeeping_is_dropped_once_reads_settle() {
        let gw = Arc::new(MemoryGateway::default());
        let cache = client(&gw, CacheConfig::default());

        for label in ["1", "2", "3"] {
            let key = QueryKey::DraftContent(v(label));
            cache.fetch(&key).await.unwrap();
            cache.invalidate(std::slice::from_ref(&key));
        }
        gw.fail_next("getVersions", GatewayError::Transport("reset".into()));
        gw.fail_next("getVersions", GatewayError::Transport("reset".into()));
        assert!(cache.fetch(&QueryKey::Versions).await.is_err());

        let key = QueryKey::IsAdmin;
        let (a, b) = tokio::join!(cache.fetch(&key), cache.fetch(&key));
        assert_eq!(a.unwrap(), b.unwrap());

        assert_eq!(cache.tracked_fetch_keys(), (0, 0));
    }
}
