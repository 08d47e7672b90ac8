//! Publishing and version switching.
//!
//! Both operations are about which cache entries must be discarded and
//! re-read afterwards so no page shows another version's data or a stale
//! "not published" state.

use std::sync::Arc;

use valentine_core::Version;
use valentine_gateway::ContentGateway;

use crate::cache::{QueryClient, QueryKey, RefetchScope};
use crate::error::{ClientError, ClientResult};
use crate::events::{CacheEvent, CacheEventBus};
use crate::mutations::MutationKind;
use crate::version_store::VersionStore;

/// Result of a successful publish.
#[derive(Debug)]
pub struct PublishOutcome {
    pub version: Version,
    /// Entries that could not be re-read after publishing. The publish
    /// itself stands; these keep showing older data until the next read.
    pub stale: Vec<(QueryKey, ClientError)>,
}

impl PublishOutcome {
    pub fn is_fully_refreshed(&self) -> bool {
        self.stale.is_empty()
    }
}

/// Result of [`Orchestrator::switch_version`].
#[derive(Debug)]
pub enum SwitchOutcome {
    /// The requested version was already active.
    Unchanged,
    Switched {
        from: Version,
        to: Version,
        /// Observed entries of `to` that failed to load.
        stale: Vec<(QueryKey, ClientError)>,
    },
}

pub struct Orchestrator {
    gateway: Arc<dyn ContentGateway>,
    cache: Arc<QueryClient>,
    versions: Arc<VersionStore>,
    events: Arc<CacheEventBus>,
}

impl Orchestrator {
    pub fn new(cache: Arc<QueryClient>, versions: Arc<VersionStore>) -> Self {
        Self {
            gateway: Arc::clone(cache.gateway()),
            events: Arc::clone(cache.events()),
            cache,
            versions,
        }
    }

    /// Publish the active version's draft.
    ///
    /// On failure nothing in the cache changes. On success the published
    /// content, publish status, and version list of the published version
    /// are invalidated and every cached or observed one is re-read, so a
    /// visitor page in this session never sees "not published" afterwards.
    pub async fn publish_draft(&self) -> ClientResult<PublishOutcome> {
        let version = self.versions.active();
        tracing::info!(version = %version, "Publishing draft");

        if let Err(err) = self.gateway.publish_draft(&version).await {
            tracing::warn!(version = %version, error = %err, "Publish failed");
            return Err(err.into());
        }

        let keys = MutationKind::PublishDraft.keys(&version);
        self.cache.invalidate(&keys);
        let stale = self.cache.refetch(&keys, RefetchScope::Cached).await;
        if !stale.is_empty() {
            tracing::warn!(
                version = %version,
                stale = stale.len(),
                "Published, but some views could not be refreshed",
            );
        }

        self.events.publish(CacheEvent::Published {
            version: version.clone(),
            at: chrono::Utc::now(),
        });
        tracing::info!(version = %version, "Draft published");
        Ok(PublishOutcome { version, stale })
    }

    /// Make `to` the active version.
    ///
    /// Invalidates the draft, published, and status entries of both the
    /// old and the new version, then re-reads the new version's entries
    /// that are currently observed. In-flight writes keep targeting the
    /// version they started with.
    pub async fn switch_version(&self, to: Version) -> ClientResult<SwitchOutcome> {
        let from = self.versions.active();
        if from == to {
            return Ok(SwitchOutcome::Unchanged);
        }

        self.versions.set_active(to.clone())?;
        tracing::info!(from = %from, to = %to, "Switched content version");

        let mut keys = QueryKey::version_triplet(&from).to_vec();
        keys.extend(QueryKey::version_triplet(&to));
        self.cache.invalidate(&keys);
        self.events.publish(CacheEvent::VersionChanged {
            from: from.clone(),
            to: to.clone(),
        });

        let stale = self
            .cache
            .refetch(&QueryKey::version_triplet(&to), RefetchScope::Active)
            .await;
        Ok(SwitchOutcome::Switched { from, to, stale })
    }

    /// Apply a share link's query string before any content is read.
    pub async fn open_share_link(&self, query: &str) -> ClientResult<SwitchOutcome> {
        match valentine_core::share_link::version_from_query(query) {
            Some(version) => self.switch_version(version).await,
            None => Ok(SwitchOutcome::Unchanged),
        }
    }
}
