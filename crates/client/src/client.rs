//! One handle over the whole client core.

use std::sync::Arc;

use valentine_core::share_link;
use valentine_core::Version;
use valentine_gateway::ContentGateway;

use crate::cache::QueryClient;
use crate::config::CacheConfig;
use crate::error::ClientResult;
use crate::events::CacheEventBus;
use crate::mutations::Mutations;
use crate::orchestrator::Orchestrator;
use crate::queries::Queries;
use crate::version_store::VersionStore;
use crate::views::{self, DraftSummary, GoLiveStep, PublishPanel};

/// The version store, cache, writes, and orchestration sharing one
/// gateway and one event bus.
pub struct ValentineClient {
    versions: Arc<VersionStore>,
    cache: Arc<QueryClient>,
    queries: Queries,
    mutations: Mutations,
    orchestrator: Orchestrator,
    share_base_url: String,
}

impl ValentineClient {
    pub fn new(
        gateway: Arc<dyn ContentGateway>,
        versions: VersionStore,
        cache_config: CacheConfig,
        share_base_url: impl Into<String>,
    ) -> Self {
        let versions = Arc::new(versions);
        let events = Arc::new(CacheEventBus::default());
        let cache = Arc::new(QueryClient::new(gateway, cache_config, events));
        Self {
            queries: Queries::new(Arc::clone(&cache), Arc::clone(&versions)),
            mutations: Mutations::new(Arc::clone(&cache), Arc::clone(&versions)),
            orchestrator: Orchestrator::new(Arc::clone(&cache), Arc::clone(&versions)),
            versions,
            cache,
            share_base_url: share_base_url.into(),
        }
    }

    pub fn versions(&self) -> &Arc<VersionStore> {
        &self.versions
    }

    pub fn cache(&self) -> &Arc<QueryClient> {
        &self.cache
    }

    pub fn events(&self) -> &Arc<CacheEventBus> {
        self.cache.events()
    }

    pub fn queries(&self) -> &Queries {
        &self.queries
    }

    pub fn mutations(&self) -> &Mutations {
        &self.mutations
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn active_version(&self) -> Version {
        self.versions.active()
    }

    /// Share link for the active version.
    pub fn share_url(&self) -> ClientResult<String> {
        Ok(share_link::build_share_url(
            &self.share_base_url,
            &self.versions.active(),
        )?)
    }

    // ---- editor panels ----

    pub async fn publish_panel(&self) -> ClientResult<PublishPanel> {
        let status = self.queries.publish_status().await?;
        Ok(PublishPanel::new(
            self.versions.active(),
            &status,
            self.share_url()?,
        ))
    }

    pub async fn go_live_checklist(&self) -> ClientResult<Vec<GoLiveStep>> {
        let status = self.queries.publish_status().await?;
        Ok(views::go_live_checklist(&status, &self.share_url()?))
    }

    pub async fn draft_summary(&self) -> ClientResult<DraftSummary> {
        let draft = self.queries.draft_content().await?;
        Ok(DraftSummary::from_draft(draft.as_ref()))
    }

    pub async fn version_choices(&self) -> ClientResult<Vec<Version>> {
        let published = self.queries.versions().await?;
        Ok(views::version_choices(&published, &self.versions.active()))
    }
}
