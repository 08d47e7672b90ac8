//! Typed reads over the [`QueryClient`].
//!
//! Version-scoped reads use the active version at call time; the `_for`
//! variants take an explicit one.

use std::sync::Arc;

use valentine_core::content::{ContentBundle, PublishStatus};
use valentine_core::roles::{UserProfile, UserRole};
use valentine_core::Version;

use crate::cache::{ObserverGuard, QueryClient, QueryData, QueryKey};
use crate::error::{ClientError, ClientResult};
use crate::version_store::VersionStore;

/// Published content as a visitor page consumes it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishedView {
    /// The published snapshot, or `None` when nothing is visible yet.
    pub content: Option<ContentBundle>,
    pub is_published: bool,
}

pub struct Queries {
    cache: Arc<QueryClient>,
    versions: Arc<VersionStore>,
}

impl Queries {
    pub fn new(cache: Arc<QueryClient>, versions: Arc<VersionStore>) -> Self {
        Self { cache, versions }
    }

    pub fn active_version(&self) -> Version {
        self.versions.active()
    }

    /// Keep `key` refreshed after writes until the guard drops.
    pub fn observe(&self, key: QueryKey) -> ObserverGuard {
        self.cache.observe(key)
    }

    // ---- content ----

    pub async fn draft_content(&self) -> ClientResult<Option<ContentBundle>> {
        self.draft_content_for(&self.versions.active()).await
    }

    pub async fn draft_content_for(
        &self,
        version: &Version,
    ) -> ClientResult<Option<ContentBundle>> {
        match self.read(QueryKey::DraftContent(version.clone())).await? {
            (QueryData::Content(content), _) => Ok(content),
            (_, key) => Err(shape_error(&key)),
        }
    }

    /// Published content; `None` for a version visitors cannot see yet.
    pub async fn published_content(&self) -> ClientResult<Option<ContentBundle>> {
        self.published_content_for(&self.versions.active()).await
    }

    pub async fn published_content_for(
        &self,
        version: &Version,
    ) -> ClientResult<Option<ContentBundle>> {
        match self.read(QueryKey::PublishedContent(version.clone())).await? {
            (QueryData::Content(content), _) => Ok(content),
            (_, key) => Err(shape_error(&key)),
        }
    }

    pub async fn publish_status(&self) -> ClientResult<PublishStatus> {
        self.publish_status_for(&self.versions.active()).await
    }

    pub async fn publish_status_for(&self, version: &Version) -> ClientResult<PublishStatus> {
        match self.read(QueryKey::PublishStatus(version.clone())).await? {
            (QueryData::Status(status), _) => Ok(status),
            (_, key) => Err(shape_error(&key)),
        }
    }

    /// What a visitor page shows for the active version.
    ///
    /// Only the published content read is softened: a version nobody may
    /// see yet comes back empty and unpublished. Other failures propagate.
    pub async fn published_view(&self) -> ClientResult<PublishedView> {
        let version = self.versions.active();
        let content = self.published_content_for(&version).await?;
        if content.is_none() {
            return Ok(PublishedView::default());
        }
        let is_published = self.publish_status_for(&version).await?.is_published;
        Ok(PublishedView {
            content,
            is_published,
        })
    }

    /// Versions published at least once.
    pub async fn versions(&self) -> ClientResult<Vec<Version>> {
        match self.read(QueryKey::Versions).await? {
            (QueryData::Versions(versions), _) => Ok(versions),
            (_, key) => Err(shape_error(&key)),
        }
    }

    // ---- caller identity ----

    pub async fn caller_profile(&self) -> ClientResult<Option<UserProfile>> {
        match self.read(QueryKey::CallerProfile).await? {
            (QueryData::Profile(profile), _) => Ok(profile),
            (_, key) => Err(shape_error(&key)),
        }
    }

    pub async fn caller_role(&self) -> ClientResult<UserRole> {
        match self.read(QueryKey::CallerRole).await? {
            (QueryData::Role(role), _) => Ok(role),
            (_, key) => Err(shape_error(&key)),
        }
    }

    pub async fn is_admin(&self) -> ClientResult<bool> {
        match self.read(QueryKey::IsAdmin).await? {
            (QueryData::Flag(flag), _) => Ok(flag),
            (_, key) => Err(shape_error(&key)),
        }
    }

    async fn read(&self, key: QueryKey) -> ClientResult<(QueryData, QueryKey)> {
        let data = self.cache.fetch(&key).await?;
        Ok((data, key))
    }
}

fn shape_error(key: &QueryKey) -> ClientError {
    ClientError::CacheShape(key.to_string())
}
