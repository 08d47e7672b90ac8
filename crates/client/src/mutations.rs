//! Write operations and the cache entries each one invalidates.
//!
//! Every content write targets the version that was active when the call
//! started, even if the active version changes before it completes. On
//! success the entries listed by [`MutationKind::invalidates`] are
//! discarded for that version and re-read if observed. On failure the
//! cache is left exactly as it was. Writes are never retried.

use std::future::Future;
use std::sync::Arc;

use validator::Validate;
use valentine_core::content::{
    FinalDedication, GalleryItem, GalleryItemInput, InteractiveSurpriseConfig, LoveMessage,
    LoveMessageInput, MilestoneInput, Ordered, OrderedKind, TimelineMilestone,
};
use valentine_core::error::CoreError;
use valentine_core::reorder::{self, OrderUpdate};
use valentine_core::roles::{UserProfile, UserRole};
use valentine_core::Version;
use valentine_gateway::{ContentGateway, GatewayResult};

use crate::cache::{QueryClient, QueryData, QueryKey, RefetchScope, ResourceKind};
use crate::error::{ClientError, ClientResult};
use crate::version_store::VersionStore;

// ---------------------------------------------------------------------------
// Invalidation table
// ---------------------------------------------------------------------------

/// Every write the client can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    AddGalleryItem,
    UpdateGalleryItemOrder,
    DeleteGalleryItem,
    AddLoveMessage,
    UpdateLoveMessage,
    UpdateLoveMessageOrder,
    DeleteLoveMessage,
    AddTimelineMilestone,
    UpdateTimelineMilestone,
    UpdateTimelineMilestoneOrder,
    DeleteTimelineMilestone,
    SetInteractiveSurpriseConfig,
    SetFinalDedication,
    PublishDraft,
    SaveCallerProfile,
    AssignCallerRole,
}

impl MutationKind {
    /// Resources a successful write of this kind may have changed.
    pub fn invalidates(self) -> &'static [ResourceKind] {
        use MutationKind::*;
        match self {
            AddGalleryItem
            | UpdateGalleryItemOrder
            | DeleteGalleryItem
            | AddLoveMessage
            | UpdateLoveMessage
            | UpdateLoveMessageOrder
            | DeleteLoveMessage
            | AddTimelineMilestone
            | UpdateTimelineMilestone
            | UpdateTimelineMilestoneOrder
            | DeleteTimelineMilestone
            | SetInteractiveSurpriseConfig
            | SetFinalDedication => &[ResourceKind::DraftContent],
            PublishDraft => &[
                ResourceKind::PublishedContent,
                ResourceKind::PublishStatus,
                ResourceKind::Versions,
            ],
            SaveCallerProfile => &[ResourceKind::CallerProfile],
            AssignCallerRole => &[ResourceKind::CallerRole, ResourceKind::IsAdmin],
        }
    }

    /// Keys to invalidate after a successful write against `version`.
    pub fn keys(self, version: &Version) -> Vec<QueryKey> {
        self.invalidates().iter().map(|r| r.key(version)).collect()
    }

    fn for_order_update(kind: OrderedKind) -> Self {
        match kind {
            OrderedKind::GalleryItem => MutationKind::UpdateGalleryItemOrder,
            OrderedKind::LoveMessage => MutationKind::UpdateLoveMessageOrder,
            OrderedKind::TimelineMilestone => MutationKind::UpdateTimelineMilestoneOrder,
        }
    }
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

/// Version-scoped writes plus caller identity writes.
pub struct Mutations {
    gateway: Arc<dyn ContentGateway>,
    cache: Arc<QueryClient>,
    versions: Arc<VersionStore>,
}

impl Mutations {
    pub fn new(cache: Arc<QueryClient>, versions: Arc<VersionStore>) -> Self {
        Self {
            gateway: Arc::clone(cache.gateway()),
            cache,
            versions,
        }
    }

    // ---- gallery ----

    /// Append a photo to the active version's draft gallery.
    pub async fn add_gallery_item(&self, input: GalleryItemInput) -> ClientResult<GalleryItem> {
        let input = input.trimmed();
        input.validate().map_err(CoreError::from)?;
        let version = self.versions.active();
        let order = self.draft_count(&version, OrderedKind::GalleryItem).await?;

        let item = GalleryItem {
            id: OrderedKind::GalleryItem.new_id(),
            image: input.image,
            caption: input.caption,
            order,
        };
        self.run(
            MutationKind::AddGalleryItem,
            &version,
            self.gateway.add_gallery_item(&version, &item),
        )
        .await?;
        Ok(item)
    }

    pub async fn delete_gallery_item(&self, id: &str) -> ClientResult<()> {
        let version = self.versions.active();
        self.run(
            MutationKind::DeleteGalleryItem,
            &version,
            self.gateway.delete_gallery_item(&version, id),
        )
        .await
    }

    /// Persist a new gallery order. See [`reorder`](Self::reorder).
    pub async fn reorder_gallery(&self, reordered: &[GalleryItem]) -> ClientResult<usize> {
        self.reorder(OrderedKind::GalleryItem, reordered).await
    }

    // ---- love messages ----

    pub async fn add_love_message(&self, input: LoveMessageInput) -> ClientResult<LoveMessage> {
        let input = input.trimmed();
        input.validate().map_err(CoreError::from)?;
        let version = self.versions.active();
        let order = self.draft_count(&version, OrderedKind::LoveMessage).await?;

        let message = LoveMessage {
            id: OrderedKind::LoveMessage.new_id(),
            title: input.title,
            preview: input.preview,
            full_text: input.full_text,
            order,
        };
        self.run(
            MutationKind::AddLoveMessage,
            &version,
            self.gateway.add_love_message(&version, &message),
        )
        .await?;
        Ok(message)
    }

    pub async fn update_love_message(&self, id: &str, input: LoveMessageInput) -> ClientResult<()> {
        let input = input.trimmed();
        input.validate().map_err(CoreError::from)?;
        let version = self.versions.active();
        self.run(
            MutationKind::UpdateLoveMessage,
            &version,
            self.gateway.update_love_message(&version, id, &input),
        )
        .await
    }

    pub async fn delete_love_message(&self, id: &str) -> ClientResult<()> {
        let version = self.versions.active();
        self.run(
            MutationKind::DeleteLoveMessage,
            &version,
            self.gateway.delete_love_message(&version, id),
        )
        .await
    }

    pub async fn reorder_love_messages(&self, reordered: &[LoveMessage]) -> ClientResult<usize> {
        self.reorder(OrderedKind::LoveMessage, reordered).await
    }

    // ---- timeline ----

    pub async fn add_timeline_milestone(
        &self,
        input: MilestoneInput,
    ) -> ClientResult<TimelineMilestone> {
        let input = input.trimmed();
        input.validate().map_err(CoreError::from)?;
        let version = self.versions.active();
        let order = self.draft_count(&version, OrderedKind::TimelineMilestone).await?;

        let milestone = TimelineMilestone {
            id: OrderedKind::TimelineMilestone.new_id(),
            date: input.date,
            title: input.title,
            description: input.description,
            photo: input.photo,
            order,
        };
        self.run(
            MutationKind::AddTimelineMilestone,
            &version,
            self.gateway.add_timeline_milestone(&version, &milestone),
        )
        .await?;
        Ok(milestone)
    }

    pub async fn update_timeline_milestone(
        &self,
        id: &str,
        input: MilestoneInput,
    ) -> ClientResult<()> {
        let input = input.trimmed();
        input.validate().map_err(CoreError::from)?;
        let version = self.versions.active();
        self.run(
            MutationKind::UpdateTimelineMilestone,
            &version,
            self.gateway.update_timeline_milestone(&version, id, &input),
        )
        .await
    }

    pub async fn delete_timeline_milestone(&self, id: &str) -> ClientResult<()> {
        let version = self.versions.active();
        self.run(
            MutationKind::DeleteTimelineMilestone,
            &version,
            self.gateway.delete_timeline_milestone(&version, id),
        )
        .await
    }

    pub async fn reorder_timeline(&self, reordered: &[TimelineMilestone]) -> ClientResult<usize> {
        self.reorder(OrderedKind::TimelineMilestone, reordered).await
    }

    // ---- singletons ----

    pub async fn set_interactive_surprise_config(
        &self,
        config: InteractiveSurpriseConfig,
    ) -> ClientResult<()> {
        config.validate_config()?;
        let version = self.versions.active();
        self.run(
            MutationKind::SetInteractiveSurpriseConfig,
            &version,
            self.gateway.set_interactive_surprise_config(&version, &config),
        )
        .await
    }

    pub async fn set_final_dedication(&self, dedication: FinalDedication) -> ClientResult<()> {
        let dedication = dedication.trimmed();
        dedication.validate().map_err(CoreError::from)?;
        let version = self.versions.active();
        self.run(
            MutationKind::SetFinalDedication,
            &version,
            self.gateway.set_final_dedication(&version, &dedication),
        )
        .await
    }

    // ---- caller identity ----

    pub async fn save_caller_profile(&self, name: &str) -> ClientResult<UserProfile> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::Validation("name must not be empty".into()).into());
        }
        let profile = UserProfile {
            name: name.to_string(),
        };
        let version = self.versions.active();
        self.run(
            MutationKind::SaveCallerProfile,
            &version,
            self.gateway.save_caller_user_profile(&profile),
        )
        .await?;
        Ok(profile)
    }

    pub async fn assign_caller_role(&self, user: &str, role: UserRole) -> ClientResult<()> {
        let version = self.versions.active();
        self.run(
            MutationKind::AssignCallerRole,
            &version,
            self.gateway.assign_caller_user_role(user, role),
        )
        .await
    }

    // ---- reorder ----

    /// Renumber `reordered` (in its new visual order) to `0..n-1`.
    ///
    /// Only entries whose `order` differs from their index are updated,
    /// one call at a time. The first failure abandons the rest and is
    /// reported as [`ClientError::Reorder`]; updates already applied stay.
    /// Returns the number of updates issued.
    pub async fn reorder<T: Ordered>(
        &self,
        kind: OrderedKind,
        reordered: &[T],
    ) -> ClientResult<usize> {
        let version = self.versions.active();
        let plan = reorder::plan_reorder(reordered);
        let total = plan.len();
        if total == 0 {
            return Ok(0);
        }
        let mutation = MutationKind::for_order_update(kind);

        for (applied, OrderUpdate { id, new_order }) in plan.iter().enumerate() {
            if let Err(source) = self.update_order(kind, &version, id, *new_order).await {
                tracing::warn!(
                    version = %version,
                    id = %id,
                    applied,
                    total,
                    error = %source,
                    "Reorder stopped",
                );
                if applied > 0 {
                    self.settle(mutation, &version).await;
                }
                return Err(ClientError::Reorder {
                    applied,
                    total,
                    source,
                });
            }
        }

        tracing::debug!(version = %version, updates = total, "Reordered {}", kind.id_prefix());
        self.settle(mutation, &version).await;
        Ok(total)
    }

    async fn update_order(
        &self,
        kind: OrderedKind,
        version: &Version,
        id: &str,
        new_order: u64,
    ) -> GatewayResult<()> {
        let gw = &self.gateway;
        match kind {
            OrderedKind::GalleryItem => gw.update_gallery_item_order(version, id, new_order).await,
            OrderedKind::LoveMessage => gw.update_love_message_order(version, id, new_order).await,
            OrderedKind::TimelineMilestone => {
                gw.update_timeline_milestone_order(version, id, new_order).await
            }
        }
    }

    // ---- private helpers ----

    /// Await `call`, then invalidate on success only.
    async fn run<T>(
        &self,
        kind: MutationKind,
        version: &Version,
        call: impl Future<Output = GatewayResult<T>>,
    ) -> ClientResult<T> {
        match call.await {
            Ok(value) => {
                tracing::debug!(version = %version, mutation = ?kind, "Write succeeded");
                self.settle(kind, version).await;
                Ok(value)
            }
            Err(err) => {
                tracing::warn!(version = %version, mutation = ?kind, error = %err, "Write failed");
                Err(err.into())
            }
        }
    }

    async fn settle(&self, kind: MutationKind, version: &Version) {
        let keys = kind.keys(version);
        self.cache.invalidate(&keys);
        self.cache.refetch(&keys, RefetchScope::Active).await;
    }

    /// Current number of entities of `kind` in `version`'s draft.
    async fn draft_count(&self, version: &Version, kind: OrderedKind) -> ClientResult<u64> {
        let key = QueryKey::DraftContent(version.clone());
        let draft = match self.cache.fetch(&key).await? {
            QueryData::Content(draft) => draft,
            _ => return Err(ClientError::CacheShape(key.to_string())),
        };
        let Some(draft) = draft else {
            return Ok(0);
        };
        Ok(match kind {
            OrderedKind::GalleryItem => reorder::next_order(&draft.gallery_items),
            OrderedKind::LoveMessage => reorder::next_order(&draft.love_messages),
            OrderedKind::TimelineMilestone => reorder::next_order(&draft.timeline_milestones),
        })
    }
}
