//! The backend call surface.

use async_trait::async_trait;
use valentine_core::content::{
    ContentBundle, FinalDedication, GalleryItem, InteractiveSurpriseConfig, LoveMessage,
    LoveMessageInput, MilestoneInput, PublishStatus, TimelineMilestone,
};
use valentine_core::roles::{UserProfile, UserRole};
use valentine_core::Version;

use crate::error::GatewayResult;

/// One method per backend operation.
///
/// Version-scoped operations take the target [`Version`] explicitly.
/// Every method fails with [`GatewayError::NotReady`](crate::GatewayError::NotReady)
/// while [`is_ready`](Self::is_ready) is `false`, and passes backend
/// failures through unmodified.
#[async_trait]
pub trait ContentGateway: Send + Sync {
    /// Whether the connection/session is established.
    fn is_ready(&self) -> bool;

    // ---- content reads ----

    async fn get_draft_content(&self, version: &Version) -> GatewayResult<Option<ContentBundle>>;

    async fn get_published_content(
        &self,
        version: &Version,
    ) -> GatewayResult<Option<ContentBundle>>;

    async fn get_publish_status(&self, version: &Version) -> GatewayResult<PublishStatus>;

    /// Versions that have been published at least once.
    async fn get_versions(&self) -> GatewayResult<Vec<Version>>;

    // ---- publishing ----

    /// Make the current draft of `version` its published snapshot.
    async fn publish_draft(&self, version: &Version) -> GatewayResult<()>;

    // ---- gallery ----

    async fn add_gallery_item(&self, version: &Version, item: &GalleryItem) -> GatewayResult<()>;

    async fn update_gallery_item_order(
        &self,
        version: &Version,
        id: &str,
        new_order: u64,
    ) -> GatewayResult<()>;

    async fn delete_gallery_item(&self, version: &Version, id: &str) -> GatewayResult<()>;

    // ---- love messages ----

    async fn add_love_message(&self, version: &Version, message: &LoveMessage)
        -> GatewayResult<()>;

    async fn update_love_message(
        &self,
        version: &Version,
        id: &str,
        input: &LoveMessageInput,
    ) -> GatewayResult<()>;

    async fn update_love_message_order(
        &self,
        version: &Version,
        id: &str,
        new_order: u64,
    ) -> GatewayResult<()>;

    async fn delete_love_message(&self, version: &Version, id: &str) -> GatewayResult<()>;

    // ---- timeline ----

    async fn add_timeline_milestone(
        &self,
        version: &Version,
        milestone: &TimelineMilestone,
    ) -> GatewayResult<()>;

    async fn update_timeline_milestone(
        &self,
        version: &Version,
        id: &str,
        input: &MilestoneInput,
    ) -> GatewayResult<()>;

    async fn update_timeline_milestone_order(
        &self,
        version: &Version,
        id: &str,
        new_order: u64,
    ) -> GatewayResult<()>;

    async fn delete_timeline_milestone(&self, version: &Version, id: &str) -> GatewayResult<()>;

    // ---- singletons ----

    async fn set_interactive_surprise_config(
        &self,
        version: &Version,
        config: &InteractiveSurpriseConfig,
    ) -> GatewayResult<()>;

    async fn set_final_dedication(
        &self,
        version: &Version,
        dedication: &FinalDedication,
    ) -> GatewayResult<()>;

    // ---- caller identity ----

    async fn get_caller_user_profile(&self) -> GatewayResult<Option<UserProfile>>;

    async fn save_caller_user_profile(&self, profile: &UserProfile) -> GatewayResult<()>;

    async fn get_caller_user_role(&self) -> GatewayResult<UserRole>;

    async fn is_caller_admin(&self) -> GatewayResult<bool>;

    /// Assign `role` to the principal `user`.
    async fn assign_caller_user_role(&self, user: &str, role: UserRole) -> GatewayResult<()>;
}
