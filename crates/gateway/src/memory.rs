//! In-process backend implementing the content contract.
//!
//! [`MemoryGateway`] keeps drafts, published snapshots, and publish status
//! per version, and enforces the backend's role rules: admins edit and
//! publish, anyone may read status and published content, and published
//! content of a never-published version is refused to non-admins with a
//! legacy `Unauthorized` trap. Every call is recorded, failures can be
//! injected per method, and a call can be held at the gateway until
//! released, so tests can assert exact call sequences and interleavings.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::Notify;
use valentine_core::content::{
    ContentBundle, FinalDedication, GalleryItem, InteractiveSurpriseConfig, LoveMessage,
    LoveMessageInput, MilestoneInput, PublishStatus, TimelineMilestone,
};
use valentine_core::roles::{UserProfile, UserRole};
use valentine_core::types;
use valentine_core::Version;

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::ContentGateway;

/// One recorded gateway invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayCall {
    /// Backend RPC name, e.g. `"publishDraft"`.
    pub method: &'static str,
    /// Target version for version-scoped calls.
    pub version: Option<Version>,
    /// Entity id for entity-scoped calls.
    pub id: Option<String>,
}

#[derive(Default)]
struct MemoryState {
    drafts: HashMap<Version, ContentBundle>,
    published: HashMap<Version, ContentBundle>,
    status: HashMap<Version, PublishStatus>,
    role: Option<UserRole>,
    profile: Option<UserProfile>,
    assigned_roles: BTreeMap<String, UserRole>,
    calls: Vec<GatewayCall>,
    failures: VecDeque<(&'static str, GatewayError)>,
}

/// A call parked at the gateway until [`release`](Self::release) is called.
#[derive(Debug, Default)]
pub struct HeldCall {
    arrived: Notify,
    released: Notify,
}

impl HeldCall {
    /// Wait until the held call has reached the gateway.
    pub async fn arrived(&self) {
        self.arrived.notified().await;
    }

    /// Let the held call proceed.
    pub fn release(&self) {
        self.released.notify_one();
    }
}

pub struct MemoryGateway {
    state: Mutex<MemoryState>,
    ready: AtomicBool,
    holds: Mutex<HashMap<&'static str, Arc<HeldCall>>>,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new(UserRole::Admin)
    }
}

impl MemoryGateway {
    /// A ready gateway whose caller holds `role`.
    pub fn new(role: UserRole) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                role: Some(role),
                ..Default::default()
            }),
            ready: AtomicBool::new(true),
            holds: Mutex::new(HashMap::new()),
        }
    }

    /// A ready gateway for an anonymous visitor.
    pub fn anonymous() -> Self {
        let gw = Self::new(UserRole::Guest);
        gw.lock().role = None;
        gw
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }

    /// Change the caller's role; `None` means anonymous.
    pub fn set_caller_role(&self, role: Option<UserRole>) {
        self.lock().role = role;
    }

    /// Make the next call to `method` fail with `error`.
    pub fn fail_next(&self, method: &'static str, error: GatewayError) {
        self.lock().failures.push_back((method, error));
    }

    /// Park the next call to `method` before it touches any state.
    pub fn hold(&self, method: &'static str) -> Arc<HeldCall> {
        let held = Arc::new(HeldCall::default());
        self.holds
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(method, Arc::clone(&held));
        held
    }

    /// Every call issued so far, in order.
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.lock().calls.iter().filter(|c| c.method == method).count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Direct view of a draft, bypassing authorization and call recording.
    pub fn draft_snapshot(&self, version: &Version) -> Option<ContentBundle> {
        self.lock().drafts.get(version).cloned()
    }

    /// Direct view of a published snapshot.
    pub fn published_snapshot(&self, version: &Version) -> Option<ContentBundle> {
        self.lock().published.get(version).cloned()
    }

    /// Replace a version's draft wholesale, as another editor session would.
    pub fn seed_draft(&self, version: &Version, bundle: ContentBundle) {
        let mut state = self.lock();
        state.drafts.insert(version.clone(), bundle);
        state.status.entry(version.clone()).or_default().draft_last_updated = Some(types::now());
    }

    pub fn assigned_role(&self, user: &str) -> Option<UserRole> {
        self.lock().assigned_roles.get(user).copied()
    }

    // ---- private helpers ----

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Wait out any hold, record the call, then apply readiness and
    /// injected failures.
    async fn begin(
        &self,
        method: &'static str,
        version: Option<&Version>,
        id: Option<&str>,
    ) -> GatewayResult<MutexGuard<'_, MemoryState>> {
        let held = self
            .holds
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(method);
        if let Some(held) = held {
            held.arrived.notify_one();
            held.released.notified().await;
        }

        if !self.ready.load(Ordering::Acquire) {
            return Err(GatewayError::NotReady);
        }
        let mut state = self.lock();
        state.calls.push(GatewayCall {
            method,
            version: version.cloned(),
            id: id.map(str::to_string),
        });
        if let Some(pos) = state.failures.iter().position(|(m, _)| *m == method) {
            if let Some((_, err)) = state.failures.remove(pos) {
                return Err(err);
            }
        }
        Ok(state)
    }

    fn require_admin(state: &MemoryState, action: &str) -> GatewayResult<()> {
        match state.role {
            Some(UserRole::Admin) => Ok(()),
            Some(_) => Err(GatewayError::from_backend(
                None,
                format!("Unauthorized: Only admins can {action}"),
            )),
            None => Err(GatewayError::from_backend(
                None,
                format!("Unauthorized: Only users can {action}"),
            )),
        }
    }

    fn require_user(state: &MemoryState, action: &str) -> GatewayResult<()> {
        match state.role {
            Some(UserRole::Admin | UserRole::User) => Ok(()),
            _ => Err(GatewayError::from_backend(
                None,
                format!("Unauthorized: Only users can {action}"),
            )),
        }
    }

    /// Apply an edit to a version's draft, creating it on first write.
    async fn edit_draft<F>(
        &self,
        method: &'static str,
        version: &Version,
        id: Option<&str>,
        edit: F,
    ) -> GatewayResult<()>
    where
        F: FnOnce(&mut ContentBundle) -> GatewayResult<()>,
    {
        let mut state = self.begin(method, Some(version), id).await?;
        Self::require_admin(&state, "edit content")?;

        let mut draft = state.drafts.get(version).cloned().unwrap_or_default();
        edit(&mut draft)?;
        state.drafts.insert(version.clone(), draft);
        state.status.entry(version.clone()).or_default().draft_last_updated = Some(types::now());
        Ok(())
    }
}

fn not_found(entity: &str, id: &str) -> GatewayError {
    GatewayError::from_backend(Some("NOT_FOUND"), format!("{entity} not found: {id}"))
}

fn find_mut<'a, T, F>(
    items: &'a mut [T],
    entity: &str,
    id: &str,
    key: F,
) -> GatewayResult<&'a mut T>
where
    F: Fn(&T) -> &str,
{
    items
        .iter_mut()
        .find(|item| key(&**item) == id)
        .ok_or_else(|| not_found(entity, id))
}

fn remove_by_id<T, F>(items: &mut Vec<T>, entity: &str, id: &str, key: F) -> GatewayResult<()>
where
    F: Fn(&T) -> &str,
{
    let before = items.len();
    items.retain(|item| key(item) != id);
    if items.len() == before {
        return Err(not_found(entity, id));
    }
    Ok(())
}

#[async_trait]
impl ContentGateway for MemoryGateway {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    async fn get_draft_content(&self, version: &Version) -> GatewayResult<Option<ContentBundle>> {
        let state = self.begin("getDraftContent", Some(version), None).await?;
        Self::require_admin(&state, "view drafts")?;
        Ok(state.drafts.get(version).cloned())
    }

    async fn get_published_content(
        &self,
        version: &Version,
    ) -> GatewayResult<Option<ContentBundle>> {
        let state = self.begin("getPublishedContent", Some(version), None).await?;
        match state.published.get(version) {
            Some(bundle) => Ok(Some(bundle.clone())),
            None if state.role == Some(UserRole::Admin) => Ok(None),
            None => Err(GatewayError::from_backend(
                None,
                format!("Unauthorized: version {version} is not published"),
            )),
        }
    }

    async fn get_publish_status(&self, version: &Version) -> GatewayResult<PublishStatus> {
        let state = self.begin("getPublishStatus", Some(version), None).await?;
        Ok(state.status.get(version).cloned().unwrap_or_default())
    }

    async fn get_versions(&self) -> GatewayResult<Vec<Version>> {
        let state = self.begin("getVersions", None, None).await?;
        let mut versions: Vec<Version> = state.published.keys().cloned().collect();
        versions.sort();
        Ok(versions)
    }

    async fn publish_draft(&self, version: &Version) -> GatewayResult<()> {
        let mut state = self.begin("publishDraft", Some(version), None).await?;
        Self::require_admin(&state, "publish")?;

        let draft = state.drafts.get(version).cloned().ok_or_else(|| {
            GatewayError::from_backend(
                Some("NOT_FOUND"),
                format!("No draft exists for version {version}"),
            )
        })?;
        state.published.insert(version.clone(), draft);
        let status = state.status.entry(version.clone()).or_default();
        status.is_published = true;
        status.last_published = Some(types::now());
        Ok(())
    }

    async fn add_gallery_item(&self, version: &Version, item: &GalleryItem) -> GatewayResult<()> {
        self.edit_draft("addGalleryItem", version, Some(&item.id), |draft| {
            draft.gallery_items.push(item.clone());
            Ok(())
        })
        .await
    }

    async fn update_gallery_item_order(
        &self,
        version: &Version,
        id: &str,
        new_order: u64,
    ) -> GatewayResult<()> {
        self.edit_draft("updateGalleryItemOrder", version, Some(id), |draft| {
            find_mut(&mut draft.gallery_items, "Gallery item", id, |i| i.id.as_str())?.order =
                new_order;
            Ok(())
        })
        .await
    }

    async fn delete_gallery_item(&self, version: &Version, id: &str) -> GatewayResult<()> {
        self.edit_draft("deleteGalleryItem", version, Some(id), |draft| {
            remove_by_id(&mut draft.gallery_items, "Gallery item", id, |i| i.id.as_str())
        })
        .await
    }

    async fn add_love_message(
        &self,
        version: &Version,
        message: &LoveMessage,
    ) -> GatewayResult<()> {
        self.edit_draft("addLoveMessage", version, Some(&message.id), |draft| {
            draft.love_messages.push(message.clone());
            Ok(())
        })
        .await
    }

    async fn update_love_message(
        &self,
        version: &Version,
        id: &str,
        input: &LoveMessageInput,
    ) -> GatewayResult<()> {
        self.edit_draft("updateLoveMessage", version, Some(id), |draft| {
            let message =
                find_mut(&mut draft.love_messages, "Love message", id, |m| m.id.as_str())?;
            message.title = input.title.clone();
            message.preview = input.preview.clone();
            message.full_text = input.full_text.clone();
            Ok(())
        })
        .await
    }

    async fn update_love_message_order(
        &self,
        version: &Version,
        id: &str,
        new_order: u64,
    ) -> GatewayResult<()> {
        self.edit_draft("updateLoveMessageOrder", version, Some(id), |draft| {
            find_mut(&mut draft.love_messages, "Love message", id, |m| m.id.as_str())?.order =
                new_order;
            Ok(())
        })
        .await
    }

    async fn delete_love_message(&self, version: &Version, id: &str) -> GatewayResult<()> {
        self.edit_draft("deleteLoveMessage", version, Some(id), |draft| {
            remove_by_id(&mut draft.love_messages, "Love message", id, |m| m.id.as_str())
        })
        .await
    }

    async fn add_timeline_milestone(
        &self,
        version: &Version,
        milestone: &TimelineMilestone,
    ) -> GatewayResult<()> {
        self.edit_draft("addTimelineMilestone", version, Some(&milestone.id), |draft| {
            draft.timeline_milestones.push(milestone.clone());
            Ok(())
        })
        .await
    }

    async fn update_timeline_milestone(
        &self,
        version: &Version,
        id: &str,
        input: &MilestoneInput,
    ) -> GatewayResult<()> {
        self.edit_draft("updateTimelineMilestone", version, Some(id), |draft| {
            let milestone = find_mut(
                &mut draft.timeline_milestones,
                "Timeline milestone",
                id,
                |m| m.id.as_str(),
            )?;
            milestone.date = input.date;
            milestone.title = input.title.clone();
            milestone.description = input.description.clone();
            milestone.photo = input.photo.clone();
            Ok(())
        })
        .await
    }

    async fn update_timeline_milestone_order(
        &self,
        version: &Version,
        id: &str,
        new_order: u64,
    ) -> GatewayResult<()> {
        self.edit_draft("updateTimelineMilestoneOrder", version, Some(id), |draft| {
            find_mut(
                &mut draft.timeline_milestones,
                "Timeline milestone",
                id,
                |m| m.id.as_str(),
            )?
            .order = new_order;
            Ok(())
        })
        .await
    }

    async fn delete_timeline_milestone(&self, version: &Version, id: &str) -> GatewayResult<()> {
        self.edit_draft("deleteTimelineMilestone", version, Some(id), |draft| {
            remove_by_id(
                &mut draft.timeline_milestones,
                "Timeline milestone",
                id,
                |m| m.id.as_str(),
            )
        })
        .await
    }

    async fn set_interactive_surprise_config(
        &self,
        version: &Version,
        config: &InteractiveSurpriseConfig,
    ) -> GatewayResult<()> {
        self.edit_draft("setInteractiveSurpriseConfig", version, None, |draft| {
            draft.interactive_surprise_config = Some(config.clone());
            Ok(())
        })
        .await
    }

    async fn set_final_dedication(
        &self,
        version: &Version,
        dedication: &FinalDedication,
    ) -> GatewayResult<()> {
        self.edit_draft("setFinalDedication", version, None, |draft| {
            draft.final_dedication = Some(dedication.clone());
            Ok(())
        })
        .await
    }

    async fn get_caller_user_profile(&self) -> GatewayResult<Option<UserProfile>> {
        let state = self.begin("getCallerUserProfile", None, None).await?;
        Self::require_user(&state, "view profiles")?;
        Ok(state.profile.clone())
    }

    async fn save_caller_user_profile(&self, profile: &UserProfile) -> GatewayResult<()> {
        let mut state = self.begin("saveCallerUserProfile", None, None).await?;
        Self::require_user(&state, "save profiles")?;
        state.profile = Some(profile.clone());
        Ok(())
    }

    async fn get_caller_user_role(&self) -> GatewayResult<UserRole> {
        let state = self.begin("getCallerUserRole", None, None).await?;
        Ok(state.role.unwrap_or(UserRole::Guest))
    }

    async fn is_caller_admin(&self) -> GatewayResult<bool> {
        let state = self.begin("isCallerAdmin", None, None).await?;
        Ok(state.role == Some(UserRole::Admin))
    }

    async fn assign_caller_user_role(&self, user: &str, role: UserRole) -> GatewayResult<()> {
        let mut state = self.begin("assignCallerUserRole", None, Some(user)).await?;
        Self::require_admin(&state, "assign roles")?;
        state.assigned_roles.insert(user.to_string(), role);
        Ok(())
    }
}
