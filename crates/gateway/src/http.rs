//! JSON-over-HTTP RPC client for the content backend.
//!
//! Each operation is a `POST {base_url}/rpc/{method}` whose JSON body
//! carries the named arguments. The backend answers with either
//! `{"ok": <value>}` or `{"err": {"code": "...", "message": "..."}}`.
//! Older deployments omit `code`; those errors are classified by message.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use valentine_core::content::{
    ContentBundle, FinalDedication, GalleryItem, InteractiveSurpriseConfig, LoveMessage,
    LoveMessageInput, MilestoneInput, PublishStatus, TimelineMilestone,
};
use valentine_core::roles::{UserProfile, UserRole};
use valentine_core::Version;

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::ContentGateway;

/// Connection settings for [`HttpGateway`].
#[derive(Debug, Clone)]
pub struct HttpGatewayConfig {
    /// Base HTTP URL, e.g. `http://127.0.0.1:4943`.
    pub base_url: String,
    /// Bearer token identifying the caller; `None` for anonymous visitors.
    pub token: Option<String>,
    /// Transport-level timeout applied to every request.
    pub request_timeout: Duration,
}

/// Reply envelope for every RPC call.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RpcReply<T> {
    Ok(T),
    Err(RpcFault),
}

#[derive(Debug, Deserialize)]
struct RpcFault {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

/// HTTP client for one backend deployment.
///
/// Calls fail with [`GatewayError::NotReady`] until [`connect`](Self::connect)
/// succeeds.
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    ready: AtomicBool,
}

impl HttpGateway {
    pub fn new(config: HttpGatewayConfig) -> GatewayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, config))
    }

    /// Create a gateway reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: HttpGatewayConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token,
            ready: AtomicBool::new(false),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Probe `GET /health` and mark the gateway ready on success.
    pub async fn connect(&self) -> GatewayResult<()> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Self::ensure_success(response).await?;

        self.ready.store(true, Ordering::Release);
        tracing::info!(base_url = %self.base_url, "Connected to content backend");
        Ok(())
    }

    /// Drop the session; subsequent calls fail with `NotReady`.
    pub fn disconnect(&self) {
        self.ready.store(false, Ordering::Release);
        tracing::info!(base_url = %self.base_url, "Disconnected from content backend");
    }

    // ---- private helpers ----

    /// Issue one RPC call and decode its `ok` payload.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        args: serde_json::Value,
    ) -> GatewayResult<T> {
        if !self.is_ready() {
            return Err(GatewayError::NotReady);
        }

        tracing::debug!(method, "Backend RPC call");

        let mut request = self
            .client
            .post(format!("{}/rpc/{method}", self.base_url))
            .json(&args);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        match serde_json::from_slice::<RpcReply<T>>(&body) {
            Ok(RpcReply::Ok(value)) if status.is_success() => Ok(value),
            Ok(RpcReply::Ok(_)) => Err(Self::status_error(status, &body)),
            Ok(RpcReply::Err(fault)) => {
                tracing::debug!(
                    method,
                    code = ?fault.code,
                    message = %fault.message,
                    "Backend rejected call",
                );
                Err(GatewayError::from_backend(fault.code.as_deref(), fault.message))
            }
            Err(_) if !status.is_success() => Err(Self::status_error(status, &body)),
            Err(e) => Err(GatewayError::Decode(format!("{method}: {e}"))),
        }
    }

    /// Map a non-2xx status without a decodable fault to an error.
    fn status_error(status: reqwest::StatusCode, body: &[u8]) -> GatewayError {
        let text = String::from_utf8_lossy(body).into_owned();
        let code = match status.as_u16() {
            401 => Some("UNAUTHORIZED"),
            403 => Some("FORBIDDEN"),
            _ => None,
        };
        let message = if text.is_empty() {
            format!("Backend returned HTTP {}", status.as_u16())
        } else {
            text
        };
        GatewayError::from_backend(code, message)
    }

    /// Ensure the response has a success status code, or turn its body into
    /// a backend error.
    async fn ensure_success(response: reqwest::Response) -> GatewayResult<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(Self::status_error(status, &body));
        }
        Ok(response)
    }
}

#[async_trait]
impl ContentGateway for HttpGateway {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    async fn get_draft_content(&self, version: &Version) -> GatewayResult<Option<ContentBundle>> {
        self.call("getDraftContent", json!({ "version": version }))
            .await
    }

    async fn get_published_content(
        &self,
        version: &Version,
    ) -> GatewayResult<Option<ContentBundle>> {
        self.call("getPublishedContent", json!({ "version": version }))
            .await
    }

    async fn get_publish_status(&self, version: &Version) -> GatewayResult<PublishStatus> {
        self.call("getPublishStatus", json!({ "version": version }))
            .await
    }

    async fn get_versions(&self) -> GatewayResult<Vec<Version>> {
        self.call("getVersions", json!({})).await
    }

    async fn publish_draft(&self, version: &Version) -> GatewayResult<()> {
        self.call("publishDraft", json!({ "version": version })).await
    }

    async fn add_gallery_item(&self, version: &Version, item: &GalleryItem) -> GatewayResult<()> {
        self.call(
            "addGalleryItem",
            json!({
                "version": version,
                "id": item.id,
                "image": item.image,
                "caption": item.caption,
                "order": item.order,
            }),
        )
        .await
    }

    async fn update_gallery_item_order(
        &self,
        version: &Version,
        id: &str,
        new_order: u64,
    ) -> GatewayResult<()> {
        self.call(
            "updateGalleryItemOrder",
            json!({ "version": version, "id": id, "newOrder": new_order }),
        )
        .await
    }

    async fn delete_gallery_item(&self, version: &Version, id: &str) -> GatewayResult<()> {
        self.call("deleteGalleryItem", json!({ "version": version, "id": id }))
            .await
    }

    async fn add_love_message(
        &self,
        version: &Version,
        message: &LoveMessage,
    ) -> GatewayResult<()> {
        self.call(
            "addLoveMessage",
            json!({
                "version": version,
                "id": message.id,
                "title": message.title,
                "preview": message.preview,
                "fullText": message.full_text,
                "order": message.order,
            }),
        )
        .await
    }

    async fn update_love_message(
        &self,
        version: &Version,
        id: &str,
        input: &LoveMessageInput,
    ) -> GatewayResult<()> {
        self.call(
            "updateLoveMessage",
            json!({
                "version": version,
                "id": id,
                "title": input.title,
                "preview": input.preview,
                "fullText": input.full_text,
            }),
        )
        .await
    }

    async fn update_love_message_order(
        &self,
        version: &Version,
        id: &str,
        new_order: u64,
    ) -> GatewayResult<()> {
        self.call(
            "updateLoveMessageOrder",
            json!({ "version": version, "id": id, "newOrder": new_order }),
        )
        .await
    }

    async fn delete_love_message(&self, version: &Version, id: &str) -> GatewayResult<()> {
        self.call("deleteLoveMessage", json!({ "version": version, "id": id }))
            .await
    }

    async fn add_timeline_milestone(
        &self,
        version: &Version,
        milestone: &TimelineMilestone,
    ) -> GatewayResult<()> {
        self.call(
            "addTimelineMilestone",
            json!({
                "version": version,
                "id": milestone.id,
                "date": milestone.date,
                "title": milestone.title,
                "description": milestone.description,
                "photo": milestone.photo,
                "order": milestone.order,
            }),
        )
        .await
    }

    async fn update_timeline_milestone(
        &self,
        version: &Version,
        id: &str,
        input: &MilestoneInput,
    ) -> GatewayResult<()> {
        self.call(
            "updateTimelineMilestone",
            json!({
                "version": version,
                "id": id,
                "date": input.date,
                "title": input.title,
                "description": input.description,
                "photo": input.photo,
            }),
        )
        .await
    }

    async fn update_timeline_milestone_order(
        &self,
        version: &Version,
        id: &str,
        new_order: u64,
    ) -> GatewayResult<()> {
        self.call(
            "updateTimelineMilestoneOrder",
            json!({ "version": version, "id": id, "newOrder": new_order }),
        )
        .await
    }

    async fn delete_timeline_milestone(&self, version: &Version, id: &str) -> GatewayResult<()> {
        self.call(
            "deleteTimelineMilestone",
            json!({ "version": version, "id": id }),
        )
        .await
    }

    async fn set_interactive_surprise_config(
        &self,
        version: &Version,
        config: &InteractiveSurpriseConfig,
    ) -> GatewayResult<()> {
        self.call(
            "setInteractiveSurpriseConfig",
            json!({ "version": version, "config": config }),
        )
        .await
    }

    async fn set_final_dedication(
        &self,
        version: &Version,
        dedication: &FinalDedication,
    ) -> GatewayResult<()> {
        self.call(
            "setFinalDedication",
            json!({ "version": version, "dedication": dedication }),
        )
        .await
    }

    async fn get_caller_user_profile(&self) -> GatewayResult<Option<UserProfile>> {
        self.call("getCallerUserProfile", json!({})).await
    }

    async fn save_caller_user_profile(&self, profile: &UserProfile) -> GatewayResult<()> {
        self.call("saveCallerUserProfile", json!({ "profile": profile }))
            .await
    }

    async fn get_caller_user_role(&self) -> GatewayResult<UserRole> {
        self.call("getCallerUserRole", json!({})).await
    }

    async fn is_caller_admin(&self) -> GatewayResult<bool> {
        self.call("isCallerAdmin", json!({})).await
    }

    async fn assign_caller_user_role(&self, user: &str, role: UserRole) -> GatewayResult<()> {
        self.call(
            "assignCallerUserRole",
            json!({ "user": user, "role": role }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> HttpGateway {
        HttpGateway::with_client(
            reqwest::Client::new(),
            HttpGatewayConfig {
                base_url: "http://127.0.0.1:9/".into(),
                token: None,
                request_timeout: Duration::from_secs(1),
            },
        )
    }

    #[test]
    fn trailing_slash_is_stripped() {
        assert_eq!(gateway().base_url(), "http://127.0.0.1:9");
    }

    #[tokio::test]
    async fn calls_before_connect_are_not_ready() {
        let gw = gateway();
        assert!(!gw.is_ready());
        let err = gw.get_versions().await.unwrap_err();
        assert_eq!(err, GatewayError::NotReady);
    }

    #[test]
    fn status_error_maps_auth_statuses() {
        let err = HttpGateway::status_error(reqwest::StatusCode::FORBIDDEN, b"nope");
        assert!(err.is_authorization());
        let err = HttpGateway::status_error(reqwest::StatusCode::BAD_GATEWAY, b"");
        assert_eq!(err.to_string(), "Backend returned HTTP 502");
    }

    #[test]
    fn reply_envelope_decodes_both_arms() {
        let ok: RpcReply<Option<u32>> = serde_json::from_str(r#"{"ok": null}"#).unwrap();
        assert!(matches!(ok, RpcReply::Ok(None)));
        let err: RpcReply<()> =
            serde_json::from_str(r#"{"err": {"message": "Unauthorized"}}"#).unwrap();
        assert!(matches!(err, RpcReply::Err(f) if f.code.is_none()));
    }
}
