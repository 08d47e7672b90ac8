//! Publishing: what the cache shows before, during, and after a publish.

mod common;

use assert_matches::assert_matches;
use common::*;
use valentine_client::{CacheEvent, ClientError, QueryKey, QueryState};
use valentine_core::authz::ErrorKind;
use valentine_core::content::FinalDedication;
use valentine_gateway::{GatewayError, MemoryGateway};
use std::sync::Arc;

#[tokio::test]
async fn published_content_matches_the_draft_it_was_published_from() {
    let (client, _gw) = admin_client();
    let m = client.mutations();
    m.add_gallery_item(photo_input("Paris")).await.unwrap();
    m.add_gallery_item(photo_input("Rome")).await.unwrap();
    m.set_final_dedication(FinalDedication::new("Always", "Yours"))
        .await
        .unwrap();

    let q = client.queries();
    assert!(!q.publish_status().await.unwrap().is_published);
    assert_eq!(q.published_content().await.unwrap(), None);
    let draft = q.draft_content().await.unwrap();
    assert!(draft.is_some());

    let outcome = client.orchestrator().publish_draft().await.unwrap();
    assert!(outcome.is_fully_refreshed());
    assert_eq!(outcome.version, v("7"));

    // Both entries were cached before the publish and are re-read now.
    assert!(q.publish_status().await.unwrap().is_published);
    assert_eq!(q.published_content().await.unwrap(), draft);
}

#[tokio::test]
async fn first_publish_adds_the_version_to_the_list() {
    let (client, _gw) = admin_client();
    client
        .mutations()
        .add_love_message(valentine_core::content::LoveMessageInput::new(
            "Hello", "Hi", "Hi there",
        ))
        .await
        .unwrap();

    assert!(client.queries().versions().await.unwrap().is_empty());
    client.orchestrator().publish_draft().await.unwrap();
    assert_eq!(client.queries().versions().await.unwrap(), vec![v("7")]);
    assert_eq!(client.version_choices().await.unwrap(), vec![v("7")]);
}

#[tokio::test]
async fn visitors_see_an_unpublished_version_as_empty_not_as_an_error() {
    let gw = Arc::new(MemoryGateway::anonymous());
    let visitor = client_for(&gw);

    let view = visitor.queries().published_view().await.unwrap();
    assert_eq!(view.content, None);
    assert!(!view.is_published);
    // authorization failures are not retried
    assert_eq!(gw.call_count("getPublishedContent"), 1);
}

#[tokio::test]
async fn visitors_see_content_once_published() {
    let (owner, gw) = admin_client();
    owner
        .mutations()
        .add_gallery_item(photo_input("Paris"))
        .await
        .unwrap();
    owner.orchestrator().publish_draft().await.unwrap();

    gw.set_caller_role(None);
    let visitor = client_for(&gw);
    let view = visitor.queries().published_view().await.unwrap();
    assert!(view.is_published);
    assert_eq!(view.content.unwrap().gallery_items[0].caption, "Paris");
}

#[tokio::test]
async fn drafts_stay_hidden_from_visitors() {
    let gw = Arc::new(MemoryGateway::anonymous());
    let visitor = client_for(&gw);

    let err = visitor.queries().draft_content().await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Unauthorized));
    assert_eq!(err.friendly_message(), "Please log in to perform this action");
}

#[tokio::test]
async fn failed_publish_leaves_the_cache_untouched() {
    let (client, gw) = admin_client();
    client
        .mutations()
        .add_gallery_item(photo_input("Paris"))
        .await
        .unwrap();
    let status_key = QueryKey::PublishStatus(v("7"));
    let before = client.queries().publish_status().await.unwrap();
    let mut events = client.events().subscribe();

    gw.fail_next("publishDraft", GatewayError::Transport("timed out".into()));
    let err = client.orchestrator().publish_draft().await.unwrap_err();
    assert_matches!(err, ClientError::Gateway(GatewayError::Transport(_)));

    assert_eq!(client.cache().state(&status_key), QueryState::Fresh);
    assert_eq!(client.queries().publish_status().await.unwrap(), before);
    assert!(events.try_recv().is_err());
    // mutations are never retried
    assert_eq!(gw.call_count("publishDraft"), 1);
}

#[tokio::test]
async fn publish_without_a_draft_is_a_backend_error() {
    let (client, _gw) = admin_client();
    let err = client.orchestrator().publish_draft().await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Backend));
    assert_eq!(
        err.friendly_message(),
        "An unexpected error occurred. Please try again."
    );
}

#[tokio::test]
async fn refresh_failure_after_publish_does_not_undo_it() {
    let (client, gw) = admin_client();
    client
        .mutations()
        .add_gallery_item(photo_input("Paris"))
        .await
        .unwrap();
    client.queries().publish_status().await.unwrap();

    // the read and its single retry both fail
    for _ in 0..2 {
        gw.fail_next("getPublishStatus", GatewayError::Transport("reset".into()));
    }
    let outcome = client.orchestrator().publish_draft().await.unwrap();

    assert!(!outcome.is_fully_refreshed());
    assert_eq!(outcome.stale.len(), 1);
    assert_eq!(outcome.stale[0].0, QueryKey::PublishStatus(v("7")));
    assert!(gw.published_snapshot(&v("7")).is_some());

    // the entry stays invalidated, so the next read recovers
    assert!(client.queries().publish_status().await.unwrap().is_published);
}

#[tokio::test]
async fn publish_announces_invalidations_and_the_publish() {
    let (client, _gw) = admin_client();
    client
        .mutations()
        .add_gallery_item(photo_input("Paris"))
        .await
        .unwrap();
    let mut events = client.events().subscribe();

    client.orchestrator().publish_draft().await.unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    for key in [
        QueryKey::PublishedContent(v("7")),
        QueryKey::PublishStatus(v("7")),
        QueryKey::Versions,
    ] {
        assert!(seen.contains(&CacheEvent::Invalidated { key }));
    }
    assert_matches!(seen.last(), Some(CacheEvent::Published { version, .. }) if *version == v("7"));
}

#[tokio::test]
async fn publish_panel_reflects_status_and_share_link() {
    let (client, _gw) = admin_client();
    client
        .mutations()
        .add_gallery_item(photo_input("Paris"))
        .await
        .unwrap();

    let panel = client.publish_panel().await.unwrap();
    assert_eq!(panel.badge, "Not published yet");
    assert_eq!(panel.last_published, "Never");
    assert!(panel.has_unpublished_changes);
    assert_eq!(panel.share_url, "http://localhost:5173/?v=7");

    client.orchestrator().publish_draft().await.unwrap();
    let panel = client.publish_panel().await.unwrap();
    assert_eq!(panel.badge, "Live");
    assert!(!panel.has_unpublished_changes);

    let steps = client.go_live_checklist().await.unwrap();
    assert!(steps.iter().all(|s| s.completed));
}
