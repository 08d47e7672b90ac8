//! Version switching and per-version isolation.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use common::*;
use valentine_client::{
    CacheConfig, CacheEvent, QueryKey, QueryState, SwitchOutcome, ValentineClient, VersionStore,
};
use valentine_core::Version;
use valentine_gateway::MemoryGateway;

fn draft_reads(gw: &MemoryGateway, version: &Version) -> usize {
    gw.calls()
        .iter()
        .filter(|c| c.method == "getDraftContent" && c.version.as_ref() == Some(version))
        .count()
}

#[tokio::test]
async fn switching_away_and_back_refetches_the_draft() {
    let (client, gw) = admin_client();
    let v7 = v("7");
    gw.seed_draft(&v7, abc_draft());

    client.queries().draft_content().await.unwrap();
    client.queries().draft_content().await.unwrap();
    assert_eq!(draft_reads(&gw, &v7), 1);

    client.orchestrator().switch_version(v("8")).await.unwrap();
    client.orchestrator().switch_version(v7.clone()).await.unwrap();
    assert_eq!(
        client.cache().state(&QueryKey::DraftContent(v7.clone())),
        QueryState::Invalidated
    );

    client.queries().draft_content().await.unwrap();
    assert_eq!(draft_reads(&gw, &v7), 2);
}

#[tokio::test]
async fn switching_to_the_active_version_does_nothing() {
    let (client, gw) = admin_client();
    client.queries().draft_content().await.unwrap();
    let mut events = client.events().subscribe();

    let outcome = client.orchestrator().switch_version(v("7")).await.unwrap();
    assert_matches!(outcome, SwitchOutcome::Unchanged);
    assert!(events.try_recv().is_err());
    assert_eq!(
        client.cache().state(&QueryKey::DraftContent(v("7"))),
        QueryState::Fresh
    );
    assert_eq!(gw.call_count("getDraftContent"), 1);
}

#[tokio::test]
async fn switch_invalidates_both_triplets_and_refetches_observed_ones() {
    let (client, gw) = admin_client();
    let (v7, v8) = (v("7"), v("8"));
    gw.seed_draft(&v8, abc_draft());

    // a page showing the draft of whichever version becomes active
    let _draft8 = client.cache().observe(QueryKey::DraftContent(v8.clone()));
    let mut events = client.events().subscribe();

    let outcome = client.orchestrator().switch_version(v8.clone()).await.unwrap();
    assert_matches!(
        outcome,
        SwitchOutcome::Switched { ref from, ref to, ref stale }
            if *from == v7 && *to == v8 && stale.is_empty()
    );
    assert_eq!(client.active_version(), v8);

    let mut invalidated = Vec::new();
    let mut refetched = Vec::new();
    while let Ok(event) = events.try_recv() {
        match event {
            CacheEvent::Invalidated { key } => invalidated.push(key),
            CacheEvent::Refetched { key } => refetched.push(key),
            CacheEvent::VersionChanged { from, to } => {
                assert_eq!((from, to), (v7.clone(), v8.clone()))
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
    let mut expected = QueryKey::version_triplet(&v7).to_vec();
    expected.extend(QueryKey::version_triplet(&v8));
    assert_eq!(invalidated, expected);
    assert_eq!(refetched, vec![QueryKey::DraftContent(v8.clone())]);

    // only the observed entry was read eagerly
    assert_eq!(draft_reads(&gw, &v8), 1);
    assert_eq!(gw.call_count("getPublishStatus"), 0);
    assert_eq!(
        client.cache().state(&QueryKey::DraftContent(v8)),
        QueryState::Fresh
    );
}

#[tokio::test]
async fn writes_never_leak_into_another_version() {
    let (client, gw) = admin_client();
    let (v7, v8) = (v("7"), v("8"));

    client
        .mutations()
        .add_gallery_item(photo_input("seven"))
        .await
        .unwrap();
    let seven = client.queries().draft_content().await.unwrap();

    client.orchestrator().switch_version(v8.clone()).await.unwrap();
    assert_eq!(client.queries().draft_content().await.unwrap(), None);
    client
        .mutations()
        .add_gallery_item(photo_input("eight"))
        .await
        .unwrap();

    assert_eq!(gw.draft_snapshot(&v7), seven);
    let eight = gw.draft_snapshot(&v8).unwrap();
    assert_eq!(eight.gallery_items.len(), 1);
    assert_eq!(eight.gallery_items[0].caption, "eight");
    // both were the first photo of their version
    assert_eq!(eight.gallery_items[0].order, 0);

    client.orchestrator().switch_version(v7.clone()).await.unwrap();
    assert_eq!(client.queries().draft_content().await.unwrap(), seven);
}

#[tokio::test]
async fn write_in_flight_during_a_switch_settles_its_own_version() {
    let (client, gw) = admin_client();
    let (v7, v8) = (v("7"), v("8"));
    let draft7 = QueryKey::DraftContent(v7.clone());
    let draft8 = QueryKey::DraftContent(v8.clone());
    let held = gw.hold("addGalleryItem");

    let write = client.mutations().add_gallery_item(photo_input("seven"));
    let switch = async {
        held.arrived().await;
        client.orchestrator().switch_version(v8.clone()).await.unwrap();
        // the new version's draft is read while the old write is pending
        client.queries().draft_content().await.unwrap();
        assert_eq!(client.cache().state(&draft8), QueryState::Fresh);
        let events = client.events().subscribe();
        held.release();
        events
    };
    let (written, mut events) = tokio::join!(write, switch);
    written.unwrap();

    assert_eq!(client.active_version(), v8);
    assert_eq!(client.cache().state(&draft7), QueryState::Invalidated);
    assert_eq!(client.cache().state(&draft8), QueryState::Fresh);

    let mut invalidated = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let CacheEvent::Invalidated { key } = event {
            invalidated.push(key);
        }
    }
    assert_eq!(invalidated, vec![draft7]);

    assert_eq!(gw.draft_snapshot(&v7).unwrap().gallery_items.len(), 1);
    assert_eq!(gw.draft_snapshot(&v8), None);
}

#[tokio::test]
async fn publishing_one_version_leaves_others_unpublished() {
    let (client, gw) = admin_client();
    gw.seed_draft(&v("7"), abc_draft());
    gw.seed_draft(&v("8"), abc_draft());

    client.orchestrator().publish_draft().await.unwrap();
    assert!(client.queries().publish_status_for(&v("7")).await.unwrap().is_published);
    assert!(!client.queries().publish_status_for(&v("8")).await.unwrap().is_published);
    assert_eq!(gw.published_snapshot(&v("8")), None);
}

#[tokio::test]
async fn share_link_selects_the_version() {
    let (client, _gw) = admin_client();
    client.queries().draft_content().await.unwrap();
    client.orchestrator().open_share_link("?v=valentine-2025").await.unwrap();
    assert_eq!(client.active_version(), v("valentine-2025"));
    assert_eq!(
        client.cache().state(&QueryKey::DraftContent(v("7"))),
        QueryState::Invalidated
    );
    assert_eq!(
        client.share_url().unwrap(),
        "http://localhost:5173/?v=valentine-2025"
    );

    let outcome = client.orchestrator().open_share_link("?x=1").await.unwrap();
    assert_matches!(outcome, SwitchOutcome::Unchanged);
}

#[tokio::test]
async fn active_version_is_restored_on_the_next_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("active-version.json");
    let gw = Arc::new(MemoryGateway::default());

    let first = ValentineClient::new(
        gw.clone(),
        VersionStore::load(&path),
        CacheConfig::default(),
        SHARE_BASE,
    );
    assert_eq!(first.active_version(), Version::default());
    first.orchestrator().switch_version(v("8")).await.unwrap();
    drop(first);

    let second = ValentineClient::new(
        gw,
        VersionStore::load(&path),
        CacheConfig::default(),
        SHARE_BASE,
    );
    assert_eq!(second.active_version(), v("8"));
}
