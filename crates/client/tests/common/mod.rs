#![allow(dead_code)]

use std::sync::Arc;

use valentine_client::{CacheConfig, ValentineClient, VersionStore};
use valentine_core::content::{
    BlobRef, ContentBundle, GalleryItem, GalleryItemInput, LoveMessage,
};
use valentine_core::roles::UserRole;
use valentine_core::Version;
use valentine_gateway::MemoryGateway;

pub const SHARE_BASE: &str = "http://localhost:5173";

pub fn v(label: &str) -> Version {
    Version::parse(label).unwrap()
}

/// A client over a fresh in-memory backend whose caller holds `role`.
pub fn client_with_role(role: UserRole) -> (ValentineClient, Arc<MemoryGateway>) {
    let gw = Arc::new(MemoryGateway::new(role));
    (client_for(&gw), gw)
}

/// An admin client over a fresh in-memory backend.
pub fn admin_client() -> (ValentineClient, Arc<MemoryGateway>) {
    client_with_role(UserRole::Admin)
}

/// Another client session against the same backend, e.g. a visitor tab.
pub fn client_for(gw: &Arc<MemoryGateway>) -> ValentineClient {
    ValentineClient::new(
        gw.clone(),
        VersionStore::default(),
        CacheConfig::default(),
        SHARE_BASE,
    )
}

pub fn photo_input(caption: &str) -> GalleryItemInput {
    GalleryItemInput::new(
        BlobRef::new(format!("https://blobs.test/{caption}.jpg")),
        caption,
    )
}

pub fn photo(id: &str, order: u64) -> GalleryItem {
    GalleryItem {
        id: id.into(),
        image: BlobRef::new(format!("https://blobs.test/{id}.jpg")),
        caption: id.into(),
        order,
    }
}

pub fn message(id: &str, order: u64) -> LoveMessage {
    LoveMessage {
        id: id.into(),
        title: id.into(),
        preview: format!("{id} preview"),
        full_text: format!("{id} full text"),
        order,
    }
}

/// A draft with photos `A`, `B`, `C` at orders 0, 1, 2.
pub fn abc_draft() -> ContentBundle {
    ContentBundle {
        gallery_items: vec![photo("A", 0), photo("B", 1), photo("C", 2)],
        ..Default::default()
    }
}
