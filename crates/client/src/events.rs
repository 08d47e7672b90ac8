//! In-process cache event bus backed by a `tokio::sync::broadcast` channel.
//!
//! Views subscribe to learn when cached data they display was discarded,
//! refreshed, or when the active version changed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use valentine_core::Version;

use crate::cache::QueryKey;

/// Something that happened to the client's cached state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CacheEvent {
    /// The entry for `key` was discarded and must be re-read.
    Invalidated { key: QueryKey },
    /// The entry for `key` was re-read from the backend.
    Refetched { key: QueryKey },
    /// The active version moved from `from` to `to`.
    VersionChanged { from: Version, to: Version },
    /// `version`'s draft became its published snapshot.
    Published {
        version: Version,
        at: DateTime<Utc>,
    },
}

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out of [`CacheEvent`]s.
///
/// Slow receivers that fall more than the capacity behind observe a
/// `RecvError::Lagged` and should simply re-read what they display.
pub struct CacheEventBus {
    sender: broadcast::Sender<CacheEvent>,
}

impl CacheEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: CacheEvent) {
        // A send error only means nobody is listening.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for CacheEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_events_in_order() {
        let bus = CacheEventBus::default();
        let mut rx = bus.subscribe();
        let v7 = Version::parse("7").unwrap();

        bus.publish(CacheEvent::Invalidated {
            key: QueryKey::DraftContent(v7.clone()),
        });
        bus.publish(CacheEvent::Refetched {
            key: QueryKey::DraftContent(v7.clone()),
        });

        assert_eq!(
            rx.recv().await.unwrap(),
            CacheEvent::Invalidated {
                key: QueryKey::DraftContent(v7.clone())
            }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            CacheEvent::Refetched {
                key: QueryKey::DraftContent(v7)
            }
        );
    }

    #[test]
    fn publish_without_subscribers_is_fine() {
        let bus = CacheEventBus::new(4);
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(CacheEvent::Refetched {
            key: QueryKey::Versions,
        });
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = CacheEvent::VersionChanged {
            from: Version::parse("7").unwrap(),
            to: Version::parse("8").unwrap(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "version_changed");
        assert_eq!(json["to"], "8");
    }
}
