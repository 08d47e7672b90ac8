//! Client core for the Valentine site: the active-version store, the
//! query cache, write operations with their invalidation rules, and the
//! draft/publish orchestration that keeps the cache consistent across a
//! publish or a version switch.
//!
//! [`ValentineClient`] wires the pieces together around one
//! [`ContentGateway`](valentine_gateway::ContentGateway).

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod mutations;
pub mod orchestrator;
pub mod queries;
pub mod version_store;
pub mod views;

pub use cache::{
    ObserverGuard, QueryClient, QueryData, QueryKey, QueryState, RefetchScope, ResourceKind,
};
pub use client::ValentineClient;
pub use config::{CacheConfig, ClientConfig, ConfigError, LogFormat};
pub use error::{ClientError, ClientResult};
pub use events::{CacheEvent, CacheEventBus};
pub use mutations::{MutationKind, Mutations};
pub use orchestrator::{Orchestrator, PublishOutcome, SwitchOutcome};
pub use queries::{PublishedView, Queries};
pub use version_store::VersionStore;
