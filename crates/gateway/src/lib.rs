//! Typed call surface to the Valentine content backend.
//!
//! [`ContentGateway`] mirrors the backend's RPC operations one-to-one and
//! carries no caching, retry, or batching logic. Two implementations:
//!
//! - [`HttpGateway`]: JSON-over-HTTP RPC client built on [`reqwest`].
//! - [`MemoryGateway`]: in-process backend honoring the same draft,
//!   publish, and authorization contract; used by tests and offline mode.

pub mod error;
pub mod gateway;
pub mod http;
pub mod memory;

pub use error::{GatewayError, GatewayResult};
pub use gateway::ContentGateway;
pub use http::{HttpGateway, HttpGatewayConfig};
pub use memory::{GatewayCall, HeldCall, MemoryGateway};
