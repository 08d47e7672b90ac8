//! Domain types and pure logic for the Valentine content site.
//!
//! Everything here is transport-agnostic: the content model shared with
//! the backend, the [`Version`] label that partitions it, error
//! classification, reorder planning, share links, and quiz scoring.

pub mod authz;
pub mod content;
pub mod error;
pub mod quiz;
pub mod reorder;
pub mod roles;
pub mod share_link;
pub mod types;
pub mod version;

pub use version::Version;
