//! Route admission for the shared router
//!
//! This library provides:
//! - Unique host admission: one namespace per hostname, oldest route wins
//! - Host resolution and rejection reporting hooks
//! - The plugin contract shared by every stage of the route event chain
//! - An in-memory route table that serves admitted routes

pub mod claims;
pub mod endpoint;
pub mod error;
pub mod event;
pub mod host;
pub mod plugin;
pub mod recorder;
pub mod route_table;
pub mod unique_host;

pub use claims::{ClaimIndex, HostClaim};
pub use endpoint::Endpoint;
pub use error::{CoreError, Result};
pub use event::EventKind;
pub use host::{GeneratedHost, HostForRoute, HostResolver};
pub use plugin::{NamespaceSet, Plugin};
pub use recorder::{LogRejections, RejectionReason, RejectionRecorder};
pub use route_table::{RouteEntry, RouteTable};
pub use unique_host::UniqueHost;
