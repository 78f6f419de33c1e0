//! Downstream plugin contract

use crate::{EventKind, Result};
use k8s_openapi::api::core::v1::Endpoints;
use router_api::Route;
use std::collections::BTreeSet;

/// Set of namespace names allowed to expose routes
pub type NamespaceSet = BTreeSet<String>;

/// A stage in the router's event chain.
///
/// Events are delivered one at a time by a single dispatcher. Errors are
/// returned to the caller as-is and never retried.
pub trait Plugin {
    /// Processes a route change
    fn handle_route(&mut self, kind: EventKind, route: &Route) -> Result<()>;

    /// Processes a change to the endpoints of a backend service
    fn handle_endpoints(&mut self, kind: EventKind, endpoints: &Endpoints) -> Result<()>;

    /// Replaces the set of allowed namespaces. `None` lifts the restriction.
    fn handle_namespaces(&mut self, namespaces: Option<&NamespaceSet>) -> Result<()>;
}

impl<P: Plugin + ?Sized> Plugin for Box<P> {
    fn handle_route(&mut self, kind: EventKind, route: &Route) -> Result<()> {
        (**self).handle_route(kind, route)
    }

    fn handle_endpoints(&mut self, kind: EventKind, endpoints: &Endpoints) -> Result<()> {
        (**self).handle_endpoints(kind, endpoints)
    }

    fn handle_namespaces(&mut self, namespaces: Option<&NamespaceSet>) -> Result<()> {
        (**self).handle_namespaces(namespaces)
    }
}
