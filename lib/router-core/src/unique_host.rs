//! Unique host admission
//!
//! [`UniqueHost`] sits in front of another [`Plugin`] and makes sure a
//! hostname is only ever exposed by routes from a single namespace. Within
//! that namespace several routes may share the host as long as they serve
//! different paths. Contests are settled by age: the route created first
//! wins, and ties go to whoever holds the host (or path) already.
//!
//! Events must be delivered by a single dispatcher, one at a time. The
//! engine does no locking of its own.

use crate::claims::{ClaimIndex, HostClaim};
use crate::host::HostResolver;
use crate::plugin::{NamespaceSet, Plugin};
use crate::recorder::{RejectionReason, RejectionRecorder};
use crate::{CoreError, EventKind, Result};
use k8s_openapi::api::core::v1::Endpoints;
use router_api::Route;
use tracing::{debug, warn};

/// Outcome of arbitrating a route against the current claim on its host
enum Admission {
    /// Nobody holds the host yet
    Claim,
    /// The route already holds its path; refresh it in place
    Replace(usize),
    /// The route takes its path over from a younger route
    Displace(usize),
    /// The route adds a new path to its namespace's claim
    Insert,
    /// The route takes the host over from another namespace
    Reclaim,
}

/// Admission stage enforcing one namespace per hostname
pub struct UniqueHost<P, R> {
    plugin: P,
    host_for_route: Box<dyn HostResolver>,
    recorder: R,

    index: ClaimIndex,
    // None means unrestricted, which is different from empty
    allowed_namespaces: Option<NamespaceSet>,
}

impl<P, R> UniqueHost<P, R>
where
    P: Plugin,
    R: RejectionRecorder,
{
    /// Wraps `plugin` so it only sees routes that own their host. Rejections
    /// are reported to `recorder`.
    pub fn new(plugin: P, host_for_route: impl HostResolver + 'static, recorder: R) -> Self {
        Self {
            plugin,
            host_for_route: Box::new(host_for_route),
            recorder,
            index: ClaimIndex::new(),
            allowed_namespaces: None,
        }
    }

    /// Routes currently claiming `host`, incumbent first
    pub fn routes_for_host(&self, host: &str) -> Option<&[Route]> {
        self.index.claim(host).map(HostClaim::routes)
    }

    /// Number of hosts currently claimed
    pub fn host_len(&self) -> usize {
        self.index.host_len()
    }

    /// Host the route `namespace/name` is bound to
    pub fn host_for_route_key(&self, name_key: &str) -> Option<&str> {
        self.index.host_for(name_key)
    }

    pub fn claims(&self) -> &ClaimIndex {
        &self.index
    }

    pub fn allowed_namespaces(&self) -> Option<&NamespaceSet> {
        self.allowed_namespaces.as_ref()
    }

    pub fn plugin(&self) -> &P {
        &self.plugin
    }

    pub fn plugin_mut(&mut self) -> &mut P {
        &mut self.plugin
    }

    /// Whether routes and endpoints from `namespace` currently pass the filter
    pub fn namespace_allowed(&self, namespace: &str) -> bool {
        self.allowed_namespaces
            .as_ref()
            .map_or(true, |allowed| allowed.contains(namespace))
    }

    /// Processes a route event, forwarding it downstream if the route owns
    /// its host. The route's host is rewritten to the resolved value.
    pub fn admit_route(&mut self, kind: EventKind, mut route: Route) -> Result<()> {
        if !self.namespace_allowed(route.route_namespace()) {
            return Ok(());
        }

        let name_key = route.name_key();
        let resolved = self.host_for_route.host_for_route(&route);

        if kind == EventKind::Deleted {
            // Clean up under the host the route was actually bound to, even
            // if it no longer resolves.
            let host = match self.index.host_for(&name_key) {
                Some(bound) => bound.to_string(),
                None => resolved,
            };
            if host.is_empty() {
                return Err(self.reject_no_host(&route, name_key));
            }
            route.spec.host = host;
            return self.delete_route(kind, route, name_key);
        }

        if resolved.is_empty() {
            return Err(self.reject_no_host(&route, name_key));
        }
        let host = resolved;
        route.spec.host = host.clone();

        let admission = self.arbitrate(&route, &host)?;
        self.apply(admission, &route, &name_key, &host);

        if let Some(previous) = self.index.bind(name_key.clone(), host.clone()) {
            if previous != host {
                debug!(
                    "Route {} changed from serving host {} to host {}",
                    route.service_key(),
                    previous,
                    host
                );
                self.index.remove_from_host(&previous, &name_key);
            }
        }

        self.plugin.handle_route(kind, &route)
    }

    /// Decides how `route` relates to the current claim on `host`, reporting
    /// the route and failing if it loses.
    fn arbitrate(&self, route: &Route, host: &str) -> Result<Admission> {
        let Some(claim) = self.index.claim(host) else {
            return Ok(Admission::Claim);
        };
        let incumbent = claim.incumbent();

        if claim.namespace() != route.route_namespace() {
            if !route.created_before(incumbent) {
                debug!(
                    "Route {} cannot take {} from {}",
                    route.name_key(),
                    host,
                    incumbent.name_key()
                );
                let message = format!(
                    "another route holds {} and is older than {}",
                    host,
                    route.route_name()
                );
                return Err(self.reject_claimed(route, message));
            }
            return Ok(Admission::Reclaim);
        }

        let Some(index) = claim.position_of_path(&route.spec.path) else {
            return Ok(Admission::Insert);
        };
        let holder = &claim.routes()[index];

        if holder.name_key() == route.name_key() {
            return Ok(Admission::Replace(index));
        }

        if !route.created_before(holder) {
            debug!(
                "Route {} cannot take {} from {}",
                route.name_key(),
                host,
                holder.name_key()
            );
            let message = format!(
                "route {} already exposes {} and is older",
                holder.route_name(),
                host
            );
            return Err(self.reject_claimed(route, message));
        }

        Ok(Admission::Displace(index))
    }

    /// Updates the claim on `host` for an admitted route, removing whatever
    /// it displaced from both indexes and from the downstream plugin.
    fn apply(&mut self, admission: Admission, route: &Route, name_key: &str, host: &str) {
        let displaced = match admission {
            Admission::Claim => {
                debug!("Route {} claims {}", route.service_key(), host);
                self.index.set_claim(host.to_string(), HostClaim::new(route.clone()));
                Vec::new()
            }
            Admission::Replace(index) => {
                if let Some(claim) = self.index.claim_mut(host) {
                    claim.replace(index, route.clone());
                    claim.drop_stale_paths(name_key, &route.spec.path);
                }
                Vec::new()
            }
            Admission::Displace(index) => {
                let Some(claim) = self.index.claim_mut(host) else {
                    return;
                };
                let previous = claim.replace(index, route.clone());
                claim.drop_stale_paths(name_key, &route.spec.path);
                debug!(
                    "Route {} will replace path {} from {} because it is older",
                    name_key,
                    route.spec.path,
                    previous.route_name()
                );
                let message = format!("replaced by older route {}", route.route_name());
                vec![(previous, message)]
            }
            Admission::Insert => {
                if let Some(claim) = self.index.claim_mut(host) {
                    claim.drop_stale_paths(name_key, &route.spec.path);
                    claim.insert(route.clone());
                }
                Vec::new()
            }
            Admission::Reclaim => {
                let previous = self
                    .index
                    .set_claim(host.to_string(), HostClaim::new(route.clone()));
                let Some(previous) = previous else {
                    return;
                };
                debug!(
                    "Route {} is reclaiming {} from namespace {}",
                    name_key,
                    host,
                    previous.namespace()
                );
                let message = format!(
                    "namespace {} owns hostname {}",
                    route.route_namespace(),
                    host
                );
                previous
                    .into_routes()
                    .into_iter()
                    .map(|displaced| (displaced, message.clone()))
                    .collect()
            }
        };

        for (route, message) in displaced {
            self.index.unbind(&route.name_key());
            self.recorder
                .record_route_rejection(&route, RejectionReason::HostAlreadyClaimed, &message);
            self.emit_deletion(&route);
        }
    }

    fn delete_route(&mut self, kind: EventKind, route: Route, name_key: String) -> Result<()> {
        debug!("Deleting routes for {}", route.service_key());
        self.index.remove_from_host(&route.spec.host, &name_key);
        self.index.unbind(&name_key);
        self.plugin.handle_route(kind, &route)
    }

    /// Tells the downstream plugin to forget a displaced route. The route
    /// has already left the indexes, so failures are only logged.
    fn emit_deletion(&mut self, route: &Route) {
        if let Err(e) = self.plugin.handle_route(EventKind::Deleted, route) {
            warn!("Failed to remove displaced route {}: {}", route.name_key(), e);
        }
    }

    fn reject_no_host(&self, route: &Route, name_key: String) -> CoreError {
        debug!("Route {} has no host value", name_key);
        self.recorder.record_route_rejection(
            route,
            RejectionReason::NoHostValue,
            "no host value was defined for the route",
        );
        CoreError::NoHostValue(name_key)
    }

    fn reject_claimed(&self, route: &Route, message: String) -> CoreError {
        self.recorder
            .record_route_rejection(route, RejectionReason::HostAlreadyClaimed, &message);
        CoreError::HostAlreadyClaimed(message)
    }

    /// Forwards an endpoints event unless its namespace is filtered out
    pub fn endpoints_event(&mut self, kind: EventKind, endpoints: &Endpoints) -> Result<()> {
        let namespace = endpoints.metadata.namespace.as_deref().unwrap_or_default();
        if !self.namespace_allowed(namespace) {
            return Ok(());
        }
        self.plugin.handle_endpoints(kind, endpoints)
    }

    /// Replaces the namespace allow-list. Hosts held by namespaces outside
    /// the new list are released and their routes removed downstream.
    pub fn namespaces_changed(&mut self, namespaces: Option<NamespaceSet>) -> Result<()> {
        let evicted = match &namespaces {
            Some(allowed) => self.index.evict_unless(|ns| allowed.contains(ns)),
            None => Vec::new(),
        };
        self.allowed_namespaces = namespaces;

        let changed = !evicted.is_empty();
        for (host, claim) in evicted {
            debug!("Namespace {} is no longer allowed to serve {}", claim.namespace(), host);
            let message = format!(
                "namespace {} is not allowed to serve {}",
                claim.namespace(),
                host
            );
            for route in claim.into_routes() {
                self.recorder.record_route_rejection(
                    &route,
                    RejectionReason::NamespaceNotAllowed,
                    &message,
                );
                self.emit_deletion(&route);
            }
        }

        let restricted = self
            .allowed_namespaces
            .as_ref()
            .is_some_and(|allowed| !allowed.is_empty());
        if !changed && restricted {
            return Ok(());
        }
        self.plugin.handle_namespaces(self.allowed_namespaces.as_ref())
    }
}

impl<P, R> Plugin for UniqueHost<P, R>
where
    P: Plugin,
    R: RejectionRecorder,
{
    fn handle_route(&mut self, kind: EventKind, route: &Route) -> Result<()> {
        self.admit_route(kind, route.clone())
    }

    fn handle_endpoints(&mut self, kind: EventKind, endpoints: &Endpoints) -> Result<()> {
        self.endpoints_event(kind, endpoints)
    }

    fn handle_namespaces(&mut self, namespaces: Option<&NamespaceSet>) -> Result<()> {
        self.namespaces_changed(namespaces.cloned())
    }
}
