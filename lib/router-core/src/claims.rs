//! Host claim bookkeeping
//!
//! Two indexes are kept in step: hostname to the routes claiming it, and
//! route identity (`namespace/name`) to the hostname it is bound to. Every
//! binding points at a host whose claim contains that route, and a host with
//! no claimants has no entry.

use router_api::Route;
use std::collections::HashMap;

/// The routes of a single namespace that currently own a hostname.
///
/// The claim is never empty while it is held by a [`ClaimIndex`], and its
/// first route is always the oldest one: the incumbent.
#[derive(Clone, Debug, PartialEq)]
pub struct HostClaim {
    namespace: String,
    routes: Vec<Route>,
}

impl HostClaim {
    pub fn new(route: Route) -> Self {
        Self {
            namespace: route.route_namespace().to_string(),
            routes: vec![route],
        }
    }

    /// Namespace owning the host
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Oldest surviving claimant, compared against routes from other namespaces
    pub fn incumbent(&self) -> &Route {
        &self.routes[0]
    }

    /// Claimants, incumbent first
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn into_routes(self) -> Vec<Route> {
        self.routes
    }

    /// Index of the claimant serving `path`
    pub(crate) fn position_of_path(&self, path: &str) -> Option<usize> {
        self.routes.iter().position(|r| r.spec.path == path)
    }

    /// Swaps the claimant at `index` for `route`, returning the previous one
    pub(crate) fn replace(&mut self, index: usize, route: Route) -> Route {
        let previous = std::mem::replace(&mut self.routes[index], route);
        self.settle();
        previous
    }

    /// Adds a claimant for a new path. Routes older than the incumbent take
    /// its place at the front; others go to the back.
    pub(crate) fn insert(&mut self, route: Route) {
        match self.routes.first() {
            Some(incumbent) if route.created_before(incumbent) => self.routes.insert(0, route),
            _ => self.routes.push(route),
        }
    }

    /// Removes every entry for the route `name_key`, returning how many were dropped
    pub(crate) fn remove(&mut self, name_key: &str) -> usize {
        let before = self.routes.len();
        self.routes.retain(|r| r.name_key() != name_key);
        self.settle();
        before - self.routes.len()
    }

    /// Drops entries left behind by `name_key` under paths other than `path`
    pub(crate) fn drop_stale_paths(&mut self, name_key: &str, path: &str) {
        self.routes
            .retain(|r| r.spec.path == path || r.name_key() != name_key);
        self.settle();
    }

    /// Moves the oldest claimant to the front. Ties keep the current incumbent.
    fn settle(&mut self) {
        let mut oldest = 0;
        for (i, route) in self.routes.iter().enumerate().skip(1) {
            if route.created_before(&self.routes[oldest]) {
                oldest = i;
            }
        }
        if oldest != 0 {
            let route = self.routes.remove(oldest);
            self.routes.insert(0, route);
        }
    }
}

/// Cross-referenced host and route indexes owned by the admission engine
#[derive(Debug, Default)]
pub struct ClaimIndex {
    host_to_routes: HashMap<String, HostClaim>,
    route_to_host: HashMap<String, String>,
}

impl ClaimIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim on `host`, if any
    pub fn claim(&self, host: &str) -> Option<&HostClaim> {
        self.host_to_routes.get(host)
    }

    pub(crate) fn claim_mut(&mut self, host: &str) -> Option<&mut HostClaim> {
        self.host_to_routes.get_mut(host)
    }

    /// Host the route `name_key` is bound to
    pub fn host_for(&self, name_key: &str) -> Option<&str> {
        self.route_to_host.get(name_key).map(String::as_str)
    }

    /// Number of claimed hosts
    pub fn host_len(&self) -> usize {
        self.host_to_routes.len()
    }

    /// Number of bound routes
    pub fn route_len(&self) -> usize {
        self.route_to_host.len()
    }

    pub fn hosts(&self) -> impl Iterator<Item = (&String, &HostClaim)> {
        self.host_to_routes.iter()
    }

    /// Records that `name_key` is bound to `host`, returning the previous binding
    pub(crate) fn bind(&mut self, name_key: String, host: String) -> Option<String> {
        self.route_to_host.insert(name_key, host)
    }

    pub(crate) fn unbind(&mut self, name_key: &str) -> Option<String> {
        self.route_to_host.remove(name_key)
    }

    /// Installs a fresh claim on `host`, returning the claim it replaced.
    /// The caller is responsible for unbinding the replaced routes.
    pub(crate) fn set_claim(&mut self, host: String, claim: HostClaim) -> Option<HostClaim> {
        self.host_to_routes.insert(host, claim)
    }

    /// Removes `name_key` from the claim on `host`, dropping the claim once
    /// it is empty. Returns whether anything was removed.
    pub(crate) fn remove_from_host(&mut self, host: &str, name_key: &str) -> bool {
        let Some(claim) = self.host_to_routes.get_mut(host) else {
            return false;
        };
        let removed = claim.remove(name_key) > 0;
        if claim.is_empty() {
            self.host_to_routes.remove(host);
        }
        removed
    }

    /// Removes every claim whose namespace fails `keep`, unbinding all of its
    /// routes. Returns the evicted claims by host.
    pub(crate) fn evict_unless<F>(&mut self, keep: F) -> Vec<(String, HostClaim)>
    where
        F: Fn(&str) -> bool,
    {
        let hosts: Vec<String> = self
            .host_to_routes
            .iter()
            .filter(|(_, claim)| !keep(claim.namespace()))
            .map(|(host, _)| host.clone())
            .collect();

        let mut evicted = Vec::with_capacity(hosts.len());
        for host in hosts {
            if let Some(claim) = self.host_to_routes.remove(&host) {
                for route in claim.routes() {
                    self.route_to_host.remove(&route.name_key());
                }
                evicted.push((host, claim));
            }
        }
        evicted
    }
}
