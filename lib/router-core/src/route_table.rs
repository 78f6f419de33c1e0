//! In-memory table of admitted routes and their backends

use crate::endpoint::{endpoints_from, Endpoint};
use crate::plugin::{NamespaceSet, Plugin};
use crate::{EventKind, Result};
use k8s_openapi::api::core::v1::Endpoints;
use router_api::Route;
use std::collections::HashMap;
use tracing::debug;

/// A route as served by the table
#[derive(Clone, Debug, PartialEq)]
pub struct RouteEntry {
    /// Route identity (namespace/name)
    pub route_key: String,
    /// Backend service id (namespace/name)
    pub service_id: String,
    pub namespace: String,
    pub path: String,
}

impl RouteEntry {
    fn from_route(route: &Route) -> Self {
        Self {
            route_key: route.name_key(),
            service_id: route.service_key(),
            namespace: route.route_namespace().to_string(),
            path: route.spec.path.clone(),
        }
    }

    /// Whether this entry serves `path`. An empty route path serves everything.
    fn serves(&self, path: &str) -> bool {
        if self.path.is_empty() || self.path == path {
            return true;
        }
        let prefix = self.path.trim_end_matches('/');
        path.strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }
}

/// RouteTable is the last stage of the plugin chain. It keeps the routes
/// that survived admission, indexed by host, and the endpoints of every
/// service (namespace/name).
#[derive(Debug, Default)]
pub struct RouteTable {
    hosts: HashMap<String, Vec<RouteEntry>>,
    endpoints: HashMap<String, Vec<Endpoint>>,
    namespaces: Option<NamespaceSet>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the route serving a request, preferring the longest matching path
    pub fn lookup(&self, host: &str, path: &str) -> Option<&RouteEntry> {
        self.hosts
            .get(host)?
            .iter()
            .filter(|entry| entry.serves(path))
            .max_by_key(|entry| entry.path.len())
    }

    /// Routes served for a host
    pub fn routes_for_host(&self, host: &str) -> &[RouteEntry] {
        self.hosts.get(host).map(Vec::as_slice).unwrap_or_default()
    }

    /// Get endpoints for a service
    pub fn endpoints(&self, service_id: &str) -> &[Endpoint] {
        self.endpoints
            .get(service_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Get count of hosts being served
    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    /// Get count of services with endpoints
    pub fn service_count(&self) -> usize {
        self.endpoints.len()
    }

    pub fn namespaces(&self) -> Option<&NamespaceSet> {
        self.namespaces.as_ref()
    }

    fn remove_route(&mut self, route_key: &str) {
        self.hosts.retain(|_, entries| {
            entries.retain(|e| e.route_key != route_key);
            !entries.is_empty()
        });
    }
}

impl Plugin for RouteTable {
    fn handle_route(&mut self, kind: EventKind, route: &Route) -> Result<()> {
        let entry = RouteEntry::from_route(route);
        self.remove_route(&entry.route_key);

        match kind {
            EventKind::Added | EventKind::Modified => {
                debug!("Serving route {} on {}{}", entry.route_key, route.spec.host, entry.path);
                self.hosts
                    .entry(route.spec.host.clone())
                    .or_default()
                    .push(entry);
            }
            EventKind::Deleted => {
                debug!("Removed route {}", entry.route_key);
            }
        }
        Ok(())
    }

    fn handle_endpoints(&mut self, kind: EventKind, endpoints: &Endpoints) -> Result<()> {
        let service_id = format!(
            "{}/{}",
            endpoints.metadata.namespace.as_deref().unwrap_or_default(),
            endpoints.metadata.name.as_deref().unwrap_or_default()
        );

        match kind {
            EventKind::Added | EventKind::Modified => {
                let flat = endpoints_from(endpoints);
                debug!("Updated endpoints for service {}: {} endpoints", service_id, flat.len());
                self.endpoints.insert(service_id, flat);
            }
            EventKind::Deleted => {
                debug!("Removed endpoints for service {}", service_id);
                self.endpoints.remove(&service_id);
            }
        }
        Ok(())
    }

    fn handle_namespaces(&mut self, namespaces: Option<&NamespaceSet>) -> Result<()> {
        if let Some(allowed) = namespaces {
            self.hosts.retain(|_, entries| {
                entries.retain(|e| allowed.contains(&e.namespace));
                !entries.is_empty()
            });
            self.endpoints.retain(|service_id, _| {
                let namespace = service_id.split('/').next().unwrap_or_default();
                allowed.contains(namespace)
            });
        }
        self.namespaces = namespaces.cloned();
        Ok(())
    }
}
