//! Host resolution for routes

use router_api::Route;

/// Resolves the hostname a route claims. An empty string means the route
/// cannot be exposed.
pub trait HostResolver: Send + Sync {
    fn host_for_route(&self, route: &Route) -> String;
}

impl<F> HostResolver for F
where
    F: Fn(&Route) -> String + Send + Sync,
{
    fn host_for_route(&self, route: &Route) -> String {
        self(route)
    }
}

/// Uses the host set on the route
#[derive(Clone, Copy, Debug, Default)]
pub struct HostForRoute;

impl HostResolver for HostForRoute {
    fn host_for_route(&self, route: &Route) -> String {
        route.spec.host.clone()
    }
}

/// Uses the host set on the route, or generates `<name>-<namespace>.<suffix>`
/// when the route leaves it empty
#[derive(Clone, Debug)]
pub struct GeneratedHost {
    suffix: String,
}

impl GeneratedHost {
    pub fn new(suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        Self {
            suffix: suffix.trim_matches('.').to_string(),
        }
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

impl HostResolver for GeneratedHost {
    fn host_for_route(&self, route: &Route) -> String {
        if !route.spec.host.is_empty() {
            return route.spec.host.clone();
        }

        let (name, namespace) = (route.route_name(), route.route_namespace());
        if name.is_empty() || namespace.is_empty() || self.suffix.is_empty() {
            return String::new();
        }

        format!("{}-{}.{}", name, namespace, self.suffix)
    }
}
