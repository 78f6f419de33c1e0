//! Controller configuration from the environment

use anyhow::{bail, Context, Result};
use router_api::Route;
use router_core::{GeneratedHost, HostForRoute, HostResolver};
use std::net::SocketAddr;

const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:9090";

#[derive(Clone, Debug, PartialEq)]
pub struct ControllerConfig {
    /// Label selector for namespaces allowed to expose routes. None admits
    /// every namespace.
    pub namespace_labels: Option<String>,
    /// Suffix for generated hosts of routes that don't set one
    pub host_suffix: Option<String>,
    /// Address of the metrics and health listener
    pub metrics_addr: SocketAddr,
}

impl ControllerConfig {
    /// Load configuration from ROUTER_* environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host_suffix = non_empty("ROUTER_HOST_SUFFIX");
        if let Some(suffix) = &host_suffix {
            if suffix.contains('/') || suffix.contains(char::is_whitespace) {
                bail!("ROUTER_HOST_SUFFIX is not a valid DNS suffix: {}", suffix);
            }
        }

        let metrics_addr = non_empty("ROUTER_METRICS_ADDR")
            .unwrap_or_else(|| DEFAULT_METRICS_ADDR.to_string());
        let metrics_addr: SocketAddr = metrics_addr
            .parse()
            .with_context(|| format!("invalid ROUTER_METRICS_ADDR: {}", metrics_addr))?;

        Ok(Self {
            namespace_labels: non_empty("ROUTER_NAMESPACE_LABELS"),
            host_suffix,
            metrics_addr,
        })
    }

    /// Host resolver for the configured host policy
    pub fn host_policy(&self) -> HostPolicy {
        match &self.host_suffix {
            Some(suffix) => HostPolicy::Generated(GeneratedHost::new(suffix.clone())),
            None => HostPolicy::Explicit(HostForRoute),
        }
    }
}

/// How routes get their hostname
#[derive(Clone, Debug)]
pub enum HostPolicy {
    /// Only the host set on the route
    Explicit(HostForRoute),
    /// The route's host, or one generated under a suffix
    Generated(GeneratedHost),
}

impl HostResolver for HostPolicy {
    fn host_for_route(&self, route: &Route) -> String {
        match self {
            HostPolicy::Explicit(resolver) => resolver.host_for_route(route),
            HostPolicy::Generated(resolver) => resolver.host_for_route(route),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ControllerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ControllerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.namespace_labels, None);
        assert_eq!(config.host_suffix, None);
        assert_eq!(config.metrics_addr, "0.0.0.0:9090".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_from_vars() {
        let config = config(&[
            ("ROUTER_NAMESPACE_LABELS", "router=public"),
            ("ROUTER_HOST_SUFFIX", "apps.example.com"),
            ("ROUTER_METRICS_ADDR", "127.0.0.1:9100"),
        ])
        .unwrap();
        assert_eq!(config.namespace_labels.as_deref(), Some("router=public"));
        assert_eq!(config.host_suffix.as_deref(), Some("apps.example.com"));
        assert_eq!(config.metrics_addr.port(), 9100);
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = config(&[
            ("ROUTER_NAMESPACE_LABELS", "  "),
            ("ROUTER_HOST_SUFFIX", ""),
        ])
        .unwrap();
        assert_eq!(config.namespace_labels, None);
        assert_eq!(config.host_suffix, None);
    }

    #[test]
    fn test_invalid_values() {
        assert!(config(&[("ROUTER_METRICS_ADDR", "not-an-address")]).is_err());
        assert!(config(&[("ROUTER_HOST_SUFFIX", "apps/example")]).is_err());
    }

    #[test]
    fn test_host_policy() {
        let mut route = Route::new("web", Default::default());
        route.metadata.namespace = Some("team".to_string());

        let explicit = config(&[]).unwrap().host_policy();
        assert_eq!(explicit.host_for_route(&route), "");

        let generated = config(&[("ROUTER_HOST_SUFFIX", "apps.example.com")])
            .unwrap()
            .host_policy();
        assert_eq!(generated.host_for_route(&route), "web-team.apps.example.com");
    }
}
