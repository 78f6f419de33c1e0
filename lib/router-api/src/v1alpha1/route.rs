use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Route exposes a backend service under a hostname (and optional path)
/// through the shared router
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "router.datum.net",
    version = "v1alpha1",
    kind = "Route",
    plural = "routes",
    namespaced,
    derive = "Default",
    derive = "PartialEq",
    status = "RouteStatus",
)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    /// Hostname claimed by this route. May be left empty when the router
    /// generates hosts for the namespace.
    #[serde(default)]
    pub host: String,

    /// Path prefix served by this route. Empty means all paths.
    #[serde(default)]
    pub path: String,

    /// Backend receiving the traffic
    pub to: RouteTargetReference,

    /// Additional weighted backends
    #[serde(default)]
    pub alternate_backends: Vec<RouteTargetReference>,

    /// Target port on the backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<RoutePort>,
}

/// Reference to a backend service
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[derive(Default)]
pub struct RouteTargetReference {
    /// Kind of the backend (only "Service" is understood)
    #[serde(default = "default_target_kind")]
    pub kind: String,

    /// Name of the backend in the route's namespace
    pub name: String,

    /// Relative weight (0-256)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
}

/// Port selection on the backend
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[derive(Default)]
pub struct RoutePort {
    /// Port name or number
    pub target_port: String,
}

/// Status of a Route as seen by the routers that process it
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RouteStatus {
    #[serde(default)]
    pub ingress: Vec<RouteIngress>,
}

/// Admission result reported by a single router
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteIngress {
    pub router_name: String,

    /// Host the router bound the route to
    #[serde(default)]
    pub host: String,

    /// Whether the route was admitted
    #[serde(default)]
    pub admitted: bool,

    /// Machine-readable reason for a rejection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable rejection message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Route {
    /// Namespace of the route, empty when unset
    pub fn route_namespace(&self) -> &str {
        self.metadata.namespace.as_deref().unwrap_or_default()
    }

    /// Name of the route, empty when unset
    pub fn route_name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    /// Unique identity of the route: `namespace/name`
    pub fn name_key(&self) -> String {
        format!("{}/{}", self.route_namespace(), self.route_name())
    }

    /// Backend key of the route: `namespace/service`
    pub fn service_key(&self) -> String {
        format!("{}/{}", self.route_namespace(), self.spec.to.name)
    }

    pub fn creation_timestamp(&self) -> Option<&Time> {
        self.metadata.creation_timestamp.as_ref()
    }

    /// Whether this route was created strictly before `other`.
    ///
    /// A missing timestamp sorts before any set timestamp. Equal timestamps
    /// are never "before" each other.
    pub fn created_before(&self, other: &Route) -> bool {
        match (self.creation_timestamp(), other.creation_timestamp()) {
            (Some(a), Some(b)) => a.0 < b.0,
            (None, Some(_)) => true,
            _ => false,
        }
    }
}

fn default_target_kind() -> String {
    "Service".to_string()
}
