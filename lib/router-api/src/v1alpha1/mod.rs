/// API version v1alpha1 for Datum Router CRDs

pub mod route;

pub use route::{Route, RouteIngress, RoutePort, RouteSpec, RouteStatus, RouteTargetReference};

/// API group for Datum Router resources
pub const API_GROUP: &str = "router.datum.net";
/// API version for Datum Router resources
pub const API_VERSION: &str = "v1alpha1";
