//! Datum Router API types and CRDs for Kubernetes integration
//!
//! This library defines the custom resources for the shared router:
//! - Route: exposes a backend service under a hostname and optional path

pub mod v1alpha1;

pub use v1alpha1::{Route, RouteSpec, RouteStatus, RouteTargetReference};
