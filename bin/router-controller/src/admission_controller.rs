//! Route admission controller
//!
//! Watches Routes, Endpoints and (optionally) the allowed Namespaces,
//! serializes the three watches into one stream and feeds it through the
//! unique host admission stage into the route table.

use crate::config::{ControllerConfig, HostPolicy};
use crate::metrics::{AdmissionMetrics, MetricsRecorder};
use crate::watch::{NamespaceWatch, WatchTranslator};
use futures::stream::{self, BoxStream};
use futures::{StreamExt, TryStreamExt};
use k8s_openapi::api::core::v1::{Endpoints, Namespace};
use kube::{Api, Client};
use kube_runtime::watcher::{self, watcher, Event};
use kube_runtime::WatchStreamExt;
use router_api::Route;
use router_core::{CoreError, EventKind, NamespaceSet, RouteTable, UniqueHost};
use tracing::{debug, info, warn};

type Admission = UniqueHost<RouteTable, MetricsRecorder>;

enum WatchItem {
    Route(Event<Route>),
    Endpoints(Event<Endpoints>),
    Namespace(Event<Namespace>),
}

/// Why the watch loop stopped reading its current streams
enum Interrupt {
    /// Allowed namespaces grew; routes must be listed again
    NamespacesGrew,
    /// All watch streams ended
    Ended,
}

/// What happened to a single route event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RouteOutcome {
    /// Added or modified and passed to the route table
    Admitted,
    /// Deletion passed to the route table
    Removed,
    /// Dropped because its namespace is not allowed
    Filtered,
    /// Refused; the recorder has already seen it
    Rejected,
    /// The route table failed to apply it
    Failed,
}

pub struct AdmissionController {
    client: Client,
    config: ControllerConfig,
    metrics: AdmissionMetrics,
}

impl AdmissionController {
    pub fn new(client: Client, config: ControllerConfig, metrics: AdmissionMetrics) -> Self {
        Self {
            client,
            config,
            metrics,
        }
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        info!("Starting route admission");

        let policy: HostPolicy = self.config.host_policy();
        debug!("Host policy: {:?}", policy);
        let mut admission = UniqueHost::new(
            RouteTable::new(),
            policy,
            MetricsRecorder::new(&self.metrics),
        );

        let mut routes = WatchTranslator::new();
        let mut endpoints = WatchTranslator::new();
        let mut namespaces = NamespaceWatch::new();

        if let Some(labels) = &self.config.namespace_labels {
            info!("Restricting routes to namespaces matching {}", labels);
            // Routes are only watched once the matching namespaces are known
            let Some(allowed) = self.initial_namespaces(labels, &mut namespaces).await else {
                info!("Namespace watch ended before the first listing");
                return Ok(());
            };
            info!("Allowed namespaces listed: {} namespaces", allowed.len());
            admission.namespaces_changed(Some(allowed))?;
        }

        loop {
            let mut stream = self.watch_stream();
            let interrupt = loop {
                let Some(item) = stream.next().await else {
                    break Interrupt::Ended;
                };
                let item = match item {
                    Ok(item) => item,
                    Err(e) => {
                        warn!("Watch error: {}", e);
                        continue;
                    }
                };

                match item {
                    WatchItem::Route(event) => {
                        for (kind, route) in routes.translate(event) {
                            let outcome = dispatch_route(&mut admission, kind, route);
                            if outcome == RouteOutcome::Admitted {
                                self.metrics.route_admissions_total.inc();
                            }
                        }
                    }
                    WatchItem::Endpoints(event) => {
                        for (kind, eps) in endpoints.translate(event) {
                            if let Err(e) = admission.endpoints_event(kind, &eps) {
                                warn!("Failed to process endpoints event: {}", e);
                            }
                        }
                    }
                    WatchItem::Namespace(event) => {
                        let Some(allowed) = namespaces.apply(event) else {
                            continue;
                        };
                        let grew = namespaces_grew(admission.allowed_namespaces(), &allowed);
                        info!("Allowed namespaces changed: {} namespaces", allowed.len());
                        if let Err(e) = admission.namespaces_changed(Some(allowed)) {
                            warn!("Failed to process namespace change: {}", e);
                        }
                        self.metrics.claimed_hosts.set(admission.host_len() as i64);
                        if grew {
                            break Interrupt::NamespacesGrew;
                        }
                    }
                }
                self.metrics.claimed_hosts.set(admission.host_len() as i64);
            };

            match interrupt {
                Interrupt::NamespacesGrew => {
                    info!("Relisting routes for newly allowed namespaces");
                }
                Interrupt::Ended => {
                    info!("Watch streams ended");
                    return Ok(());
                }
            }
        }
    }

    /// Reads the namespace watch until its first full listing
    async fn initial_namespaces(
        &self,
        labels: &str,
        namespaces: &mut NamespaceWatch,
    ) -> Option<NamespaceSet> {
        let mut stream = self.namespace_stream(labels);
        while let Some(event) = stream.next().await {
            match event {
                Ok(event) => {
                    if let Some(allowed) = namespaces.apply(event) {
                        return Some(allowed);
                    }
                }
                Err(e) => warn!("Namespace watch error: {}", e),
            }
        }
        None
    }

    fn namespace_stream(
        &self,
        labels: &str,
    ) -> BoxStream<'static, Result<Event<Namespace>, watcher::Error>> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        watcher(namespaces, watcher::Config::default().labels(labels))
            .default_backoff()
            .boxed()
    }

    fn watch_stream(&self) -> BoxStream<'static, Result<WatchItem, watcher::Error>> {
        let routes: Api<Route> = Api::all(self.client.clone());
        let endpoints: Api<Endpoints> = Api::all(self.client.clone());

        let mut streams = vec![
            watcher(routes, watcher::Config::default())
                .default_backoff()
                .map_ok(WatchItem::Route)
                .boxed(),
            watcher(endpoints, watcher::Config::default())
                .default_backoff()
                .map_ok(WatchItem::Endpoints)
                .boxed(),
        ];

        if let Some(labels) = &self.config.namespace_labels {
            streams.push(
                self.namespace_stream(labels)
                    .map_ok(WatchItem::Namespace)
                    .boxed(),
            );
        }

        stream::select_all(streams).boxed()
    }
}

/// Whether `next` allows a namespace that `current` did not.
///
/// Lifting a restriction never counts: an unrestricted engine has already
/// seen every route.
fn namespaces_grew(current: Option<&NamespaceSet>, next: &NamespaceSet) -> bool {
    current.is_some_and(|current| !next.is_subset(current))
}

fn dispatch_route(admission: &mut Admission, kind: EventKind, route: Route) -> RouteOutcome {
    let key = route.name_key();
    let allowed = admission.namespace_allowed(route.route_namespace());

    match admission.admit_route(kind, route) {
        Ok(()) if !allowed => {
            debug!("Skipped {} for route {} in a filtered namespace", kind, key);
            RouteOutcome::Filtered
        }
        Ok(()) if kind == EventKind::Deleted => {
            debug!("Processed {} for route {}", kind, key);
            RouteOutcome::Removed
        }
        Ok(()) => {
            debug!("Processed {} for route {}", kind, key);
            RouteOutcome::Admitted
        }
        // Already reported through the recorder
        Err(CoreError::NoHostValue(_)) | Err(CoreError::HostAlreadyClaimed(_)) => {
            RouteOutcome::Rejected
        }
        Err(e) => {
            warn!("Failed to process {} for route {}: {}", kind, key, e);
            RouteOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use router_core::HostForRoute;

    fn set(names: &[&str]) -> NamespaceSet {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn route(namespace: &str, name: &str, host: &str) -> Route {
        let mut route = Route::new(name, Default::default());
        route.metadata.namespace = Some(namespace.to_string());
        route.spec.host = host.to_string();
        route.spec.to.name = name.to_string();
        route
    }

    fn admission(metrics: &AdmissionMetrics) -> Admission {
        UniqueHost::new(
            RouteTable::new(),
            HostPolicy::Explicit(HostForRoute),
            MetricsRecorder::new(metrics),
        )
    }

    #[test]
    fn test_lifting_restriction_is_not_growth() {
        assert!(!namespaces_grew(None, &set(&["a"])));
        assert!(!namespaces_grew(None, &set(&[])));
    }

    #[test]
    fn test_shrink_is_not_growth() {
        assert!(!namespaces_grew(Some(&set(&["a", "b"])), &set(&["a"])));
        assert!(!namespaces_grew(Some(&set(&["a"])), &set(&[])));
    }

    #[test]
    fn test_identical_set_is_not_growth() {
        assert!(!namespaces_grew(Some(&set(&["a", "b"])), &set(&["a", "b"])));
        assert!(!namespaces_grew(Some(&set(&[])), &set(&[])));
    }

    #[test]
    fn test_superset_is_growth() {
        assert!(namespaces_grew(Some(&set(&["a"])), &set(&["a", "b"])));
        // One namespace swapped for another still adds one
        assert!(namespaces_grew(Some(&set(&["a"])), &set(&["b"])));
    }

    #[test]
    fn test_first_listing_after_empty_is_growth() {
        assert!(namespaces_grew(Some(&NamespaceSet::new()), &set(&["a"])));
    }

    #[test]
    fn test_dispatch_outcomes() {
        let metrics = AdmissionMetrics::new().unwrap();
        let mut admission = admission(&metrics);

        let web = route("team-a", "web", "www.example.com");
        assert_eq!(
            dispatch_route(&mut admission, EventKind::Added, web.clone()),
            RouteOutcome::Admitted
        );
        assert_eq!(
            dispatch_route(&mut admission, EventKind::Modified, web.clone()),
            RouteOutcome::Admitted
        );

        // Same host from another namespace, no older than the incumbent
        let rival = route("team-b", "web", "www.example.com");
        assert_eq!(
            dispatch_route(&mut admission, EventKind::Added, rival),
            RouteOutcome::Rejected
        );

        let hostless = route("team-a", "api", "");
        assert_eq!(
            dispatch_route(&mut admission, EventKind::Added, hostless),
            RouteOutcome::Rejected
        );

        assert_eq!(
            dispatch_route(&mut admission, EventKind::Deleted, web),
            RouteOutcome::Removed
        );
        assert_eq!(admission.host_len(), 0);

        let counter = &metrics.route_rejections_total;
        assert_eq!(counter.with_label_values(&["HostAlreadyClaimed"]).get(), 1);
        assert_eq!(counter.with_label_values(&["NoHostValue"]).get(), 1);
    }

    #[test]
    fn test_dispatch_filtered_namespace() {
        let metrics = AdmissionMetrics::new().unwrap();
        let mut admission = admission(&metrics);
        admission.namespaces_changed(Some(set(&["team-a"]))).unwrap();

        let outside = route("team-b", "web", "www.example.com");
        assert_eq!(
            dispatch_route(&mut admission, EventKind::Added, outside.clone()),
            RouteOutcome::Filtered
        );
        assert_eq!(
            dispatch_route(&mut admission, EventKind::Deleted, outside),
            RouteOutcome::Filtered
        );
        assert_eq!(admission.host_len(), 0);

        let inside = route("team-a", "web", "www.example.com");
        assert_eq!(
            dispatch_route(&mut admission, EventKind::Added, inside),
            RouteOutcome::Admitted
        );
    }
}
