//! Prometheus metrics for route admission

use anyhow::Result;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use router_api::Route;
use router_core::{LogRejections, RejectionReason, RejectionRecorder};
use std::sync::Arc;

/// Prometheus metrics collector for the admission controller
#[derive(Clone)]
pub struct AdmissionMetrics {
    /// Added or modified routes passed to the route table
    pub route_admissions_total: IntCounter,
    /// Rejected or displaced routes by reason
    pub route_rejections_total: IntCounterVec,
    /// Hostnames currently claimed
    pub claimed_hosts: IntGauge,
    /// Prometheus registry for metrics
    pub registry: Arc<Registry>,
}

impl AdmissionMetrics {
    /// Create and register the admission metrics
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let route_admissions_total = IntCounter::new(
            "route_admissions_total",
            "Added or modified routes passed to the route table",
        )?;

        let route_rejections_total = IntCounterVec::new(
            Opts::new("route_rejections_total", "Routes rejected or displaced, by reason"),
            &["reason"],
        )?;

        let claimed_hosts = IntGauge::new("claimed_hosts", "Hostnames currently claimed")?;

        registry.register(Box::new(route_admissions_total.clone()))?;
        registry.register(Box::new(route_rejections_total.clone()))?;
        registry.register(Box::new(claimed_hosts.clone()))?;

        Ok(Self {
            route_admissions_total,
            route_rejections_total,
            claimed_hosts,
            registry,
        })
    }

    /// Gather all metrics in Prometheus text format
    pub fn gather(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = vec![];
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Logs rejections and counts them by reason
#[derive(Clone)]
pub struct MetricsRecorder {
    rejections: IntCounterVec,
}

impl MetricsRecorder {
    pub fn new(metrics: &AdmissionMetrics) -> Self {
        Self {
            rejections: metrics.route_rejections_total.clone(),
        }
    }
}

impl RejectionRecorder for MetricsRecorder {
    fn record_route_rejection(&self, route: &Route, reason: RejectionReason, message: &str) {
        LogRejections.record_route_rejection(route, reason, message);
        self.rejections.with_label_values(&[reason.as_str()]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_counts_by_reason() {
        let metrics = AdmissionMetrics::new().unwrap();
        let recorder = MetricsRecorder::new(&metrics);
        let route = Route::new("web", Default::default());

        recorder.record_route_rejection(&route, RejectionReason::HostAlreadyClaimed, "taken");
        recorder.record_route_rejection(&route, RejectionReason::HostAlreadyClaimed, "taken");
        recorder.record_route_rejection(&route, RejectionReason::NoHostValue, "no host");

        let counter = &metrics.route_rejections_total;
        assert_eq!(counter.with_label_values(&["HostAlreadyClaimed"]).get(), 2);
        assert_eq!(counter.with_label_values(&["NoHostValue"]).get(), 1);
    }

    #[test]
    fn test_gather() {
        let metrics = AdmissionMetrics::new().unwrap();
        metrics.route_admissions_total.inc();
        metrics.claimed_hosts.set(3);

        let text = metrics.gather().unwrap();
        assert!(text.contains("route_admissions_total 1"));
        assert!(text.contains("claimed_hosts 3"));
    }
}
