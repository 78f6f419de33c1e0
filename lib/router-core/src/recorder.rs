//! Reporting of rejected and displaced routes

use router_api::Route;
use std::fmt;
use tracing::debug;

/// Why a route was refused or removed from a host
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RejectionReason {
    /// The route resolved to an empty hostname
    NoHostValue,
    /// Another route holds the hostname (or path) and takes precedence
    HostAlreadyClaimed,
    /// The route's namespace was removed from the allow-list
    NamespaceNotAllowed,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::NoHostValue => "NoHostValue",
            RejectionReason::HostAlreadyClaimed => "HostAlreadyClaimed",
            RejectionReason::NamespaceNotAllowed => "NamespaceNotAllowed",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sink told about every rejected or displaced route.
///
/// Called synchronously from the admission path; implementations must not
/// block for long and cannot affect the admission decision.
pub trait RejectionRecorder {
    fn record_route_rejection(&self, route: &Route, reason: RejectionReason, message: &str);
}

/// Records rejections to the log
#[derive(Clone, Copy, Debug, Default)]
pub struct LogRejections;

impl RejectionRecorder for LogRejections {
    fn record_route_rejection(&self, route: &Route, reason: RejectionReason, message: &str) {
        debug!("Rejected route {}: {}: {}", route.name_key(), reason, message);
    }
}
