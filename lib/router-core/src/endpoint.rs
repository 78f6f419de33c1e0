//! Backend endpoints of a service
use k8s_openapi::api::core::v1::{EndpointAddress, Endpoints};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub ip: String,
    pub port: u16,
    /// Name of the service port this endpoint serves, if named
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_name: Option<String>,
    pub ready: bool,
}

/// Flattens the subsets of an Endpoints object into one entry per address
/// and port. Ports outside the u16 range are skipped.
pub fn endpoints_from(endpoints: &Endpoints) -> Vec<Endpoint> {
    let mut out = Vec::new();
    for subset in endpoints.subsets.iter().flatten() {
        let ready = subset.addresses.iter().flatten().map(|a| (a, true));
        let not_ready = subset.not_ready_addresses.iter().flatten().map(|a| (a, false));
        let addresses: Vec<(&EndpointAddress, bool)> = ready.chain(not_ready).collect();

        for port in subset.ports.iter().flatten() {
            let Ok(number) = u16::try_from(port.port) else {
                continue;
            };
            for (address, ready) in &addresses {
                out.push(Endpoint {
                    ip: address.ip.clone(),
                    port: number,
                    port_name: port.name.clone(),
                    ready: *ready,
                });
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{EndpointPort, EndpointSubset};

    fn address(ip: &str) -> EndpointAddress {
        EndpointAddress {
            ip: ip.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_endpoints_from_subsets() {
        let endpoints = Endpoints {
            subsets: Some(vec![EndpointSubset {
                addresses: Some(vec![address("10.0.0.1"), address("10.0.0.2")]),
                not_ready_addresses: Some(vec![address("10.0.0.3")]),
                ports: Some(vec![EndpointPort {
                    name: Some("http".to_string()),
                    port: 8080,
                    ..Default::default()
                }]),
            }]),
            ..Default::default()
        };

        let flat = endpoints_from(&endpoints);
        assert_eq!(flat.len(), 3);
        assert_eq!(flat[0].ip, "10.0.0.1");
        assert_eq!(flat[0].port, 8080);
        assert_eq!(flat[0].port_name.as_deref(), Some("http"));
        assert!(flat[1].ready);
        assert!(!flat[2].ready);
    }

    #[test]
    fn test_endpoints_from_empty() {
        assert!(endpoints_from(&Endpoints::default()).is_empty());
    }
}
