// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Discovery of externally assigned addresses.
//!
//! Node ports, load-balancer ingress and route hosts are assigned by the
//! platform after the service or route is created. These functions read them
//! back from observed objects; `None` means "not assigned yet".

use crate::route::Route;
use k8s_openapi::api::core::v1::Service;
use std::fmt;

/// Externally reachable component of a Horreum deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    App,
    Keycloak,
    Grafana,
    Report,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::App => "Horreum",
            Self::Keycloak => "Keycloak",
            Self::Grafana => "Grafana",
            Self::Report => "Report",
        })
    }
}

/// Node port of the first service port; zero counts as unassigned.
#[must_use]
pub fn node_port(service: &Service) -> Option<i32> {
    service
        .spec
        .as_ref()
        .and_then(|s| s.ports.as_ref())
        .and_then(|ports| ports.first())
        .and_then(|p| p.node_port)
        .filter(|port| *port != 0)
}

/// `<scheme>://<node_host>:<node port>` once a node port is assigned.
#[must_use]
pub fn node_port_url(scheme: &str, node_host: &str, service: &Service) -> Option<String> {
    node_port(service).map(|port| format!("{scheme}://{node_host}:{port}"))
}

/// URL of the first load-balancer ingress, preferring its hostname over its IP.
///
/// The ingress port is used when reported, else the service's node port.
#[must_use]
pub fn load_balancer_url(scheme: &str, service: &Service) -> Option<String> {
    let ingress = service
        .status
        .as_ref()
        .and_then(|s| s.load_balancer.as_ref())
        .and_then(|lb| lb.ingress.as_ref())
        .and_then(|ingress| ingress.first())?;
    let port = ingress
        .ports
        .as_ref()
        .and_then(|ports| ports.first())
        .map(|p| p.port)
        .or_else(|| node_port(service))?;
    let address = ingress
        .hostname
        .as_deref()
        .filter(|h| !h.is_empty())
        .or_else(|| ingress.ip.as_deref().filter(|ip| !ip.is_empty()))?;
    Some(format!("{scheme}://{address}:{port}"))
}

/// URL of the host the first router admitted, using the default port of the scheme.
#[must_use]
pub fn route_url(route: &Route) -> Option<String> {
    let host = route
        .status
        .as_ref()
        .and_then(|s| s.ingress.first())
        .and_then(|ingress| ingress.host.as_deref())
        .filter(|h| !h.is_empty())?;
    let scheme = if route.spec.tls.is_some() {
        "https"
    } else {
        "http"
    };
    Some(format!("{scheme}://{host}"))
}

#[cfg(test)]
#[path = "exposure_tests.rs"]
mod exposure_tests;
