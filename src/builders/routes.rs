// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Route types, TLS termination and service exposure.

use crate::builders::Platform;
use crate::constants::{
    SERVICE_HTTPS_PORT, SERVICE_HTTP_PORT, SERVICE_TYPE_CLUSTER_IP, SERVICE_TYPE_NODE_PORT,
};
use crate::crd::{Horreum, RouteSpec};
use crate::errors::ReconcileError;
use crate::labels::component_labels;
use crate::route::{
    OpenShiftRouteSpec, Route, RouteTargetReference, TlsConfig, INSECURE_POLICY_REDIRECT,
    TERMINATION_EDGE, TERMINATION_PASSTHROUGH, TERMINATION_REENCRYPT,
};
use k8s_openapi::api::core::v1::ServicePort;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::ObjectMeta;
use kube::ResourceExt;

/// How external traffic reaches a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteType {
    /// Plain text end to end.
    Http,
    /// TLS terminated at the router; plain text inside the cluster.
    Edge,
    /// TLS terminated at the router and re-encrypted to the pod.
    Reencrypt,
    /// TLS terminated by the pod.
    Passthrough,
}

impl RouteType {
    /// Parses the route type, defaulting to [`RouteType::Reencrypt`].
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unknown values.
    pub fn parse(route: &RouteSpec) -> Result<Self, ReconcileError> {
        Self::parse_or(route, Self::Reencrypt)
    }

    /// Parses the route type, using `default` when none is set.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unknown values.
    pub fn parse_or(route: &RouteSpec, default: Self) -> Result<Self, ReconcileError> {
        match route.r#type.as_deref().unwrap_or_default() {
            "" => Ok(default),
            "http" => Ok(Self::Http),
            "edge" => Ok(Self::Edge),
            "reencrypt" => Ok(Self::Reencrypt),
            "passthrough" => Ok(Self::Passthrough),
            other => Err(ReconcileError::Configuration(format!(
                "Invalid route type: {other}"
            ))),
        }
    }

    /// The pod serves plain HTTP behind this route type.
    #[must_use]
    pub fn is_plain_inside(self) -> bool {
        matches!(self, Self::Http | Self::Edge)
    }

    /// Scheme the pod itself serves.
    #[must_use]
    pub fn scheme(self) -> &'static str {
        if self.is_plain_inside() {
            "http"
        } else {
            "https"
        }
    }

    /// Scheme prefix of in-cluster URLs pointing at the pod.
    #[must_use]
    pub fn inner_protocol(self) -> &'static str {
        if self.is_plain_inside() {
            "http://"
        } else {
            "https://"
        }
    }

    /// Edge and reencrypt routes carry certificate material on the route itself.
    #[must_use]
    pub fn terminates_at_router(self) -> bool {
        matches!(self, Self::Edge | Self::Reencrypt)
    }
}

/// Certificate material read from the route's TLS secret.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsMaterial {
    pub certificate: Option<String>,
    pub key: Option<String>,
    pub ca_certificate: Option<String>,
}

/// TLS section of a route; `None` for plain HTTP.
#[must_use]
pub fn route_tls(route_type: RouteType, material: Option<&TlsMaterial>) -> Option<TlsConfig> {
    let termination = match route_type {
        RouteType::Http => return None,
        RouteType::Passthrough => {
            // Certificates must not be set on passthrough routes.
            return Some(TlsConfig {
                termination: TERMINATION_PASSTHROUGH.to_string(),
                insecure_edge_termination_policy: Some(INSECURE_POLICY_REDIRECT.to_string()),
                ..Default::default()
            });
        }
        RouteType::Edge => TERMINATION_EDGE,
        RouteType::Reencrypt => TERMINATION_REENCRYPT,
    };
    let material = material.cloned().unwrap_or_default();
    Some(TlsConfig {
        termination: termination.to_string(),
        insecure_edge_termination_policy: Some(INSECURE_POLICY_REDIRECT.to_string()),
        certificate: material.certificate,
        key: material.key,
        ca_certificate: material.ca_certificate,
        destination_ca_certificate: None,
    })
}

/// Route named `<owner><suffix>` pointing at the service of the same name.
///
/// Without an explicit host the route asks for the `<owner><suffix>` subdomain.
#[must_use]
pub fn route(
    hr: &Horreum,
    spec: &RouteSpec,
    route_type: RouteType,
    suffix: &str,
    role: &str,
    material: Option<&TlsMaterial>,
) -> Route {
    let owner = hr.name_any();
    let name = format!("{owner}{suffix}");
    let host = spec.host.clone().filter(|h| !h.is_empty());
    let subdomain = if host.is_none() {
        Some(name.clone())
    } else {
        None
    };
    let mut route = Route::new(
        &name,
        OpenShiftRouteSpec {
            host,
            subdomain,
            to: RouteTargetReference {
                kind: "Service".to_string(),
                name: name.clone(),
                weight: None,
            },
            tls: route_tls(route_type, material),
        },
    );
    route.metadata = ObjectMeta {
        name: Some(name),
        namespace: hr.namespace(),
        labels: Some(component_labels(&owner, role)),
        ..Default::default()
    };
    route
}

/// Requested service type, else `ClusterIP` behind routes, else `NodePort`.
#[must_use]
pub fn service_type(requested: Option<&str>, platform: Platform) -> String {
    match requested {
        Some(t) if !t.is_empty() => t.to_string(),
        _ if platform.routes_available => SERVICE_TYPE_CLUSTER_IP.to_string(),
        _ => SERVICE_TYPE_NODE_PORT.to_string(),
    }
}

/// The component is exposed through a node port.
#[must_use]
pub fn is_node_port(requested: Option<&str>, platform: Platform) -> bool {
    service_type(requested, platform) == SERVICE_TYPE_NODE_PORT
}

/// Service port matching the route type: 80 to `http_port` for plain-text
/// pods, 443 to `https_port` otherwise.
#[must_use]
pub fn service_port(route_type: RouteType, http_port: i32, https_port: i32) -> ServicePort {
    if route_type.is_plain_inside() {
        http_service_port(http_port)
    } else {
        ServicePort {
            name: Some("https".to_string()),
            port: SERVICE_HTTPS_PORT,
            target_port: Some(IntOrString::Int(https_port)),
            ..Default::default()
        }
    }
}

/// Port 80 forwarded to `target`.
#[must_use]
pub fn http_service_port(target: i32) -> ServicePort {
    ServicePort {
        name: Some("http".to_string()),
        port: SERVICE_HTTP_PORT,
        target_port: Some(IntOrString::Int(target)),
        ..Default::default()
    }
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod routes_tests;
