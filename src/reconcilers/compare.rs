// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Drift detection between desired and observed resources.
//!
//! Only fields the operator authors are compared. Anything the API server or
//! the platform fills in (status, defaults, cluster IPs, node ports, injected
//! volumes) is ignored, so the engine never fights the cluster's own mutations.
//!
//! | Kind      | Materially equal when                                                   |
//! |-----------|-------------------------------------------------------------------------|
//! | Pod       | init and main containers match pairwise: name, image, command, env count |
//! | Service   | type and the ordered list of port numbers match                         |
//! | Route     | host (or subdomain when no host is set) and TLS configuration match     |
//! | ConfigMap | data matches exactly                                                    |
//! | Secret    | always; secrets are create-once                                         |

use crate::reconcilers::managed::ManagedResource;
use crate::route::Route;
use k8s_openapi::api::core::v1::{ConfigMap, Container, Pod, Service};
use std::collections::BTreeMap;
use tracing::info;

/// Returns `true` when `observed` needs no remediation to match `desired`.
///
/// Resources of different kinds are never equal.
#[must_use]
pub fn equal_enough(desired: &ManagedResource, observed: &ManagedResource) -> bool {
    let name = desired.name();
    match (desired, observed) {
        (ManagedResource::Pod(d), ManagedResource::Pod(o)) => compare_pods(name, d, o),
        (ManagedResource::Service(d), ManagedResource::Service(o)) => compare_services(name, d, o),
        (ManagedResource::Route(d), ManagedResource::Route(o)) => compare_routes(name, d, o),
        (ManagedResource::ConfigMap(d), ManagedResource::ConfigMap(o)) => {
            compare_config_maps(name, d, o)
        }
        (ManagedResource::Secret(_), ManagedResource::Secret(_)) => true,
        _ => false,
    }
}

/// Fingerprint of one container's operator-authored input.
#[derive(Debug, PartialEq, Eq)]
struct ContainerShape<'a> {
    name: &'a str,
    image: &'a str,
    command: &'a [String],
    env_count: usize,
}

fn container_shapes(containers: &[Container]) -> Vec<ContainerShape<'_>> {
    containers
        .iter()
        .map(|c| ContainerShape {
            name: &c.name,
            image: c.image.as_deref().unwrap_or_default(),
            command: c.command.as_deref().unwrap_or_default(),
            env_count: c.env.as_ref().map_or(0, Vec::len),
        })
        .collect()
}

fn compare_pods(name: &str, desired: &Pod, observed: &Pod) -> bool {
    let empty = Vec::new();
    let (d_spec, o_spec) = (desired.spec.as_ref(), observed.spec.as_ref());
    let d_init = d_spec.and_then(|s| s.init_containers.as_ref()).unwrap_or(&empty);
    let o_init = o_spec.and_then(|s| s.init_containers.as_ref()).unwrap_or(&empty);
    let d_main = d_spec.map_or(&empty, |s| &s.containers);
    let o_main = o_spec.map_or(&empty, |s| &s.containers);

    if container_shapes(d_init) != container_shapes(o_init) {
        info!(pod = %name, "Init containers of Pod {name} differ from desired");
        return false;
    }
    if container_shapes(d_main) != container_shapes(o_main) {
        info!(pod = %name, "Containers of Pod {name} differ from desired");
        return false;
    }
    true
}

fn service_type(service: &Service) -> &str {
    service
        .spec
        .as_ref()
        .and_then(|s| s.type_.as_deref())
        .unwrap_or("ClusterIP")
}

fn service_ports(service: &Service) -> Vec<i32> {
    service
        .spec
        .as_ref()
        .and_then(|s| s.ports.as_ref())
        .map(|ports| ports.iter().map(|p| p.port).collect())
        .unwrap_or_default()
}

fn compare_services(name: &str, desired: &Service, observed: &Service) -> bool {
    let (d_type, o_type) = (service_type(desired), service_type(observed));
    if d_type != o_type {
        info!(service = %name, "Type of Service {name} does not match: {d_type} | {o_type}");
        return false;
    }
    let (d_ports, o_ports) = (service_ports(desired), service_ports(observed));
    if d_ports != o_ports {
        info!(service = %name, "Ports of Service {name} do not match: {d_ports:?} | {o_ports:?}");
        return false;
    }
    true
}

fn compare_routes(name: &str, desired: &Route, observed: &Route) -> bool {
    let (d, o) = (&desired.spec, &observed.spec);
    let addressed_alike = match d.host.as_deref().filter(|h| !h.is_empty()) {
        Some(host) => o.host.as_deref() == Some(host),
        None => d.subdomain == o.subdomain,
    };
    if !addressed_alike {
        info!(route = %name, "Host of Route {name} does not match");
        return false;
    }
    if d.tls != o.tls {
        info!(route = %name, "TLS configuration of Route {name} does not match");
        return false;
    }
    true
}

fn compare_config_maps(name: &str, desired: &ConfigMap, observed: &ConfigMap) -> bool {
    let empty = BTreeMap::new();
    let d_data = desired.data.as_ref().unwrap_or(&empty);
    let o_data = observed.data.as_ref().unwrap_or(&empty);
    if d_data.len() != o_data.len() {
        info!(config_map = %name, "ConfigMap {name} has {} keys, expected {}", o_data.len(), d_data.len());
        return false;
    }
    for (key, value) in d_data {
        if o_data.get(key) != Some(value) {
            info!(config_map = %name, "Key {key} of ConfigMap {name} differs");
            return false;
        }
    }
    true
}

#[cfg(test)]
#[path = "compare_tests.rs"]
mod compare_tests;
