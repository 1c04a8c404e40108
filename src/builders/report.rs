// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Optional Hyperfoil report server.

use crate::builders::naming::{owner_name, owner_namespace, report_image, report_name};
use crate::builders::routes::{self, RouteType, TlsMaterial};
use crate::builders::{claim_or_empty_dir_volume, mount, Platform};
use crate::constants::{REPORT_PORT, SUFFIX_REPORT};
use crate::crd::Horreum;
use crate::errors::ReconcileError;
use crate::labels::{component_labels, selector_labels, ROLE_REPORT};
use crate::route::Route;
use k8s_openapi::api::core::v1::{Container, ContainerPort, Pod, PodSpec, Service, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

const REPORTS_DIR: &str = "/var/www/report";

/// Route type of the report route, `edge` when unset.
///
/// # Errors
///
/// Returns a configuration error for unknown, `reencrypt` or `passthrough`
/// route types; the report server only speaks plain HTTP.
pub fn route_type(hr: &Horreum) -> Result<RouteType, ReconcileError> {
    match RouteType::parse_or(&hr.spec.report.route, RouteType::Edge)? {
        RouteType::Reencrypt | RouteType::Passthrough => Err(ReconcileError::Configuration(
            "Report server supports only http or edge routes".to_string(),
        )),
        other => Ok(other),
    }
}

#[must_use]
pub fn pod(hr: &Horreum) -> Pod {
    let owner = owner_name(hr);
    Pod {
        metadata: ObjectMeta {
            name: Some(report_name(hr)),
            namespace: Some(owner_namespace(hr)),
            labels: Some(component_labels(&owner, ROLE_REPORT)),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![Container {
                name: "report".to_string(),
                image: Some(report_image(hr)),
                image_pull_policy: Some("Always".to_string()),
                ports: Some(vec![ContainerPort {
                    name: Some("http".to_string()),
                    container_port: REPORT_PORT,
                    ..Default::default()
                }]),
                volume_mounts: Some(vec![mount("reports", REPORTS_DIR)]),
                ..Default::default()
            }],
            volumes: Some(vec![claim_or_empty_dir_volume(
                "reports",
                hr.spec.report.persistent_volume_claim.as_deref(),
            )]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[must_use]
pub fn service(hr: &Horreum, platform: Platform) -> Service {
    let owner = owner_name(hr);
    Service {
        metadata: ObjectMeta {
            name: Some(report_name(hr)),
            namespace: Some(owner_namespace(hr)),
            labels: Some(component_labels(&owner, ROLE_REPORT)),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            type_: Some(routes::service_type(
                hr.spec.report.service_type.as_deref(),
                platform,
            )),
            ports: Some(vec![routes::http_service_port(REPORT_PORT)]),
            selector: Some(selector_labels(&owner, ROLE_REPORT)),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[must_use]
pub fn route(hr: &Horreum, route_type: RouteType, material: Option<&TlsMaterial>) -> Route {
    routes::route(
        hr,
        &hr.spec.report.route,
        route_type,
        SUFFIX_REPORT,
        ROLE_REPORT,
        material,
    )
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod report_tests;
