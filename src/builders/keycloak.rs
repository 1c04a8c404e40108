// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Keycloak identity provider managed next to Horreum.

use crate::builders::naming::{
    db_host, db_port, keycloak_admin_secret_name, keycloak_certs_secret_name, keycloak_db_secret_name,
    keycloak_image, keycloak_name, owner_name, owner_namespace, with_default,
};
use crate::builders::routes::{self, RouteType, TlsMaterial};
use crate::builders::{env, mount, secret_env, secret_volume, Platform};
use crate::constants::{
    DEFAULT_KEYCLOAK_DB_NAME, KEYCLOAK_HTTPS_PORT, SECRET_PASSWORD_KEY, SECRET_USERNAME_KEY,
    SERVICE_HTTPS_PORT, SERVING_CERT_ANNOTATION, SUFFIX_KEYCLOAK,
};
use crate::crd::Horreum;
use crate::errors::ReconcileError;
use crate::labels::{component_labels, selector_labels, ROLE_KEYCLOAK};
use crate::route::Route;
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, Pod, PodSpec, Service, ServicePort, ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;
use url::Url;

const CERTS_DIR: &str = "/etc/x509/https";

/// Route type of the Keycloak route; only TLS-encrypted types are accepted.
///
/// # Errors
///
/// Returns a configuration error for unknown, `http` or `edge` route types.
pub fn route_type(hr: &Horreum) -> Result<RouteType, ReconcileError> {
    match RouteType::parse(&hr.spec.keycloak.route)? {
        RouteType::Http | RouteType::Edge => Err(ReconcileError::Configuration(
            "Keycloak supports only TLS-encrypted routes".to_string(),
        )),
        other => Ok(other),
    }
}

/// TLS secret mounted into the Keycloak pod.
#[must_use]
pub fn certs_secret_name(hr: &Horreum, route_type: RouteType) -> String {
    match (route_type, hr.spec.keycloak.route.tls.as_deref()) {
        (RouteType::Passthrough, Some(tls)) if !tls.is_empty() => tls.to_string(),
        _ => keycloak_certs_secret_name(hr),
    }
}

/// Keycloak pod advertising the host of `public_url`.
///
/// # Errors
///
/// Returns a configuration error when `public_url` is not an absolute URL or
/// the route type is not accepted.
pub fn pod(hr: &Horreum, public_url: &str) -> Result<Pod, ReconcileError> {
    let route_type = route_type(hr)?;
    let public = Url::parse(public_url).map_err(|e| {
        ReconcileError::Configuration(format!("Invalid Keycloak URL {public_url}: {e}"))
    })?;
    let hostname = match (public.host_str(), public.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => {
            return Err(ReconcileError::Configuration(format!(
                "Keycloak URL {public_url} has no host"
            )))
        }
    };

    let owner = owner_name(hr);
    let admin_secret = keycloak_admin_secret_name(hr);
    let db_secret = keycloak_db_secret_name(hr);
    let db = &hr.spec.keycloak.database;

    let env_vars = vec![
        secret_env("KEYCLOAK_ADMIN", &admin_secret, SECRET_USERNAME_KEY),
        secret_env("KEYCLOAK_ADMIN_PASSWORD", &admin_secret, SECRET_PASSWORD_KEY),
        env("DB_ADDR", db_host(hr, db)),
        env("DB_PORT", db_port(db).to_string()),
        env(
            "DB_DATABASE",
            with_default(db.name.as_deref(), DEFAULT_KEYCLOAK_DB_NAME),
        ),
        env("KC_HTTP_ENABLED", "false"),
        env("KC_HTTPS_PORT", KEYCLOAK_HTTPS_PORT.to_string()),
        env("KC_HTTPS_CERTIFICATE_FILE", format!("{CERTS_DIR}/tls.crt")),
        env("KC_HTTPS_CERTIFICATE_KEY_FILE", format!("{CERTS_DIR}/tls.key")),
        env("KC_HOSTNAME", hostname),
        env("KC_PROXY", "passthrough"),
        secret_env("KC_DB_USERNAME", &db_secret, SECRET_USERNAME_KEY),
        secret_env("KC_DB_PASSWORD", &db_secret, SECRET_PASSWORD_KEY),
        env("KEYCLOAK_COMMAND", "start"),
    ];

    Ok(Pod {
        metadata: ObjectMeta {
            name: Some(keycloak_name(hr)),
            namespace: Some(owner_namespace(hr)),
            labels: Some(component_labels(&owner, ROLE_KEYCLOAK)),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![Container {
                name: "keycloak".to_string(),
                image: Some(keycloak_image(hr)),
                env: Some(env_vars),
                ports: Some(vec![ContainerPort {
                    name: Some("https".to_string()),
                    container_port: KEYCLOAK_HTTPS_PORT,
                    ..Default::default()
                }]),
                volume_mounts: Some(vec![mount("certs", CERTS_DIR)]),
                ..Default::default()
            }],
            volumes: Some(vec![secret_volume(
                "certs",
                &certs_secret_name(hr, route_type),
            )]),
            ..Default::default()
        }),
        ..Default::default()
    })
}

#[must_use]
pub fn service(hr: &Horreum, platform: Platform) -> Service {
    let owner = owner_name(hr);
    let name = keycloak_name(hr);
    let mut annotations = BTreeMap::new();
    annotations.insert(
        SERVING_CERT_ANNOTATION.to_string(),
        keycloak_certs_secret_name(hr),
    );
    Service {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: Some(owner_namespace(hr)),
            labels: Some(component_labels(&owner, ROLE_KEYCLOAK)),
            annotations: Some(annotations),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            type_: Some(routes::service_type(
                hr.spec.keycloak.service_type.as_deref(),
                platform,
            )),
            ports: Some(vec![ServicePort {
                name: Some("https".to_string()),
                port: SERVICE_HTTPS_PORT,
                target_port: Some(IntOrString::Int(KEYCLOAK_HTTPS_PORT)),
                ..Default::default()
            }]),
            selector: Some(selector_labels(&owner, ROLE_KEYCLOAK)),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Route exposing the Keycloak service.
///
/// # Errors
///
/// Returns a configuration error when the route type is not TLS-encrypted.
pub fn route(hr: &Horreum, material: Option<&TlsMaterial>) -> Result<Route, ReconcileError> {
    let route_type = route_type(hr)?;
    Ok(routes::route(
        hr,
        &hr.spec.keycloak.route,
        route_type,
        SUFFIX_KEYCLOAK,
        ROLE_KEYCLOAK,
        material,
    ))
}

#[cfg(test)]
#[path = "keycloak_tests.rs"]
mod keycloak_tests;
