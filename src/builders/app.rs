// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The Horreum application server.
//!
//! The pod runs an init container that provisions the Keycloak realm client
//! and the first admin user, then the server itself. Both need the public URLs
//! of Keycloak and of the app, so the engine can only build this pod after it
//! discovered them.

use crate::builders::naming::{
    app_certs_secret_name, app_image, app_pod_name, app_service_name, app_user_secret_name,
    db_admin_secret_name, db_url, horreum_admin_secret_name, keycloak_admin_secret_name,
    keycloak_internal_url, owner_name, owner_namespace, upload_config_map_name,
};
use crate::builders::routes::{self, RouteType, TlsMaterial};
use crate::builders::{
    config_map_volume, empty_dir_volume, env, mount, mount_file, secret_env, secret_volume,
    Platform,
};
use crate::constants::{
    APP_HTTPS_PORT, APP_HTTP_PORT, DEFAULT_APP_DB_NAME, INJECT_CABUNDLE_ANNOTATION,
    JAVA_OPTIONS_ANNOTATION,
    SECRET_DB_SECRET_KEY, SECRET_PASSWORD_KEY, SECRET_USERNAME_KEY, SERVICE_CA_CONFIGMAP,
    SERVING_CERT_ANNOTATION, TLS_CERT_KEY, TLS_PRIVATE_KEY_KEY,
};
use crate::crd::Horreum;
use crate::errors::ReconcileError;
use crate::labels::{component_labels, selector_labels, ROLE_APP};
use crate::route::Route;
use k8s_openapi::api::core::v1::{
    ConfigMap, Container, Pod, PodSpec, Service, ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

const IMPORTS_DIR: &str = "/etc/horreum/imports";
const CERTS_DIR: &str = "/opt/certs";
const SERVICE_CA_PATH: &str = "/etc/ssl/certs/service-ca.crt";

const SERVER_SCRIPT: &str = r#"
keytool -noprompt -import -alias service-ca -file /etc/ssl/certs/service-ca.crt -cacerts -storepass changeit
export QUARKUS_OIDC_CREDENTIALS_SECRET=$(cat /etc/horreum/imports/clientsecret)
/deployments/horreum.sh
"#;

/// Route type of the app route, `reencrypt` when unset.
///
/// # Errors
///
/// Returns a configuration error for unknown route types.
pub fn route_type(hr: &Horreum) -> Result<RouteType, ReconcileError> {
    RouteType::parse(&hr.spec.route)
}

/// In-cluster URL of the app service.
#[must_use]
pub fn internal_url(hr: &Horreum, route_type: RouteType) -> String {
    format!(
        "{}{}.{}.svc",
        route_type.inner_protocol(),
        app_service_name(hr),
        owner_namespace(hr)
    )
}

/// TLS secret mounted into the app pod.
#[must_use]
pub fn certs_secret_name(hr: &Horreum, route_type: RouteType) -> String {
    match (route_type, hr.spec.route.tls.as_deref()) {
        (RouteType::Passthrough, Some(tls)) if !tls.is_empty() => tls.to_string(),
        _ => app_certs_secret_name(hr),
    }
}

#[must_use]
pub fn pod(
    hr: &Horreum,
    route_type: RouteType,
    keycloak_public_url: &str,
    app_public_url: &str,
) -> Pod {
    let owner = owner_name(hr);
    let keycloak_internal = keycloak_internal_url(hr);
    let app_secret = app_user_secret_name(hr);
    let db_admin = db_admin_secret_name(hr);
    let keycloak_admin = keycloak_admin_secret_name(hr);
    let horreum_admin = horreum_admin_secret_name(hr);
    let jdbc_url = db_url(hr, &hr.spec.database, DEFAULT_APP_DB_NAME);

    let mut server_env = vec![
        env("QUARKUS_DATASOURCE_JDBC_URL", jdbc_url.clone()),
        secret_env("QUARKUS_DATASOURCE_USERNAME", &app_secret, SECRET_USERNAME_KEY),
        secret_env("QUARKUS_DATASOURCE_PASSWORD", &app_secret, SECRET_PASSWORD_KEY),
        env("QUARKUS_DATASOURCE_MIGRATION_JDBC_URL", jdbc_url),
        secret_env(
            "QUARKUS_DATASOURCE_MIGRATION_USERNAME",
            &db_admin,
            SECRET_USERNAME_KEY,
        ),
        secret_env(
            "QUARKUS_DATASOURCE_MIGRATION_PASSWORD",
            &db_admin,
            SECRET_PASSWORD_KEY,
        ),
        secret_env("HORREUM_DB_SECRET", &app_secret, SECRET_DB_SECRET_KEY),
        env(
            "QUARKUS_OIDC_AUTH_SERVER_URL",
            format!("{keycloak_internal}/realms/horreum"),
        ),
        env(
            "QUARKUS_OIDC_TOKEN_ISSUER",
            format!("{keycloak_public_url}/realms/horreum"),
        ),
        // Quarkus cannot be given a custom CA for OIDC.
        env("QUARKUS_OIDC_TLS_VERIFICATION", "none"),
        env("HORREUM_URL", app_public_url),
        env("HORREUM_INTERNAL_URL", internal_url(hr, route_type)),
        env("HORREUM_KEYCLOAK_URL", format!("{keycloak_public_url}/")),
    ];
    if let Some(java_options) = hr
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(JAVA_OPTIONS_ANNOTATION))
    {
        server_env.push(env("JAVA_OPTIONS", java_options.clone()));
    }

    let mut volumes = vec![
        empty_dir_volume("imports"),
        config_map_volume("service-ca", SERVICE_CA_CONFIGMAP),
    ];
    let mut server_mounts = vec![mount("imports", IMPORTS_DIR)];
    if !route_type.is_plain_inside() {
        volumes.push(secret_volume("certs", &certs_secret_name(hr, route_type)));
        server_mounts.push(mount("certs", CERTS_DIR));
        server_mounts.push(mount_file("service-ca", SERVICE_CA_PATH, SERVICE_CA_CONFIGMAP));
        server_env.push(env(
            "QUARKUS_HTTP_SSL_CERTIFICATE_FILE",
            format!("{CERTS_DIR}/{TLS_CERT_KEY}"),
        ));
        server_env.push(env(
            "QUARKUS_HTTP_SSL_CERTIFICATE_KEY_FILE",
            format!("{CERTS_DIR}/{TLS_PRIVATE_KEY_KEY}"),
        ));
    }
    let ca_cert_arg = if route_type == RouteType::Reencrypt {
        format!("--cacert {SERVICE_CA_PATH}")
    } else {
        String::new()
    };

    let init = Container {
        name: "init".to_string(),
        image: Some(app_image(hr)),
        image_pull_policy: Some("Always".to_string()),
        command: Some(vec![
            "sh".to_string(),
            "-x".to_string(),
            "-c".to_string(),
            "/deployments/k8s-setup.sh".to_string(),
        ]),
        env: Some(vec![
            secret_env("KEYCLOAK_USER", &keycloak_admin, SECRET_USERNAME_KEY),
            secret_env("KEYCLOAK_PASSWORD", &keycloak_admin, SECRET_PASSWORD_KEY),
            secret_env("ADMIN_USERNAME", &horreum_admin, SECRET_USERNAME_KEY),
            secret_env("ADMIN_PASSWORD", &horreum_admin, SECRET_PASSWORD_KEY),
            env("KC_URL", keycloak_internal),
            env("CA_CERT_ARG", ca_cert_arg),
            env("APP_URL", app_public_url),
        ]),
        volume_mounts: Some(vec![
            mount("imports", IMPORTS_DIR),
            mount_file("service-ca", SERVICE_CA_PATH, SERVICE_CA_CONFIGMAP),
        ]),
        ..Default::default()
    };
    let server = Container {
        name: "horreum".to_string(),
        image: Some(app_image(hr)),
        command: Some(vec![
            "sh".to_string(),
            "-c".to_string(),
            SERVER_SCRIPT.to_string(),
        ]),
        env: Some(server_env),
        volume_mounts: Some(server_mounts),
        ..Default::default()
    };

    Pod {
        metadata: ObjectMeta {
            name: Some(app_pod_name(hr)),
            namespace: Some(owner_namespace(hr)),
            labels: Some(component_labels(&owner, ROLE_APP)),
            ..Default::default()
        },
        spec: Some(PodSpec {
            termination_grace_period_seconds: Some(0),
            init_containers: Some(vec![init]),
            containers: vec![server],
            volumes: Some(volumes),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[must_use]
pub fn service(hr: &Horreum, route_type: RouteType, platform: Platform) -> Service {
    let owner = owner_name(hr);
    let mut annotations = BTreeMap::new();
    annotations.insert(
        SERVING_CERT_ANNOTATION.to_string(),
        app_certs_secret_name(hr),
    );
    Service {
        metadata: ObjectMeta {
            name: Some(app_service_name(hr)),
            namespace: Some(owner_namespace(hr)),
            labels: Some(component_labels(&owner, ROLE_APP)),
            annotations: Some(annotations),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            type_: Some(routes::service_type(
                hr.spec.service_type.as_deref(),
                platform,
            )),
            ports: Some(vec![routes::service_port(
                route_type,
                APP_HTTP_PORT,
                APP_HTTPS_PORT,
            )]),
            selector: Some(selector_labels(&owner, ROLE_APP)),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Route exposing the app service under the bare owner name.
#[must_use]
pub fn route(hr: &Horreum, route_type: RouteType, material: Option<&TlsMaterial>) -> Route {
    routes::route(hr, &hr.spec.route, route_type, "", ROLE_APP, material)
}

/// Hyperfoil hook script uploading run results to this Horreum.
#[must_use]
pub fn upload_config_map(hr: &Horreum, route_type: RouteType) -> ConfigMap {
    let keycloak_url = keycloak_internal_url(hr);
    let horreum_url = internal_url(hr, route_type);
    let script = format!(
        r#"#!/bin/bash

TOKEN=$(curl -s -X POST {keycloak_url}/realms/horreum/protocol/openid-connect/token \
  -H 'content-type: application/x-www-form-urlencoded' \
  -d 'username='$HORREUM_USER'&password='$HORREUM_PASSWORD'&grant_type=password&client_id=horreum-ui' \
  | jq -r .access_token)

curl -s '{horreum_url}/api/run/data?owner='$HORREUM_GROUP'&access=PUBLIC&test=$.info.benchmark&start=$.info.startTime&stop=$.info.terminateTime' \
  -X POST -H 'content-type: application/json' -d @$RUN_DIR/all.json -H 'Authorization: Bearer '$TOKEN
"#
    );
    let mut data = BTreeMap::new();
    data.insert("50-upload-to-horreum".to_string(), script);
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(upload_config_map_name(hr)),
            namespace: Some(owner_namespace(hr)),
            labels: Some(component_labels(&owner_name(hr), ROLE_APP)),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    }
}

/// Config map holding the CA that signed the in-cluster serving certificates.
///
/// With `bundle` unset the platform is asked to inject it; otherwise the
/// bundle is written as given.
#[must_use]
pub fn service_ca_config_map(hr: &Horreum, bundle: Option<String>) -> ConfigMap {
    let (annotations, data) = match bundle {
        Some(bundle) => {
            let mut data = BTreeMap::new();
            data.insert(SERVICE_CA_CONFIGMAP.to_string(), bundle);
            (None, Some(data))
        }
        None => {
            let mut annotations = BTreeMap::new();
            annotations.insert(INJECT_CABUNDLE_ANNOTATION.to_string(), "true".to_string());
            (Some(annotations), None)
        }
    };
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(SERVICE_CA_CONFIGMAP.to_string()),
            namespace: Some(owner_namespace(hr)),
            labels: Some(component_labels(&owner_name(hr), ROLE_APP)),
            annotations,
            ..Default::default()
        },
        data,
        ..Default::default()
    }
}

#[cfg(test)]
#[path = "app_tests.rs"]
mod app_tests;
