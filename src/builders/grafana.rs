// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Optional Grafana dashboards, signing in through the Horreum Keycloak realm.

use crate::builders::naming::{
    app_image, grafana_admin_secret_name, grafana_image, grafana_name, keycloak_admin_secret_name,
    keycloak_internal_url, owner_name, owner_namespace, with_default,
};
use crate::builders::routes::{self, RouteType, TlsMaterial};
use crate::builders::{empty_dir_volume, env, mount, secret_env, Platform};
use crate::constants::{GRAFANA_PORT, SECRET_PASSWORD_KEY, SECRET_USERNAME_KEY, SUFFIX_GRAFANA};
use crate::crd::Horreum;
use crate::errors::ReconcileError;
use crate::labels::{component_labels, selector_labels, ROLE_GRAFANA};
use crate::route::Route;
use k8s_openapi::api::core::v1::{Container, Pod, PodSpec, Service, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

const IMPORTS_DIR: &str = "/etc/grafana/imports";

const SET_SECRET_SCRIPT: &str = r#"
export TOKEN=$(curl -s $KC_URL/realms/master/protocol/openid-connect/token -X POST -H 'content-type: application/x-www-form-urlencoded' -d 'username='$KEYCLOAK_USER'&password='$KEYCLOAK_PASSWORD'&grant_type=password&client_id=admin-cli' | jq -r .access_token)
export CLIENTID=$(curl -s $KC_URL/admin/realms/horreum/clients -H 'Authorization: Bearer '$TOKEN | jq -r '.[] | select(.clientId=="grafana") | .id')
export CLIENTSECRET=$(curl -s $KC_URL/admin/realms/horreum/clients/$CLIENTID/client-secret -X POST -H 'Authorization: Bearer '$TOKEN | jq -r '.value')
[ -n "$CLIENTSECRET" ] || exit 1;
echo $CLIENTSECRET > /etc/grafana/imports/clientsecret
"#;

const RUN_SCRIPT: &str = r#"
export GF_AUTH_GENERIC_OAUTH_CLIENT_SECRET=$(cat /etc/grafana/imports/clientsecret)
/run.sh
"#;

/// Route type of the Grafana route, `edge` when unset.
///
/// Grafana serves plain HTTP, so only `http` and `edge` are accepted.
///
/// # Errors
///
/// Returns a configuration error for other route types.
pub fn route_type(hr: &Horreum) -> Result<RouteType, ReconcileError> {
    match RouteType::parse_or(&hr.spec.grafana.route, RouteType::Edge)? {
        RouteType::Reencrypt | RouteType::Passthrough => Err(ReconcileError::Configuration(
            "Grafana supports only http or edge routes".to_string(),
        )),
        other => Ok(other),
    }
}

#[must_use]
pub fn pod(hr: &Horreum, keycloak_public_url: &str, grafana_public_url: &str) -> Pod {
    let owner = owner_name(hr);
    let keycloak_internal = keycloak_internal_url(hr);
    let keycloak_admin = keycloak_admin_secret_name(hr);
    let admin_secret = grafana_admin_secret_name(hr);
    let oidc = "realms/horreum/protocol/openid-connect";

    let init = Container {
        name: "set-secret".to_string(),
        image: Some(app_image(hr)),
        image_pull_policy: Some("Always".to_string()),
        command: Some(vec![
            "sh".to_string(),
            "-x".to_string(),
            "-c".to_string(),
            SET_SECRET_SCRIPT.to_string(),
        ]),
        env: Some(vec![
            env("KC_URL", keycloak_internal.clone()),
            secret_env("KEYCLOAK_USER", &keycloak_admin, SECRET_USERNAME_KEY),
            secret_env("KEYCLOAK_PASSWORD", &keycloak_admin, SECRET_PASSWORD_KEY),
        ]),
        volume_mounts: Some(vec![mount("imports", IMPORTS_DIR)]),
        ..Default::default()
    };
    let grafana = Container {
        name: "grafana".to_string(),
        image: Some(grafana_image(hr)),
        command: Some(vec![
            "sh".to_string(),
            "-c".to_string(),
            RUN_SCRIPT.to_string(),
        ]),
        env: Some(vec![
            env("GF_INSTALL_PLUGINS", "simpod-json-datasource"),
            env("GF_SERVER_ROOT_URL", format!("{grafana_public_url}/")),
            env(
                "GF_USERS_DEFAULT_THEME",
                with_default(hr.spec.grafana.theme.as_deref(), "light"),
            ),
            env("GF_SECURITY_ALLOW_EMBEDDING", "true"),
            env("GF_AUTH_DISABLE_LOGIN_FORM", "true"),
            env("GF_AUTH_OAUTH_AUTO_LOGIN", "true"),
            env("GF_AUTH_GENERIC_OAUTH_ENABLED", "true"),
            env("GF_AUTH_GENERIC_OAUTH_CLIENT_ID", "grafana"),
            env("GF_AUTH_GENERIC_OAUTH_SCOPES", "openid profile email"),
            env("GF_AUTH_GENERIC_OAUTH_ALLOW_SIGN_UP", "false"),
            env(
                "GF_AUTH_GENERIC_OAUTH_AUTH_URL",
                format!("{keycloak_public_url}/{oidc}/auth"),
            ),
            env(
                "GF_AUTH_GENERIC_OAUTH_TOKEN_URL",
                format!("{keycloak_internal}/{oidc}/token"),
            ),
            env(
                "GF_AUTH_GENERIC_OAUTH_API_URL",
                format!("{keycloak_internal}/{oidc}/userinfo"),
            ),
            secret_env("GF_SECURITY_ADMIN_USER", &admin_secret, SECRET_USERNAME_KEY),
            secret_env(
                "GF_SECURITY_ADMIN_PASSWORD",
                &admin_secret,
                SECRET_PASSWORD_KEY,
            ),
        ]),
        volume_mounts: Some(vec![mount("imports", IMPORTS_DIR)]),
        ..Default::default()
    };

    Pod {
        metadata: ObjectMeta {
            name: Some(grafana_name(hr)),
            namespace: Some(owner_namespace(hr)),
            labels: Some(component_labels(&owner, ROLE_GRAFANA)),
            ..Default::default()
        },
        spec: Some(PodSpec {
            termination_grace_period_seconds: Some(0),
            init_containers: Some(vec![init]),
            containers: vec![grafana],
            volumes: Some(vec![empty_dir_volume("imports")]),
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
            name: Some(grafana_name(hr)),
            namespace: Some(owner_namespace(hr)),
            labels: Some(component_labels(&owner, ROLE_GRAFANA)),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            type_: Some(routes::service_type(
                hr.spec.grafana.service_type.as_deref(),
                platform,
            )),
            ports: Some(vec![routes::http_service_port(GRAFANA_PORT)]),
            selector: Some(selector_labels(&owner, ROLE_GRAFANA)),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[must_use]
pub fn route(hr: &Horreum, route_type: RouteType, material: Option<&TlsMaterial>) -> Route {
    routes::route(
        hr,
        &hr.spec.grafana.route,
        route_type,
        SUFFIX_GRAFANA,
        ROLE_GRAFANA,
        material,
    )
}

#[cfg(test)]
#[path = "grafana_tests.rs"]
mod grafana_tests;
