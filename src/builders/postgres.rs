// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! PostgreSQL database deployed next to Horreum.
//!
//! The start scripts create the Keycloak and application roles the first time
//! the database boots; they are idempotent so a recreated pod can rerun them
//! against a persistent volume.

use crate::builders::naming::{
    app_user_secret_name, db_admin_secret_name, db_image, db_name, keycloak_db_secret_name,
    owner_name, owner_namespace, postgres_start_config_map_name, with_default,
};
use crate::builders::{
    claim_or_empty_dir_volume, config_map_volume, env, mount, secret_env, Platform,
};
use crate::constants::{
    DEFAULT_APP_DB_NAME, DEFAULT_DB_PORT, DEFAULT_KEYCLOAK_DB_NAME, REDHAT_POSTGRES_UID,
    SECRET_DB_SECRET_KEY, SECRET_PASSWORD_KEY, SECRET_USERNAME_KEY,
    SERVICE_TYPE_CLUSTER_IP, SERVING_CERT_ANNOTATION, UPSTREAM_POSTGRES_UID,
};
use crate::crd::Horreum;
use crate::labels::{component_labels, selector_labels, ROLE_DB};
use k8s_openapi::api::core::v1::{
    ConfigMap, Container, ContainerPort, Pod, PodSpec, SecurityContext, Service, ServicePort,
    ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;

const DATA_DIR: &str = "/var/lib/pgsql/data";
const START_SCRIPTS_DIR: &str = "/opt/app-root/src/postgresql-start";

/// Upstream images published under these prefixes run as the `postgres` user (999).
const UPSTREAM_IMAGE_PREFIXES: [&str; 2] = ["docker.io/postgres", "docker.io/library/postgres"];

/// Scripts run by the image on first start.
#[must_use]
pub fn start_config_map(hr: &Horreum) -> ConfigMap {
    let keycloak_db = with_default(
        hr.spec.keycloak.database.name.as_deref(),
        DEFAULT_KEYCLOAK_DB_NAME,
    );
    let init_keycloak = format!(
        r#"
if psql -t -c "SELECT 1 FROM pg_roles WHERE rolname = '$KEYCLOAK_USER';" | grep -q 1; then
  echo "Database role $KEYCLOAK_USER already exists.";
else
  psql -c "CREATE ROLE \"$KEYCLOAK_USER\" noinherit login password '$KEYCLOAK_PASSWORD';";
fi
if psql -t -c "SELECT 1 FROM pg_database WHERE datname = '{keycloak_db}';" | grep -q 1; then
  echo "Database {keycloak_db} already exists.";
else
  psql -c "CREATE DATABASE {keycloak_db} WITH OWNER = '$KEYCLOAK_USER';";
fi
"#
    );
    let init_app = r#"
# pgcrypto requires superuser privileges
psql -c 'ALTER ROLE "'$POSTGRESQL_USER'" WITH SUPERUSER';
if psql -t -c "SELECT 1 FROM pg_roles WHERE rolname = '$APP_USER';" | grep -q 1; then
  echo "Database role $APP_USER already exists.";
else
  psql -c "CREATE ROLE \"$APP_USER\" noinherit login password '$APP_PASSWORD';"
fi
"#;

    let mut data = BTreeMap::new();
    data.insert("init_keycloak.sh".to_string(), init_keycloak);
    data.insert("init_app.sh".to_string(), init_app.to_string());
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(postgres_start_config_map_name(hr)),
            namespace: Some(owner_namespace(hr)),
            labels: Some(component_labels(&owner_name(hr), ROLE_DB)),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    }
}

/// UID the database container runs as; the same UID must own the volume.
#[must_use]
pub fn run_as_user(hr: &Horreum, image: &str) -> i64 {
    hr.spec.postgres.user.unwrap_or_else(|| {
        if UPSTREAM_IMAGE_PREFIXES
            .iter()
            .any(|prefix| image.starts_with(prefix))
        {
            UPSTREAM_POSTGRES_UID
        } else {
            REDHAT_POSTGRES_UID
        }
    })
}

#[must_use]
pub fn pod(hr: &Horreum, platform: Platform) -> Pod {
    let owner = owner_name(hr);
    let image = db_image(hr, platform);
    let admin_secret = db_admin_secret_name(hr);
    let keycloak_secret = keycloak_db_secret_name(hr);
    let app_secret = app_user_secret_name(hr);
    let database = with_default(hr.spec.database.name.as_deref(), DEFAULT_APP_DB_NAME);

    let env_vars = vec![
        // upstream image
        env("POSTGRES_DB", database.clone()),
        secret_env("POSTGRES_USER", &admin_secret, SECRET_USERNAME_KEY),
        secret_env("POSTGRES_PASSWORD", &admin_secret, SECRET_PASSWORD_KEY),
        env("PGDATA", DATA_DIR),
        // Red Hat image
        env("POSTGRESQL_DATABASE", database),
        secret_env("POSTGRESQL_USER", &admin_secret, SECRET_USERNAME_KEY),
        secret_env("POSTGRESQL_PASSWORD", &admin_secret, SECRET_PASSWORD_KEY),
        secret_env("KEYCLOAK_USER", &keycloak_secret, SECRET_USERNAME_KEY),
        secret_env("KEYCLOAK_PASSWORD", &keycloak_secret, SECRET_PASSWORD_KEY),
        secret_env("APP_USER", &app_secret, SECRET_USERNAME_KEY),
        secret_env("APP_PASSWORD", &app_secret, SECRET_PASSWORD_KEY),
        secret_env("APP_DB_SECRET", &app_secret, SECRET_DB_SECRET_KEY),
    ];

    Pod {
        metadata: ObjectMeta {
            name: Some(db_name(hr)),
            namespace: Some(owner_namespace(hr)),
            labels: Some(component_labels(&owner, ROLE_DB)),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![Container {
                name: "postgres".to_string(),
                image: Some(image.clone()),
                env: Some(env_vars),
                ports: Some(vec![ContainerPort {
                    name: Some("postgres".to_string()),
                    container_port: DEFAULT_DB_PORT,
                    ..Default::default()
                }]),
                security_context: Some(SecurityContext {
                    run_as_user: Some(run_as_user(hr, &image)),
                    ..Default::default()
                }),
                volume_mounts: Some(vec![
                    mount("db-volume", DATA_DIR),
                    mount("postgresql-start", START_SCRIPTS_DIR),
                ]),
                ..Default::default()
            }],
            volumes: Some(vec![
                claim_or_empty_dir_volume(
                    "db-volume",
                    hr.spec.postgres.persistent_volume_claim.as_deref(),
                ),
                config_map_volume("postgresql-start", &postgres_start_config_map_name(hr)),
            ]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[must_use]
pub fn service(hr: &Horreum) -> Service {
    let owner = owner_name(hr);
    let mut annotations = BTreeMap::new();
    annotations.insert(
        SERVING_CERT_ANNOTATION.to_string(),
        format!("{owner}-postgres"),
    );
    Service {
        metadata: ObjectMeta {
            name: Some(db_name(hr)),
            namespace: Some(owner_namespace(hr)),
            labels: Some(component_labels(&owner, ROLE_DB)),
            annotations: Some(annotations),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            type_: Some(SERVICE_TYPE_CLUSTER_IP.to_string()),
            ports: Some(vec![ServicePort {
                name: Some("postgres".to_string()),
                port: DEFAULT_DB_PORT,
                target_port: Some(IntOrString::Int(DEFAULT_DB_PORT)),
                ..Default::default()
            }]),
            selector: Some(selector_labels(&owner, ROLE_DB)),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
#[path = "postgres_tests.rs"]
mod postgres_tests;
