// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Resource names, default images and derived URLs.
//!
//! Every name is a pure function of the owning resource's name and a fixed
//! role suffix, optionally overridden by the user for secrets.

use crate::builders::Platform;
use crate::constants::{
    DEFAULT_APP_IMAGE, DEFAULT_DB_PORT, DEFAULT_GRAFANA_IMAGE, DEFAULT_KEYCLOAK_IMAGE,
    DEFAULT_POSTGRES_IMAGE, DEFAULT_REPORT_IMAGE, REDHAT_POSTGRES_IMAGE, SUFFIX_APP, SUFFIX_DB,
    SUFFIX_GRAFANA, SUFFIX_KEYCLOAK, SUFFIX_REPORT,
};
use crate::crd::{DatabaseSpec, Horreum};
use kube::ResourceExt;

/// `custom` unless it is missing or empty.
pub(crate) fn with_default(custom: Option<&str>, default: impl Into<String>) -> String {
    match custom {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => default.into(),
    }
}

#[must_use]
pub fn owner_name(hr: &Horreum) -> String {
    hr.name_any()
}

#[must_use]
pub fn owner_namespace(hr: &Horreum) -> String {
    hr.namespace().unwrap_or_default()
}

// ============================================================================
// Workloads
// ============================================================================

/// The app service and route carry the bare owner name.
#[must_use]
pub fn app_service_name(hr: &Horreum) -> String {
    owner_name(hr)
}

#[must_use]
pub fn app_pod_name(hr: &Horreum) -> String {
    format!("{}{SUFFIX_APP}", owner_name(hr))
}

#[must_use]
pub fn keycloak_name(hr: &Horreum) -> String {
    format!("{}{SUFFIX_KEYCLOAK}", owner_name(hr))
}

#[must_use]
pub fn db_name(hr: &Horreum) -> String {
    format!("{}{SUFFIX_DB}", owner_name(hr))
}

#[must_use]
pub fn grafana_name(hr: &Horreum) -> String {
    format!("{}{SUFFIX_GRAFANA}", owner_name(hr))
}

#[must_use]
pub fn report_name(hr: &Horreum) -> String {
    format!("{}{SUFFIX_REPORT}", owner_name(hr))
}

#[must_use]
pub fn postgres_start_config_map_name(hr: &Horreum) -> String {
    format!("{}-postgresql-start", owner_name(hr))
}

#[must_use]
pub fn upload_config_map_name(hr: &Horreum) -> String {
    format!("{}-hyperfoil-upload", owner_name(hr))
}

/// TLS secret mounted by the app when the route does not bring its own.
#[must_use]
pub fn app_certs_secret_name(hr: &Horreum) -> String {
    format!("{}-app-certs", owner_name(hr))
}

/// TLS secret mounted by Keycloak when the route does not bring its own.
#[must_use]
pub fn keycloak_certs_secret_name(hr: &Horreum) -> String {
    format!("{}-keycloak-certs", owner_name(hr))
}

// ============================================================================
// Credential secrets
// ============================================================================

#[must_use]
pub fn db_admin_secret_name(hr: &Horreum) -> String {
    with_default(
        hr.spec.postgres.admin_secret.as_deref(),
        format!("{}-db-admin", owner_name(hr)),
    )
}

#[must_use]
pub fn app_user_secret_name(hr: &Horreum) -> String {
    with_default(
        hr.spec.database.secret.as_deref(),
        format!("{}{SUFFIX_APP}", owner_name(hr)),
    )
}

#[must_use]
pub fn keycloak_db_secret_name(hr: &Horreum) -> String {
    with_default(
        hr.spec.keycloak.database.secret.as_deref(),
        format!("{}-keycloak-db", owner_name(hr)),
    )
}

#[must_use]
pub fn keycloak_admin_secret_name(hr: &Horreum) -> String {
    with_default(
        hr.spec.keycloak.admin_secret.as_deref(),
        format!("{}-keycloak-admin", owner_name(hr)),
    )
}

#[must_use]
pub fn horreum_admin_secret_name(hr: &Horreum) -> String {
    with_default(
        hr.spec.admin_secret.as_deref(),
        format!("{}-admin", owner_name(hr)),
    )
}

#[must_use]
pub fn grafana_admin_secret_name(hr: &Horreum) -> String {
    with_default(
        hr.spec.grafana.admin_secret.as_deref(),
        format!("{}-grafana-admin", owner_name(hr)),
    )
}

// ============================================================================
// Images
// ============================================================================

#[must_use]
pub fn app_image(hr: &Horreum) -> String {
    with_default(hr.spec.image.as_deref(), DEFAULT_APP_IMAGE)
}

#[must_use]
pub fn keycloak_image(hr: &Horreum) -> String {
    with_default(hr.spec.keycloak.image.as_deref(), DEFAULT_KEYCLOAK_IMAGE)
}

#[must_use]
pub fn db_image(hr: &Horreum, platform: Platform) -> String {
    let default = if platform.use_redhat_images {
        REDHAT_POSTGRES_IMAGE
    } else {
        DEFAULT_POSTGRES_IMAGE
    };
    with_default(hr.spec.postgres.image.as_deref(), default)
}

#[must_use]
pub fn grafana_image(hr: &Horreum) -> String {
    with_default(hr.spec.grafana.image.as_deref(), DEFAULT_GRAFANA_IMAGE)
}

#[must_use]
pub fn report_image(hr: &Horreum) -> String {
    with_default(hr.spec.report.image.as_deref(), DEFAULT_REPORT_IMAGE)
}

// ============================================================================
// Database and internal URLs
// ============================================================================

/// In-cluster host of the operator-managed database.
#[must_use]
pub fn db_default_host(hr: &Horreum) -> String {
    format!("{}.{}.svc", db_name(hr), owner_namespace(hr))
}

#[must_use]
pub fn db_host(hr: &Horreum, db: &DatabaseSpec) -> String {
    with_default(db.host.as_deref(), db_default_host(hr))
}

#[must_use]
pub fn db_port(db: &DatabaseSpec) -> i32 {
    db.port.filter(|p| *p != 0).unwrap_or(DEFAULT_DB_PORT)
}

/// JDBC URL of `db`, falling back to `default_name` for the database name.
#[must_use]
pub fn db_url(hr: &Horreum, db: &DatabaseSpec, default_name: &str) -> String {
    format!(
        "jdbc:postgresql://{}:{}/{}",
        db_host(hr, db),
        db_port(db),
        with_default(db.name.as_deref(), default_name)
    )
}

/// URL the app and the init scripts use to reach Keycloak.
///
/// An external Keycloak's internal URI wins, then its public URI, then the
/// in-cluster service of the managed Keycloak.
#[must_use]
pub fn keycloak_internal_url(hr: &Horreum) -> String {
    let external = &hr.spec.keycloak.external;
    let fallback = with_default(
        external.public_uri.as_deref(),
        format!("https://{}.{}.svc", keycloak_name(hr), owner_namespace(hr)),
    );
    with_default(external.internal_uri.as_deref(), fallback)
}

#[cfg(test)]
#[path = "naming_tests.rs"]
mod naming_tests;
