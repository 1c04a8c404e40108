// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definition for a Horreum deployment.
//!
//! A single [`Horreum`] resource declares the whole application stack: the
//! Horreum application server, the Keycloak identity provider, a PostgreSQL
//! database and the optional Grafana and report components. The operator owns
//! every object it creates for it.
//!
//! # Example
//!
//! ```rust,no_run
//! use horreum_operator::crd::{HorreumSpec, RouteSpec};
//!
//! let spec = HorreumSpec {
//!     route: RouteSpec {
//!         host: Some("horreum.apps.example.com".to_string()),
//!         r#type: Some("reencrypt".to_string()),
//!         tls: None,
//!     },
//!     ..Default::default()
//! };
//! ```

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Access coordinates of a PostgreSQL database.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSpec {
    /// Hostname of the database. Defaults to the database deployed by the operator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Database port; defaults to 5432.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i32>,

    /// Name of the database.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Name of a secret with keys `username` and `password`. Created if it does not exist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

/// External access through an OpenShift route.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    /// Host for the route, e.g. `horreum.apps.mycloud.example.com`.
    /// When empty the platform assigns a host from the route's subdomain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Either `http` (plain-text, not recommended), `edge`, `reencrypt` or `passthrough`.
    /// Defaults to `reencrypt`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,

    /// Name of a secret holding `tls.crt`, `tls.key` and optionally `ca.crt`.
    /// Optional for edge and reencrypt routes, required for passthrough.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<String>,
}

/// Endpoints of a component that is not deployed by the operator.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExternalSpec {
    /// Public facing URI; handed out to clients.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_uri: Option<String>,

    /// Internal URI; used for server-to-server traffic but never disclosed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_uri: Option<String>,
}

/// Keycloak identity provider setup.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KeycloakSpec {
    /// When the public URI is set no Keycloak is deployed and Horreum uses this instance.
    #[serde(default)]
    pub external: ExternalSpec,

    /// Keycloak image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Route for external access to the Keycloak instance.
    #[serde(default)]
    pub route: RouteSpec,

    /// Service type used when routes are not available (e.g. on vanilla Kubernetes).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,

    /// Secret with admin credentials for the deployed Keycloak. Created if it does not exist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_secret: Option<String>,

    /// Database coordinates Keycloak should use.
    #[serde(default)]
    pub database: DatabaseSpec,
}

/// PostgreSQL database deployed by the operator.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostgresSpec {
    /// True (or omitted) to deploy the database.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// PostgreSQL image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Secret with superuser credentials. Created if it does not exist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_secret: Option<String>,

    /// PVC holding the data. Ephemeral storage is used when empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistent_volume_claim: Option<String>,

    /// UID the database container runs as.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<i64>,
}

/// Grafana dashboard setup.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GrafanaSpec {
    /// True to deploy Grafana. Defaults to false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Grafana image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Route for external access.
    #[serde(default)]
    pub route: RouteSpec,

    /// Service type used when routes are not available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,

    /// Secret with Grafana admin credentials. Created if it does not exist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_secret: Option<String>,

    /// Default UI theme; `light` unless set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
}

/// Hyperfoil report server setup.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportSpec {
    /// True (or omitted) to deploy the report server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Report server image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Route for external access.
    #[serde(default)]
    pub route: RouteSpec,

    /// Service type used when routes are not available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,

    /// PVC where reports are stored. Ephemeral storage is used when empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistent_volume_claim: Option<String>,
}

/// Desired state of a Horreum deployment.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[kube(
    group = "hyperfoil.io",
    version = "v1alpha1",
    kind = "Horreum",
    namespaced,
    shortname = "hrm",
    category = "hyperfoil",
    doc = "Horreum declares one deployment of the Horreum performance results repository together with its Keycloak, PostgreSQL and optional Grafana and report components.",
    printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.status","description":"Overall status"}"#,
    printcolumn = r#"{"name":"Reason","type":"string","jsonPath":".status.reason","description":"Reason for status"}"#,
    printcolumn = r#"{"name":"URL","type":"string","jsonPath":".status.publicUrl","description":"Horreum URL"}"#,
    printcolumn = r#"{"name":"Keycloak URL","type":"string","jsonPath":".status.keycloakUrl","description":"Keycloak URL"}"#
)]
#[kube(status = "HorreumStatus")]
#[serde(rename_all = "camelCase")]
pub struct HorreumSpec {
    /// Secret with `username` and `password` of the first Horreum user, who gets
    /// the `admin` role. Created if it does not exist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_secret: Option<String>,

    /// Route for external access.
    #[serde(default)]
    pub route: RouteSpec,

    /// Service type used when routes are not available (e.g. on vanilla Kubernetes).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,

    /// Horreum image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Database coordinates for Horreum data. Besides `username` and `password`
    /// the secret holds `dbsecret`, used to sign database access.
    #[serde(default)]
    pub database: DatabaseSpec,

    /// Keycloak specification.
    #[serde(default)]
    pub keycloak: KeycloakSpec,

    /// PostgreSQL specification.
    #[serde(default)]
    pub postgres: PostgresSpec,

    /// Grafana specification.
    #[serde(default)]
    pub grafana: GrafanaSpec,

    /// Report server specification.
    #[serde(default)]
    pub report: ReportSpec,

    /// Host used to build URLs of `NodePort` services.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_host: Option<String>,
}

/// Overall state of a Horreum deployment.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub enum HorreumPhase {
    /// Every managed resource matches its desired shape and is healthy.
    #[default]
    Ready,
    /// Something is still progressing; the operator keeps polling.
    Pending,
    /// A failure needs attention.
    Error,
}

impl HorreumPhase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "Ready",
            Self::Pending => "Pending",
            Self::Error => "Error",
        }
    }
}

impl fmt::Display for HorreumPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observed state of a Horreum deployment.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HorreumStatus {
    /// Ready, Pending or Error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<HorreumPhase>,

    /// Last time the state changed (RFC3339).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update: Option<String>,

    /// Explanation for the current status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Public URL of the Horreum application.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,

    /// Public URL of Keycloak.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keycloak_url: Option<String>,

    /// Public URL of Grafana, when deployed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grafana_url: Option<String>,

    /// Public URL of the report server, when deployed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_url: Option<String>,
}

impl PostgresSpec {
    /// The database is deployed unless explicitly disabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

impl GrafanaSpec {
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(false)
    }
}

impl ReportSpec {
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

impl KeycloakSpec {
    /// Keycloak is managed by the operator unless an external public URI is given.
    #[must_use]
    pub fn is_external(&self) -> bool {
        self.external
            .public_uri
            .as_deref()
            .is_some_and(|uri| !uri.is_empty())
    }
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
