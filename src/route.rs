// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! OpenShift `Route` (`route.openshift.io/v1`).
//!
//! Only the fields the operator writes or reads back are modelled. The CRD is
//! owned by the platform, so no schema is generated for it.

use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// Route specification.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[kube(
    group = "route.openshift.io",
    version = "v1",
    kind = "Route",
    namespaced,
    schema = "disabled",
    status = "OpenShiftRouteStatus",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct OpenShiftRouteSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Used to build the host from the router's domain when `host` is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdomain: Option<String>,

    pub to: RouteTargetReference,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsConfig>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteTargetReference {
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i32>,
}

/// TLS termination of a route.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TlsConfig {
    /// `edge`, `passthrough` or `reencrypt`.
    pub termination: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure_edge_termination_policy: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_certificate: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_ca_certificate: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OpenShiftRouteStatus {
    #[serde(default)]
    pub ingress: Vec<RouteIngress>,
}

/// Admission state of the route on one router.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteIngress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router_name: Option<String>,

    #[serde(default)]
    pub conditions: Vec<RouteIngressCondition>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteIngressCondition {
    /// Only `Admitted` is defined by the platform.
    #[serde(rename = "type")]
    pub type_: String,

    /// `True`, `False` or `Unknown`.
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Condition type reporting whether a router accepted the route.
pub const ROUTE_ADMITTED: &str = "Admitted";

/// TLS termination at the router.
pub const TERMINATION_EDGE: &str = "edge";

/// TLS passed through to the service.
pub const TERMINATION_PASSTHROUGH: &str = "passthrough";

/// TLS terminated at the router and re-encrypted towards the service.
pub const TERMINATION_REENCRYPT: &str = "reencrypt";

/// Plain HTTP requests are redirected to HTTPS.
pub const INSECURE_POLICY_REDIRECT: &str = "Redirect";
