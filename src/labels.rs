// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label constants applied to every managed resource.
//!
//! The short `app` / `service` pair is what service selectors match on; the
//! `app.kubernetes.io/*` labels follow the Kubernetes recommended set.

use std::collections::BTreeMap;

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the component name within the architecture (e.g., "app", "keycloak")
pub const K8S_COMPONENT: &str = "app.kubernetes.io/component";

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Standard label for the name of the application
pub const K8S_NAME: &str = "app.kubernetes.io/name";

/// Standard label for a unique name identifying the instance of an application
pub const K8S_INSTANCE: &str = "app.kubernetes.io/instance";

/// Standard label for the name of a higher-level application this one is part of
pub const K8S_PART_OF: &str = "app.kubernetes.io/part-of";

// ============================================================================
// Label Values
// ============================================================================

/// Value for `app.kubernetes.io/part-of`
pub const PART_OF_HORREUM: &str = "horreum";

/// Value for `app.kubernetes.io/managed-by`
pub const MANAGED_BY_OPERATOR: &str = "horreum-operator";

// ============================================================================
// Selector Labels
// ============================================================================

/// Label carrying the owning `Horreum` name; used by service selectors
pub const APP_LABEL: &str = "app";

/// Label carrying the component role; used by service selectors
pub const SERVICE_LABEL: &str = "service";

/// Component role of the Horreum application
pub const ROLE_APP: &str = "app";

/// Component role of Keycloak
pub const ROLE_KEYCLOAK: &str = "keycloak";

/// Component role of the PostgreSQL database
pub const ROLE_DB: &str = "db";

/// Component role of Grafana
pub const ROLE_GRAFANA: &str = "grafana";

/// Component role of the report server
pub const ROLE_REPORT: &str = "report";

/// Labels a service uses to select the pod of one component.
#[must_use]
pub fn selector_labels(owner_name: &str, role: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(APP_LABEL.into(), owner_name.into());
    labels.insert(SERVICE_LABEL.into(), role.into());
    labels
}

/// Full label set for a managed resource of one component.
#[must_use]
pub fn component_labels(owner_name: &str, role: &str) -> BTreeMap<String, String> {
    let mut labels = selector_labels(owner_name, role);
    labels.insert(K8S_NAME.into(), PART_OF_HORREUM.into());
    labels.insert(K8S_INSTANCE.into(), owner_name.into());
    labels.insert(K8S_COMPONENT.into(), role.into());
    labels.insert(K8S_MANAGED_BY.into(), MANAGED_BY_OPERATOR.into());
    labels.insert(K8S_PART_OF.into(), PART_OF_HORREUM.into());
    labels
}
