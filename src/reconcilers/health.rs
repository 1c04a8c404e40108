// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Runtime health classification of observed resources.
//!
//! Assessment never remediates; it only reports whether the resource is
//! healthy, still progressing, or failed in a way that needs attention.

use crate::reconcilers::managed::{Desired, ManagedResource};
use crate::route::{Route, ROUTE_ADMITTED};
use k8s_openapi::api::core::v1::{ContainerStatus, Pod};
use std::collections::BTreeSet;

/// Waiting reasons that mean the image will not be pulled without intervention.
const IMAGE_PULL_FAILURES: [&str; 2] = ["ImagePullBackOff", "ErrImagePull"];

/// Outcome of a health assessment.
///
/// The detail text is appended to `"<Kind> <name>"` to form a status reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Health {
    Healthy,
    Pending(String),
    Error(String),
}

/// Classifies `observed`, using `desired` to know which keys must be present.
#[must_use]
pub fn assess(desired: &Desired, observed: &ManagedResource) -> Health {
    match observed {
        ManagedResource::Pod(pod) => assess_pod(pod),
        ManagedResource::Route(route) => assess_route(route),
        ManagedResource::Secret(secret) => {
            let present: BTreeSet<&str> = secret
                .data
                .iter()
                .flat_map(|d| d.keys())
                .chain(secret.string_data.iter().flat_map(|d| d.keys()))
                .map(String::as_str)
                .collect();
            missing_key(&required_keys(desired), &present)
        }
        ManagedResource::ConfigMap(config_map) => {
            let present: BTreeSet<&str> = config_map
                .data
                .iter()
                .flat_map(|d| d.keys())
                .map(String::as_str)
                .collect();
            missing_key(&required_keys(desired), &present)
        }
        ManagedResource::Service(_) => Health::Healthy,
    }
}

/// Keys the desired secret or config map declares.
fn required_keys(desired: &Desired) -> Vec<String> {
    let mut keys: Vec<String> = match &desired.resource {
        ManagedResource::Secret(secret) => secret
            .string_data
            .iter()
            .flat_map(|d| d.keys().cloned())
            .chain(secret.data.iter().flat_map(|d| d.keys().cloned()))
            .collect(),
        ManagedResource::ConfigMap(config_map) => config_map
            .data
            .iter()
            .flat_map(|d| d.keys().cloned())
            .collect(),
        _ => Vec::new(),
    };
    keys.extend(desired.generated_keys.iter().cloned());
    keys
}

fn missing_key(required: &[String], present: &BTreeSet<&str>) -> Health {
    required
        .iter()
        .find(|key| !present.contains(key.as_str()))
        .map_or(Health::Healthy, |key| {
            Health::Error(format!("missing data {key}"))
        })
}

fn image_pull_failed(statuses: Option<&Vec<ContainerStatus>>) -> bool {
    statuses.into_iter().flatten().any(|cs| {
        cs.state
            .as_ref()
            .and_then(|s| s.waiting.as_ref())
            .and_then(|w| w.reason.as_deref())
            .is_some_and(|reason| IMAGE_PULL_FAILURES.contains(&reason))
    })
}

/// Image pull failures are terminal, terminated containers may recover, and
/// only a true `Ready` condition counts as healthy.
fn assess_pod(pod: &Pod) -> Health {
    let Some(status) = pod.status.as_ref() else {
        return Health::Pending("is not ready".to_string());
    };
    if image_pull_failed(status.init_container_statuses.as_ref())
        || image_pull_failed(status.container_statuses.as_ref())
    {
        return Health::Error("cannot pull container image".to_string());
    }
    let terminated = status.container_statuses.iter().flatten().any(|cs| {
        cs.state
            .as_ref()
            .is_some_and(|s| s.waiting.is_none() && s.terminated.is_some())
    });
    if terminated {
        return Health::Pending("has terminated container".to_string());
    }
    let ready = status
        .conditions
        .iter()
        .flatten()
        .any(|c| c.type_ == "Ready" && c.status == "True");
    if ready {
        Health::Healthy
    } else {
        Health::Pending("is not ready".to_string())
    }
}

/// The first `Admitted` condition across router ingresses decides.
fn assess_route(route: &Route) -> Health {
    let admitted = route
        .status
        .iter()
        .flat_map(|s| s.ingress.iter())
        .flat_map(|ingress| ingress.conditions.iter())
        .find(|c| c.type_ == ROUTE_ADMITTED);
    match admitted {
        Some(c) if c.status == "True" => Health::Healthy,
        Some(_) => Health::Error("was not admitted".to_string()),
        None => Health::Pending("is in unknown state".to_string()),
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod health_tests;
