// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Resource builders for a Horreum deployment.
//!
//! Builders are pure functions from a [`Horreum`](crate::crd::Horreum) (plus
//! facts the engine discovered earlier in the pass, such as public URLs and TLS
//! material) to the Kubernetes objects that should exist. They never talk to
//! the cluster, and calling them twice with the same input yields identical
//! objects, which is what makes drift detection meaningful.
//!
//! ## Module Structure
//!
//! - [`naming`] - Resource names, default images and derived URLs
//! - [`routes`] - Route types, TLS termination and service exposure
//! - [`secrets`] - Credential secrets
//! - [`postgres`] - Database config map, pod and service
//! - [`keycloak`] - Keycloak pod and service
//! - [`app`] - Horreum pod, service and upload script
//! - [`grafana`] - Grafana pod and service
//! - [`report`] - Report server pod and service

pub mod app;
pub mod grafana;
pub mod keycloak;
pub mod naming;
pub mod postgres;
pub mod report;
pub mod routes;
pub mod secrets;

use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, EmptyDirVolumeSource, EnvVar, EnvVarSource,
    PersistentVolumeClaimVolumeSource, SecretKeySelector, SecretVolumeSource, Volume, VolumeMount,
};

/// Cluster capabilities that shape the desired resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Platform {
    /// The cluster serves `route.openshift.io`.
    pub routes_available: bool,
    /// Prefer Red Hat certified images where a choice exists.
    pub use_redhat_images: bool,
}

/// Plain environment variable.
pub(crate) fn env(name: &str, value: impl Into<String>) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.into()),
        value_from: None,
    }
}

/// Environment variable read from a key of a mandatory secret.
pub(crate) fn secret_env(name: &str, secret: &str, key: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: None,
        value_from: Some(EnvVarSource {
            secret_key_ref: Some(SecretKeySelector {
                name: secret.to_string(),
                key: key.to_string(),
                optional: Some(false),
            }),
            ..Default::default()
        }),
    }
}

pub(crate) fn mount(name: &str, path: &str) -> VolumeMount {
    VolumeMount {
        name: name.to_string(),
        mount_path: path.to_string(),
        ..Default::default()
    }
}

/// Mounts a single key of a volume as a file.
pub(crate) fn mount_file(name: &str, path: &str, key: &str) -> VolumeMount {
    VolumeMount {
        name: name.to_string(),
        mount_path: path.to_string(),
        sub_path: Some(key.to_string()),
        ..Default::default()
    }
}

pub(crate) fn empty_dir_volume(name: &str) -> Volume {
    Volume {
        name: name.to_string(),
        empty_dir: Some(EmptyDirVolumeSource::default()),
        ..Default::default()
    }
}

pub(crate) fn secret_volume(name: &str, secret: &str) -> Volume {
    Volume {
        name: name.to_string(),
        secret: Some(SecretVolumeSource {
            secret_name: Some(secret.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub(crate) fn config_map_volume(name: &str, config_map: &str) -> Volume {
    Volume {
        name: name.to_string(),
        config_map: Some(ConfigMapVolumeSource {
            name: config_map.to_string(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Volume backed by `claim`, or ephemeral storage when no claim is given.
pub(crate) fn claim_or_empty_dir_volume(name: &str, claim: Option<&str>) -> Volume {
    match claim.filter(|c| !c.is_empty()) {
        Some(claim) => Volume {
            name: name.to_string(),
            persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                claim_name: claim.to_string(),
                read_only: None,
            }),
            ..Default::default()
        },
        None => empty_dir_volume(name),
    }
}
