// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Typed descriptors of the objects the operator manages.
//!
//! Every managed object is one [`ManagedResource`] variant. Comparison and
//! health assessment dispatch on the variant, so no kind-specific logic needs
//! to inspect objects dynamically.

use crate::constants::{API_GROUP_VERSION, KIND_HORREUM};
use crate::crd::Horreum;
use crate::route::Route;
use k8s_openapi::api::core::v1::{ConfigMap, Pod, Secret, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::ResourceExt;
use std::fmt;

/// Kind of a managed resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
    Pod,
    Service,
    Route,
    Secret,
    ConfigMap,
    /// The owning entity itself; only used when reporting status failures.
    Horreum,
}

impl ResourceKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pod => "Pod",
            Self::Service => "Service",
            Self::Route => "Route",
            Self::Secret => "Secret",
            Self::ConfigMap => "ConfigMap",
            Self::Horreum => KIND_HORREUM,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One object the operator creates and tracks.
#[derive(Debug, Clone, PartialEq)]
pub enum ManagedResource {
    Pod(Pod),
    Service(Service),
    Route(Route),
    Secret(Secret),
    ConfigMap(ConfigMap),
}

impl ManagedResource {
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Pod(_) => ResourceKind::Pod,
            Self::Service(_) => ResourceKind::Service,
            Self::Route(_) => ResourceKind::Route,
            Self::Secret(_) => ResourceKind::Secret,
            Self::ConfigMap(_) => ResourceKind::ConfigMap,
        }
    }

    #[must_use]
    pub fn meta(&self) -> &ObjectMeta {
        match self {
            Self::Pod(r) => &r.metadata,
            Self::Service(r) => &r.metadata,
            Self::Route(r) => &r.metadata,
            Self::Secret(r) => &r.metadata,
            Self::ConfigMap(r) => &r.metadata,
        }
    }

    pub fn meta_mut(&mut self) -> &mut ObjectMeta {
        match self {
            Self::Pod(r) => &mut r.metadata,
            Self::Service(r) => &mut r.metadata,
            Self::Route(r) => &mut r.metadata,
            Self::Secret(r) => &mut r.metadata,
            Self::ConfigMap(r) => &mut r.metadata,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.meta().name.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        self.meta().namespace.as_deref().unwrap_or_default()
    }

    /// `"<Kind> <name>"`, the prefix of every per-resource status reason.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.kind(), self.name())
    }

    /// Records `owner` as the controlling owner, so deleting the owner
    /// cascades to this resource.
    pub fn set_owner(&mut self, owner: &OwnerRelation) {
        self.meta_mut().owner_references = Some(vec![owner.owner_reference()]);
    }
}

/// How the engine decides whether an observed object still matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparePolicy {
    /// Kind-specific comparison of the fields the operator authors.
    ByKind,
    /// Created once, then never compared; the platform or the user owns its content.
    CreateOnly,
}

/// A resource the engine should converge, with the rules to apply to it.
#[derive(Debug, Clone)]
pub struct Desired {
    pub resource: ManagedResource,
    pub policy: ComparePolicy,
    /// Secret keys filled with a freshly generated value at creation time.
    pub generated_keys: Vec<String>,
}

impl Desired {
    /// Desired resource compared with its kind's rules.
    #[must_use]
    pub fn compared(resource: ManagedResource) -> Self {
        Self {
            resource,
            policy: ComparePolicy::ByKind,
            generated_keys: Vec::new(),
        }
    }

    /// Desired resource that is only created when absent.
    #[must_use]
    pub fn create_only(resource: ManagedResource) -> Self {
        Self {
            resource,
            policy: ComparePolicy::CreateOnly,
            generated_keys: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_generated_keys(mut self, keys: &[&str]) -> Self {
        self.generated_keys = keys.iter().map(|k| (*k).to_string()).collect();
        self
    }
}

/// Back-reference from the owning `Horreum` to the resources it controls.
///
/// The relation is stamped onto every created resource as an owner reference;
/// children never hold a pointer to the owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerRelation {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: String,
}

impl OwnerRelation {
    #[must_use]
    pub fn of(horreum: &Horreum) -> Self {
        Self {
            api_version: API_GROUP_VERSION.to_string(),
            kind: KIND_HORREUM.to_string(),
            name: horreum.name_any(),
            uid: horreum.uid().unwrap_or_default(),
        }
    }

    /// `resource` carries an owner reference to this `Horreum`.
    #[must_use]
    pub fn owns(&self, resource: &ManagedResource) -> bool {
        resource
            .meta()
            .owner_references
            .iter()
            .flatten()
            .any(|reference| reference.uid == self.uid)
    }

    #[must_use]
    pub fn owner_reference(&self) -> OwnerReference {
        OwnerReference {
            api_version: self.api_version.clone(),
            kind: self.kind.clone(),
            name: self.name.clone(),
            uid: self.uid.clone(),
            controller: Some(true),
            block_owner_deletion: Some(true),
        }
    }
}

#[cfg(test)]
#[path = "managed_tests.rs"]
mod managed_tests;
