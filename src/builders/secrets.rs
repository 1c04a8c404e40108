// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Credential secrets.
//!
//! The descriptor only carries the user name; passwords are listed as
//! generated keys and filled in by the engine when the secret is created.

use crate::builders::naming::{owner_name, owner_namespace};
use crate::constants::{
    SECRET_DB_SECRET_KEY, SECRET_PASSWORD_KEY, SECRET_TYPE_BASIC_AUTH, SECRET_USERNAME_KEY,
};
use crate::crd::Horreum;
use crate::labels::component_labels;
use crate::reconcilers::managed::{Desired, ManagedResource};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

/// Basic-auth secret `name` whose user name is the secret name itself.
#[must_use]
pub fn credential_secret(hr: &Horreum, name: &str, role: &str) -> Desired {
    let mut string_data = BTreeMap::new();
    string_data.insert(SECRET_USERNAME_KEY.to_string(), name.to_string());
    let secret = Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(owner_namespace(hr)),
            labels: Some(component_labels(&owner_name(hr), role)),
            ..Default::default()
        },
        type_: Some(SECRET_TYPE_BASIC_AUTH.to_string()),
        string_data: Some(string_data),
        ..Default::default()
    };
    Desired::compared(ManagedResource::Secret(secret)).with_generated_keys(&[SECRET_PASSWORD_KEY])
}

/// App database credentials, which also carry the `dbsecret` signing key.
#[must_use]
pub fn app_user_secret(hr: &Horreum, name: &str, role: &str) -> Desired {
    credential_secret(hr, name, role)
        .with_generated_keys(&[SECRET_PASSWORD_KEY, SECRET_DB_SECRET_KEY])
}

#[cfg(test)]
#[path = "secrets_tests.rs"]
mod secrets_tests;
