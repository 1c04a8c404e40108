// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for the `Horreum` controller.
//!
//! The controller hands every reconciliation an `Arc<Context>` holding:
//! - the Kubernetes client and the [`ClusterApi`] built on it
//! - the platform capabilities discovered at startup
//! - the password generator used for auto-created secrets

use crate::builders::Platform;
use crate::credentials::PasswordGenerator;
use crate::reconcilers::{ClusterApi, KubeClusterApi, PassContext};
use kube::Client;
use std::sync::Arc;

/// Shared context passed to the controller.
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client for API operations
    pub client: Client,

    /// Cluster operations used by reconciliation passes
    pub cluster: Arc<dyn ClusterApi>,

    /// Capabilities of the cluster the operator runs in
    pub platform: Platform,

    /// Source of generated credentials
    pub passwords: Arc<PasswordGenerator>,
}

impl Context {
    /// Context backed by the API server behind `client`.
    #[must_use]
    pub fn new(client: Client, platform: Platform) -> Self {
        Self {
            cluster: Arc::new(KubeClusterApi::new(client.clone())),
            client,
            platform,
            passwords: Arc::new(PasswordGenerator::from_entropy()),
        }
    }

    /// Borrowed view used by a single pass.
    #[must_use]
    pub fn pass(&self) -> PassContext<'_> {
        PassContext {
            cluster: self.cluster.as_ref(),
            passwords: self.passwords.as_ref(),
            platform: self.platform,
        }
    }
}
