// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes reconciliation of `Horreum` resources.
//!
//! # Reconciliation Architecture
//!
//! The operator follows the standard Kubernetes controller pattern:
//!
//! 1. **Watch** - The controller triggers a pass on `Horreum` changes and on
//!    changes to the objects it owns
//! 2. **Build** - [`crate::builders`] compute the desired resources
//! 3. **Converge** - [`Convergence`] gets, compares, creates and recreates them
//! 4. **Status** - [`StatusTracker`] aggregates the outcome into one status
//!
//! # Modules
//!
//! - [`managed`] - Typed descriptors of managed resources
//! - [`compare`] - Drift detection per resource kind
//! - [`health`] - Runtime health per resource kind
//! - [`exposure`] - Discovery of node ports, load balancers and route hosts
//! - [`cluster_api`] - The cluster operations the engine depends on
//! - [`convergence`] - The per-resource convergence cycle
//! - [`status`] - The status state machine
//! - [`horreum`] - The ordered reconciliation pass
//!
//! # Example: Running a Pass
//!
//! ```rust,no_run
//! use horreum_operator::builders::Platform;
//! use horreum_operator::credentials::PasswordGenerator;
//! use horreum_operator::crd::Horreum;
//! use horreum_operator::reconcilers::{reconcile_horreum, KubeClusterApi, PassContext};
//! use kube::Client;
//!
//! async fn run_pass(client: Client, horreum: Horreum) -> anyhow::Result<()> {
//!     let cluster = KubeClusterApi::new(client);
//!     let passwords = PasswordGenerator::from_entropy();
//!     let ctx = PassContext {
//!         cluster: &cluster,
//!         passwords: &passwords,
//!         platform: Platform::default(),
//!     };
//!     let outcome = reconcile_horreum(&ctx, &horreum).await?;
//!     println!("{outcome:?}");
//!     Ok(())
//! }
//! ```

pub mod cluster_api;
pub mod compare;
pub mod convergence;
pub mod exposure;
pub mod health;
pub mod horreum;
pub mod managed;
pub mod status;

#[cfg(test)]
pub(crate) mod fake_cluster;

pub use cluster_api::{ClusterApi, KubeClusterApi};
pub use convergence::Convergence;
pub use horreum::{reconcile_horreum, PassContext, PassOutcome};
pub use status::StatusTracker;
