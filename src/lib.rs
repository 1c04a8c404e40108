// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # Horreum Operator for Kubernetes
//!
//! The Horreum operator deploys and maintains a complete Horreum performance
//! results repository from a single `Horreum` custom resource: the Horreum
//! application server, a Keycloak identity provider, a PostgreSQL database and
//! optionally Grafana dashboards and a Hyperfoil report server.
//!
//! ## Overview
//!
//! Each reconciliation pass compares the resources the spec asks for with what
//! the cluster holds, creates what is missing, recreates what drifted, deletes
//! what was disabled and reports a single `Ready` / `Pending` / `Error` status.
//!
//! ## Modules
//!
//! - [`crd`] - The `Horreum` custom resource
//! - [`route`] - The OpenShift `Route` resource
//! - [`builders`] - Pure functions computing the desired resources
//! - [`reconcilers`] - Convergence engine, drift detection, health and status
//! - [`credentials`] - Generated passwords for auto-created secrets
//! - [`context`] - Shared controller context
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust,no_run
//! use horreum_operator::crd::{Horreum, HorreumSpec, RouteSpec};
//!
//! let spec = HorreumSpec {
//!     route: RouteSpec {
//!         host: Some("horreum.apps.example.com".to_string()),
//!         ..Default::default()
//!     },
//!     ..Default::default()
//! };
//! let horreum = Horreum::new("demo", spec);
//! ```

pub mod builders;
pub mod constants;
pub mod context;
pub mod crd;
pub mod credentials;
pub mod errors;
pub mod labels;
pub mod metrics;
pub mod reconcilers;
pub mod route;
pub mod status_reasons;
