// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Human-readable reasons written into the `Horreum` status.
//!
//! The status carries a single free-text reason next to the phase. Reasons
//! that name a resource always start with `"<Kind> <name>"` so users can find
//! the object that holds up the deployment.
//!
//! # Example Status
//!
//! ```yaml
//! status:
//!   status: Pending
//!   reason: "Recreating Pod demo-app"
//!   lastUpdate: "2024-05-01T12:00:00Z"
//!   publicUrl: "https://demo.apps.example.com"
//! ```

use crate::reconcilers::exposure::Component;

// ============================================================================
// Requeue Reasons (metrics labels)
// ============================================================================

/// Requeue while resources are being created or become ready.
pub const REQUEUE_PENDING: &str = "pending";

/// Requeue after the pass ended with an `Error` status.
pub const REQUEUE_ERROR: &str = "error";

// ============================================================================
// Pending Reasons
// ============================================================================

/// A missing resource was just created.
#[must_use]
pub fn creating(display_name: &str) -> String {
    format!("Creating {display_name}")
}

/// A drifted resource was deleted and created again.
#[must_use]
pub fn recreating(display_name: &str) -> String {
    format!("Recreating {display_name}")
}

/// A NodePort service has no port assigned yet.
#[must_use]
pub fn waiting_for_node_port(component: Component) -> String {
    format!("Waiting for {component} service node port")
}

/// Neither a load balancer nor a route reported an address yet.
#[must_use]
pub fn waiting_for_url(component: Component) -> String {
    format!("Waiting for {component} service URL")
}

/// A TLS secret the operator does not create is not there yet.
#[must_use]
pub fn waiting_for_secret(name: &str) -> String {
    format!("Waiting for secret {name}")
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// `serviceType: NodePort` was requested without `nodeHost`.
#[must_use]
pub fn node_host_required(component: Component) -> String {
    format!("{component} service type is NodePort but nodeHost is not set")
}

#[cfg(test)]
#[path = "status_reasons_tests.rs"]
mod status_reasons_tests;
