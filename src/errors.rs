// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the Horreum operator.
//!
//! [`ClusterError`] is what the cluster API seam reports. [`ReconcileError`]
//! is what aborts a reconciliation pass; its `Display` output is written
//! verbatim into the `Horreum` status reason.

use crate::reconcilers::managed::ResourceKind;
use std::fmt;
use thiserror::Error;

/// Failure reported by a cluster API round-trip.
///
/// "Not found" never surfaces as an error: `get` reports it as `Ok(None)` and
/// `delete` treats it as success.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClusterError {
    /// The API server answered with an error status.
    #[error("API error {code}: {message}")]
    Api {
        /// HTTP status code (409 conflict, 500, ...)
        code: u16,
        /// Message returned by the API server
        message: String,
    },

    /// Transport, timeout or (de)serialization failure.
    #[error("{0}")]
    Other(String),
}

impl ClusterError {
    /// Returns `true` for HTTP 409 conflicts.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Api { code: 409, .. })
    }
}

impl From<kube::Error> for ClusterError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(ae) => Self::Api {
                code: ae.code,
                message: ae.message.clone(),
            },
            other => Self::Other(other.to_string()),
        }
    }
}

/// Cluster operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterAction {
    Find,
    Create,
    Delete,
    UpdateStatus,
}

impl fmt::Display for ClusterAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Find => "find",
            Self::Create => "create",
            Self::Delete => "delete",
            Self::UpdateStatus => "update status of",
        })
    }
}

/// Reason a reconciliation pass stopped before converging.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// The `Horreum` spec cannot be turned into valid resources.
    ///
    /// Retrying does not help; the user must change the spec.
    #[error("{0}")]
    Configuration(String),

    /// A cluster API call failed for a reason other than "not found".
    #[error("Cannot {action} {kind} {name}")]
    Cluster {
        /// Operation that failed
        action: ClusterAction,
        /// Kind of the resource involved
        kind: ResourceKind,
        /// Name of the resource involved
        name: String,
        /// Underlying API failure
        #[source]
        source: ClusterError,
    },

    /// A secret the operator reads but never creates does not exist.
    #[error("Cannot find secret {name}")]
    MissingSecret {
        /// Name of the missing secret
        name: String,
    },
}

impl ReconcileError {
    /// Shorthand for a cluster failure on a named resource.
    pub fn cluster(
        action: ClusterAction,
        kind: ResourceKind,
        name: impl Into<String>,
        source: ClusterError,
    ) -> Self {
        Self::Cluster {
            action,
            kind,
            name: name.into(),
            source,
        }
    }

    /// Configuration errors are not retried until the resource changes.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Reason written into the `Horreum` status.
    #[must_use]
    pub fn status_reason(&self) -> String {
        self.to_string()
    }

    /// Error category used as a metrics label.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration_error",
            Self::Cluster { .. } => "api_error",
            Self::MissingSecret { .. } => "missing_secret",
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
