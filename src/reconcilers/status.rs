// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status state machine of a `Horreum` resource.
//!
//! Each pass starts optimistic (`Ready`, with a hint on how to read the admin
//! password) and is downgraded by the steps that find something wrong:
//!
//! - `Error` is sticky: a later `Pending` in the same pass never replaces it.
//! - The last-update timestamp only moves when phase or reason change, so an
//!   unchanged pass does not rewrite the status and retrigger the watch.
//! - The status is persisted at most once per pass, and only when it changed.

use crate::crd::{HorreumPhase, HorreumStatus};
use crate::reconcilers::exposure::Component;
use crate::reconcilers::health::Health;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::debug;

/// Reason reported while everything is ready.
#[must_use]
pub fn ready_reason(admin_secret: &str) -> String {
    format!(
        "For admin ({admin_secret}) password run: kubectl get secret {admin_secret} -o go-template='{{{{.data.password|base64decode}}}}'"
    )
}

/// Accumulates the status of one reconciliation pass.
#[derive(Debug, Clone)]
pub struct StatusTracker {
    previous: HorreumStatus,
    current: HorreumStatus,
}

impl StatusTracker {
    /// Starts a pass from the persisted status.
    ///
    /// Discovered URLs are carried over until the pass rediscovers them.
    #[must_use]
    pub fn begin(previous: Option<&HorreumStatus>, admin_secret: &str) -> Self {
        let previous = previous.cloned().unwrap_or_default();
        let current = HorreumStatus {
            status: Some(HorreumPhase::Ready),
            reason: Some(ready_reason(admin_secret)),
            ..previous.clone()
        };
        Self { previous, current }
    }

    #[must_use]
    pub fn phase(&self) -> HorreumPhase {
        self.current.status.unwrap_or_default()
    }

    #[must_use]
    pub fn reason(&self) -> &str {
        self.current.reason.as_deref().unwrap_or_default()
    }

    /// Records that something is still progressing, unless an error was seen.
    pub fn pending(&mut self, reason: impl Into<String>) {
        if self.phase() == HorreumPhase::Error {
            debug!("Keeping Error status over pending: {}", reason.into());
            return;
        }
        self.set(HorreumPhase::Pending, reason.into());
    }

    /// Records a failure; always wins over `Ready` and `Pending`.
    pub fn error(&mut self, reason: impl Into<String>) {
        self.set(HorreumPhase::Error, reason.into());
    }

    /// Records a health assessment of the resource called `display_name`.
    pub fn record(&mut self, display_name: &str, health: &Health) {
        match health {
            Health::Healthy => {}
            Health::Pending(detail) => self.pending(format!("{display_name} {detail}")),
            Health::Error(detail) => self.error(format!("{display_name} {detail}")),
        }
    }

    pub fn set_url(&mut self, component: Component, url: Option<String>) {
        let slot = match component {
            Component::App => &mut self.current.public_url,
            Component::Keycloak => &mut self.current.keycloak_url,
            Component::Grafana => &mut self.current.grafana_url,
            Component::Report => &mut self.current.report_url,
        };
        *slot = url;
    }

    #[must_use]
    pub fn current(&self) -> &HorreumStatus {
        &self.current
    }

    fn set(&mut self, phase: HorreumPhase, reason: String) {
        self.current.status = Some(phase);
        self.current.reason = Some(reason);
    }

    /// Final status of the pass, or `None` when nothing changed.
    ///
    /// The timestamp is refreshed only if phase or reason differ from the
    /// persisted status.
    #[must_use]
    pub fn finish(&self, now: DateTime<Utc>) -> Option<HorreumStatus> {
        let mut status = self.current.clone();
        let transitioned = status.status != self.previous.status
            || status.reason != self.previous.reason
            || self.previous.last_update.is_none();
        status.last_update = if transitioned {
            Some(now.to_rfc3339_opts(SecondsFormat::Secs, true))
        } else {
            self.previous.last_update.clone()
        };
        (status != self.previous).then_some(status)
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
