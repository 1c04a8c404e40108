// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The convergence engine.
//!
//! For every desired resource the engine runs one get, compare, create or
//! delete-then-create cycle and feeds what it saw into the [`StatusTracker`]:
//!
//! ```text
//! absent ──create──▶ Pending "Creating <Kind> <name>"
//! present, equal ──▶ health assessment (Healthy / Pending / Error)
//! present, drifted ──delete, create──▶ Pending "Recreating <Kind> <name>"
//! ```
//!
//! Any cluster failure other than "not found" aborts the pass with a
//! [`ReconcileError`]; the controller retries the whole pass later.

use crate::builders::routes::TlsMaterial;
use crate::constants::{
    SERVICE_TYPE_LOAD_BALANCER, SERVICE_TYPE_NODE_PORT, TLS_CA_CERT_KEY, TLS_CERT_KEY,
    TLS_PRIVATE_KEY_KEY,
};
use crate::credentials::PasswordGenerator;
use crate::crd::Horreum;
use crate::errors::{ClusterAction, ReconcileError};
use crate::metrics;
use crate::reconcilers::cluster_api::ClusterApi;
use crate::reconcilers::compare::equal_enough;
use crate::reconcilers::exposure::{self, Component};
use crate::reconcilers::health::assess;
use crate::reconcilers::managed::{
    ComparePolicy, Desired, ManagedResource, OwnerRelation, ResourceKind,
};
use crate::reconcilers::status::StatusTracker;
use crate::route::Route;
use crate::status_reasons;
use chrono::Utc;
use k8s_openapi::api::core::v1::{Secret, Service};
use kube::ResourceExt;
use tracing::{debug, info, warn};

/// Converges the resources of one `Horreum` during one pass.
pub struct Convergence<'a> {
    cluster: &'a dyn ClusterApi,
    passwords: &'a PasswordGenerator,
    owner: OwnerRelation,
    namespace: String,
    /// Status accumulated so far in this pass.
    pub status: StatusTracker,
}

impl<'a> Convergence<'a> {
    #[must_use]
    pub fn new(
        cluster: &'a dyn ClusterApi,
        passwords: &'a PasswordGenerator,
        horreum: &Horreum,
        admin_secret: &str,
    ) -> Self {
        Self {
            cluster,
            passwords,
            owner: OwnerRelation::of(horreum),
            namespace: horreum.namespace().unwrap_or_default(),
            status: StatusTracker::begin(horreum.status.as_ref(), admin_secret),
        }
    }

    async fn find(
        &self,
        kind: ResourceKind,
        name: &str,
    ) -> Result<Option<ManagedResource>, ReconcileError> {
        self.cluster
            .get(kind, &self.namespace, name)
            .await
            .map_err(|e| ReconcileError::cluster(ClusterAction::Find, kind, name, e))
    }

    /// Fills generated secret keys; only ever called right before a create.
    fn with_generated_values(&self, desired: &Desired) -> ManagedResource {
        let mut resource = desired.resource.clone();
        if let ManagedResource::Secret(secret) = &mut resource {
            let data = secret.string_data.get_or_insert_with(Default::default);
            for key in &desired.generated_keys {
                data.insert(key.clone(), self.passwords.generate());
            }
        }
        resource
    }

    async fn create(&self, desired: &Desired) -> Result<(), ReconcileError> {
        let resource = self.with_generated_values(desired);
        self.cluster.create(&resource).await.map_err(|e| {
            ReconcileError::cluster(ClusterAction::Create, resource.kind(), resource.name(), e)
        })?;
        metrics::record_resource_created(resource.kind().as_str());
        Ok(())
    }

    /// Makes the cluster hold `desired`.
    ///
    /// Returns the observed resource when it already existed and was left in
    /// place, `None` when it was created or recreated in this pass.
    ///
    /// # Errors
    ///
    /// Returns an error when a get, create or delete fails for a reason other
    /// than "not found". A conflict while recreating is not an error: the old
    /// object is still terminating and the next pass creates it.
    pub async fn ensure_same(
        &mut self,
        mut desired: Desired,
    ) -> Result<Option<ManagedResource>, ReconcileError> {
        desired.resource.set_owner(&self.owner);
        let kind = desired.resource.kind();
        let name = desired.resource.name().to_string();
        let display_name = desired.resource.display_name();

        let Some(observed) = self.find(kind, &name).await? else {
            info!(namespace = %self.namespace, "Creating {display_name}");
            self.create(&desired).await?;
            self.status.pending(status_reasons::creating(&display_name));
            return Ok(None);
        };

        if desired.policy == ComparePolicy::CreateOnly
            || equal_enough(&desired.resource, &observed)
        {
            let health = assess(&desired, &observed);
            debug!(namespace = %self.namespace, "{display_name} is {health:?}");
            self.status.record(&display_name, &health);
            return Ok(Some(observed));
        }

        info!(namespace = %self.namespace, "Recreating {display_name}");
        self.cluster
            .delete(kind, &self.namespace, &name)
            .await
            .map_err(|e| ReconcileError::cluster(ClusterAction::Delete, kind, &name, e))?;
        let resource = self.with_generated_values(&desired);
        match self.cluster.create(&resource).await {
            Ok(()) => metrics::record_resource_recreated(kind.as_str()),
            Err(e) if e.is_conflict() => {
                warn!(namespace = %self.namespace, "{display_name} still terminating, creating it on the next pass");
            }
            Err(e) => {
                return Err(ReconcileError::cluster(
                    ClusterAction::Create,
                    kind,
                    &name,
                    e,
                ))
            }
        }
        self.status.pending(status_reasons::recreating(&display_name));
        Ok(None)
    }

    /// Deletes the resource if it exists and this `Horreum` owns it.
    ///
    /// Objects provisioned by someone else, such as a secret the user named
    /// in the spec, are left in place.
    ///
    /// # Errors
    ///
    /// Returns an error when the lookup or the deletion fails.
    pub async fn ensure_deleted(
        &mut self,
        kind: ResourceKind,
        name: &str,
    ) -> Result<(), ReconcileError> {
        let Some(observed) = self.find(kind, name).await? else {
            return Ok(());
        };
        if !self.owner.owns(&observed) {
            debug!(namespace = %self.namespace, "Keeping {kind} {name}, not owned by {}", self.owner.name);
            return Ok(());
        }
        info!(namespace = %self.namespace, "Deleting {kind} {name}");
        self.cluster
            .delete(kind, &self.namespace, name)
            .await
            .map_err(|e| ReconcileError::cluster(ClusterAction::Delete, kind, name, e))?;
        metrics::record_resource_deleted(kind.as_str());
        Ok(())
    }

    /// Looks up a secret the operator expects someone else to provision.
    ///
    /// A missing secret sets `Pending "Waiting for secret <name>"`.
    ///
    /// # Errors
    ///
    /// Returns an error when the lookup fails.
    pub async fn require_secret(&mut self, name: &str) -> Result<Option<Secret>, ReconcileError> {
        match self.find(ResourceKind::Secret, name).await? {
            Some(ManagedResource::Secret(secret)) => Ok(Some(secret)),
            _ => {
                info!(namespace = %self.namespace, "Secret {name} is not provisioned yet");
                self.status.pending(status_reasons::waiting_for_secret(name));
                Ok(None)
            }
        }
    }

    /// Certificate material of the TLS secret a route refers to.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::MissingSecret`] when a secret is named but
    /// does not exist.
    pub async fn tls_material(
        &self,
        secret: Option<&str>,
    ) -> Result<Option<TlsMaterial>, ReconcileError> {
        let Some(name) = secret.filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        match self.find(ResourceKind::Secret, name).await? {
            Some(ManagedResource::Secret(secret)) => Ok(Some(TlsMaterial {
                certificate: secret_value(&secret, TLS_CERT_KEY),
                key: secret_value(&secret, TLS_PRIVATE_KEY_KEY),
                ca_certificate: secret_value(&secret, TLS_CA_CERT_KEY),
            })),
            _ => Err(ReconcileError::MissingSecret {
                name: name.to_string(),
            }),
        }
    }

    /// Converges the service (and route) of `component` and discovers its URL.
    ///
    /// NodePort and LoadBalancer services are addressed directly. Otherwise
    /// the route, if any, provides the address. An address that is not
    /// assigned yet sets `Pending` and yields `None`; a discovered address is
    /// recorded in the status.
    ///
    /// # Errors
    ///
    /// Returns an error when a cluster call fails.
    pub async fn expose(
        &mut self,
        component: Component,
        service: Service,
        route: Option<Route>,
        scheme: &str,
        node_host: &str,
    ) -> Result<Option<String>, ReconcileError> {
        let service_name = service.name_any();
        let service_type = service
            .spec
            .as_ref()
            .and_then(|s| s.type_.clone())
            .unwrap_or_default();
        let observed = self
            .ensure_same(Desired::compared(ManagedResource::Service(service)))
            .await?;

        let (url, waiting) = match service_type.as_str() {
            SERVICE_TYPE_NODE_PORT => {
                let url = self
                    .observed_service(observed, &service_name)
                    .await?
                    .and_then(|svc| exposure::node_port_url(scheme, node_host, &svc));
                (url, status_reasons::waiting_for_node_port(component))
            }
            SERVICE_TYPE_LOAD_BALANCER => {
                let url = self
                    .observed_service(observed, &service_name)
                    .await?
                    .and_then(|svc| exposure::load_balancer_url(scheme, &svc));
                (url, status_reasons::waiting_for_url(component))
            }
            _ => {
                let url = match route {
                    Some(route) => match self
                        .ensure_same(Desired::compared(ManagedResource::Route(route)))
                        .await?
                    {
                        Some(ManagedResource::Route(observed)) => exposure::route_url(&observed),
                        _ => None,
                    },
                    None => None,
                };
                (url, status_reasons::waiting_for_url(component))
            }
        };

        match &url {
            Some(url) => {
                debug!(namespace = %self.namespace, "{component} is reachable at {url}");
                self.status.set_url(component, Some(url.clone()));
            }
            None => self.status.pending(waiting),
        }
        Ok(url)
    }

    /// The service as the cluster holds it; refetched only when it was
    /// (re)created in this pass and the API server assigned ports since.
    async fn observed_service(
        &self,
        observed: Option<ManagedResource>,
        name: &str,
    ) -> Result<Option<Service>, ReconcileError> {
        let observed = match observed {
            Some(resource) => Some(resource),
            None => self.find(ResourceKind::Service, name).await?,
        };
        Ok(match observed {
            Some(ManagedResource::Service(svc)) => Some(svc),
            _ => None,
        })
    }

    /// Writes the status if this pass changed it.
    ///
    /// # Errors
    ///
    /// Returns an error when the status update fails.
    pub async fn persist(&self) -> Result<(), ReconcileError> {
        let Some(status) = self.status.finish(Utc::now()) else {
            debug!(namespace = %self.namespace, name = %self.owner.name, "Status unchanged");
            return Ok(());
        };
        self.cluster
            .update_status(&self.namespace, &self.owner.name, &status)
            .await
            .map_err(|e| {
                ReconcileError::cluster(
                    ClusterAction::UpdateStatus,
                    ResourceKind::Horreum,
                    &self.owner.name,
                    e,
                )
            })
    }
}

/// Decoded value of a secret key, looking at `data` then `stringData`.
#[must_use]
pub fn secret_value(secret: &Secret, key: &str) -> Option<String> {
    secret
        .data
        .as_ref()
        .and_then(|d| d.get(key))
        .map(|v| String::from_utf8_lossy(&v.0).into_owned())
        .or_else(|| secret.string_data.as_ref().and_then(|d| d.get(key)).cloned())
}

#[cfg(test)]
#[path = "convergence_tests.rs"]
mod convergence_tests;
