// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The cluster operations the convergence engine depends on.
//!
//! The engine only ever needs four namespaced round-trips: get by name,
//! create, delete and status update. Keeping them behind [`ClusterApi`] lets
//! tests drive the engine against an in-memory cluster.

use crate::crd::{Horreum, HorreumStatus};
use crate::errors::ClusterError;
use crate::reconcilers::managed::{ManagedResource, ResourceKind};
use crate::route::Route;
use k8s_openapi::api::core::v1::{ConfigMap, Pod, Secret, Service};
use k8s_openapi::NamespaceResourceScope;
use kube::api::{DeleteParams, Patch, PatchParams, PostParams};
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::fmt::Debug;
use tracing::debug;

/// Namespaced cluster operations used by a reconciliation pass.
#[async_trait::async_trait]
pub trait ClusterApi: Send + Sync {
    /// Fetches a resource; a missing resource is `Ok(None)`.
    async fn get(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ManagedResource>, ClusterError>;

    /// Creates `resource` in its namespace.
    async fn create(&self, resource: &ManagedResource) -> Result<(), ClusterError>;

    /// Deletes a resource; deleting a missing resource succeeds.
    async fn delete(&self, kind: ResourceKind, namespace: &str, name: &str)
        -> Result<(), ClusterError>;

    /// Replaces the status of the `Horreum` resource.
    async fn update_status(
        &self,
        namespace: &str,
        name: &str,
        status: &HorreumStatus,
    ) -> Result<(), ClusterError>;
}

/// [`ClusterApi`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeClusterApi {
    client: Client,
}

impl KubeClusterApi {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<DynamicType = (), Scope = NamespaceResourceScope>,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn get_typed<K>(&self, namespace: &str, name: &str) -> Result<Option<K>, ClusterError>
    where
        K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
            + Clone
            + Debug
            + DeserializeOwned,
    {
        Ok(self.api::<K>(namespace).get_opt(name).await?)
    }

    async fn create_typed<K>(&self, namespace: &str, resource: &K) -> Result<(), ClusterError>
    where
        K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
            + Clone
            + Debug
            + Serialize
            + DeserializeOwned,
    {
        self.api::<K>(namespace)
            .create(&PostParams::default(), resource)
            .await?;
        Ok(())
    }

    async fn delete_typed<K>(&self, namespace: &str, name: &str) -> Result<(), ClusterError>
    where
        K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
            + Clone
            + Debug
            + DeserializeOwned,
    {
        match self
            .api::<K>(namespace)
            .delete(name, &DeleteParams::default())
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                debug!(namespace = %namespace, name = %name, kind = %K::kind(&()), "Already deleted");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait::async_trait]
impl ClusterApi for KubeClusterApi {
    async fn get(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ManagedResource>, ClusterError> {
        Ok(match kind {
            ResourceKind::Pod => self
                .get_typed::<Pod>(namespace, name)
                .await?
                .map(ManagedResource::Pod),
            ResourceKind::Service => self
                .get_typed::<Service>(namespace, name)
                .await?
                .map(ManagedResource::Service),
            ResourceKind::Route => self
                .get_typed::<Route>(namespace, name)
                .await?
                .map(ManagedResource::Route),
            ResourceKind::Secret => self
                .get_typed::<Secret>(namespace, name)
                .await?
                .map(ManagedResource::Secret),
            ResourceKind::ConfigMap => self
                .get_typed::<ConfigMap>(namespace, name)
                .await?
                .map(ManagedResource::ConfigMap),
            ResourceKind::Horreum => {
                return Err(ClusterError::Other(
                    "Horreum is not a managed resource".to_string(),
                ))
            }
        })
    }

    async fn create(&self, resource: &ManagedResource) -> Result<(), ClusterError> {
        let namespace = resource.namespace();
        match resource {
            ManagedResource::Pod(r) => self.create_typed(namespace, r).await,
            ManagedResource::Service(r) => self.create_typed(namespace, r).await,
            ManagedResource::Route(r) => self.create_typed(namespace, r).await,
            ManagedResource::Secret(r) => self.create_typed(namespace, r).await,
            ManagedResource::ConfigMap(r) => self.create_typed(namespace, r).await,
        }
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<(), ClusterError> {
        match kind {
            ResourceKind::Pod => self.delete_typed::<Pod>(namespace, name).await,
            ResourceKind::Service => self.delete_typed::<Service>(namespace, name).await,
            ResourceKind::Route => self.delete_typed::<Route>(namespace, name).await,
            ResourceKind::Secret => self.delete_typed::<Secret>(namespace, name).await,
            ResourceKind::ConfigMap => self.delete_typed::<ConfigMap>(namespace, name).await,
            ResourceKind::Horreum => Err(ClusterError::Other(
                "Horreum is not a managed resource".to_string(),
            )),
        }
    }

    async fn update_status(
        &self,
        namespace: &str,
        name: &str,
        status: &HorreumStatus,
    ) -> Result<(), ClusterError> {
        // Every field is written, so values dropped from the status are cleared.
        let patch = json!({
            "status": {
                "status": status.status,
                "reason": status.reason,
                "lastUpdate": status.last_update,
                "publicUrl": status.public_url,
                "keycloakUrl": status.keycloak_url,
                "grafanaUrl": status.grafana_url,
                "reportUrl": status.report_url,
            }
        });
        self.api::<Horreum>(namespace)
            .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "cluster_api_tests.rs"]
mod cluster_api_tests;
