// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory [`ClusterApi`] for reconciler tests.
//!
//! Objects are keyed by kind and name within a single namespace. Every call is
//! recorded so tests can assert exactly which mutations a pass issued. The
//! fake plays the API server's part where the engine depends on it: secret
//! `stringData` is folded into `data` and node ports are assigned on create.

use crate::crd::{Horreum, HorreumSpec, HorreumStatus};
use crate::errors::ClusterError;
use crate::reconcilers::cluster_api::ClusterApi;
use crate::reconcilers::managed::{ManagedResource, ResourceKind};
use crate::route::{OpenShiftRouteStatus, RouteIngress, RouteIngressCondition, ROUTE_ADMITTED};
use k8s_openapi::api::core::v1::{
    ContainerState, ContainerStateWaiting, ContainerStatus, LoadBalancerIngress,
    LoadBalancerStatus, PodCondition, PodStatus, Secret, ServiceStatus,
};
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;
use std::sync::Mutex;

pub const NAMESPACE: &str = "perf";

/// One recorded cluster call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Get(ResourceKind, String),
    Create(ResourceKind, String),
    Delete(ResourceKind, String),
    UpdateStatus(String),
}

/// Operation a test can make fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Op {
    Get,
    Create,
    Delete,
    UpdateStatus,
}

#[derive(Default)]
struct State {
    objects: BTreeMap<(ResourceKind, String), ManagedResource>,
    calls: Vec<Call>,
    statuses: Vec<HorreumStatus>,
    failures: BTreeMap<(Op, String), ClusterError>,
    next_node_port: i32,
}

#[derive(Default)]
pub struct FakeCluster {
    state: Mutex<State>,
}

/// `Horreum` named `name` in the test namespace.
pub fn horreum(name: &str, spec: HorreumSpec) -> Horreum {
    let mut hr = Horreum::new(name, spec);
    hr.metadata = ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(NAMESPACE.to_string()),
        uid: Some(format!("uid-{name}")),
        ..Default::default()
    };
    hr
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Stores `resource` as if someone else had created it.
    pub fn insert(&self, resource: ManagedResource) {
        let key = (resource.kind(), resource.name().to_string());
        self.lock().objects.insert(key, resource);
    }

    /// Seeds a TLS secret as provisioned outside the operator.
    pub fn insert_tls_secret(&self, name: &str) {
        let mut data = BTreeMap::new();
        data.insert("tls.crt".to_string(), ByteString(b"CERT".to_vec()));
        data.insert("tls.key".to_string(), ByteString(b"KEY".to_vec()));
        data.insert("ca.crt".to_string(), ByteString(b"CA".to_vec()));
        self.insert(ManagedResource::Secret(Secret {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(NAMESPACE.to_string()),
                ..Default::default()
            },
            type_: Some("kubernetes.io/tls".to_string()),
            data: Some(data),
            ..Default::default()
        }));
    }

    pub fn object(&self, kind: ResourceKind, name: &str) -> Option<ManagedResource> {
        self.lock().objects.get(&(kind, name.to_string())).cloned()
    }

    pub fn contains(&self, kind: ResourceKind, name: &str) -> bool {
        self.object(kind, name).is_some()
    }

    pub fn names(&self, kind: ResourceKind) -> Vec<String> {
        self.lock()
            .objects
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, n)| n.clone())
            .collect()
    }

    /// Mutates a stored object in place.
    pub fn update(&self, kind: ResourceKind, name: &str, f: impl FnOnce(&mut ManagedResource)) {
        let mut state = self.lock();
        if let Some(resource) = state.objects.get_mut(&(kind, name.to_string())) {
            f(resource);
        }
    }

    pub fn fail_on(&self, op: Op, name: &str, error: ClusterError) {
        self.lock().failures.insert((op, name.to_string()), error);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn creates(&self) -> Vec<(ResourceKind, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Create(kind, name) => Some((kind, name)),
                _ => None,
            })
            .collect()
    }

    pub fn deletes(&self) -> Vec<(ResourceKind, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete(kind, name) => Some((kind, name)),
                _ => None,
            })
            .collect()
    }

    /// Statuses written so far, oldest first.
    pub fn statuses(&self) -> Vec<HorreumStatus> {
        self.lock().statuses.clone()
    }

    pub fn last_status(&self) -> Option<HorreumStatus> {
        self.lock().statuses.last().cloned()
    }

    /// Marks every pod `Ready`, clearing container failures.
    pub fn mark_pods_ready(&self) {
        let mut state = self.lock();
        for resource in state.objects.values_mut() {
            if let ManagedResource::Pod(pod) = resource {
                pod.status = Some(PodStatus {
                    conditions: Some(vec![PodCondition {
                        type_: "Ready".to_string(),
                        status: "True".to_string(),
                        ..Default::default()
                    }]),
                    ..Default::default()
                });
            }
        }
    }

    /// Makes the main container of pod `name` fail to pull its image.
    pub fn set_image_pull_failure(&self, name: &str) {
        self.update(ResourceKind::Pod, name, |resource| {
            if let ManagedResource::Pod(pod) = resource {
                pod.status = Some(PodStatus {
                    container_statuses: Some(vec![ContainerStatus {
                        name: "main".to_string(),
                        state: Some(ContainerState {
                            waiting: Some(ContainerStateWaiting {
                                reason: Some("ImagePullBackOff".to_string()),
                                message: None,
                            }),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }]),
                    ..Default::default()
                });
            }
        });
    }

    /// Admits every route, reporting its host or `<subdomain>.apps.example.com`.
    pub fn admit_routes(&self) {
        let mut state = self.lock();
        for resource in state.objects.values_mut() {
            if let ManagedResource::Route(route) = resource {
                let host = route.spec.host.clone().unwrap_or_else(|| {
                    format!(
                        "{}.apps.example.com",
                        route.spec.subdomain.clone().unwrap_or_default()
                    )
                });
                route.status = Some(OpenShiftRouteStatus {
                    ingress: vec![RouteIngress {
                        host: Some(host),
                        router_name: Some("default".to_string()),
                        conditions: vec![RouteIngressCondition {
                            type_: ROUTE_ADMITTED.to_string(),
                            status: "True".to_string(),
                            ..Default::default()
                        }],
                    }],
                });
            }
        }
    }

    /// Reports a load-balancer hostname on service `name`.
    pub fn assign_load_balancer(&self, name: &str, hostname: &str) {
        self.update(ResourceKind::Service, name, |resource| {
            if let ManagedResource::Service(service) = resource {
                service.status = Some(ServiceStatus {
                    load_balancer: Some(LoadBalancerStatus {
                        ingress: Some(vec![LoadBalancerIngress {
                            hostname: Some(hostname.to_string()),
                            ..Default::default()
                        }]),
                    }),
                    ..Default::default()
                });
            }
        });
    }

    fn check(&self, state: &State, op: Op, name: &str) -> Result<(), ClusterError> {
        match state.failures.get(&(op, name.to_string())) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

/// What the API server does to a submitted object.
fn admit(resource: &ManagedResource, next_node_port: &mut i32) -> ManagedResource {
    let mut stored = resource.clone();
    match &mut stored {
        ManagedResource::Secret(secret) => {
            if let Some(string_data) = secret.string_data.take() {
                let data = secret.data.get_or_insert_with(Default::default);
                for (key, value) in string_data {
                    data.insert(key, ByteString(value.into_bytes()));
                }
            }
        }
        ManagedResource::Service(service) => {
            if let Some(spec) = service.spec.as_mut() {
                let exposed = matches!(
                    spec.type_.as_deref(),
                    Some("NodePort") | Some("LoadBalancer")
                );
                for port in spec.ports.iter_mut().flatten() {
                    if exposed && port.node_port.is_none() {
                        *next_node_port += 1;
                        port.node_port = Some(30000 + *next_node_port);
                    }
                }
            }
        }
        _ => {}
    }
    stored
}

#[async_trait::async_trait]
impl ClusterApi for FakeCluster {
    async fn get(
        &self,
        kind: ResourceKind,
        _namespace: &str,
        name: &str,
    ) -> Result<Option<ManagedResource>, ClusterError> {
        let mut state = self.lock();
        state.calls.push(Call::Get(kind, name.to_string()));
        self.check(&state, Op::Get, name)?;
        Ok(state.objects.get(&(kind, name.to_string())).cloned())
    }

    async fn create(&self, resource: &ManagedResource) -> Result<(), ClusterError> {
        let mut state = self.lock();
        let key = (resource.kind(), resource.name().to_string());
        state.calls.push(Call::Create(key.0, key.1.clone()));
        self.check(&state, Op::Create, &key.1)?;
        if state.objects.contains_key(&key) {
            return Err(ClusterError::Api {
                code: 409,
                message: format!("{} {} already exists", key.0, key.1),
            });
        }
        let stored = admit(resource, &mut state.next_node_port);
        state.objects.insert(key, stored);
        Ok(())
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        _namespace: &str,
        name: &str,
    ) -> Result<(), ClusterError> {
        let mut state = self.lock();
        state.calls.push(Call::Delete(kind, name.to_string()));
        self.check(&state, Op::Delete, name)?;
        state.objects.remove(&(kind, name.to_string()));
        Ok(())
    }

    async fn update_status(
        &self,
        _namespace: &str,
        name: &str,
        status: &HorreumStatus,
    ) -> Result<(), ClusterError> {
        let mut state = self.lock();
        state.calls.push(Call::UpdateStatus(name.to_string()));
        self.check(&state, Op::UpdateStatus, name)?;
        state.statuses.push(status.clone());
        Ok(())
    }
}
