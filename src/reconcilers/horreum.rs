// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation of the `Horreum` custom resource.
//!
//! One pass converges every managed resource in dependency order:
//!
//! 1. Validation of the spec (no cluster writes before it passes)
//! 2. TLS prerequisites (service CA bundle, externally provided certificates)
//! 3. Credential secrets
//! 4. PostgreSQL
//! 5. Keycloak, whose public URL the app and Grafana need
//! 6. The Horreum app, whose public URL its own pod needs
//! 7. Grafana and the report server, when enabled
//! 8. The Hyperfoil upload script
//!
//! The pass stops early when an address a later step needs is not assigned
//! yet. Either way the status is persisted once, at the end.

use crate::builders::naming::{
    app_user_secret_name, db_admin_secret_name, db_name, grafana_admin_secret_name,
    grafana_name, horreum_admin_secret_name, keycloak_admin_secret_name,
    keycloak_db_secret_name, keycloak_name, postgres_start_config_map_name, report_name,
};
use crate::builders::routes::{is_node_port, RouteType};
use crate::builders::{app, grafana, keycloak, postgres, report, secrets, Platform};
use crate::constants::{KIND_HORREUM, TLS_CA_CERT_KEY, TLS_CERT_KEY};
use crate::credentials::PasswordGenerator;
use crate::crd::{Horreum, HorreumPhase};
use crate::errors::ReconcileError;
use crate::labels::{ROLE_APP, ROLE_DB, ROLE_GRAFANA, ROLE_KEYCLOAK};
use crate::metrics;
use crate::reconcilers::cluster_api::ClusterApi;
use crate::reconcilers::convergence::{secret_value, Convergence};
use crate::reconcilers::exposure::Component;
use crate::reconcilers::managed::{Desired, ManagedResource, ResourceKind};
use crate::status_reasons::{self, REQUEUE_ERROR, REQUEUE_PENDING};
use kube::ResourceExt;
use tracing::{debug, info, warn};

/// Collaborators of a reconciliation pass.
pub struct PassContext<'a> {
    pub cluster: &'a dyn ClusterApi,
    pub passwords: &'a PasswordGenerator,
    pub platform: Platform,
}

/// How a completed pass asks to be scheduled again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Everything is ready; check again on the slow resync interval.
    Converged,
    /// Something is progressing or failed; poll again soon.
    Requeue,
    /// The spec is invalid; wait until it changes.
    Invalid,
}

/// Route types of the exposed components, validated up front.
#[derive(Debug, Clone, Copy)]
struct Plan {
    app_route: RouteType,
    /// `None` when Keycloak is external.
    keycloak_route: Option<RouteType>,
    grafana_route: Option<RouteType>,
    report_route: Option<RouteType>,
}

/// Whether the pass reached its end or stopped to wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Progress {
    Complete,
    Stopped,
}

fn validate(hr: &Horreum, platform: Platform) -> Result<Plan, ReconcileError> {
    let spec = &hr.spec;
    let plan = Plan {
        app_route: app::route_type(hr)?,
        keycloak_route: if spec.keycloak.is_external() {
            None
        } else {
            Some(keycloak::route_type(hr)?)
        },
        grafana_route: if spec.grafana.is_enabled() {
            Some(grafana::route_type(hr)?)
        } else {
            None
        },
        report_route: if spec.report.is_enabled() {
            Some(report::route_type(hr)?)
        } else {
            None
        },
    };

    if spec.node_host.as_deref().unwrap_or_default().is_empty() {
        let exposed = [
            (Component::App, true, spec.service_type.as_deref()),
            (
                Component::Keycloak,
                plan.keycloak_route.is_some(),
                spec.keycloak.service_type.as_deref(),
            ),
            (
                Component::Grafana,
                plan.grafana_route.is_some(),
                spec.grafana.service_type.as_deref(),
            ),
            (
                Component::Report,
                plan.report_route.is_some(),
                spec.report.service_type.as_deref(),
            ),
        ];
        for (component, managed, service_type) in exposed {
            if managed && is_node_port(service_type, platform) {
                return Err(ReconcileError::Configuration(
                    status_reasons::node_host_required(component),
                ));
            }
        }
    }
    Ok(plan)
}

/// Runs one reconciliation pass for `hr`.
///
/// # Errors
///
/// Returns an error when a cluster call fails. The status is set to `Error`
/// and persisted on a best-effort basis before returning. Configuration
/// errors are not returned; they are persisted and reported as
/// [`PassOutcome::Invalid`].
pub async fn reconcile_horreum(
    ctx: &PassContext<'_>,
    hr: &Horreum,
) -> Result<PassOutcome, ReconcileError> {
    let name = hr.name_any();
    let mut engine = Convergence::new(
        ctx.cluster,
        ctx.passwords,
        hr,
        &horreum_admin_secret_name(hr),
    );

    match converge(&mut engine, hr, ctx.platform).await {
        Ok(progress) => {
            engine.persist().await?;
            let outcome = match (progress, engine.status.phase()) {
                (Progress::Complete, HorreumPhase::Ready) => PassOutcome::Converged,
                (_, HorreumPhase::Error) => {
                    metrics::record_reconciliation_requeue(KIND_HORREUM, REQUEUE_ERROR);
                    PassOutcome::Requeue
                }
                _ => {
                    metrics::record_reconciliation_requeue(KIND_HORREUM, REQUEUE_PENDING);
                    PassOutcome::Requeue
                }
            };
            debug!(horreum = %name, "Pass finished as {outcome:?}: {}", engine.status.reason());
            Ok(outcome)
        }
        Err(e) if e.is_configuration() => {
            warn!(horreum = %name, "Invalid Horreum spec: {e}");
            engine.status.error(e.status_reason());
            engine.persist().await?;
            Ok(PassOutcome::Invalid)
        }
        Err(e) => {
            engine.status.error(e.status_reason());
            if let Err(persist_error) = engine.persist().await {
                warn!(horreum = %name, "Cannot record failure in status: {persist_error}");
            }
            Err(e)
        }
    }
}

async fn converge(
    engine: &mut Convergence<'_>,
    hr: &Horreum,
    platform: Platform,
) -> Result<Progress, ReconcileError> {
    let plan = validate(hr, platform)?;
    let spec = &hr.spec;
    let node_host = spec.node_host.clone().unwrap_or_default();

    // TLS prerequisites
    if platform.routes_available {
        engine
            .ensure_same(Desired::create_only(ManagedResource::ConfigMap(
                app::service_ca_config_map(hr, None),
            )))
            .await?;
    } else {
        let mut certs = vec![app::certs_secret_name(hr, plan.app_route)];
        if let Some(route_type) = plan.keycloak_route {
            certs.push(keycloak::certs_secret_name(hr, route_type));
        }
        let mut provisioned = Vec::with_capacity(certs.len());
        for name in &certs {
            provisioned.push(engine.require_secret(name).await?);
        }
        let Some(Some(app_certs)) = provisioned.first() else {
            return Ok(Progress::Stopped);
        };
        if provisioned.iter().any(Option::is_none) {
            return Ok(Progress::Stopped);
        }
        let bundle = secret_value(app_certs, TLS_CA_CERT_KEY)
            .or_else(|| secret_value(app_certs, TLS_CERT_KEY));
        engine
            .ensure_same(Desired::create_only(ManagedResource::ConfigMap(
                app::service_ca_config_map(hr, bundle),
            )))
            .await?;
    }

    // Credentials
    for desired in [
        secrets::credential_secret(hr, &db_admin_secret_name(hr), ROLE_DB),
        secrets::credential_secret(hr, &keycloak_db_secret_name(hr), ROLE_KEYCLOAK),
        secrets::credential_secret(hr, &keycloak_admin_secret_name(hr), ROLE_KEYCLOAK),
        secrets::app_user_secret(hr, &app_user_secret_name(hr), ROLE_APP),
        secrets::credential_secret(hr, &horreum_admin_secret_name(hr), ROLE_APP),
    ] {
        engine.ensure_same(desired).await?;
    }

    // PostgreSQL
    if spec.postgres.is_enabled() {
        engine
            .ensure_same(Desired::compared(ManagedResource::ConfigMap(
                postgres::start_config_map(hr),
            )))
            .await?;
        engine
            .ensure_same(Desired::compared(ManagedResource::Pod(postgres::pod(
                hr, platform,
            ))))
            .await?;
        engine
            .ensure_same(Desired::compared(ManagedResource::Service(
                postgres::service(hr),
            )))
            .await?;
    } else {
        engine.ensure_deleted(ResourceKind::Pod, &db_name(hr)).await?;
        engine.ensure_deleted(ResourceKind::Service, &db_name(hr)).await?;
        engine
            .ensure_deleted(ResourceKind::ConfigMap, &postgres_start_config_map_name(hr))
            .await?;
    }

    // Keycloak
    let keycloak_url = match plan.keycloak_route {
        None => {
            let url = spec
                .keycloak
                .external
                .public_uri
                .clone()
                .unwrap_or_default();
            engine.status.set_url(Component::Keycloak, Some(url.clone()));
            engine.ensure_deleted(ResourceKind::Pod, &keycloak_name(hr)).await?;
            engine
                .ensure_deleted(ResourceKind::Service, &keycloak_name(hr))
                .await?;
            if platform.routes_available {
                engine
                    .ensure_deleted(ResourceKind::Route, &keycloak_name(hr))
                    .await?;
            }
            url
        }
        Some(route_type) => {
            let route = if platform.routes_available {
                let material = if route_type.terminates_at_router() {
                    engine
                        .tls_material(spec.keycloak.route.tls.as_deref())
                        .await?
                } else {
                    None
                };
                Some(keycloak::route(hr, material.as_ref())?)
            } else {
                None
            };
            let Some(url) = engine
                .expose(
                    Component::Keycloak,
                    keycloak::service(hr, platform),
                    route,
                    "https",
                    &node_host,
                )
                .await?
            else {
                return Ok(Progress::Stopped);
            };
            engine
                .ensure_same(Desired::compared(ManagedResource::Pod(keycloak::pod(
                    hr, &url,
                )?)))
                .await?;
            url
        }
    };

    // Horreum
    let app_route = if platform.routes_available {
        let material = if plan.app_route.terminates_at_router() {
            engine.tls_material(spec.route.tls.as_deref()).await?
        } else {
            None
        };
        Some(app::route(hr, plan.app_route, material.as_ref()))
    } else {
        None
    };
    let Some(app_url) = engine
        .expose(
            Component::App,
            app::service(hr, plan.app_route, platform),
            app_route,
            plan.app_route.scheme(),
            &node_host,
        )
        .await?
    else {
        return Ok(Progress::Stopped);
    };
    engine
        .ensure_same(Desired::compared(ManagedResource::Pod(app::pod(
            hr,
            plan.app_route,
            &keycloak_url,
            &app_url,
        ))))
        .await?;

    // Grafana
    match plan.grafana_route {
        Some(route_type) => {
            engine
                .ensure_same(secrets::credential_secret(
                    hr,
                    &grafana_admin_secret_name(hr),
                    ROLE_GRAFANA,
                ))
                .await?;
            let route = if platform.routes_available {
                let material = if route_type.terminates_at_router() {
                    engine
                        .tls_material(spec.grafana.route.tls.as_deref())
                        .await?
                } else {
                    None
                };
                Some(grafana::route(hr, route_type, material.as_ref()))
            } else {
                None
            };
            if let Some(grafana_url) = engine
                .expose(
                    Component::Grafana,
                    grafana::service(hr, platform),
                    route,
                    "http",
                    &node_host,
                )
                .await?
            {
                engine
                    .ensure_same(Desired::compared(ManagedResource::Pod(grafana::pod(
                        hr,
                        &keycloak_url,
                        &grafana_url,
                    ))))
                    .await?;
            }
        }
        None => {
            let name = grafana_name(hr);
            engine.ensure_deleted(ResourceKind::Pod, &name).await?;
            engine.ensure_deleted(ResourceKind::Service, &name).await?;
            if platform.routes_available {
                engine.ensure_deleted(ResourceKind::Route, &name).await?;
            }
            engine
                .ensure_deleted(ResourceKind::Secret, &grafana_admin_secret_name(hr))
                .await?;
            engine.status.set_url(Component::Grafana, None);
        }
    }

    // Report
    match plan.report_route {
        Some(route_type) => {
            engine
                .ensure_same(Desired::compared(ManagedResource::Pod(report::pod(hr))))
                .await?;
            let route = if platform.routes_available {
                let material = if route_type.terminates_at_router() {
                    engine
                        .tls_material(spec.report.route.tls.as_deref())
                        .await?
                } else {
                    None
                };
                Some(report::route(hr, route_type, material.as_ref()))
            } else {
                None
            };
            engine
                .expose(
                    Component::Report,
                    report::service(hr, platform),
                    route,
                    "http",
                    &node_host,
                )
                .await?;
        }
        None => {
            let name = report_name(hr);
            engine.ensure_deleted(ResourceKind::Pod, &name).await?;
            engine.ensure_deleted(ResourceKind::Service, &name).await?;
            if platform.routes_available {
                engine.ensure_deleted(ResourceKind::Route, &name).await?;
            }
            engine.status.set_url(Component::Report, None);
        }
    }

    engine
        .ensure_same(Desired::compared(ManagedResource::ConfigMap(
            app::upload_config_map(hr, plan.app_route),
        )))
        .await?;

    info!(horreum = %hr.name_any(), "Pass complete: {} {}", engine.status.phase(), engine.status.reason());
    Ok(Progress::Complete)
}

#[cfg(test)]
#[path = "horreum_tests.rs"]
mod horreum_tests;
