// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use clap::{Parser, ValueEnum};
use futures::StreamExt;
use horreum_operator::{
    builders::Platform,
    constants::{
        ERROR_REQUEUE_DURATION_SECS, KIND_HORREUM, METRICS_SERVER_BIND_ADDRESS,
        METRICS_SERVER_PATH, METRICS_SERVER_PORT, PENDING_REQUEUE_DURATION_SECS,
        READY_REQUEUE_DURATION_SECS, ROUTE_API_GROUP, TOKIO_WORKER_THREADS,
    },
    context::Context,
    crd::Horreum,
    errors::ReconcileError,
    metrics,
    reconcilers::{reconcile_horreum, PassOutcome},
    route::Route,
};
use k8s_openapi::api::core::v1::{ConfigMap, Pod, Secret, Service};
use kube::{
    runtime::{controller::Action, watcher::Config, Controller},
    Api, Client, Resource, ResourceExt,
};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Whether `Route` objects are managed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RouteMode {
    /// Use routes when the cluster serves `route.openshift.io`
    Auto,
    Enabled,
    Disabled,
}

/// Kubernetes operator for the Horreum performance results repository
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Manage OpenShift routes
    #[arg(long, env = "HORREUM_ROUTES", value_enum, default_value_t = RouteMode::Auto)]
    routes: RouteMode,

    /// Prefer Red Hat certified images where a choice exists
    #[arg(
        long,
        env = "HORREUM_USE_REDHAT_IMAGES",
        action = clap::ArgAction::Set,
        default_value_t = false
    )]
    use_redhat_images: bool,

    /// Watch a single namespace instead of the whole cluster
    #[arg(long, env = "HORREUM_WATCH_NAMESPACE")]
    watch_namespace: Option<String>,

    /// Port of the metrics and health endpoint
    #[arg(long, env = "METRICS_PORT", default_value_t = METRICS_SERVER_PORT)]
    metrics_port: u16,

    /// Log output format: text or json
    #[arg(long, env = "RUST_LOG_FORMAT", default_value = "text")]
    log_format: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("horreum-operator")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(args))
}

fn init_logging(log_format: &str) {
    // Respects RUST_LOG if set, otherwise defaults to INFO level
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main(args: Args) -> Result<()> {
    init_logging(&args.log_format);

    info!("Starting Horreum operator");
    debug!(?args, "Configuration loaded");

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let routes_available = match args.routes {
        RouteMode::Enabled => true,
        RouteMode::Disabled => false,
        RouteMode::Auto => discover_routes(&client).await?,
    };
    let platform = Platform {
        routes_available,
        use_redhat_images: args.use_redhat_images,
    };
    info!(
        routes_available = platform.routes_available,
        use_redhat_images = platform.use_redhat_images,
        "Platform capabilities"
    );

    let context = Arc::new(Context::new(client, platform));

    // Neither task should ever exit
    tokio::select! {
        result = run_horreum_controller(context, args.watch_namespace) => {
            error!("CRITICAL: Horreum controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Horreum controller exited unexpectedly without error")
        }
        result = run_metrics_server(args.metrics_port) => {
            error!("CRITICAL: Metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Metrics server exited unexpectedly without error")
        }
    }
}

/// Returns `true` when the API server serves `route.openshift.io`.
async fn discover_routes(client: &Client) -> Result<bool> {
    let groups = client.list_api_groups().await?;
    Ok(groups.groups.iter().any(|g| g.name == ROUTE_API_GROUP))
}

fn scoped_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<DynamicType = (), Scope = k8s_openapi::NamespaceResourceScope>
        + Clone
        + Debug
        + DeserializeOwned,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Run the `Horreum` controller
async fn run_horreum_controller(context: Arc<Context>, namespace: Option<String>) -> Result<()> {
    info!(namespace = ?namespace, "Starting Horreum controller");

    let client = context.client.clone();
    let ns = namespace.as_deref();

    let mut controller = Controller::new(scoped_api::<Horreum>(&client, ns), Config::default())
        .owns(scoped_api::<Pod>(&client, ns), Config::default())
        .owns(scoped_api::<Service>(&client, ns), Config::default())
        .owns(scoped_api::<Secret>(&client, ns), Config::default())
        .owns(scoped_api::<ConfigMap>(&client, ns), Config::default());
    if context.platform.routes_available {
        controller = controller.owns(scoped_api::<Route>(&client, ns), Config::default());
    }

    controller
        .shutdown_on_signal()
        .run(reconcile_horreum_wrapper, error_policy, context)
        .for_each(|result| async move {
            match result {
                Ok((object, _)) => debug!("Reconciled {}", object.name),
                Err(e) => warn!("Reconcile failed: {e}"),
            }
        })
        .await;

    Ok(())
}

/// Reconcile wrapper for `Horreum`
async fn reconcile_horreum_wrapper(
    horreum: Arc<Horreum>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    debug!(
        horreum = %horreum.name_any(),
        namespace = ?horreum.namespace(),
        "Reconcile wrapper called for Horreum"
    );

    match reconcile_horreum(&ctx.pass(), &horreum).await {
        Ok(PassOutcome::Converged) => {
            info!("Horreum {} is ready", horreum.name_any());
            metrics::record_reconciliation_success(KIND_HORREUM, start.elapsed());
            Ok(Action::requeue(Duration::from_secs(READY_REQUEUE_DURATION_SECS)))
        }
        Ok(PassOutcome::Requeue) => Ok(Action::requeue(Duration::from_secs(
            PENDING_REQUEUE_DURATION_SECS,
        ))),
        Ok(PassOutcome::Invalid) => {
            metrics::record_error(KIND_HORREUM, "configuration_error");
            Ok(Action::await_change())
        }
        Err(e) => {
            error!("Failed to reconcile Horreum {}: {}", horreum.name_any(), e);
            metrics::record_reconciliation_error(KIND_HORREUM, start.elapsed());
            metrics::record_error(KIND_HORREUM, e.error_type());
            Err(e)
        }
    }
}

/// Error policy for the `Horreum` controller
fn error_policy(_resource: Arc<Horreum>, _err: &ReconcileError, _ctx: Arc<Context>) -> Action {
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
}

/// Serve `/metrics` and `/healthz`
async fn run_metrics_server(port: u16) -> Result<()> {
    let app = Router::new()
        .route(METRICS_SERVER_PATH, get(metrics_handler))
        .route("/healthz", get(|| async { "ok" }));

    let listener = tokio::net::TcpListener::bind((METRICS_SERVER_BIND_ADDRESS, port)).await?;
    info!("Metrics server listening on {METRICS_SERVER_BIND_ADDRESS}:{port}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn metrics_handler() -> impl IntoResponse {
    match metrics::gather_metrics() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            error!("Failed to encode metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
