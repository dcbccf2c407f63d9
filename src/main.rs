// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context as _, Result};
use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use digicloud_issuer::{
    authority::UnimplementedAuthority,
    constants::{
        ERROR_REQUEUE_DURATION_SECS, KIND_CERTIFICATE_REQUEST, KIND_DIGICLOUD_CLUSTER_ISSUER,
        KIND_DIGICLOUD_ISSUER, METRICS_SERVER_PATH, TOKIO_WORKER_THREADS,
    },
    context::{Context, OperatorSettings},
    crd::{CertificateRequest, DigicloudClusterIssuer, DigicloudIssuer},
    digicloud::build_http_client,
    metrics,
    reconcilers::{
        issuer::issuer_recheck_action, reconcile_certificate_request,
        reconcile_digicloud_cluster_issuer, reconcile_digicloud_issuer,
    },
};
use futures::StreamExt;
use kube::{
    runtime::{controller::Action, watcher::Config, Controller},
    Api, Client, ResourceExt,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
struct ControllerError(#[from] anyhow::Error);

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("digicloud-issuer")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    // Initialize logging
    // Format: timestamp file:line LEVEL message
    //
    // Respects RUST_LOG environment variable if set, otherwise defaults to INFO level
    // Example: RUST_LOG=debug cargo run
    //
    // Respects RUST_LOG_FORMAT environment variable for output format
    // Example: RUST_LOG_FORMAT=json cargo run
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

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

    info!("Starting DigiCloud DNS-01 issuer");

    let settings = OperatorSettings::from_env().context("Invalid operator settings")?;
    info!(
        cluster_resource_namespace = %settings.cluster_resource_namespace,
        metrics_bind_address = %settings.metrics_bind_address,
        reconcile_timeout = ?settings.reconcile_timeout,
        "Loaded operator settings"
    );

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let http_client = build_http_client().context("Failed to build DigiCloud HTTP client")?;
    let metrics_address = settings.metrics_bind_address;
    let ctx = Arc::new(Context::new(
        client,
        settings,
        http_client,
        Arc::new(UnimplementedAuthority),
    ));

    info!("Starting all controllers");

    // Controllers should never exit - if one fails, we log it and exit the main process
    tokio::select! {
        result = run_certificaterequest_controller(ctx.clone()) => {
            error!("CRITICAL: CertificateRequest controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("CertificateRequest controller exited unexpectedly without error")
        }
        result = run_digicloudissuer_controller(ctx.clone()) => {
            error!("CRITICAL: DigicloudIssuer controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("DigicloudIssuer controller exited unexpectedly without error")
        }
        result = run_digicloudclusterissuer_controller(ctx.clone()) => {
            error!("CRITICAL: DigicloudClusterIssuer controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("DigicloudClusterIssuer controller exited unexpectedly without error")
        }
        result = run_metrics_server(metrics_address) => {
            error!("CRITICAL: Metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Metrics server exited unexpectedly without error")
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal, stopping controllers");
            Ok(())
        }
    }
}

/// Serve Prometheus metrics
async fn run_metrics_server(address: SocketAddr) -> Result<()> {
    let app = Router::new().route(METRICS_SERVER_PATH, get(metrics_handler));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .with_context(|| format!("Failed to bind metrics server to {address}"))?;
    info!("Metrics server listening on {}", address);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn metrics_handler() -> impl IntoResponse {
    match metrics::gather_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Run the `CertificateRequest` controller
async fn run_certificaterequest_controller(ctx: Arc<Context>) -> Result<()> {
    info!("Starting CertificateRequest controller");

    let api = Api::<CertificateRequest>::all(ctx.client.clone());

    Controller::new(api, Config::default())
        .run(reconcile_certificaterequest_wrapper, error_policy, ctx)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Run the `DigicloudIssuer` controller
async fn run_digicloudissuer_controller(ctx: Arc<Context>) -> Result<()> {
    info!("Starting DigicloudIssuer controller");

    let api = Api::<DigicloudIssuer>::all(ctx.client.clone());

    Controller::new(api, Config::default())
        .run(reconcile_digicloudissuer_wrapper, error_policy, ctx)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Run the `DigicloudClusterIssuer` controller
async fn run_digicloudclusterissuer_controller(ctx: Arc<Context>) -> Result<()> {
    info!("Starting DigicloudClusterIssuer controller");

    let api = Api::<DigicloudClusterIssuer>::all(ctx.client.clone());

    Controller::new(api, Config::default())
        .run(reconcile_digicloudclusterissuer_wrapper, error_policy, ctx)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Reconcile wrapper for `CertificateRequest`
async fn reconcile_certificaterequest_wrapper(
    request: Arc<CertificateRequest>,
    ctx: Arc<Context>,
) -> Result<Action, ControllerError> {
    let start = Instant::now();
    let name = request.name_any();
    let namespace = request.namespace().unwrap_or_default();

    match reconcile_certificate_request(ctx, request).await {
        Ok(action) => {
            debug!(name = %name, namespace = %namespace, "Reconciled CertificateRequest");
            metrics::record_reconciliation_success(KIND_CERTIFICATE_REQUEST, start.elapsed());
            Ok(action)
        }
        Err(e) => {
            error!(
                name = %name,
                namespace = %namespace,
                "Failed to reconcile CertificateRequest: {:#}",
                e
            );
            metrics::record_reconciliation_error(KIND_CERTIFICATE_REQUEST, start.elapsed());
            metrics::record_reconciliation_requeue(KIND_CERTIFICATE_REQUEST, "error");
            Err(e.into())
        }
    }
}

/// Reconcile wrapper for `DigicloudIssuer`
async fn reconcile_digicloudissuer_wrapper(
    issuer: Arc<DigicloudIssuer>,
    ctx: Arc<Context>,
) -> Result<Action, ControllerError> {
    let start = Instant::now();
    let name = issuer.name_any();

    match reconcile_digicloud_issuer(ctx, issuer).await {
        Ok(()) => {
            debug!("Successfully reconciled DigicloudIssuer: {}", name);
            metrics::record_reconciliation_success(KIND_DIGICLOUD_ISSUER, start.elapsed());
            Ok(issuer_recheck_action())
        }
        Err(e) => {
            error!("Failed to reconcile DigicloudIssuer {}: {:#}", name, e);
            metrics::record_reconciliation_error(KIND_DIGICLOUD_ISSUER, start.elapsed());
            Err(e.into())
        }
    }
}

/// Reconcile wrapper for `DigicloudClusterIssuer`
async fn reconcile_digicloudclusterissuer_wrapper(
    issuer: Arc<DigicloudClusterIssuer>,
    ctx: Arc<Context>,
) -> Result<Action, ControllerError> {
    let start = Instant::now();
    let name = issuer.name_any();

    match reconcile_digicloud_cluster_issuer(ctx, issuer).await {
        Ok(()) => {
            debug!("Successfully reconciled DigicloudClusterIssuer: {}", name);
            metrics::record_reconciliation_success(KIND_DIGICLOUD_CLUSTER_ISSUER, start.elapsed());
            Ok(issuer_recheck_action())
        }
        Err(e) => {
            error!("Failed to reconcile DigicloudClusterIssuer {}: {:#}", name, e);
            metrics::record_reconciliation_error(KIND_DIGICLOUD_CLUSTER_ISSUER, start.elapsed());
            Err(e.into())
        }
    }
}

/// Error policy for all controllers
fn error_policy(
    _resource: Arc<impl std::fmt::Debug>,
    _err: &ControllerError,
    _ctx: Arc<Context>,
) -> Action {
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
}
