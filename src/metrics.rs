// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the DigiCloud issuer.
//!
//! Every metric is prefixed `digicloud_issuer_` and lives in [`METRICS_REGISTRY`],
//! which the operator binary serves on `/metrics`.
//!
//! | Metric | Labels |
//! |--------|--------|
//! | `reconciliations_total` | `resource_type`, `status` |
//! | `reconciliation_duration_seconds` | `resource_type` |
//! | `requeues_total` | `resource_type`, `reason` |
//! | `dns_operations_total` | `operation`, `status` |
//! | `dns_operation_duration_seconds` | `operation` |
//! | `certificates_total` | `outcome` |
//! | `errors_total` | `resource_type`, `error_type` |
//!
//! ```rust,no_run
//! use digicloud_issuer::metrics::record_reconciliation_success;
//!
//! record_reconciliation_success("CertificateRequest", std::time::Duration::from_secs(1));
//! ```

use prometheus::core::Collector;
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

const PREFIX: &str = "digicloud_issuer";

const STATUS_SUCCESS: &str = "success";
const STATUS_ERROR: &str = "error";
const STATUS_REQUEUE: &str = "requeue";

/// Reconcile passes range from sub-millisecond skips to the full pass deadline.
const RECONCILE_BUCKETS: &[f64] = &[0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0];

/// DigiCloud calls are bounded by the 30s HTTP timeout.
const DNS_CALL_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Registry holding every metric below.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Registers `metric` with [`METRICS_REGISTRY`] and hands it back.
///
/// Metric definitions are static, so a registration failure is a programming error.
#[allow(clippy::expect_used)]
fn registered<M: Collector + Clone + 'static>(metric: M) -> M {
    METRICS_REGISTRY
        .register(Box::new(metric.clone()))
        .expect("metric names are unique");
    metric
}

#[allow(clippy::expect_used)]
fn counter(name: &str, help: &str, labels: &[&str]) -> CounterVec {
    let opts = Opts::new(format!("{PREFIX}_{name}"), help);
    registered(CounterVec::new(opts, labels).expect("valid counter definition"))
}

#[allow(clippy::expect_used)]
fn histogram(name: &str, help: &str, labels: &[&str], buckets: &[f64]) -> HistogramVec {
    let opts = HistogramOpts::new(format!("{PREFIX}_{name}"), help).buckets(buckets.to_vec());
    registered(HistogramVec::new(opts, labels).expect("valid histogram definition"))
}

/// Reconcile passes by kind and result (`success`, `error`, `requeue`).
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "reconciliations_total",
        "Reconcile passes by resource type and result",
        &["resource_type", "status"],
    )
});

/// Wall time of reconcile passes.
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    histogram(
        "reconciliation_duration_seconds",
        "Reconcile pass duration in seconds by resource type",
        &["resource_type"],
        RECONCILE_BUCKETS,
    )
});

/// Requeues by kind and reason (`propagation_wait`, `issuer_not_ready`, `error`).
pub static REQUEUE_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "requeues_total",
        "Requeues by resource type and reason",
        &["resource_type", "reason"],
    )
});

/// DigiCloud record API calls by operation (`create`, `list`, `delete`) and result.
pub static DNS_OPERATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "dns_operations_total",
        "DigiCloud DNS API calls by operation and result",
        &["operation", "status"],
    )
});

/// Latency of DigiCloud record API calls.
pub static DNS_OPERATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    histogram(
        "dns_operation_duration_seconds",
        "DigiCloud DNS API call latency in seconds by operation",
        &["operation"],
        DNS_CALL_BUCKETS,
    )
});

/// Requests reaching a terminal state, by `issued` or `failed`.
pub static CERTIFICATES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "certificates_total",
        "Certificate requests reaching a terminal state by outcome",
        &["outcome"],
    )
});

/// Errors by kind and category (`credentials`, `transport`, `cleanup`, ...).
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "errors_total",
        "Errors by resource type and category",
        &["resource_type", "error_type"],
    )
});

fn observe_reconciliation(resource_type: &str, status: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, status])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a reconcile pass that returned `Ok`.
pub fn record_reconciliation_success(resource_type: &str, duration: Duration) {
    observe_reconciliation(resource_type, STATUS_SUCCESS, duration);
}

/// Record a reconcile pass that returned an error.
pub fn record_reconciliation_error(resource_type: &str, duration: Duration) {
    observe_reconciliation(resource_type, STATUS_ERROR, duration);
}

/// Record a requeue and why it happened.
pub fn record_reconciliation_requeue(resource_type: &str, reason: &str) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, STATUS_REQUEUE])
        .inc();
    REQUEUE_TOTAL
        .with_label_values(&[resource_type, reason])
        .inc();
}

/// Record one DigiCloud API call.
pub fn record_dns_operation(operation: &str, success: bool, duration: Duration) {
    let status = if success { STATUS_SUCCESS } else { STATUS_ERROR };
    DNS_OPERATIONS_TOTAL
        .with_label_values(&[operation, status])
        .inc();
    DNS_OPERATION_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration.as_secs_f64());
}

pub fn record_certificate_outcome(outcome: &str) {
    CERTIFICATES_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_error(resource_type: &str, error_type: &str) {
    ERRORS_TOTAL
        .with_label_values(&[resource_type, error_type])
        .inc();
}

/// Encode the registry in the Prometheus text exposition format.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&METRICS_REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
