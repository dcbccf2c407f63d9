// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Backoff and retry for the Kubernetes API calls the reconcilers make.
//!
//! Two policies exist:
//!
//! - [`API_READ_POLICY`] for plain reads, retried on rate limiting, server errors
//!   and connection failures through [`retry_kube_call`].
//! - [`STATUS_CONFLICT_POLICY`] for status writes rejected with 409. The caller
//!   re-reads the object between attempts, so these are short and frequent.
//!
//! DigiCloud calls are never retried here. A failed record operation fails the pass
//! and the controller requeues it.

use std::future::Future;
use std::time::{Duration, Instant};

use anyhow::Result;
use rand::Rng;
use tracing::{debug, error, warn};

/// Shape of an exponential backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    /// First delay
    pub initial_interval: Duration,
    /// Upper bound for any single delay
    pub max_interval: Duration,
    /// Total time after which no further delay is handed out
    pub budget: Duration,
    /// Growth factor between consecutive delays
    pub multiplier: f64,
    /// Fraction of each delay applied as random jitter in both directions
    pub jitter: f64,
}

/// Reads: 100ms doubling to 30s, for at most 5 minutes.
pub const API_READ_POLICY: BackoffPolicy = BackoffPolicy {
    initial_interval: Duration::from_millis(100),
    max_interval: Duration::from_secs(30),
    budget: Duration::from_secs(300),
    multiplier: 2.0,
    jitter: 0.1,
};

/// Status write conflicts: 50ms doubling to 2s, for at most 30 seconds.
pub const STATUS_CONFLICT_POLICY: BackoffPolicy = BackoffPolicy {
    initial_interval: Duration::from_millis(50),
    max_interval: Duration::from_secs(2),
    budget: Duration::from_secs(30),
    multiplier: 2.0,
    jitter: 0.1,
};

/// Running backoff schedule for one operation.
#[derive(Debug)]
pub struct Backoff {
    policy: BackoffPolicy,
    interval: Duration,
    started: Instant,
}

impl Backoff {
    #[must_use]
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            interval: policy.initial_interval,
            started: Instant::now(),
        }
    }

    /// Returns the next delay, or `None` once the policy's budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.started.elapsed() >= self.policy.budget {
            return None;
        }

        let delay = jittered(self.interval, self.policy.jitter);
        self.interval = self
            .interval
            .mul_f64(self.policy.multiplier)
            .min(self.policy.max_interval);
        Some(delay)
    }
}

fn jittered(interval: Duration, jitter: f64) -> Duration {
    if jitter <= 0.0 {
        return interval;
    }
    let factor = rand::thread_rng().gen_range((1.0 - jitter)..=(1.0 + jitter));
    interval.mul_f64(factor.max(0.0))
}

/// Backoff for Kubernetes reads.
#[must_use]
pub fn api_read_backoff() -> Backoff {
    Backoff::new(API_READ_POLICY)
}

/// Backoff for status writes rejected because the object changed underneath.
#[must_use]
pub fn conflict_backoff() -> Backoff {
    Backoff::new(STATUS_CONFLICT_POLICY)
}

/// Returns `true` when the API server rejected a write because the object changed.
#[must_use]
pub fn is_conflict(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(status) if status.is_conflict())
}

/// Returns `true` for errors worth retrying: 429, any 5xx, and connection failures.
///
/// Every other client error (including 409) is returned to the caller immediately.
#[must_use]
pub fn is_transient(err: &kube::Error) -> bool {
    match err {
        kube::Error::Api(status) => status.code == 429 || (500..600).contains(&status.code),
        kube::Error::Service(_) => true,
        _ => false,
    }
}

/// Runs a Kubernetes API call, retrying transient failures with [`API_READ_POLICY`].
///
/// # Errors
///
/// Returns the first non-transient error, or the last transient one once the
/// backoff budget is spent.
///
/// # Example
///
/// ```no_run
/// use kube::{Api, Client};
/// use digicloud_issuer::crd::CertificateRequest;
/// use digicloud_issuer::reconcilers::retry::retry_kube_call;
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = Client::try_default().await?;
/// let api: Api<CertificateRequest> = Api::namespaced(client, "default");
///
/// let request = retry_kube_call("get certificaterequest default/web-tls-1", || {
///     api.get("web-tls-1")
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn retry_kube_call<T, F, Fut>(operation: &str, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, kube::Error>>,
{
    let mut backoff = api_read_backoff();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;

        let err = match call().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation, attempt, "Kubernetes API call succeeded after retries");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if !is_transient(&err) {
            return Err(anyhow::Error::new(err).context(format!("{operation} failed")));
        }

        let Some(delay) = backoff.next_delay() else {
            error!(operation, attempt, error = %err, "Retry budget spent, giving up");
            return Err(anyhow::Error::new(err)
                .context(format!("{operation} failed after {attempt} attempts")));
        };

        warn!(
            operation,
            attempt,
            retry_after = ?delay,
            error = %err,
            "Transient Kubernetes API error, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
