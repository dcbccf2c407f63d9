// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `CertificateRequest` reconciliation: the DNS-01 challenge state machine.
//!
//! The state of a request is never stored separately. It is derived from the Ready
//! condition on every pass:
//!
//! | Ready condition | State |
//! |-----------------|-------|
//! | absent | `Unprocessed` |
//! | False / Pending, any other message | `ValidatingIssuer` |
//! | False / Pending, "DNS validation in progress..." | `ChallengePending` |
//! | True / Issued, or a certificate is present | `Issued` |
//! | False / Failed | `Failed` |
//!
//! Waiting for propagation is expressed as a requeue, never as a sleep. Each pass
//! produces a [`ReconcileOutcome`]; the kube wrapper persists its status and turns
//! `requeue_after` into an [`Action`].
//!
//! Challenge records are never remembered. The key authorization for a request and
//! domain is deterministic, so cleanup recomputes the TXT content and deletes by
//! content match.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use k8s_openapi::ByteString;
use kube::runtime::controller::Action;
use kube::ResourceExt;
use reqwest::Client as HttpClient;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::authority::{AuthorityError, CertificateAuthority, RequestIdentity};
use crate::challenge::ChallengeRecord;
use crate::constants::{ISSUER_NOT_READY_REQUEUE_SECS, KIND_CERTIFICATE_REQUEST};
use crate::context::Context;
use crate::crd::{CertificateRequest, CertificateRequestStatus, Condition};
use crate::csr::requested_dns_names;
use crate::digicloud::{ChallengeRecordManager, DigicloudClient};
use crate::dns_errors::DnsError;
use crate::issuer::{is_digicloud_issuer, IssuerConfig, IssuerError, IssuerSource};
use crate::metrics;
use crate::reconcilers::status::{
    certificate_request_status_equal, find_condition, upsert_condition,
    write_certificate_request_status,
};
use crate::status_reasons::{
    pending_authority_message, pending_issuer_message, CONDITION_TYPE_READY, MESSAGE_CERTIFICATE_ISSUED,
    MESSAGE_DNS_VALIDATION_IN_PROGRESS, REASON_FAILED, REASON_ISSUED, REASON_PENDING,
    STATUS_FALSE, STATUS_TRUE,
};

/// Lifecycle state of a request, derived from its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestState {
    /// No Ready condition yet
    Unprocessed,
    /// Pending on issuer resolution; no challenge records exist
    ValidatingIssuer,
    /// Challenge records published at `since`
    ChallengePending {
        /// When the records were published; `None` if the timestamp is missing or unparseable
        since: Option<DateTime<Utc>>,
    },
    /// Certificate issued
    Issued,
    /// Permanently failed
    Failed,
}

impl RequestState {
    /// Issued and Failed are never processed again.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Issued | Self::Failed)
    }
}

/// Derives the lifecycle state from a request's status.
#[must_use]
pub fn derive_state(status: Option<&CertificateRequestStatus>) -> RequestState {
    let Some(status) = status else {
        return RequestState::Unprocessed;
    };

    if status.has_certificate() {
        return RequestState::Issued;
    }

    let Some(ready) = find_condition(&status.conditions, CONDITION_TYPE_READY) else {
        return RequestState::Unprocessed;
    };

    match (ready.status.as_str(), ready.reason.as_deref()) {
        (STATUS_TRUE, Some(REASON_ISSUED)) => RequestState::Issued,
        (STATUS_FALSE, Some(REASON_FAILED)) => RequestState::Failed,
        (STATUS_FALSE, Some(REASON_PENDING)) => {
            let challenge_published = ready
                .message
                .as_deref()
                .is_some_and(|message| message.starts_with(MESSAGE_DNS_VALIDATION_IN_PROGRESS));
            if challenge_published {
                RequestState::ChallengePending {
                    since: ready
                        .last_transition_time
                        .as_deref()
                        .and_then(|time| DateTime::parse_from_rfc3339(time).ok())
                        .map(|time| time.with_timezone(&Utc)),
                }
            } else {
                RequestState::ValidatingIssuer
            }
        }
        _ => RequestState::Unprocessed,
    }
}

/// Propagation settings taken from the issuer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengeTiming {
    pub propagation_timeout: Duration,
    pub polling_interval: Duration,
}

impl From<&IssuerConfig> for ChallengeTiming {
    fn from(config: &IssuerConfig) -> Self {
        Self {
            propagation_timeout: config.propagation_timeout,
            polling_interval: config.polling_interval,
        }
    }
}

/// What a pass should do for a request in a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Terminal; nothing to do
    Skip,
    /// Publish challenge records
    StartChallenge,
    /// Propagation still running; look again after the duration
    Wait(Duration),
    /// Propagation timeout elapsed; complete the challenge
    Complete,
}

/// Decides the next step from the derived state and the current time.
///
/// While pending, the wait is the polling interval capped by the propagation time
/// remaining. A pending request without a usable timestamp is treated as elapsed.
#[must_use]
pub fn decide(state: &RequestState, now: DateTime<Utc>, timing: ChallengeTiming) -> Decision {
    match state {
        RequestState::Issued | RequestState::Failed => Decision::Skip,
        RequestState::Unprocessed | RequestState::ValidatingIssuer => Decision::StartChallenge,
        RequestState::ChallengePending { since: None } => Decision::Complete,
        RequestState::ChallengePending { since: Some(since) } => {
            // A timestamp in the future counts as zero elapsed.
            let elapsed = (now - *since).to_std().unwrap_or(Duration::ZERO);
            if elapsed >= timing.propagation_timeout {
                Decision::Complete
            } else {
                let remaining = timing.propagation_timeout - elapsed;
                Decision::Wait(timing.polling_interval.min(remaining))
            }
        }
    }
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileOutcome {
    /// Status to persist; `None` when nothing observable changed
    pub status: Option<CertificateRequestStatus>,
    /// When to look at the request again; `None` waits for the next change
    pub requeue_after: Option<Duration>,
}

impl ReconcileOutcome {
    /// No write and no requeue.
    #[must_use]
    pub fn idle() -> Self {
        Self::default()
    }

    /// Builds an outcome, dropping `status` when it matches what is already stored.
    fn new(
        request: &CertificateRequest,
        status: CertificateRequestStatus,
        requeue_after: Option<Duration>,
    ) -> Self {
        let status = if certificate_request_status_equal(request.status.as_ref(), &status) {
            None
        } else {
            Some(status)
        };
        Self {
            status,
            requeue_after,
        }
    }

    /// Maps the requeue delay to a controller action.
    #[must_use]
    pub fn action(&self) -> Action {
        match self.requeue_after {
            Some(delay) => Action::requeue(delay),
            None => Action::await_change(),
        }
    }
}

/// Errors that abort a pass without writing status. The controller requeues them.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// A challenge record could not be published; already-created records were removed
    #[error("failed to publish DNS-01 challenge for {domain}: {source}")]
    Publish {
        /// Domain whose record failed
        domain: String,
        /// Underlying DNS error
        #[source]
        source: DnsError,
    },

    /// The pass did not finish before its deadline
    #[error("reconciliation of CertificateRequest {namespace}/{name} timed out after {seconds}s")]
    Timeout {
        namespace: String,
        name: String,
        seconds: u64,
    },
}

/// Drives certificate requests through the DNS-01 challenge.
#[derive(Clone)]
pub struct ChallengeEngine {
    issuers: Arc<dyn IssuerSource>,
    authority: Arc<dyn CertificateAuthority>,
    http: HttpClient,
}

impl ChallengeEngine {
    #[must_use]
    pub fn new(
        issuers: Arc<dyn IssuerSource>,
        authority: Arc<dyn CertificateAuthority>,
        http: HttpClient,
    ) -> Self {
        Self {
            issuers,
            authority,
            http,
        }
    }

    /// Runs one pass for `request` at time `now`.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Publish`] when the DNS provider rejects a record
    /// creation. The pass is abandoned with no status change.
    pub async fn reconcile(
        &self,
        request: &CertificateRequest,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let namespace = request.namespace().unwrap_or_default();
        let name = request.name_any();

        let state = derive_state(request.status.as_ref());
        if state.is_terminal() {
            debug!(
                name = %name,
                namespace = %namespace,
                state = ?state,
                "CertificateRequest already in terminal state, skipping"
            );
            return Ok(ReconcileOutcome::idle());
        }

        let config = match self
            .issuers
            .resolve(&namespace, &request.spec.issuer_ref)
            .await
        {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    name = %name,
                    namespace = %namespace,
                    issuer = %request.spec.issuer_ref.name,
                    error = %e,
                    "Issuer not ready"
                );
                metrics::record_error(KIND_CERTIFICATE_REQUEST, e.category());
                return Ok(issuer_unavailable(request, &state, &e, now));
            }
        };

        let domains = match requested_dns_names(&request.spec.request.0) {
            Ok(domains) => domains,
            Err(e) => {
                error!(
                    name = %name,
                    namespace = %namespace,
                    error = %e,
                    "Malformed certificate signing request"
                );
                return Ok(failed(request, &format!("Failed to parse CSR: {e}"), now));
            }
        };

        let identity = RequestIdentity {
            namespace,
            name,
            uid: request.uid().unwrap_or_default(),
        };
        let records = DigicloudClient::new(self.http.clone(), &config);
        let timing = ChallengeTiming::from(&config);

        match decide(&state, now, timing) {
            Decision::Skip => Ok(ReconcileOutcome::idle()),
            Decision::StartChallenge => {
                self.start_challenge(request, &identity, &domains, &records, &config, now)
                    .await
            }
            Decision::Wait(delay) => {
                debug!(
                    name = %identity.name,
                    namespace = %identity.namespace,
                    requeue_after = ?delay,
                    "Waiting for DNS propagation"
                );
                Ok(still_pending(request, delay))
            }
            Decision::Complete => Ok(self
                .complete_challenge(request, &identity, &domains, &records, timing, now)
                .await),
        }
    }

    /// Publishes one TXT record per domain and moves the request to `ChallengePending`.
    async fn start_challenge(
        &self,
        request: &CertificateRequest,
        identity: &RequestIdentity,
        domains: &[String],
        records: &dyn ChallengeRecordManager,
        config: &IssuerConfig,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let mut published: Vec<ChallengeRecord> = Vec::with_capacity(domains.len());

        for domain in domains {
            let key_authorization = match self.authority.key_authorization(identity, domain).await
            {
                Ok(key_authorization) => key_authorization,
                Err(e) => {
                    remove_challenge_records(records, &published).await;
                    return Ok(failed(request, &e.to_string(), now));
                }
            };

            let challenge = ChallengeRecord::new(domain, &key_authorization);
            match records
                .present(&challenge.fqdn, &challenge.value, config.ttl)
                .await
            {
                Ok(zone_record) => {
                    info!(
                        name = %identity.name,
                        namespace = %identity.namespace,
                        domain = %domain,
                        zone = %zone_record.zone,
                        record = %zone_record.label,
                        "Published DNS-01 challenge record"
                    );
                    published.push(challenge);
                }
                Err(e) => {
                    metrics::record_error(KIND_CERTIFICATE_REQUEST, e.category());
                    remove_challenge_records(records, &published).await;
                    if e.is_transient() {
                        return Err(ReconcileError::Publish {
                            domain: domain.clone(),
                            source: e,
                        });
                    }
                    return Ok(failed(request, &e.to_string(), now));
                }
            }
        }

        let status = with_ready(
            request,
            ready_condition(
                STATUS_FALSE,
                REASON_PENDING,
                MESSAGE_DNS_VALIDATION_IN_PROGRESS,
                now.to_rfc3339(),
            ),
        );
        Ok(ReconcileOutcome::new(
            request,
            status,
            Some(config.polling_interval),
        ))
    }

    /// Asks the authority to finish the challenge, then removes every record.
    ///
    /// Records are located by their content, so all of them must be recomputed
    /// before anything is completed or removed. If one cannot be, the request stays
    /// pending with its records in place and completion is tried again later.
    async fn complete_challenge(
        &self,
        request: &CertificateRequest,
        identity: &RequestIdentity,
        domains: &[String],
        records: &dyn ChallengeRecordManager,
        timing: ChallengeTiming,
        now: DateTime<Utc>,
    ) -> ReconcileOutcome {
        let mut challenges = Vec::with_capacity(domains.len());
        for domain in domains {
            match self.authority.key_authorization(identity, domain).await {
                Ok(key_authorization) => {
                    challenges.push(ChallengeRecord::new(domain, &key_authorization));
                }
                Err(e) => {
                    warn!(
                        name = %identity.name,
                        namespace = %identity.namespace,
                        domain = %domain,
                        error = %e,
                        "Cannot recompute challenge record, keeping request pending"
                    );
                    metrics::record_error(KIND_CERTIFICATE_REQUEST, "authority");
                    return authority_unavailable(request, &e, timing.polling_interval);
                }
            }
        }

        let result = self.authority.complete_challenge(domains, &challenges).await;

        remove_challenge_records(records, &challenges).await;

        match result {
            Ok(issued) => {
                info!(
                    name = %identity.name,
                    namespace = %identity.namespace,
                    "Certificate issued"
                );
                metrics::record_certificate_outcome("issued");
                let mut status = with_ready(
                    request,
                    ready_condition(
                        STATUS_TRUE,
                        REASON_ISSUED,
                        MESSAGE_CERTIFICATE_ISSUED,
                        now.to_rfc3339(),
                    ),
                );
                status.certificate = Some(ByteString(issued.certificate));
                if let Some(ca) = issued.ca {
                    status.ca = Some(ByteString(ca));
                }
                ReconcileOutcome::new(request, status, None)
            }
            Err(e) => {
                error!(
                    name = %identity.name,
                    namespace = %identity.namespace,
                    error = %e,
                    "Certificate authority did not complete the challenge"
                );
                failed(request, &e.to_string(), now)
            }
        }
    }
}

/// Removes the given challenge records. Failures are logged and counted, never returned.
async fn remove_challenge_records(
    records: &dyn ChallengeRecordManager,
    challenges: &[ChallengeRecord],
) {
    for challenge in challenges {
        match records.cleanup(&challenge.fqdn, &challenge.value).await {
            Ok(true) => {
                debug!(
                    domain = %challenge.domain,
                    record = %challenge.fqdn,
                    "Removed DNS-01 challenge record"
                );
            }
            Ok(false) => {}
            Err(e) => {
                warn!(
                    domain = %challenge.domain,
                    record = %challenge.fqdn,
                    error = %e,
                    "Failed to remove DNS-01 challenge record"
                );
                metrics::record_error(KIND_CERTIFICATE_REQUEST, "cleanup");
            }
        }
    }
}

fn ready_condition(status: &str, reason: &str, message: &str, time: String) -> Condition {
    Condition {
        r#type: CONDITION_TYPE_READY.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(time),
    }
}

fn with_ready(request: &CertificateRequest, condition: Condition) -> CertificateRequestStatus {
    let mut status = request.status.clone().unwrap_or_default();
    upsert_condition(&mut status.conditions, condition);
    status
}

fn existing_ready(request: &CertificateRequest) -> Option<&Condition> {
    request
        .status
        .as_ref()
        .and_then(|status| find_condition(&status.conditions, CONDITION_TYPE_READY))
}

fn failed(request: &CertificateRequest, message: &str, now: DateTime<Utc>) -> ReconcileOutcome {
    metrics::record_certificate_outcome("failed");
    let mut status = with_ready(
        request,
        ready_condition(STATUS_FALSE, REASON_FAILED, message, now.to_rfc3339()),
    );
    status.failure_time = Some(now.to_rfc3339());
    ReconcileOutcome::new(request, status, None)
}

/// Keeps the request pending while the issuer cannot be resolved.
///
/// A request with published records stays in `ChallengePending` with its original
/// timestamp, so no second set of records is created once the issuer returns.
fn issuer_unavailable(
    request: &CertificateRequest,
    state: &RequestState,
    error: &IssuerError,
    now: DateTime<Utc>,
) -> ReconcileOutcome {
    let existing = existing_ready(request);
    let pending_since = existing
        .filter(|ready| {
            ready.status == STATUS_FALSE && ready.reason.as_deref() == Some(REASON_PENDING)
        })
        .and_then(|ready| ready.last_transition_time.clone());

    let message = match state {
        RequestState::ChallengePending { .. } => pending_issuer_message(&error.to_string()),
        _ => format!("Failed to get issuer: {error}"),
    };

    let status = with_ready(
        request,
        ready_condition(
            STATUS_FALSE,
            REASON_PENDING,
            &message,
            pending_since.unwrap_or_else(|| now.to_rfc3339()),
        ),
    );
    metrics::record_reconciliation_requeue(KIND_CERTIFICATE_REQUEST, "issuer_not_ready");
    ReconcileOutcome::new(
        request,
        status,
        Some(Duration::from_secs(ISSUER_NOT_READY_REQUEUE_SECS)),
    )
}

/// Keeps a challenge pending while the authority cannot recompute its records.
///
/// The published records and the original timestamp are left untouched.
fn authority_unavailable(
    request: &CertificateRequest,
    error: &AuthorityError,
    delay: Duration,
) -> ReconcileOutcome {
    metrics::record_reconciliation_requeue(KIND_CERTIFICATE_REQUEST, "authority_not_ready");
    let Some(ready) = existing_ready(request) else {
        return ReconcileOutcome {
            status: None,
            requeue_after: Some(delay),
        };
    };

    let mut condition = ready.clone();
    condition.message = Some(pending_authority_message(&error.to_string()));
    ReconcileOutcome::new(request, with_ready(request, condition), Some(delay))
}

/// Keeps waiting, restoring the plain pending message if an outage changed it.
fn still_pending(request: &CertificateRequest, delay: Duration) -> ReconcileOutcome {
    metrics::record_reconciliation_requeue(KIND_CERTIFICATE_REQUEST, "propagation_wait");
    let Some(ready) = existing_ready(request) else {
        return ReconcileOutcome {
            status: None,
            requeue_after: Some(delay),
        };
    };

    let mut condition = ready.clone();
    condition.message = Some(MESSAGE_DNS_VALIDATION_IN_PROGRESS.to_string());
    ReconcileOutcome::new(request, with_ready(request, condition), Some(delay))
}

/// Reconcile a `CertificateRequest` observed by the controller.
///
/// Requests for other issuers are ignored. The pass runs under the configured
/// deadline; an expired pass writes nothing.
///
/// # Errors
///
/// Returns an error when the pass fails, times out, or the status cannot be written.
pub async fn reconcile_certificate_request(
    ctx: Arc<Context>,
    request: Arc<CertificateRequest>,
) -> Result<Action> {
    let namespace = request.namespace().unwrap_or_default();
    let name = request.name_any();

    if !is_digicloud_issuer(&request.spec.issuer_ref) {
        debug!(
            name = %name,
            namespace = %namespace,
            group = %request.spec.issuer_ref.group,
            kind = %request.spec.issuer_ref.kind,
            "CertificateRequest is for another issuer, ignoring"
        );
        return Ok(Action::await_change());
    }

    debug!(name = %name, namespace = %namespace, "Reconciling CertificateRequest");

    let deadline = ctx.settings.reconcile_timeout;
    let outcome = tokio::time::timeout(deadline, ctx.engine.reconcile(&request, Utc::now()))
        .await
        .map_err(|_| ReconcileError::Timeout {
            namespace: namespace.clone(),
            name: name.clone(),
            seconds: deadline.as_secs(),
        })??;

    if let Some(status) = &outcome.status {
        write_certificate_request_status(&ctx.client, &request, status).await?;
    }

    Ok(outcome.action())
}

#[cfg(test)]
#[path = "certificaterequest_tests.rs"]
mod certificaterequest_tests;
