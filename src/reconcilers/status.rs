// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ready-condition bookkeeping and status writers.
//!
//! Every resource this operator touches reports through a single `Ready`
//! condition. Helpers here keep exactly one condition per type, carry the
//! transition time over while the status value is unchanged, and decide whether a
//! computed status differs from the stored one. The writers at the bottom persist
//! status through the status subresource.

use crate::crd::{CertificateRequest, CertificateRequestStatus, Condition, IssuerStatus};
use crate::reconcilers::retry::{conflict_backoff, is_conflict, retry_kube_call};
use crate::status_reasons::CONDITION_TYPE_READY;
use anyhow::{Context, Result};
use chrono::Utc;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::fmt::Debug;
use tracing::{debug, warn};

/// True when `new_condition` reports something `existing` does not.
///
/// Only status and message count. A reason or timestamp difference alone is
/// not worth a write.
#[must_use]
pub fn condition_changed(existing: &Option<Condition>, new_condition: &Condition) -> bool {
    existing.as_ref().is_none_or(|current| {
        current.r#type != new_condition.r#type
            || current.status != new_condition.status
            || current.message != new_condition.message
    })
}

#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// Replace the condition of the same type in place, or append it.
///
/// Duplicates of that type are dropped; other types keep their position.
pub fn upsert_condition(conditions: &mut Vec<Condition>, condition: Condition) {
    let condition_type = condition.r#type.clone();
    let Some(index) = conditions.iter().position(|c| c.r#type == condition_type) else {
        conditions.push(condition);
        return;
    };

    conditions[index] = condition;
    let mut first = true;
    conditions.retain(|c| {
        if c.r#type != condition_type {
            return true;
        }
        std::mem::replace(&mut first, false)
    });
}

/// Set a condition without touching the API server.
///
/// `lastTransitionTime` is kept when `status` matches the stored value and
/// stamped with the current time otherwise.
pub fn update_condition_in_memory(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) {
    let last_transition_time = find_condition(conditions, condition_type)
        .filter(|existing| existing.status == status)
        .and_then(|existing| existing.last_transition_time.clone())
        .unwrap_or_else(|| Utc::now().to_rfc3339());

    upsert_condition(
        conditions,
        Condition {
            r#type: condition_type.to_string(),
            status: status.to_string(),
            reason: Some(reason.to_string()),
            message: Some(message.to_string()),
            last_transition_time: Some(last_transition_time),
        },
    );
}

/// Same set of condition types with the same status, reason and message.
///
/// Order and transition times are ignored.
#[must_use]
pub fn conditions_equal(current: &[Condition], new: &[Condition]) -> bool {
    current.len() == new.len()
        && new.iter().all(|wanted| {
            find_condition(current, &wanted.r#type).is_some_and(|have| {
                have.status == wanted.status
                    && have.reason == wanted.reason
                    && have.message == wanted.message
            })
        })
}

/// Returns true when `new` would not change anything a consumer can observe.
///
/// Transition timestamps of otherwise identical conditions are ignored.
#[must_use]
pub fn certificate_request_status_equal(
    current: Option<&CertificateRequestStatus>,
    new: &CertificateRequestStatus,
) -> bool {
    let Some(current) = current else {
        return false;
    };
    conditions_equal(&current.conditions, &new.conditions)
        && current.certificate == new.certificate
        && current.ca == new.ca
        && current.failure_time == new.failure_time
}

/// Re-applies a computed status onto the latest status read from the API server.
///
/// The computed Ready condition replaces the latest one; other condition types
/// written by someone else are kept. Certificate, CA and failure time are only
/// overwritten when the computed status carries them.
#[must_use]
pub fn merge_certificate_request_status(
    latest: Option<&CertificateRequestStatus>,
    computed: &CertificateRequestStatus,
) -> CertificateRequestStatus {
    let mut merged = latest.cloned().unwrap_or_default();

    if let Some(ready) = find_condition(&computed.conditions, CONDITION_TYPE_READY) {
        upsert_condition(&mut merged.conditions, ready.clone());
    }
    if computed.certificate.is_some() {
        merged.certificate.clone_from(&computed.certificate);
    }
    if computed.ca.is_some() {
        merged.ca.clone_from(&computed.ca);
    }
    if computed.failure_time.is_some() {
        merged.failure_time.clone_from(&computed.failure_time);
    }
    merged
}

/// Builds a status merge patch guarded by the object's `resourceVersion`.
///
/// With a resource version present the API server rejects the patch with 409
/// if the object changed since it was read.
#[must_use]
pub fn status_patch<S: Serialize>(resource_version: Option<&str>, status: &S) -> serde_json::Value {
    match resource_version {
        Some(version) => json!({
            "metadata": { "resourceVersion": version },
            "status": status,
        }),
        None => json!({ "status": status }),
    }
}

/// Persist a `CertificateRequest` status, retrying on optimistic-concurrency conflicts.
///
/// On HTTP 409 the latest object is re-read, the computed status is re-applied
/// onto it with [`merge_certificate_request_status`], and the write is retried with
/// [`conflict_backoff`].
///
/// # Errors
///
/// Returns an error if the write fails with anything other than a conflict, or if
/// conflicts persist past the backoff budget.
pub async fn write_certificate_request_status(
    client: &Client,
    request: &CertificateRequest,
    status: &CertificateRequestStatus,
) -> Result<()> {
    let namespace = request.namespace().unwrap_or_default();
    let name = request.name_any();
    let api: Api<CertificateRequest> = Api::namespaced(client.clone(), &namespace);

    let mut resource_version = request.resource_version();
    let mut desired = status.clone();
    let mut backoff = conflict_backoff();
    let mut attempt = 0;

    loop {
        attempt += 1;
        let patch = status_patch(resource_version.as_deref(), &desired);

        match api
            .patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
        {
            Ok(_) => {
                debug!(
                    name = %name,
                    namespace = %namespace,
                    attempt = attempt,
                    "Updated CertificateRequest status"
                );
                return Ok(());
            }
            Err(e) if is_conflict(&e) => {
                let Some(delay) = backoff.next_delay() else {
                    return Err(anyhow::anyhow!(
                        "Status write for CertificateRequest {namespace}/{name} still conflicting after {attempt} attempts: {e}"
                    ));
                };
                warn!(
                    name = %name,
                    namespace = %namespace,
                    attempt = attempt,
                    retry_after = ?delay,
                    "CertificateRequest changed during status write, re-reading"
                );
                tokio::time::sleep(delay).await;

                let latest = retry_kube_call(
                    &format!("get certificaterequest {namespace}/{name}"),
                    || api.get(&name),
                )
                .await?;
                desired = merge_certificate_request_status(latest.status.as_ref(), status);
                resource_version = latest.resource_version();
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to update status of CertificateRequest {namespace}/{name}")
                });
            }
        }
    }
}

/// Patch the status of a `DigicloudIssuer` or `DigicloudClusterIssuer`.
///
/// # Errors
///
/// Returns an error if the Kubernetes API call fails.
pub async fn patch_issuer_status<K>(api: &Api<K>, name: &str, status: &IssuerStatus) -> Result<()>
where
    K: Clone + DeserializeOwned + Debug,
{
    let patch = json!({ "status": status });
    api.patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .with_context(|| format!("Failed to update issuer status for {name}"))?;
    Ok(())
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
