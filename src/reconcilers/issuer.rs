// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `DigicloudIssuer` and `DigicloudClusterIssuer` reconciliation.
//!
//! Both kinds share one provisioner shape; they differ only in where the credential
//! secret is read from ([`IssuerScope`]). Each pass validates the provisioner and
//! reports the result as the Ready condition. The status is patched only when the
//! condition changes.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use kube::runtime::controller::Action;
use kube::{Api, ResourceExt};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::constants::ISSUER_RECHECK_SECS;
use crate::context::Context;
use crate::crd::{DigicloudClusterIssuer, DigicloudIssuer, IssuerProvisioner, IssuerStatus};
use crate::issuer::{load_issuer_config, IssuerConfig, IssuerError, IssuerScope};
use crate::metrics;
use crate::reconcilers::status::{
    condition_changed, find_condition, patch_issuer_status, update_condition_in_memory,
};
use crate::status_reasons::{
    CONDITION_TYPE_READY, REASON_CHECKED, REASON_FAILED, STATUS_FALSE, STATUS_TRUE,
};

/// Computes the issuer status for a validation result.
///
/// Returns `None` when the Ready condition would not change.
#[must_use]
pub fn issuer_status(
    current: Option<&IssuerStatus>,
    validation: &Result<IssuerConfig, IssuerError>,
    scope: &IssuerScope,
) -> Option<IssuerStatus> {
    let mut status = current.cloned().unwrap_or_default();
    let existing = find_condition(&status.conditions, CONDITION_TYPE_READY).cloned();

    match validation {
        Ok(_) => update_condition_in_memory(
            &mut status.conditions,
            CONDITION_TYPE_READY,
            STATUS_TRUE,
            REASON_CHECKED,
            scope.valid_message(),
        ),
        Err(e) => update_condition_in_memory(
            &mut status.conditions,
            CONDITION_TYPE_READY,
            STATUS_FALSE,
            REASON_FAILED,
            &e.to_string(),
        ),
    }

    let updated = find_condition(&status.conditions, CONDITION_TYPE_READY)?;
    condition_changed(&existing, updated).then_some(status)
}

/// Action after a successful issuer pass: validate again later, since the
/// credential secret can change without the issuer changing.
#[must_use]
pub fn issuer_recheck_action() -> Action {
    Action::requeue(Duration::from_secs(ISSUER_RECHECK_SECS))
}

/// Reconcile a namespaced `DigicloudIssuer`.
///
/// # Errors
///
/// Returns an error when validation fails or the status cannot be written.
pub async fn reconcile_digicloud_issuer(
    ctx: Arc<Context>,
    issuer: Arc<DigicloudIssuer>,
) -> Result<()> {
    let namespace = issuer.namespace().unwrap_or_default();
    let api: Api<DigicloudIssuer> = Api::namespaced(ctx.client.clone(), &namespace);
    let scope = IssuerScope::Namespaced { namespace };

    reconcile_issuer(
        &ctx,
        &api,
        &issuer.name_any(),
        issuer.status.as_ref(),
        &issuer.spec.provisioner,
        &scope,
    )
    .await
}

/// Reconcile a cluster-scoped `DigicloudClusterIssuer`.
///
/// # Errors
///
/// Returns an error when validation fails or the status cannot be written.
pub async fn reconcile_digicloud_cluster_issuer(
    ctx: Arc<Context>,
    issuer: Arc<DigicloudClusterIssuer>,
) -> Result<()> {
    let api: Api<DigicloudClusterIssuer> = Api::all(ctx.client.clone());
    let scope = IssuerScope::Cluster {
        secret_namespace: ctx.settings.cluster_resource_namespace.clone(),
    };

    reconcile_issuer(
        &ctx,
        &api,
        &issuer.name_any(),
        issuer.status.as_ref(),
        &issuer.spec.provisioner,
        &scope,
    )
    .await
}

async fn reconcile_issuer<K>(
    ctx: &Context,
    api: &Api<K>,
    name: &str,
    current: Option<&IssuerStatus>,
    provisioner: &IssuerProvisioner,
    scope: &IssuerScope,
) -> Result<()>
where
    K: Clone + DeserializeOwned + Debug,
{
    let kind = scope.kind();
    debug!(kind, name = %name, secret_namespace = %scope.secret_namespace(), "Validating issuer");

    let validation = load_issuer_config(&ctx.client, provisioner, scope).await;

    if let Some(status) = issuer_status(current, &validation, scope) {
        patch_issuer_status(api, name, &status).await?;
        info!(kind, name = %name, valid = validation.is_ok(), "Updated issuer status");
    }

    match validation {
        Ok(config) => {
            debug!(kind, name = %name, config = ?config, "Issuer configuration is valid");
            Ok(())
        }
        Err(e) => {
            warn!(kind, name = %name, error = %e, "Issuer configuration is invalid");
            metrics::record_error(kind, e.category());
            Err(e.into())
        }
    }
}

#[cfg(test)]
#[path = "issuer_tests.rs"]
mod issuer_tests;
