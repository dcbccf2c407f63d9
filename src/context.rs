// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for all controllers.
//!
//! All controllers receive an `Arc<Context>` that contains:
//! - Kubernetes client
//! - Operator settings read once from the environment
//! - The challenge engine driving `CertificateRequest` resources

use crate::authority::CertificateAuthority;
use crate::constants::{
    DEFAULT_CLUSTER_RESOURCE_NAMESPACE, DEFAULT_RECONCILE_TIMEOUT_SECS,
    METRICS_SERVER_BIND_ADDRESS,
};
use crate::issuer::KubeIssuerSource;
use crate::reconcilers::certificaterequest::ChallengeEngine;
use anyhow::{Context as _, Result};
use kube::Client;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Environment variable naming the namespace that holds cluster issuer secrets
pub const ENV_CLUSTER_RESOURCE_NAMESPACE: &str = "CLUSTER_RESOURCE_NAMESPACE";

/// Environment variable with the operator's own namespace (downward API)
pub const ENV_POD_NAMESPACE: &str = "POD_NAMESPACE";

/// Environment variable overriding the metrics listen address
pub const ENV_METRICS_BIND_ADDRESS: &str = "METRICS_BIND_ADDRESS";

/// Environment variable overriding the per-pass reconcile deadline
pub const ENV_RECONCILE_TIMEOUT_SECS: &str = "RECONCILE_TIMEOUT_SECS";

/// Operator settings, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorSettings {
    /// Namespace holding the credential secrets of `DigicloudClusterIssuer` resources
    pub cluster_resource_namespace: String,

    /// Listen address of the `/metrics` endpoint
    pub metrics_bind_address: SocketAddr,

    /// Deadline for one `CertificateRequest` reconciliation pass
    pub reconcile_timeout: Duration,
}

impl OperatorSettings {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, treating empty values as unset.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let cluster_resource_namespace = get(ENV_CLUSTER_RESOURCE_NAMESPACE)
            .or_else(|| get(ENV_POD_NAMESPACE))
            .unwrap_or_else(|| DEFAULT_CLUSTER_RESOURCE_NAMESPACE.to_string());

        let metrics_bind_address = get(ENV_METRICS_BIND_ADDRESS)
            .unwrap_or_else(|| METRICS_SERVER_BIND_ADDRESS.to_string())
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid {ENV_METRICS_BIND_ADDRESS}"))?;

        let reconcile_timeout = match get(ENV_RECONCILE_TIMEOUT_SECS) {
            Some(value) => Duration::from_secs(
                value
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("Invalid {ENV_RECONCILE_TIMEOUT_SECS}: {value}"))?,
            ),
            None => Duration::from_secs(DEFAULT_RECONCILE_TIMEOUT_SECS),
        };

        Ok(Self {
            cluster_resource_namespace,
            metrics_bind_address,
            reconcile_timeout,
        })
    }
}

/// Shared context passed to all controllers.
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client for API operations
    pub client: Client,

    /// Settings read at startup
    pub settings: OperatorSettings,

    /// DNS-01 challenge engine for `CertificateRequest` resources
    pub engine: ChallengeEngine,
}

impl Context {
    /// Wires the Kubernetes-backed issuer source and the given authority into a context.
    #[must_use]
    pub fn new(
        client: Client,
        settings: OperatorSettings,
        http_client: reqwest::Client,
        authority: Arc<dyn CertificateAuthority>,
    ) -> Self {
        let issuers = Arc::new(KubeIssuerSource::new(
            client.clone(),
            &settings.cluster_resource_namespace,
        ));
        let engine = ChallengeEngine::new(issuers, authority, http_client);
        Self {
            client,
            settings,
            engine,
        }
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;
