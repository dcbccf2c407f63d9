// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Issuer resolution and configuration validation.
//!
//! Both issuer kinds share one provisioner shape ([`IssuerProvisioner`]). The only
//! difference between them is where the credential secret lives, which is captured by
//! [`IssuerScope`]. Validation turns a provisioner plus its secret into an immutable
//! [`IssuerConfig`] that the challenge engine uses for one reconciliation pass.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::constants::{
    API_GROUP, DEFAULT_API_BASE_URL, DEFAULT_POLLING_INTERVAL_SECS,
    DEFAULT_PROPAGATION_TIMEOUT_SECS, DEFAULT_TENANT_NAMESPACE, DEFAULT_TXT_RECORD_TTL_SECS,
    KIND_DIGICLOUD_CLUSTER_ISSUER, KIND_DIGICLOUD_ISSUER, MAX_TXT_RECORD_TTL_SECS,
    MIN_TXT_RECORD_TTL_SECS, SECRET_KEY_TENANT_NAMESPACE,
};
use crate::crd::{
    DigicloudClusterIssuer, DigicloudIssuer, IssuerProvisioner, IssuerRef, SecretKeySelector,
};
use crate::duration::parse_duration_or;
use crate::status_reasons::{MESSAGE_CLUSTER_ISSUER_VALID, MESSAGE_ISSUER_VALID};

/// Errors raised while resolving or validating an issuer.
///
/// Every variant is a configuration problem an operator can fix without resubmitting
/// the certificate request, so none of them fail a request permanently.
#[derive(Error, Debug)]
pub enum IssuerError {
    /// Secret reference is missing its name or key
    #[error("API token secret reference must specify both name and key")]
    MissingSecretReference,

    /// Secret does not exist
    #[error("API token secret {name} not found in namespace {namespace}")]
    SecretNotFound {
        /// Secret name
        name: String,
        /// Namespace that was searched
        namespace: String,
    },

    /// Secret exists but does not carry the configured key
    #[error("API token secret {name} does not contain key {key}")]
    SecretKeyMissing {
        /// Secret name
        name: String,
        /// Namespace holding the secret
        namespace: String,
        /// Key that was expected
        key: String,
    },

    /// The token stored under the configured key is empty
    #[error("API token secret {name} has an empty value for key {key}")]
    EmptyToken {
        /// Secret name
        name: String,
        /// Key holding the empty value
        key: String,
    },

    /// TTL outside the accepted range
    #[error("ttl {ttl} is outside the allowed range {min}-{max} seconds")]
    InvalidTtl {
        /// Configured TTL
        ttl: u32,
        /// Minimum accepted TTL
        min: u32,
        /// Maximum accepted TTL
        max: u32,
    },

    /// A duration field could not be parsed
    #[error("invalid {field}: {reason}")]
    InvalidDuration {
        /// Field name (`propagationTimeout` or `pollingInterval`)
        field: &'static str,
        /// Parser error text
        reason: String,
    },

    /// Base URL is not a valid absolute URL
    #[error("invalid apiBaseUrl '{url}': {reason}")]
    InvalidBaseUrl {
        /// Configured URL
        url: String,
        /// Parser error text
        reason: String,
    },

    /// Referenced issuer does not exist
    #[error("{kind} {name} not found")]
    IssuerNotFound {
        /// Issuer kind
        kind: String,
        /// Issuer name
        name: String,
    },

    /// Issuer kind is not one this operator handles
    #[error("unknown issuer kind: {0}")]
    UnknownKind(String),

    /// Kubernetes API call failed
    #[error("failed to read issuer resources: {0}")]
    Api(#[from] kube::Error),
}

impl IssuerError {
    /// Returns a short category name used as a metrics label.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::MissingSecretReference
            | Self::SecretNotFound { .. }
            | Self::SecretKeyMissing { .. }
            | Self::EmptyToken { .. } => "credentials",
            Self::InvalidTtl { .. } | Self::InvalidDuration { .. } | Self::InvalidBaseUrl { .. } => {
                "issuer_config"
            }
            Self::IssuerNotFound { .. } | Self::UnknownKind(_) => "issuer_lookup",
            Self::Api(_) => "kubernetes_api",
        }
    }
}

/// Where an issuer's credential secret is looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssuerScope {
    /// `DigicloudIssuer`: the secret lives next to the issuer
    Namespaced {
        /// Issuer namespace
        namespace: String,
    },
    /// `DigicloudClusterIssuer`: the secret lives in the cluster resource namespace
    Cluster {
        /// Operator's cluster resource namespace
        secret_namespace: String,
    },
}

impl IssuerScope {
    /// Namespace to read the credential secret from.
    #[must_use]
    pub fn secret_namespace(&self) -> &str {
        match self {
            Self::Namespaced { namespace } => namespace,
            Self::Cluster { secret_namespace } => secret_namespace,
        }
    }

    /// Issuer kind this scope belongs to.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Namespaced { .. } => KIND_DIGICLOUD_ISSUER,
            Self::Cluster { .. } => KIND_DIGICLOUD_CLUSTER_ISSUER,
        }
    }

    /// Ready message written when the issuer validates.
    #[must_use]
    pub fn valid_message(&self) -> &'static str {
        match self {
            Self::Namespaced { .. } => MESSAGE_ISSUER_VALID,
            Self::Cluster { .. } => MESSAGE_CLUSTER_ISSUER_VALID,
        }
    }
}

/// Fully resolved issuer settings for one reconciliation pass.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuerConfig {
    /// DigiCloud API base URL without trailing slash
    pub base_url: String,
    api_token: String,
    /// DigiCloud tenant namespace sent in the `Digicloud-Namespace` header
    pub tenant_namespace: String,
    /// TTL for challenge records, in seconds
    pub ttl: u32,
    /// Time to wait for DNS propagation
    pub propagation_timeout: Duration,
    /// Interval between propagation checks
    pub polling_interval: Duration,
}

impl fmt::Debug for IssuerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuerConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &"<redacted>")
            .field("tenant_namespace", &self.tenant_namespace)
            .field("ttl", &self.ttl)
            .field("propagation_timeout", &self.propagation_timeout)
            .field("polling_interval", &self.polling_interval)
            .finish()
    }
}

impl IssuerConfig {
    /// Builds a config directly, bypassing secret lookup.
    #[must_use]
    pub fn new(
        base_url: &str,
        api_token: &str,
        tenant_namespace: &str,
        ttl: u32,
        propagation_timeout: Duration,
        polling_interval: Duration,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
            tenant_namespace: tenant_namespace.to_string(),
            ttl,
            propagation_timeout,
            polling_interval,
        }
    }

    /// Bearer token for the DigiCloud API.
    #[must_use]
    pub fn api_token(&self) -> &str {
        &self.api_token
    }
}

/// Checks that the secret reference names both a secret and a key.
///
/// # Errors
///
/// Returns [`IssuerError::MissingSecretReference`] when either is empty.
pub fn check_secret_reference(
    provisioner: &IssuerProvisioner,
) -> Result<&SecretKeySelector, IssuerError> {
    let selector = &provisioner.api_token_secret_ref;
    if selector.name.trim().is_empty() || selector.key.trim().is_empty() {
        return Err(IssuerError::MissingSecretReference);
    }
    Ok(selector)
}

/// Validates a provisioner against its secret data and builds an [`IssuerConfig`].
///
/// `secret_data` is `None` when the secret does not exist.
///
/// # Errors
///
/// Returns an [`IssuerError`] describing the first problem found, in this order:
/// secret reference, secret presence, token key, ttl, durations, base URL.
pub fn build_issuer_config(
    provisioner: &IssuerProvisioner,
    scope: &IssuerScope,
    secret_data: Option<&BTreeMap<String, Vec<u8>>>,
) -> Result<IssuerConfig, IssuerError> {
    let selector = check_secret_reference(provisioner)?;
    let namespace = scope.secret_namespace();

    let data = secret_data.ok_or_else(|| IssuerError::SecretNotFound {
        name: selector.name.clone(),
        namespace: namespace.to_string(),
    })?;

    let token_bytes = data
        .get(&selector.key)
        .ok_or_else(|| IssuerError::SecretKeyMissing {
            name: selector.name.clone(),
            namespace: namespace.to_string(),
            key: selector.key.clone(),
        })?;
    let api_token = String::from_utf8_lossy(token_bytes).trim().to_string();
    if api_token.is_empty() {
        return Err(IssuerError::EmptyToken {
            name: selector.name.clone(),
            key: selector.key.clone(),
        });
    }

    let tenant_namespace = data
        .get(SECRET_KEY_TENANT_NAMESPACE)
        .map(|bytes| String::from_utf8_lossy(bytes).trim().to_string())
        .filter(|ns| !ns.is_empty())
        .unwrap_or_else(|| DEFAULT_TENANT_NAMESPACE.to_string());

    let ttl = provisioner.ttl.unwrap_or(DEFAULT_TXT_RECORD_TTL_SECS);
    if !(MIN_TXT_RECORD_TTL_SECS..=MAX_TXT_RECORD_TTL_SECS).contains(&ttl) {
        return Err(IssuerError::InvalidTtl {
            ttl,
            min: MIN_TXT_RECORD_TTL_SECS,
            max: MAX_TXT_RECORD_TTL_SECS,
        });
    }

    let propagation_timeout = parse_duration_or(
        provisioner.propagation_timeout.as_deref(),
        Duration::from_secs(DEFAULT_PROPAGATION_TIMEOUT_SECS),
    )
    .map_err(|e| IssuerError::InvalidDuration {
        field: "propagationTimeout",
        reason: e.to_string(),
    })?;

    let polling_interval = parse_duration_or(
        provisioner.polling_interval.as_deref(),
        Duration::from_secs(DEFAULT_POLLING_INTERVAL_SECS),
    )
    .map_err(|e| IssuerError::InvalidDuration {
        field: "pollingInterval",
        reason: e.to_string(),
    })?;
    if polling_interval.is_zero() {
        return Err(IssuerError::InvalidDuration {
            field: "pollingInterval",
            reason: "must be greater than zero".to_string(),
        });
    }

    let base_url = provisioner
        .api_base_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .unwrap_or(DEFAULT_API_BASE_URL);
    Url::parse(base_url).map_err(|e| IssuerError::InvalidBaseUrl {
        url: base_url.to_string(),
        reason: e.to_string(),
    })?;

    Ok(IssuerConfig::new(
        base_url,
        &api_token,
        &tenant_namespace,
        ttl,
        propagation_timeout,
        polling_interval,
    ))
}

/// Reads the credential secret for a provisioner and validates the result.
///
/// # Errors
///
/// Returns an [`IssuerError`] if the reference is incomplete, the secret cannot be
/// read, or validation fails.
pub async fn load_issuer_config(
    client: &Client,
    provisioner: &IssuerProvisioner,
    scope: &IssuerScope,
) -> Result<IssuerConfig, IssuerError> {
    let selector = check_secret_reference(provisioner)?;
    let namespace = scope.secret_namespace();

    debug!(
        secret = %selector.name,
        namespace = %namespace,
        "Loading DigiCloud API credentials"
    );

    let secret_api: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let secret = secret_api.get_opt(&selector.name).await?;

    let data = secret.map(|secret| {
        let mut converted = BTreeMap::new();
        for (key, value) in secret.data.unwrap_or_default() {
            converted.insert(key, value.0);
        }
        for (key, value) in secret.string_data.unwrap_or_default() {
            converted.entry(key).or_insert_with(|| value.into_bytes());
        }
        converted
    });

    build_issuer_config(provisioner, scope, data.as_ref())
}

/// Returns true when an issuer reference points at one of this operator's kinds.
#[must_use]
pub fn is_digicloud_issuer(issuer_ref: &IssuerRef) -> bool {
    issuer_ref.group == API_GROUP
        && (issuer_ref.kind == KIND_DIGICLOUD_ISSUER
            || issuer_ref.kind == KIND_DIGICLOUD_CLUSTER_ISSUER)
}

/// Resolves the issuer a certificate request points at.
#[async_trait]
pub trait IssuerSource: Send + Sync {
    /// Looks up the referenced issuer and validates its credentials.
    ///
    /// # Errors
    ///
    /// Returns an [`IssuerError`] when the issuer or its secret cannot be resolved.
    async fn resolve(
        &self,
        request_namespace: &str,
        issuer_ref: &IssuerRef,
    ) -> Result<IssuerConfig, IssuerError>;
}

/// [`IssuerSource`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeIssuerSource {
    client: Client,
    cluster_resource_namespace: String,
}

impl KubeIssuerSource {
    #[must_use]
    pub fn new(client: Client, cluster_resource_namespace: &str) -> Self {
        Self {
            client,
            cluster_resource_namespace: cluster_resource_namespace.to_string(),
        }
    }
}

#[async_trait]
impl IssuerSource for KubeIssuerSource {
    async fn resolve(
        &self,
        request_namespace: &str,
        issuer_ref: &IssuerRef,
    ) -> Result<IssuerConfig, IssuerError> {
        let not_found = || IssuerError::IssuerNotFound {
            kind: issuer_ref.kind.clone(),
            name: issuer_ref.name.clone(),
        };

        let (provisioner, scope) = match issuer_ref.kind.as_str() {
            KIND_DIGICLOUD_ISSUER => {
                let api: Api<DigicloudIssuer> =
                    Api::namespaced(self.client.clone(), request_namespace);
                let issuer = api.get_opt(&issuer_ref.name).await?.ok_or_else(not_found)?;
                (
                    issuer.spec.provisioner,
                    IssuerScope::Namespaced {
                        namespace: request_namespace.to_string(),
                    },
                )
            }
            KIND_DIGICLOUD_CLUSTER_ISSUER => {
                let api: Api<DigicloudClusterIssuer> = Api::all(self.client.clone());
                let issuer = api.get_opt(&issuer_ref.name).await?.ok_or_else(not_found)?;
                (
                    issuer.spec.provisioner,
                    IssuerScope::Cluster {
                        secret_namespace: self.cluster_resource_namespace.clone(),
                    },
                )
            }
            other => return Err(IssuerError::UnknownKind(other.to_string())),
        };

        load_issuer_config(&self.client, &provisioner, &scope).await
    }
}

#[cfg(test)]
#[path = "issuer_tests.rs"]
mod issuer_tests;
