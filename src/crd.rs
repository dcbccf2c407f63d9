// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) for the DigiCloud issuer.
//!
//! # Resource Types
//!
//! ## Issuers (owned by this operator)
//!
//! - [`DigicloudIssuer`] - Namespaced issuer; credentials are read from its own namespace
//! - [`DigicloudClusterIssuer`] - Cluster-scoped issuer; credentials are read from the
//!   operator's cluster resource namespace
//!
//! ## Requests (owned by cert-manager)
//!
//! - [`CertificateRequest`] - cert-manager's request object. Only the fields this
//!   operator reads or writes are modelled, and its CRD is never generated here.
//!
//! # Example: Creating an Issuer
//!
//! ```rust,no_run
//! use digicloud_issuer::crd::{DigicloudIssuerSpec, IssuerProvisioner, SecretKeySelector};
//!
//! let spec = DigicloudIssuerSpec {
//!     provisioner: IssuerProvisioner {
//!         api_base_url: None,
//!         api_token_secret_ref: SecretKeySelector {
//!             name: "digicloud-credentials".to_string(),
//!             key: "token".to_string(),
//!         },
//!         ttl: Some(300),
//!         propagation_timeout: Some("5m".to_string()),
//!         polling_interval: Some("10s".to_string()),
//!     },
//! };
//! ```

use k8s_openapi::ByteString;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Condition represents an observation of a resource's current state.
///
/// Only the `Ready` condition type is written by this operator.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition. This operator only writes `Ready`.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// Reference to a key within a Kubernetes `Secret`.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeySelector {
    /// Name of the secret.
    #[serde(default)]
    pub name: String,

    /// Key within the secret's data holding the value.
    #[serde(default)]
    pub key: String,
}

/// DigiCloud API settings shared by [`DigicloudIssuer`] and [`DigicloudClusterIssuer`].
///
/// Both issuer kinds carry the same shape. They differ only in which namespace the
/// credential secret is read from, see [`crate::issuer::IssuerScope`].
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IssuerProvisioner {
    /// DigiCloud API base URL.
    ///
    /// Defaults to `https://api.digicloud.ir` when unset or empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,

    /// Secret key holding the DigiCloud API token.
    ///
    /// The same secret may carry a `namespace` key naming the DigiCloud tenant
    /// namespace. When absent the tenant namespace is `default`.
    pub api_token_secret_ref: SecretKeySelector,

    /// TTL in seconds for challenge TXT records.
    ///
    /// Defaults to 300. Accepted range: 60-86400.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 60, max = 86400))]
    pub ttl: Option<u32>,

    /// Time to wait for DNS propagation before completing the challenge.
    ///
    /// Duration string such as `5m`, `90s` or `1h30m`. Defaults to `5m`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub propagation_timeout: Option<String>,

    /// Interval between propagation checks.
    ///
    /// Duration string such as `10s`. Defaults to `10s`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polling_interval: Option<String>,
}

/// Status shared by both issuer kinds
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IssuerStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// `DigicloudIssuer` solves DNS-01 challenges for requests in its own namespace.
///
/// # Example
///
/// ```yaml
/// apiVersion: digicloud.issuer.vamirreza.github.io/v1alpha1
/// kind: DigicloudIssuer
/// metadata:
///   name: digicloud
///   namespace: default
/// spec:
///   provisioner:
///     apiTokenSecretRef:
///       name: digicloud-credentials
///       key: token
///     ttl: 300
///     propagationTimeout: 5m
///     pollingInterval: 10s
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "digicloud.issuer.vamirreza.github.io",
    version = "v1alpha1",
    kind = "DigicloudIssuer",
    namespaced,
    doc = "DigicloudIssuer is a cert-manager external issuer that solves DNS-01 challenges using DigiCloud Edge DNS. Credentials are read from the issuer's namespace."
)]
#[kube(status = "IssuerStatus")]
#[kube(
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DigicloudIssuerSpec {
    /// DigiCloud API settings
    pub provisioner: IssuerProvisioner,
}

/// `DigicloudClusterIssuer` solves DNS-01 challenges for requests in any namespace.
///
/// The credential secret is read from the operator's cluster resource namespace
/// (`CLUSTER_RESOURCE_NAMESPACE`, default `digicloud-issuer-system`).
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "digicloud.issuer.vamirreza.github.io",
    version = "v1alpha1",
    kind = "DigicloudClusterIssuer",
    doc = "DigicloudClusterIssuer is a cluster-scoped cert-manager external issuer that solves DNS-01 challenges using DigiCloud Edge DNS. Credentials are read from the operator's cluster resource namespace."
)]
#[kube(status = "IssuerStatus")]
#[kube(
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DigicloudClusterIssuerSpec {
    /// DigiCloud API settings
    pub provisioner: IssuerProvisioner,
}

/// Reference from a `CertificateRequest` to the issuer that should sign it.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IssuerRef {
    /// Issuer name
    pub name: String,

    /// Issuer kind; cert-manager leaves this empty for its own `Issuer`
    #[serde(default)]
    pub kind: String,

    /// API group of the issuer; empty means `cert-manager.io`
    #[serde(default)]
    pub group: String,
}

/// `CertificateRequest` status written by this operator.
///
/// Fields this operator does not set are carried through untouched when the
/// status is re-applied after a write conflict.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRequestStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// Signed certificate (PEM) once issued
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub certificate: Option<ByteString>,

    /// CA certificate (PEM), when the authority returns one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub ca: Option<ByteString>,

    /// Time the request entered the Failed state (RFC3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_time: Option<String>,
}

/// cert-manager `CertificateRequest` (`cert-manager.io/v1`).
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cert-manager.io",
    version = "v1",
    kind = "CertificateRequest",
    namespaced
)]
#[kube(status = "CertificateRequestStatus")]
#[serde(rename_all = "camelCase")]
pub struct CertificateRequestSpec {
    /// PEM-encoded PKCS#10 signing request (base64 on the wire)
    #[schemars(with = "String")]
    pub request: ByteString,

    /// Issuer that should sign this request
    pub issuer_ref: IssuerRef,

    /// Requested certificate lifetime
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    /// Whether a CA certificate is requested
    #[serde(default, rename = "isCA", skip_serializing_if = "Option::is_none")]
    pub is_ca: Option<bool>,

    /// Requested key usages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usages: Option<Vec<String>>,
}

impl CertificateRequestStatus {
    /// Returns true when a non-empty certificate has been stored.
    #[must_use]
    pub fn has_certificate(&self) -> bool {
        self.certificate
            .as_ref()
            .is_some_and(|cert| !cert.0.is_empty())
    }
}
