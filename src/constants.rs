// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Names, defaults and limits shared by the issuer crate and its binaries.

// ============================================================================
// API Constants
// ============================================================================

/// API group for the issuer CRDs
pub const API_GROUP: &str = "digicloud.issuer.vamirreza.github.io";

/// API version for the issuer CRDs
pub const API_VERSION: &str = "v1alpha1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "digicloud.issuer.vamirreza.github.io/v1alpha1";

/// Kind name for the namespaced `DigicloudIssuer` resource
pub const KIND_DIGICLOUD_ISSUER: &str = "DigicloudIssuer";

/// Kind name for the cluster-scoped `DigicloudClusterIssuer` resource
pub const KIND_DIGICLOUD_CLUSTER_ISSUER: &str = "DigicloudClusterIssuer";

/// Kind name for cert-manager's `CertificateRequest` resource
pub const KIND_CERTIFICATE_REQUEST: &str = "CertificateRequest";

// ============================================================================
// DigiCloud API Constants
// ============================================================================

/// Default DigiCloud API base URL
pub const DEFAULT_API_BASE_URL: &str = "https://api.digicloud.ir";

/// Header carrying the DigiCloud tenant namespace
pub const DIGICLOUD_NAMESPACE_HEADER: &str = "Digicloud-Namespace";

/// Tenant namespace used when the credential secret does not name one
pub const DEFAULT_TENANT_NAMESPACE: &str = "default";

/// Secret key holding the optional tenant namespace
pub const SECRET_KEY_TENANT_NAMESPACE: &str = "namespace";

/// Timeout applied to every DigiCloud HTTP call (30 seconds)
pub const DIGICLOUD_HTTP_TIMEOUT_SECS: u64 = 30;

/// Note attached to every TXT record this operator creates
pub const TXT_RECORD_NOTE: &str = "Created by cert-manager digicloud issuer";

// ============================================================================
// DNS Record Constants
// ============================================================================

/// Default TTL for challenge TXT records (5 minutes)
pub const DEFAULT_TXT_RECORD_TTL_SECS: u32 = 300;

/// Minimum accepted TTL for challenge TXT records
pub const MIN_TXT_RECORD_TTL_SECS: u32 = 60;

/// Maximum accepted TTL for challenge TXT records (1 day)
pub const MAX_TXT_RECORD_TTL_SECS: u32 = 86400;

/// Label prepended to a domain to form its DNS-01 challenge name
pub const ACME_CHALLENGE_LABEL: &str = "_acme-challenge";

/// Record name used for the zone apex
pub const APEX_RECORD_NAME: &str = "@";

// ============================================================================
// Challenge Timing Constants
// ============================================================================

/// Default time to wait for DNS propagation (5 minutes)
pub const DEFAULT_PROPAGATION_TIMEOUT_SECS: u64 = 300;

/// Default interval between propagation checks (10 seconds)
pub const DEFAULT_POLLING_INTERVAL_SECS: u64 = 10;

/// Requeue delay while the referenced issuer cannot be resolved (1 minute)
pub const ISSUER_NOT_READY_REQUEUE_SECS: u64 = 60;

/// Requeue interval for issuers that validated successfully (5 minutes)
pub const ISSUER_RECHECK_SECS: u64 = 300;

// ============================================================================
// Controller Error Handling Constants
// ============================================================================

/// Requeue duration for controller errors (30 seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Default deadline for a single reconciliation pass (2 minutes)
pub const DEFAULT_RECONCILE_TIMEOUT_SECS: u64 = 120;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Namespace holding credential secrets for cluster issuers when none is configured
pub const DEFAULT_CLUSTER_RESOURCE_NAMESPACE: &str = "digicloud-issuer-system";

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Bind address for metrics HTTP server
pub const METRICS_SERVER_BIND_ADDRESS: &str = "0.0.0.0:8080";
