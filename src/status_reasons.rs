// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Standard Kubernetes status condition reasons for issuer resources.
//!
//! Reasons are programmatic identifiers in CamelCase that explain why a condition has
//! a particular status. The values match the ones cert-manager itself uses for
//! `CertificateRequest` and issuer conditions, so `kubectl get certificaterequest`
//! and cert-manager's own controllers interpret them correctly.
//!
//! # Condition Model
//!
//! Every resource carries exactly one `type: Ready` condition. It is overwritten in
//! place on each transition, never appended.
//!
//! # Example Status
//!
//! ```yaml
//! status:
//!   conditions:
//!     - type: Ready
//!       status: "False"
//!       reason: Pending
//!       message: "DNS validation in progress"
//!       lastTransitionTime: "2025-06-01T10:00:00Z"
//! ```

// ============================================================================
// Condition Types
// ============================================================================

/// Primary condition type indicating overall resource readiness.
pub const CONDITION_TYPE_READY: &str = "Ready";

// ============================================================================
// Condition Status Values
// ============================================================================

/// Condition is satisfied.
pub const STATUS_TRUE: &str = "True";

/// Condition is not satisfied.
pub const STATUS_FALSE: &str = "False";

// ============================================================================
// CertificateRequest Reasons
// ============================================================================

/// Request is still being worked on.
///
/// Used both while the referenced issuer cannot be resolved and while the DNS-01
/// challenge waits for propagation. The two cases are told apart by the message
/// (see [`MESSAGE_DNS_VALIDATION_IN_PROGRESS`]).
pub const REASON_PENDING: &str = "Pending";

/// Request failed permanently and will not be retried.
///
/// Used for malformed signing requests and certificate authority rejections.
/// The operator must resubmit the request.
pub const REASON_FAILED: &str = "Failed";

/// Certificate has been issued and stored on the request.
pub const REASON_ISSUED: &str = "Issued";

// ============================================================================
// Issuer Reasons
// ============================================================================

/// Issuer configuration has been validated successfully.
pub const REASON_CHECKED: &str = "Checked";

// ============================================================================
// Messages
// ============================================================================

/// Message marking a request whose DNS challenge records have been published.
///
/// The reconciler uses this prefix to recognise the challenge-pending state, so any
/// message written while records are outstanding must start with it.
pub const MESSAGE_DNS_VALIDATION_IN_PROGRESS: &str = "DNS validation in progress";

/// Message for a successfully issued certificate.
pub const MESSAGE_CERTIFICATE_ISSUED: &str = "Certificate issued";

/// Message for a valid namespaced issuer.
pub const MESSAGE_ISSUER_VALID: &str = "Issuer configuration is valid";

/// Message for a valid cluster issuer.
pub const MESSAGE_CLUSTER_ISSUER_VALID: &str = "Cluster issuer configuration is valid";

/// Build the message written while a challenge is outstanding but its issuer
/// cannot currently be resolved.
///
/// The message keeps the [`MESSAGE_DNS_VALIDATION_IN_PROGRESS`] prefix so the
/// published records stay tracked.
///
/// # Example
///
/// ```rust
/// use digicloud_issuer::status_reasons::pending_issuer_message;
///
/// let message = pending_issuer_message("secret not found");
/// assert!(message.starts_with("DNS validation in progress"));
/// assert!(message.ends_with("secret not found"));
/// ```
#[must_use]
pub fn pending_issuer_message(error: &str) -> String {
    format!("{MESSAGE_DNS_VALIDATION_IN_PROGRESS}; waiting for issuer: {error}")
}

/// Build the message written while a challenge is outstanding but the certificate
/// authority cannot recompute its records.
#[must_use]
pub fn pending_authority_message(error: &str) -> String {
    format!("{MESSAGE_DNS_VALIDATION_IN_PROGRESS}; waiting for certificate authority: {error}")
}
