// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Certificate authority collaborator.
//!
//! The reconciler publishes DNS-01 records and waits for propagation; signing is
//! delegated to a [`CertificateAuthority`]. The ACME exchange itself lives behind this
//! trait. The only implementation shipped here, [`UnimplementedAuthority`], derives
//! stable key authorizations and rejects every completion.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::challenge::{challenge_value, ChallengeRecord};

/// Identity of the request a challenge belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestIdentity {
    pub namespace: String,
    pub name: String,
    /// Kubernetes UID; stable for the lifetime of the object
    pub uid: String,
}

/// A signed certificate chain returned by the authority.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssuedCertificate {
    /// PEM certificate chain
    pub certificate: Vec<u8>,
    /// PEM CA certificate, when the authority provides one
    pub ca: Option<Vec<u8>>,
}

/// Errors returned by a certificate authority.
///
/// A failed completion fails the request. A key authorization that cannot be
/// recomputed at completion keeps the request pending instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorityError {
    /// Signing is not available
    #[error("certificate signing not yet implemented")]
    NotImplemented,

    /// The authority rejected one or more challenges
    #[error("challenge rejected for {domain}: {reason}")]
    ChallengeRejected {
        /// Domain whose challenge failed
        domain: String,
        /// Reason reported by the authority
        reason: String,
    },

    /// The authority could not derive a key authorization
    #[error("failed to derive key authorization for {domain}: {reason}")]
    KeyAuthorization {
        /// Domain being authorized
        domain: String,
        /// Error text
        reason: String,
    },
}

/// Contract between the challenge engine and the certificate authority.
#[async_trait]
pub trait CertificateAuthority: Send + Sync {
    /// Returns the key authorization for `domain`.
    ///
    /// Must be deterministic for a given request and domain, since cleanup recomputes
    /// record content from it instead of storing it.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthorityError`] if no authorization can be produced.
    async fn key_authorization(
        &self,
        request: &RequestIdentity,
        domain: &str,
    ) -> Result<String, AuthorityError>;

    /// Completes the challenges for `domains` and returns the signed certificate.
    ///
    /// `proven` lists the records that were published for the challenge.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthorityError`] when validation or signing fails.
    async fn complete_challenge(
        &self,
        domains: &[String],
        proven: &[ChallengeRecord],
    ) -> Result<IssuedCertificate, AuthorityError>;
}

/// Authority used until an ACME client is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnimplementedAuthority;

#[async_trait]
impl CertificateAuthority for UnimplementedAuthority {
    async fn key_authorization(
        &self,
        request: &RequestIdentity,
        domain: &str,
    ) -> Result<String, AuthorityError> {
        let mut hasher = Sha256::new();
        hasher.update(request.uid.as_bytes());
        hasher.update(b"/");
        hasher.update(domain.as_bytes());
        let token = challenge_value(&format!("{:x}", hasher.finalize()));
        Ok(format!("{token}.{}", request.uid))
    }

    async fn complete_challenge(
        &self,
        _domains: &[String],
        _proven: &[ChallengeRecord],
    ) -> Result<IssuedCertificate, AuthorityError> {
        Err(AuthorityError::NotImplemented)
    }
}

#[cfg(test)]
#[path = "authority_tests.rs"]
mod authority_tests;
