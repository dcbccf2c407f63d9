// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS-01 challenge derivation.
//!
//! Maps a requested domain and its key authorization to the TXT record that proves
//! control of the domain: the record lives at `_acme-challenge.<domain>.` and holds
//! the base64url (no padding) SHA-256 digest of the key authorization.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};

use crate::constants::ACME_CHALLENGE_LABEL;

/// One TXT record to publish for a domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeRecord {
    /// Domain as requested (may be a wildcard)
    pub domain: String,
    /// Absolute challenge FQDN with trailing dot
    pub fqdn: String,
    /// TXT record content
    pub value: String,
}

impl ChallengeRecord {
    /// Derives the challenge record for `domain` from its key authorization.
    #[must_use]
    pub fn new(domain: &str, key_authorization: &str) -> Self {
        Self {
            domain: domain.to_string(),
            fqdn: challenge_fqdn(domain),
            value: challenge_value(key_authorization),
        }
    }
}

/// Strips a leading `*.` wildcard and any trailing dot.
#[must_use]
pub fn normalize_domain(domain: &str) -> &str {
    let domain = domain.strip_prefix("*.").unwrap_or(domain);
    domain.strip_suffix('.').unwrap_or(domain)
}

/// Builds the absolute challenge FQDN for a domain.
///
/// `example.com` and `*.example.com` both map to `_acme-challenge.example.com.`.
#[must_use]
pub fn challenge_fqdn(domain: &str) -> String {
    format!("{ACME_CHALLENGE_LABEL}.{}.", normalize_domain(domain))
}

/// Computes the TXT record content for a key authorization.
#[must_use]
pub fn challenge_value(key_authorization: &str) -> String {
    let digest = Sha256::digest(key_authorization.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

#[cfg(test)]
#[path = "challenge_tests.rs"]
mod challenge_tests;
