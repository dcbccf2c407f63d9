// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS zone and DigiCloud HTTP API error types.
//!
//! This module provides specialized error types for:
//! - Zone resolution of challenge FQDNs
//! - DigiCloud Edge DNS REST API operations (record create, list, delete)
//!
//! These errors provide structured error handling for DNS operations,
//! enabling better error reporting in status conditions and metrics.

use thiserror::Error;

/// Errors that can occur while splitting an FQDN into zone and record label.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ZoneError {
    /// FQDN has fewer than two labels, so no registrable zone can be derived.
    ///
    /// This is permanent for the domain. Retrying with the same input always fails.
    #[error("cannot determine zone for FQDN '{fqdn}'")]
    CannotDetermineZone {
        /// The FQDN that could not be split
        fqdn: String,
    },
}

/// Errors that can occur when calling the DigiCloud Edge DNS API.
///
/// The API does not distinguish transient and permanent failures, so every variant
/// fails the current reconciliation pass and is retried by requeue.
#[derive(Error, Debug, Clone)]
pub enum DigicloudError {
    /// Connection, TLS, or timeout failure before a response was received
    #[error("DigiCloud {operation} request for zone '{zone}' failed: {reason}")]
    Transport {
        /// Operation name (create, list, delete)
        operation: &'static str,
        /// Zone the request targeted
        zone: String,
        /// Underlying client error text
        reason: String,
    },

    /// Response status was not the one this operation succeeds on
    ///
    /// Create expects 202, list expects 200, delete expects 204. Any other code,
    /// including other 2xx codes, lands here with the response body for diagnostics.
    #[error(
        "DigiCloud {operation} for zone '{zone}' returned HTTP {status} (expected {expected}): {body}"
    )]
    UnexpectedStatus {
        /// Operation name (create, list, delete)
        operation: &'static str,
        /// Zone the request targeted
        zone: String,
        /// Status code the API returned
        status: u16,
        /// Status code the operation expects
        expected: u16,
        /// Response body text
        body: String,
    },

    /// Response body could not be decoded
    #[error("Failed to decode DigiCloud {operation} response for zone '{zone}': {reason}")]
    Decode {
        /// Operation name (create, list, delete)
        operation: &'static str,
        /// Zone the request targeted
        zone: String,
        /// Decoder error text
        reason: String,
    },

    /// Base URL and path could not be joined into a request URL
    #[error("Invalid DigiCloud request URL '{url}': {reason}")]
    InvalidUrl {
        /// The URL that failed to parse
        url: String,
        /// Parser error text
        reason: String,
    },
}

/// Composite error type for challenge record operations.
///
/// This is the error type returned by [`crate::digicloud::ChallengeRecordManager`]
/// helpers that combine zone resolution with API calls.
#[derive(Error, Debug, Clone)]
pub enum DnsError {
    /// Zone could not be derived from the challenge FQDN
    #[error(transparent)]
    Zone(#[from] ZoneError),

    /// DigiCloud API call failed
    #[error(transparent)]
    Api(#[from] DigicloudError),
}

impl DnsError {
    /// Returns true if this error is transient and the operation should be retried.
    ///
    /// Zone resolution failures are permanent. Every API failure is treated as transient.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Zone(_) => false,
            Self::Api(_) => true,
        }
    }

    /// Returns a short category name used as a metrics label.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Zone(ZoneError::CannotDetermineZone { .. }) => "zone",
            Self::Api(DigicloudError::Transport { .. }) => "transport",
            Self::Api(DigicloudError::UnexpectedStatus { .. }) => "http_status",
            Self::Api(DigicloudError::Decode { .. }) => "decode",
            Self::Api(DigicloudError::InvalidUrl { .. }) => "url",
        }
    }
}
