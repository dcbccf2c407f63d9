// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # digicloud-issuer - cert-manager DNS-01 issuer for DigiCloud
//!
//! A Kubernetes operator that completes ACME DNS-01 challenges for cert-manager
//! `CertificateRequest` resources by publishing TXT records through the DigiCloud
//! Edge DNS API.
//!
//! ## Overview
//!
//! For each request that references a `DigicloudIssuer` or `DigicloudClusterIssuer`
//! the operator:
//!
//! 1. resolves the issuer and its API credentials,
//! 2. reads the DNS names from the signing request,
//! 3. publishes one `_acme-challenge` TXT record per name,
//! 4. waits for the issuer's propagation timeout by requeueing,
//! 5. hands the proven challenges to a certificate authority and removes the records.
//!
//! ## Modules
//!
//! - [`crd`] - Issuer CRDs and the cert-manager `CertificateRequest` type
//! - [`issuer`] - Issuer validation and credential loading
//! - [`zone`] - FQDN to zone and record label decomposition
//! - [`digicloud`] - DigiCloud challenge record client
//! - [`challenge`] - DNS-01 record name and value derivation
//! - [`csr`] - Signing request inspection
//! - [`authority`] - Certificate authority contract
//! - [`reconcilers`] - Controllers for requests and issuers
//! - [`context`] - Shared controller context and settings
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust,no_run
//! use digicloud_issuer::zone::resolve_zone;
//!
//! let record = resolve_zone("_acme-challenge.sub.example.com.").unwrap();
//! assert_eq!(record.zone, "example.com");
//! assert_eq!(record.label, "_acme-challenge.sub");
//! ```

pub mod authority;
pub mod challenge;
pub mod constants;
pub mod context;
pub mod crd;
pub mod csr;
pub mod digicloud;
pub mod dns_errors;
pub mod duration;
pub mod issuer;
pub mod metrics;
pub mod reconcilers;
pub mod status_reasons;
pub mod zone;

#[cfg(test)]
mod crd_tests;
