// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Certificate signing request inspection.
//!
//! Extracts the DNS names a PKCS#10 request asks for. Subject alternative names
//! take precedence; the subject common name is used only when the request has no
//! DNS SANs at all.

use thiserror::Error;
use x509_parser::prelude::*;

const PEM_LABEL_CSR: &str = "CERTIFICATE REQUEST";
const PEM_LABEL_CSR_LEGACY: &str = "NEW CERTIFICATE REQUEST";

/// Errors raised while inspecting a signing request. All of them are permanent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CsrError {
    /// No PEM block could be decoded
    #[error("failed to decode PEM block: {0}")]
    InvalidPem(String),

    /// PEM block is not a certificate request
    #[error("unexpected PEM block type '{0}', expected CERTIFICATE REQUEST")]
    WrongLabel(String),

    /// DER content is not a valid PKCS#10 request
    #[error("failed to parse certificate request: {0}")]
    InvalidDer(String),

    /// Request names no DNS identifiers
    #[error("certificate request does not contain any DNS names")]
    NoDnsNames,
}

/// Parses a PEM signing request and returns its DNS names.
///
/// Names are returned in first-seen order without duplicates.
///
/// # Errors
///
/// Returns a [`CsrError`] if the PEM or DER is malformed, or the request has no
/// DNS names.
pub fn requested_dns_names(pem_bytes: &[u8]) -> Result<Vec<String>, CsrError> {
    let (_, pem) = x509_parser::pem::parse_x509_pem(pem_bytes)
        .map_err(|e| CsrError::InvalidPem(e.to_string()))?;

    if pem.label != PEM_LABEL_CSR && pem.label != PEM_LABEL_CSR_LEGACY {
        return Err(CsrError::WrongLabel(pem.label));
    }

    let (_, csr) = X509CertificationRequest::from_der(&pem.contents)
        .map_err(|e| CsrError::InvalidDer(e.to_string()))?;

    let mut names: Vec<String> = Vec::new();

    if let Some(extensions) = csr.requested_extensions() {
        for extension in extensions {
            if let ParsedExtension::SubjectAlternativeName(san) = extension {
                for general_name in &san.general_names {
                    if let GeneralName::DNSName(dns) = general_name {
                        push_unique(&mut names, dns);
                    }
                }
            }
        }
    }

    if names.is_empty() {
        for attribute in csr.certification_request_info.subject.iter_common_name() {
            if let Ok(common_name) = attribute.as_str() {
                push_unique(&mut names, common_name);
            }
        }
    }

    if names.is_empty() {
        return Err(CsrError::NoDnsNames);
    }
    Ok(names)
}

fn push_unique(names: &mut Vec<String>, name: &str) {
    let name = name.trim();
    if !name.is_empty() && !names.iter().any(|existing| existing == name) {
        names.push(name.to_string());
    }
}

#[cfg(test)]
#[path = "csr_tests.rs"]
mod csr_tests;
