// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Zone resolution for challenge FQDNs.
//!
//! DigiCloud manages records per registrable domain, so every challenge FQDN has to
//! be split into the zone it lives in and the record label relative to that zone.
//!
//! The zone is always the last two labels of the FQDN. Multi-label public suffixes
//! such as `co.uk` are therefore resolved incorrectly (`_acme-challenge.example.co.uk`
//! yields zone `co.uk`). This matches the behaviour existing deployments rely on and
//! is kept as-is.

use crate::constants::APEX_RECORD_NAME;
use crate::dns_errors::ZoneError;

/// An FQDN split into its zone and relative record label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneRecord {
    /// Registrable domain, e.g. `example.com`
    pub zone: String,
    /// Record label relative to the zone, or `@` for the apex
    pub label: String,
}

impl ZoneRecord {
    /// Rebuilds the FQDN (without trailing dot) from zone and label.
    #[must_use]
    pub fn fqdn(&self) -> String {
        if self.label == APEX_RECORD_NAME {
            self.zone.clone()
        } else {
            format!("{}.{}", self.label, self.zone)
        }
    }
}

/// Splits an FQDN into zone and record label.
///
/// A trailing dot is ignored. The zone is the last two labels; the label is
/// everything before them, or `@` when the FQDN is the zone itself.
///
/// # Errors
///
/// Returns [`ZoneError::CannotDetermineZone`] when the FQDN has fewer than two labels
/// or any label is empty.
///
/// # Example
///
/// ```rust
/// use digicloud_issuer::zone::resolve_zone;
///
/// let record = resolve_zone("_acme-challenge.sub.example.com.").unwrap();
/// assert_eq!(record.zone, "example.com");
/// assert_eq!(record.label, "_acme-challenge.sub");
/// ```
pub fn resolve_zone(fqdn: &str) -> Result<ZoneRecord, ZoneError> {
    let name = fqdn.strip_suffix('.').unwrap_or(fqdn);
    let labels: Vec<&str> = name.split('.').collect();

    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return Err(ZoneError::CannotDetermineZone {
            fqdn: fqdn.to_string(),
        });
    }

    let split = labels.len() - 2;
    let zone = labels[split..].join(".");
    let label = if split == 0 {
        APEX_RECORD_NAME.to_string()
    } else {
        labels[..split].join(".")
    };

    Ok(ZoneRecord { zone, label })
}

#[cfg(test)]
#[path = "zone_tests.rs"]
mod zone_tests;
