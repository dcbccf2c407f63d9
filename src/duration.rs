// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Duration parsing for Go-style duration strings.
//!
//! Issuer timing fields (`propagationTimeout`, `pollingInterval`) are written in Go's
//! `time.ParseDuration` format, e.g. "5m", "10s", "1h30m" or "1.5h". This module
//! parses them into Rust `std::time::Duration`.

use anyhow::{bail, Context, Result};
use std::time::Duration;

const NANOS_PER_MICRO: f64 = 1_000.0;
const NANOS_PER_MILLI: f64 = 1_000_000.0;
const NANOS_PER_SECOND: f64 = 1_000_000_000.0;
const NANOS_PER_MINUTE: f64 = 60.0 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: f64 = 60.0 * NANOS_PER_MINUTE;

fn unit_nanos(unit: &str) -> Option<f64> {
    match unit {
        "ns" => Some(1.0),
        "us" | "µs" | "μs" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SECOND),
        "m" => Some(NANOS_PER_MINUTE),
        "h" => Some(NANOS_PER_HOUR),
        _ => None,
    }
}

/// Parse a Go-style duration string into a Rust `Duration`.
///
/// A duration is a sequence of decimal numbers, each with an optional fraction and
/// a unit suffix. Supported units: `ns`, `us` (or `µs`), `ms`, `s`, `m`, `h`.
/// The bare string `"0"` is also accepted. Negative durations are rejected.
///
/// # Examples
///
/// ```
/// use digicloud_issuer::duration::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
/// assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
/// assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
///
/// assert!(parse_duration("").is_err());
/// assert!(parse_duration("10").is_err());  // Missing unit
/// assert!(parse_duration("10d").is_err()); // Unsupported unit
/// ```
///
/// # Errors
///
/// Returns an error if the string is empty, negative, has a missing or unknown
/// unit, or a malformed number.
pub fn parse_duration(duration_str: &str) -> Result<Duration> {
    if duration_str.is_empty() {
        bail!("Duration string cannot be empty");
    }

    let mut rest = duration_str.strip_prefix('+').unwrap_or(duration_str);
    if rest.starts_with('-') {
        bail!("Duration '{duration_str}' must not be negative");
    }
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        bail!("Duration '{duration_str}' has no value");
    }

    let mut total_nanos = 0.0_f64;
    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .with_context(|| format!("Duration '{duration_str}' is missing a unit"))?;
        let (number, after_number) = rest.split_at(number_end);
        if number.is_empty() || number == "." {
            bail!("Duration '{duration_str}' has a unit without a value");
        }
        let value: f64 = number
            .parse()
            .with_context(|| format!("Invalid number '{number}' in duration '{duration_str}'"))?;

        let unit_end = after_number
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(after_number.len());
        let (unit, remaining) = after_number.split_at(unit_end);
        let Some(scale) = unit_nanos(unit) else {
            bail!(
                "Unsupported duration unit '{unit}' in '{duration_str}'. Use ns, us, ms, s, m or h"
            );
        };

        total_nanos += value * scale;
        rest = remaining;
    }

    if !total_nanos.is_finite() || total_nanos > u64::MAX as f64 {
        bail!("Duration '{duration_str}' is too large");
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(Duration::from_nanos(total_nanos.round() as u64))
}

/// Parse an optional duration field, falling back to `default` when unset or empty.
///
/// # Errors
///
/// Returns an error if a non-empty value fails [`parse_duration`].
pub fn parse_duration_or(value: Option<&str>, default: Duration) -> Result<Duration> {
    match value.map(str::trim) {
        None | Some("") => Ok(default),
        Some(text) => parse_duration(text),
    }
}

#[cfg(test)]
#[path = "duration_tests.rs"]
mod duration_tests;
