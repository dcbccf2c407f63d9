// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Wire types for the DigiCloud Edge DNS records API.

use serde::{Deserialize, Deserializer, Serialize};

/// Record type for challenge records
pub const RECORD_TYPE_TXT: &str = "TXT";

/// Body of `POST /v1/edge/domains/{zone}/records`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CreateRecordRequest {
    pub name: String,
    /// TTL in the API's `"<seconds>s"` form
    pub ttl: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A record as returned by the list endpoint.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RecordDetails {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub ttl: String,
    #[serde(rename = "type")]
    pub record_type: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// Body of `GET /v1/edge/domains/{zone}/records`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RecordListResponse {
    #[serde(default)]
    pub records: Vec<RecordDetails>,
}

/// Formats a TTL in seconds as the API expects it (`300` becomes `"300s"`).
#[must_use]
pub fn format_ttl(ttl_secs: u32) -> String {
    format!("{ttl_secs}s")
}

// The API documents string ids; accept numbers too.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(id) => id,
        RawId::Number(id) => id.to_string(),
    })
}

impl RecordDetails {
    /// Returns true when this is a TXT record with exactly this name and content.
    #[must_use]
    pub fn matches_txt(&self, name: &str, content: &str) -> bool {
        self.record_type == RECORD_TYPE_TXT && self.name == name && self.content == content
    }
}
