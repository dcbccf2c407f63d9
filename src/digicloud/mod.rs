// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DigiCloud Edge DNS challenge record management.
//!
//! This module owns the lifecycle of DNS-01 TXT records: create, find and delete
//! against the DigiCloud REST API.
//!
//! # Endpoints
//!
//! | Operation | Request | Success |
//! |-----------|---------|---------|
//! | Create | `POST /v1/edge/domains/{zone}/records` | 202 |
//! | List   | `GET /v1/edge/domains/{zone}/records` | 200 |
//! | Delete | `DELETE /v1/edge/domains/{zone}/records/{id}` | 204 |
//!
//! Every request carries `Authorization: Bearer <token>` and
//! `Digicloud-Namespace: <tenant>`. Any status other than the expected one is an
//! error carrying the response body.
//!
//! Record ids are never remembered. Both publishing and cleanup list the zone and
//! match on name and content, so either can be repeated after a lost status write or
//! a partial failure without duplicating or stranding a record.

pub mod types;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method, RequestBuilder, StatusCode};
use tracing::{debug, error, info};
use url::Url;

use crate::constants::{DIGICLOUD_HTTP_TIMEOUT_SECS, DIGICLOUD_NAMESPACE_HEADER, TXT_RECORD_NOTE};
use crate::dns_errors::{DigicloudError, DnsError};
use crate::issuer::IssuerConfig;
use crate::metrics;
use crate::zone::{resolve_zone, ZoneRecord};

use types::{format_ttl, CreateRecordRequest, RecordListResponse, RECORD_TYPE_TXT};

/// Builds the shared HTTP client used for all DigiCloud calls.
///
/// Every request made through it is bounded by a fixed 30 second timeout.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialised.
pub fn build_http_client() -> Result<HttpClient, reqwest::Error> {
    HttpClient::builder()
        .timeout(Duration::from_secs(DIGICLOUD_HTTP_TIMEOUT_SECS))
        .build()
}

/// Create, find and delete TXT records for DNS-01 challenges.
///
/// Implementations perform exactly one API call per method. `present` and `cleanup`
/// combine zone resolution with those calls.
#[async_trait]
pub trait ChallengeRecordManager: Send + Sync {
    /// Creates a TXT record. Succeeds only when the provider accepts the request.
    ///
    /// # Errors
    ///
    /// Returns a [`DigicloudError`] on transport failure or any unexpected status.
    async fn create_txt_record(
        &self,
        zone: &str,
        label: &str,
        content: &str,
        ttl_secs: u32,
    ) -> Result<(), DigicloudError>;

    /// Returns the id of the TXT record matching `label` and `content`, if any.
    ///
    /// # Errors
    ///
    /// Returns a [`DigicloudError`] when the zone cannot be listed.
    async fn find_txt_record(
        &self,
        zone: &str,
        label: &str,
        content: &str,
    ) -> Result<Option<String>, DigicloudError>;

    /// Deletes a record by id.
    ///
    /// # Errors
    ///
    /// Returns a [`DigicloudError`] on transport failure or any status other than 204.
    async fn delete_txt_record(&self, zone: &str, id: &str) -> Result<(), DigicloudError>;

    /// Publishes `content` at `fqdn` unless a matching record already exists.
    ///
    /// A pass whose status write was lost publishes the same content again on the
    /// next pass; the lookup keeps that from creating a second record.
    ///
    /// # Errors
    ///
    /// Returns [`DnsError::Zone`] when no zone can be derived from `fqdn`, or
    /// [`DnsError::Api`] when the lookup or the create call fails.
    async fn present(
        &self,
        fqdn: &str,
        content: &str,
        ttl_secs: u32,
    ) -> Result<ZoneRecord, DnsError> {
        let record = resolve_zone(fqdn)?;
        if let Some(id) = self
            .find_txt_record(&record.zone, &record.label, content)
            .await?
        {
            debug!(
                zone = %record.zone,
                record = %record.label,
                id = %id,
                "Challenge TXT record already present, not creating"
            );
            return Ok(record);
        }
        self.create_txt_record(&record.zone, &record.label, content, ttl_secs)
            .await?;
        Ok(record)
    }

    /// Removes the record holding `content` at `fqdn`.
    ///
    /// Returns `false` when no matching record exists. That case makes no delete call
    /// and is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`DnsError::Zone`] when no zone can be derived from `fqdn`, or
    /// [`DnsError::Api`] when listing or deleting fails.
    async fn cleanup(&self, fqdn: &str, content: &str) -> Result<bool, DnsError> {
        let record = resolve_zone(fqdn)?;
        match self
            .find_txt_record(&record.zone, &record.label, content)
            .await?
        {
            Some(id) => {
                self.delete_txt_record(&record.zone, &id).await?;
                Ok(true)
            }
            None => {
                info!(
                    zone = %record.zone,
                    record = %record.label,
                    "Challenge TXT record not found, nothing to clean up"
                );
                Ok(false)
            }
        }
    }
}

/// [`ChallengeRecordManager`] backed by the DigiCloud Edge DNS API.
#[derive(Clone)]
pub struct DigicloudClient {
    http: HttpClient,
    base_url: String,
    api_token: String,
    tenant_namespace: String,
}

impl std::fmt::Debug for DigicloudClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigicloudClient")
            .field("base_url", &self.base_url)
            .field("tenant_namespace", &self.tenant_namespace)
            .finish_non_exhaustive()
    }
}

impl DigicloudClient {
    /// Creates a client for the account described by `config`.
    #[must_use]
    pub fn new(http: HttpClient, config: &IssuerConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token().to_string(),
            tenant_namespace: config.tenant_namespace.clone(),
        }
    }

    fn records_url(&self, zone: &str, id: Option<&str>) -> Result<Url, DigicloudError> {
        let raw = match id {
            Some(id) => format!("{}/v1/edge/domains/{zone}/records/{id}", self.base_url),
            None => format!("{}/v1/edge/domains/{zone}/records", self.base_url),
        };
        Url::parse(&raw).map_err(|e| DigicloudError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .header(DIGICLOUD_NAMESPACE_HEADER, &self.tenant_namespace)
    }

    /// Sends a request and checks the response status.
    ///
    /// Returns the body text on success.
    async fn execute(
        &self,
        operation: &'static str,
        zone: &str,
        request: RequestBuilder,
        expected: StatusCode,
    ) -> Result<String, DigicloudError> {
        let start = Instant::now();
        let response = request.send().await.map_err(|e| {
            error!(operation, zone = %zone, error = %e, "DigiCloud API request failed");
            metrics::record_dns_operation(operation, false, start.elapsed());
            DigicloudError::Transport {
                operation,
                zone: zone.to_string(),
                reason: e.to_string(),
            }
        })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status != expected {
            error!(
                operation,
                zone = %zone,
                status = %status,
                error = %body,
                "DigiCloud API returned unexpected status"
            );
            metrics::record_dns_operation(operation, false, start.elapsed());
            return Err(DigicloudError::UnexpectedStatus {
                operation,
                zone: zone.to_string(),
                status: status.as_u16(),
                expected: expected.as_u16(),
                body,
            });
        }

        debug!(
            operation,
            zone = %zone,
            status = %status,
            elapsed = ?start.elapsed(),
            "DigiCloud API request successful"
        );
        metrics::record_dns_operation(operation, true, start.elapsed());
        Ok(body)
    }
}

#[async_trait]
impl ChallengeRecordManager for DigicloudClient {
    async fn create_txt_record(
        &self,
        zone: &str,
        label: &str,
        content: &str,
        ttl_secs: u32,
    ) -> Result<(), DigicloudError> {
        let url = self.records_url(zone, None)?;
        let body = CreateRecordRequest {
            name: label.to_string(),
            ttl: format_ttl(ttl_secs),
            record_type: RECORD_TYPE_TXT.to_string(),
            content: content.to_string(),
            note: Some(TXT_RECORD_NOTE.to_string()),
        };

        self.execute(
            "create",
            zone,
            self.request(Method::POST, url).json(&body),
            StatusCode::ACCEPTED,
        )
        .await?;

        info!(zone = %zone, record = %label, ttl = ttl_secs, "Created challenge TXT record");
        Ok(())
    }

    async fn find_txt_record(
        &self,
        zone: &str,
        label: &str,
        content: &str,
    ) -> Result<Option<String>, DigicloudError> {
        let url = self.records_url(zone, None)?;
        let body = self
            .execute(
                "list",
                zone,
                self.request(Method::GET, url),
                StatusCode::OK,
            )
            .await?;

        let listing: RecordListResponse =
            serde_json::from_str(&body).map_err(|e| DigicloudError::Decode {
                operation: "list",
                zone: zone.to_string(),
                reason: e.to_string(),
            })?;

        let found = listing
            .records
            .into_iter()
            .find(|record| record.matches_txt(label, content))
            .map(|record| record.id);

        debug!(zone = %zone, record = %label, found = found.is_some(), "Searched for challenge TXT record");
        Ok(found)
    }

    async fn delete_txt_record(&self, zone: &str, id: &str) -> Result<(), DigicloudError> {
        let url = self.records_url(zone, Some(id))?;
        self.execute(
            "delete",
            zone,
            self.request(Method::DELETE, url),
            StatusCode::NO_CONTENT,
        )
        .await?;

        info!(zone = %zone, id = %id, "Deleted challenge TXT record");
        Ok(())
    }
}

#[cfg(test)]
mod mod_tests;
