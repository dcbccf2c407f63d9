// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the DigiCloud challenge record client

#[cfg(test)]
mod tests {
    use crate::digicloud::{build_http_client, ChallengeRecordManager, DigicloudClient};
    use crate::dns_errors::{DigicloudError, DnsError};
    use crate::issuer::IssuerConfig;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RECORDS_PATH: &str = "/v1/edge/domains/example.com/records";

    fn client_for(server: &MockServer) -> DigicloudClient {
        let config = IssuerConfig::new(
            &server.uri(),
            "test-token",
            "tenant-1",
            300,
            Duration::from_secs(300),
            Duration::from_secs(10),
        );
        DigicloudClient::new(build_http_client().unwrap(), &config)
    }

    fn listing() -> serde_json::Value {
        serde_json::json!({
            "records": [
                {"id": "rec-a", "name": "www", "ttl": "300s", "type": "A", "content": "192.0.2.1"},
                {"id": "rec-b", "name": "_acme-challenge", "ttl": "300s", "type": "TXT", "content": "other-value"},
                {"id": "rec-c", "name": "_acme-challenge", "ttl": "300s", "type": "TXT", "content": "token-value"}
            ]
        })
    }

    // ========================================================================
    // Create
    // ========================================================================

    #[tokio::test]
    async fn test_create_sends_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(RECORDS_PATH))
            .and(header("Authorization", "Bearer test-token"))
            .and(header("Digicloud-Namespace", "tenant-1"))
            .and(header("Content-Type", "application/json"))
            .and(body_json(serde_json::json!({
                "name": "_acme-challenge",
                "ttl": "300s",
                "type": "TXT",
                "content": "token-value",
                "note": "Created by cert-manager digicloud issuer"
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client
            .create_txt_record("example.com", "_acme-challenge", "token-value", 300)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_rejects_other_success_codes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(RECORDS_PATH))
            .respond_with(ResponseTemplate::new(201).set_body_string("created"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .create_txt_record("example.com", "_acme-challenge", "token-value", 300)
            .await
            .unwrap_err();

        match err {
            DigicloudError::UnexpectedStatus {
                status,
                expected,
                body,
                ..
            } => {
                assert_eq!(status, 201);
                assert_eq!(expected, 202);
                assert_eq!(body, "created");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_error_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(RECORDS_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_string("{\"detail\":\"forbidden\"}"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .create_txt_record("example.com", "_acme-challenge", "token-value", 300)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("HTTP 403"));
        assert!(err.to_string().contains("forbidden"));
    }

    // ========================================================================
    // Find
    // ========================================================================

    #[tokio::test]
    async fn test_find_matches_name_and_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RECORDS_PATH))
            .and(header("Authorization", "Bearer test-token"))
            .and(header("Digicloud-Namespace", "tenant-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing()))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let id = client
            .find_txt_record("example.com", "_acme-challenge", "token-value")
            .await
            .unwrap();

        assert_eq!(id.as_deref(), Some("rec-c"));
    }

    #[tokio::test]
    async fn test_find_with_different_content_returns_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RECORDS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing()))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let id = client
            .find_txt_record("example.com", "_acme-challenge", "no-such-value")
            .await
            .unwrap();
        assert!(id.is_none());

        // Same content, wrong type
        let id = client
            .find_txt_record("example.com", "www", "192.0.2.1")
            .await
            .unwrap();
        assert!(id.is_none());
    }

    #[tokio::test]
    async fn test_find_accepts_numeric_ids() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RECORDS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "records": [{"id": 42, "name": "@", "ttl": "60s", "type": "TXT", "content": "v"}]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let id = client.find_txt_record("example.com", "@", "v").await.unwrap();
        assert_eq!(id.as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn test_find_rejects_invalid_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RECORDS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .find_txt_record("example.com", "_acme-challenge", "v")
            .await
            .unwrap_err();
        assert!(matches!(err, DigicloudError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_find_non_200_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RECORDS_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .find_txt_record("example.com", "_acme-challenge", "v")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DigicloudError::UnexpectedStatus { status: 500, .. }
        ));
    }

    // ========================================================================
    // Delete
    // ========================================================================

    #[tokio::test]
    async fn test_delete_expects_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(format!("{RECORDS_PATH}/rec-c")))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.delete_txt_record("example.com", "rec-c").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_200_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(format!("{RECORDS_PATH}/rec-c")))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.delete_txt_record("example.com", "rec-c").await.is_err());
    }

    // ========================================================================
    // Present / cleanup
    // ========================================================================

    #[tokio::test]
    async fn test_present_resolves_zone_and_label() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RECORDS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"records": []})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(RECORDS_PATH))
            .and(body_json(serde_json::json!({
                "name": "_acme-challenge.sub",
                "ttl": "120s",
                "type": "TXT",
                "content": "v",
                "note": "Created by cert-manager digicloud issuer"
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let record = client
            .present("_acme-challenge.sub.example.com.", "v", 120)
            .await
            .unwrap();
        assert_eq!(record.zone, "example.com");
        assert_eq!(record.label, "_acme-challenge.sub");
    }

    #[tokio::test]
    async fn test_present_reuses_existing_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RECORDS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(202))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let record = client
            .present("_acme-challenge.example.com.", "token-value", 300)
            .await
            .unwrap();
        assert_eq!(record.zone, "example.com");
        assert_eq!(record.label, "_acme-challenge");
    }

    #[tokio::test]
    async fn test_present_same_label_other_content_still_creates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RECORDS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing()))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(RECORDS_PATH))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client
            .present("_acme-challenge.example.com.", "fresh-value", 300)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_present_lookup_failure_skips_create() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RECORDS_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(202))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .present("_acme-challenge.example.com.", "token-value", 300)
            .await
            .unwrap_err();
        assert!(matches!(err, DnsError::Api(_)));
    }

    #[tokio::test]
    async fn test_present_invalid_fqdn_makes_no_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(202))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.present("localhost", "v", 300).await.unwrap_err();
        assert!(matches!(err, DnsError::Zone(_)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_cleanup_deletes_matching_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RECORDS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path(format!("{RECORDS_PATH}/rec-c")))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let removed = client
            .cleanup("_acme-challenge.example.com.", "token-value")
            .await
            .unwrap();
        assert!(removed);
    }

    #[tokio::test]
    async fn test_cleanup_not_found_skips_delete() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RECORDS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"records": []})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let removed = client
            .cleanup("_acme-challenge.example.com", "token-value")
            .await
            .unwrap();
        assert!(!removed);
    }

    #[tokio::test]
    async fn test_trailing_slash_in_base_url() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(format!("{RECORDS_PATH}/rec-1")))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let config = IssuerConfig::new(
            &format!("{}/", server.uri()),
            "test-token",
            "default",
            300,
            Duration::from_secs(300),
            Duration::from_secs(10),
        );
        let client = DigicloudClient::new(build_http_client().unwrap(), &config);
        client.delete_txt_record("example.com", "rec-1").await.unwrap();
    }

    #[test]
    fn test_debug_hides_token() {
        let config = IssuerConfig::new(
            "https://api.digicloud.ir",
            "very-secret",
            "default",
            300,
            Duration::from_secs(300),
            Duration::from_secs(10),
        );
        let client = DigicloudClient::new(build_http_client().unwrap(), &config);
        assert!(!format!("{client:?}").contains("very-secret"));
    }
}
