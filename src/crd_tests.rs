// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::crd::*;
    use k8s_openapi::ByteString;
    use kube::CustomResourceExt;

    #[test]
    fn test_condition_serializes_camel_case() {
        let condition = Condition {
            r#type: "Ready".into(),
            status: "False".into(),
            reason: Some("Pending".into()),
            message: Some("DNS validation in progress".into()),
            last_transition_time: Some("2025-06-01T10:00:00Z".into()),
        };

        let json = serde_json::to_value(&condition).unwrap();
        assert_eq!(json["type"], "Ready");
        assert_eq!(json["lastTransitionTime"], "2025-06-01T10:00:00Z");
        assert!(json.get("last_transition_time").is_none());
    }

    #[test]
    fn test_provisioner_deserializes_optional_fields() {
        let provisioner: IssuerProvisioner = serde_json::from_value(serde_json::json!({
            "apiTokenSecretRef": {"name": "creds", "key": "token"}
        }))
        .unwrap();

        assert_eq!(provisioner.api_token_secret_ref.name, "creds");
        assert_eq!(provisioner.api_token_secret_ref.key, "token");
        assert!(provisioner.api_base_url.is_none());
        assert!(provisioner.ttl.is_none());
        assert!(provisioner.propagation_timeout.is_none());
        assert!(provisioner.polling_interval.is_none());
    }

    #[test]
    fn test_provisioner_full() {
        let provisioner: IssuerProvisioner = serde_json::from_value(serde_json::json!({
            "apiBaseUrl": "https://dns.example.net/",
            "apiTokenSecretRef": {"name": "creds", "key": "token"},
            "ttl": 120,
            "propagationTimeout": "2m",
            "pollingInterval": "5s"
        }))
        .unwrap();

        assert_eq!(
            provisioner.api_base_url.as_deref(),
            Some("https://dns.example.net/")
        );
        assert_eq!(provisioner.ttl, Some(120));
        assert_eq!(provisioner.propagation_timeout.as_deref(), Some("2m"));
        assert_eq!(provisioner.polling_interval.as_deref(), Some("5s"));
    }

    #[test]
    fn test_certificate_request_round_trip_from_cert_manager_json() {
        let request: CertificateRequest = serde_json::from_value(serde_json::json!({
            "apiVersion": "cert-manager.io/v1",
            "kind": "CertificateRequest",
            "metadata": {"name": "web", "namespace": "default", "uid": "abc"},
            "spec": {
                "request": "LS0tLS1CRUdJTg==",
                "issuerRef": {
                    "name": "digicloud",
                    "kind": "DigicloudIssuer",
                    "group": "digicloud.issuer.vamirreza.github.io"
                },
                "isCA": false
            },
            "status": {
                "conditions": [{
                    "type": "Ready",
                    "status": "True",
                    "reason": "Issued",
                    "lastTransitionTime": "2025-06-01T10:00:00Z"
                }],
                "certificate": "Q0VSVA=="
            }
        }))
        .unwrap();

        assert_eq!(request.spec.request.0, b"-----BEGIN".to_vec());
        assert_eq!(request.spec.issuer_ref.kind, "DigicloudIssuer");
        assert_eq!(request.spec.is_ca, Some(false));

        let status = request.status.unwrap();
        assert_eq!(status.conditions.len(), 1);
        assert!(status.has_certificate());
    }

    #[test]
    fn test_issuer_ref_defaults_kind_and_group() {
        let issuer_ref: IssuerRef =
            serde_json::from_value(serde_json::json!({"name": "letsencrypt"})).unwrap();

        assert_eq!(issuer_ref.name, "letsencrypt");
        assert!(issuer_ref.kind.is_empty());
        assert!(issuer_ref.group.is_empty());
    }

    #[test]
    fn test_has_certificate_ignores_empty_payload() {
        let mut status = CertificateRequestStatus::default();
        assert!(!status.has_certificate());

        status.certificate = Some(ByteString(Vec::new()));
        assert!(!status.has_certificate());

        status.certificate = Some(ByteString(b"CERT".to_vec()));
        assert!(status.has_certificate());
    }

    #[test]
    fn test_status_skips_empty_optionals() {
        let json = serde_json::to_value(CertificateRequestStatus::default()).unwrap();
        assert_eq!(json, serde_json::json!({"conditions": []}));
    }

    #[test]
    fn test_issuer_crd_scopes() {
        let namespaced = DigicloudIssuer::crd();
        assert_eq!(namespaced.spec.scope, "Namespaced");
        assert_eq!(namespaced.spec.group, "digicloud.issuer.vamirreza.github.io");
        assert_eq!(namespaced.spec.names.kind, "DigicloudIssuer");

        let cluster = DigicloudClusterIssuer::crd();
        assert_eq!(cluster.spec.scope, "Cluster");
        assert_eq!(cluster.spec.names.kind, "DigicloudClusterIssuer");
    }

    #[test]
    fn test_issuer_api_version_matches_constants() {
        use crate::constants::{API_GROUP, API_GROUP_VERSION, API_VERSION};
        use kube::Resource;

        assert_eq!(DigicloudIssuer::group(&()), API_GROUP);
        assert_eq!(DigicloudIssuer::version(&()), API_VERSION);
        assert_eq!(DigicloudIssuer::api_version(&()), API_GROUP_VERSION);
        assert_eq!(DigicloudClusterIssuer::api_version(&()), API_GROUP_VERSION);
    }

    #[test]
    fn test_certificate_request_schema_types_byte_fields_as_strings() {
        let crd = serde_json::to_value(CertificateRequest::crd()).unwrap();
        let schema = &crd["spec"]["versions"][0]["schema"]["openAPIV3Schema"]["properties"];

        assert_eq!(schema["spec"]["properties"]["request"]["type"], "string");
        assert_eq!(
            schema["status"]["properties"]["certificate"]["type"],
            "string"
        );
        assert_eq!(schema["status"]["properties"]["ca"]["type"], "string");
    }
}
