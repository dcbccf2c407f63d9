// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `status.rs`

#[cfg(test)]
mod tests {
    use crate::crd::{CertificateRequestStatus, Condition};
    use crate::reconcilers::status::{
        certificate_request_status_equal, condition_changed, conditions_equal, find_condition,
        merge_certificate_request_status, status_patch, update_condition_in_memory,
        upsert_condition,
    };
    use k8s_openapi::ByteString;

    const STATUS_TRUE: &str = "True";
    const STATUS_FALSE: &str = "False";

    fn condition_at(condition_type: &str, status: &str, message: &str, time: &str) -> Condition {
        Condition {
            r#type: condition_type.to_string(),
            status: status.to_string(),
            reason: Some("Pending".to_string()),
            message: Some(message.to_string()),
            last_transition_time: Some(time.to_string()),
        }
    }

    #[test]
    fn test_condition_changed() {
        let existing = Some(condition_at("Ready", STATUS_FALSE, "Waiting", "2025-01-01T00:00:00Z"));

        let mut same = condition_at("Ready", STATUS_FALSE, "Waiting", "2025-02-01T00:00:00Z");
        same.reason = Some("Other".to_string());
        assert!(!condition_changed(&existing, &same));

        let new_status = condition_at("Ready", STATUS_TRUE, "Waiting", "2025-01-01T00:00:00Z");
        assert!(condition_changed(&existing, &new_status));

        let new_message = condition_at("Ready", STATUS_FALSE, "Other", "2025-01-01T00:00:00Z");
        assert!(condition_changed(&existing, &new_message));

        assert!(condition_changed(&None, &same));
    }

    #[test]
    fn test_find_condition() {
        let conditions = vec![condition_at("Ready", STATUS_FALSE, "x", "2025-01-01T00:00:00Z")];

        assert_eq!(
            find_condition(&conditions, "Ready").and_then(|c| c.last_transition_time.as_deref()),
            Some("2025-01-01T00:00:00Z")
        );
        assert!(find_condition(&conditions, "Degraded").is_none());
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut conditions = vec![
            condition_at("Approved", STATUS_TRUE, "approved", "2025-01-01T00:00:00Z"),
            condition_at("Ready", STATUS_FALSE, "old", "2025-01-01T00:00:00Z"),
        ];

        upsert_condition(
            &mut conditions,
            condition_at("Ready", STATUS_TRUE, "new", "2025-01-02T00:00:00Z"),
        );

        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[0].r#type, "Approved");
        assert_eq!(conditions[1].message.as_deref(), Some("new"));
    }

    #[test]
    fn test_upsert_collapses_duplicates() {
        let mut conditions = vec![
            condition_at("Ready", STATUS_FALSE, "one", "2025-01-01T00:00:00Z"),
            condition_at("Approved", STATUS_TRUE, "approved", "2025-01-01T00:00:00Z"),
            condition_at("Ready", STATUS_FALSE, "two", "2025-01-01T00:00:00Z"),
        ];

        upsert_condition(
            &mut conditions,
            condition_at("Ready", STATUS_TRUE, "only", "2025-01-02T00:00:00Z"),
        );

        let ready: Vec<_> = conditions.iter().filter(|c| c.r#type == "Ready").collect();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].message.as_deref(), Some("only"));
        assert_eq!(conditions.len(), 2);
    }

    #[test]
    fn test_upsert_appends_when_missing() {
        let mut conditions = Vec::new();
        upsert_condition(
            &mut conditions,
            condition_at("Ready", STATUS_FALSE, "first", "2025-01-01T00:00:00Z"),
        );
        assert_eq!(conditions.len(), 1);
    }

    #[test]
    fn test_update_condition_preserves_time_when_status_unchanged() {
        let mut conditions = vec![condition_at(
            "Ready",
            STATUS_FALSE,
            "old",
            "2025-01-01T00:00:00Z",
        )];

        update_condition_in_memory(&mut conditions, "Ready", STATUS_FALSE, "Failed", "new");
        assert_eq!(
            conditions[0].last_transition_time.as_deref(),
            Some("2025-01-01T00:00:00Z")
        );
        assert_eq!(conditions[0].message.as_deref(), Some("new"));

        update_condition_in_memory(&mut conditions, "Ready", STATUS_TRUE, "Checked", "ok");
        assert_ne!(
            conditions[0].last_transition_time.as_deref(),
            Some("2025-01-01T00:00:00Z")
        );
        assert_eq!(conditions.len(), 1);
    }

    #[test]
    fn test_conditions_equal_ignores_time() {
        let a = vec![condition_at("Ready", STATUS_FALSE, "m", "2025-01-01T00:00:00Z")];
        let b = vec![condition_at("Ready", STATUS_FALSE, "m", "2025-06-01T00:00:00Z")];
        let c = vec![condition_at("Ready", STATUS_FALSE, "other", "2025-01-01T00:00:00Z")];

        assert!(conditions_equal(&a, &b));
        assert!(!conditions_equal(&a, &c));
        assert!(!conditions_equal(&a, &[]));
    }

    #[test]
    fn test_certificate_request_status_equal() {
        let status = CertificateRequestStatus {
            conditions: vec![condition_at("Ready", STATUS_FALSE, "m", "2025-01-01T00:00:00Z")],
            ..Default::default()
        };

        assert!(!certificate_request_status_equal(None, &status));
        assert!(certificate_request_status_equal(Some(&status), &status));

        let mut with_cert = status.clone();
        with_cert.certificate = Some(ByteString(b"cert".to_vec()));
        assert!(!certificate_request_status_equal(Some(&status), &with_cert));
    }

    #[test]
    fn test_merge_keeps_foreign_conditions_and_fields() {
        let latest = CertificateRequestStatus {
            conditions: vec![
                condition_at("Approved", STATUS_TRUE, "approved", "2025-01-01T00:00:00Z"),
                condition_at("Ready", STATUS_FALSE, "stale", "2025-01-01T00:00:00Z"),
            ],
            ca: Some(ByteString(b"existing-ca".to_vec())),
            ..Default::default()
        };
        let computed = CertificateRequestStatus {
            conditions: vec![condition_at("Ready", STATUS_TRUE, "fresh", "2025-01-02T00:00:00Z")],
            certificate: Some(ByteString(b"cert".to_vec())),
            ..Default::default()
        };

        let merged = merge_certificate_request_status(Some(&latest), &computed);

        assert_eq!(merged.conditions.len(), 2);
        assert_eq!(
            find_condition(&merged.conditions, "Ready")
                .and_then(|c| c.message.as_deref()),
            Some("fresh")
        );
        assert!(find_condition(&merged.conditions, "Approved").is_some());
        assert_eq!(merged.certificate, Some(ByteString(b"cert".to_vec())));
        assert_eq!(merged.ca, Some(ByteString(b"existing-ca".to_vec())));
    }

    #[test]
    fn test_merge_onto_empty_status() {
        let computed = CertificateRequestStatus {
            conditions: vec![condition_at("Ready", STATUS_FALSE, "m", "2025-01-01T00:00:00Z")],
            failure_time: Some("2025-01-01T00:00:00Z".to_string()),
            ..Default::default()
        };

        let merged = merge_certificate_request_status(None, &computed);
        assert_eq!(merged, computed);
    }

    #[test]
    fn test_status_patch_carries_resource_version() {
        let status = CertificateRequestStatus::default();

        let guarded = status_patch(Some("42"), &status);
        assert_eq!(guarded["metadata"]["resourceVersion"], "42");
        assert!(guarded.get("status").is_some());

        let unguarded = status_patch(None, &status);
        assert!(unguarded.get("metadata").is_none());
    }
}
