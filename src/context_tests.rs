// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for context.rs

#[cfg(test)]
mod tests {
    use super::super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<OperatorSettings> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        OperatorSettings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = settings(&[]).unwrap();

        assert_eq!(
            settings.cluster_resource_namespace,
            "digicloud-issuer-system"
        );
        assert_eq!(
            settings.metrics_bind_address,
            "0.0.0.0:8080".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(settings.reconcile_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_cluster_resource_namespace_precedence() {
        let from_pod = settings(&[(ENV_POD_NAMESPACE, "operators")]).unwrap();
        assert_eq!(from_pod.cluster_resource_namespace, "operators");

        let explicit = settings(&[
            (ENV_POD_NAMESPACE, "operators"),
            (ENV_CLUSTER_RESOURCE_NAMESPACE, "cert-manager"),
        ])
        .unwrap();
        assert_eq!(explicit.cluster_resource_namespace, "cert-manager");

        let empty = settings(&[
            (ENV_CLUSTER_RESOURCE_NAMESPACE, "  "),
            (ENV_POD_NAMESPACE, "operators"),
        ])
        .unwrap();
        assert_eq!(empty.cluster_resource_namespace, "operators");
    }

    #[test]
    fn test_overrides() {
        let settings = settings(&[
            (ENV_METRICS_BIND_ADDRESS, "127.0.0.1:9090"),
            (ENV_RECONCILE_TIMEOUT_SECS, "45"),
        ])
        .unwrap();

        assert_eq!(settings.metrics_bind_address.port(), 9090);
        assert_eq!(settings.reconcile_timeout, Duration::from_secs(45));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(settings(&[(ENV_METRICS_BIND_ADDRESS, "not-an-address")]).is_err());
        assert!(settings(&[(ENV_RECONCILE_TIMEOUT_SECS, "soon")]).is_err());
    }
}
