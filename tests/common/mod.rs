// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

// Cluster helpers shared by the live integration tests

use k8s_openapi::api::core::v1::{Namespace, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{
    api::{Api, DeleteParams, PostParams},
    client::Client,
};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Client for the current kubeconfig, or `None` when no cluster is reachable
pub async fn get_kube_client_or_skip() -> Option<Client> {
    match Client::try_default().await {
        Ok(client) => Some(client),
        Err(e) => {
            eprintln!("No reachable cluster, skipping: {e}");
            None
        }
    }
}

/// Create a labelled namespace; an existing one is reused
pub async fn create_test_namespace(
    client: &Client,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let namespaces: Api<Namespace> = Api::all(client.clone());

    let labels = BTreeMap::from([(
        "app.kubernetes.io/managed-by".to_string(),
        "digicloud-issuer-tests".to_string(),
    )]);

    let ns = Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(labels),
            ..Default::default()
        },
        ..Default::default()
    };

    match namespaces.create(&PostParams::default(), &ns).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(status)) if status.is_already_exists() => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Delete a namespace created by [`create_test_namespace`], ignoring 404
pub async fn cleanup_test_namespace(client: &Client, name: &str) {
    let namespaces: Api<Namespace> = Api::all(client.clone());

    match namespaces.delete(name, &DeleteParams::default()).await {
        Ok(_) => {}
        Err(kube::Error::Api(status)) if status.is_not_found() => {}
        Err(e) => eprintln!("Could not delete namespace {name}: {e}"),
    }
}

/// Create a secret holding a DigiCloud API token
pub async fn create_token_secret(
    client: &Client,
    namespace: &str,
    name: &str,
    key: &str,
    token: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);

    let mut string_data = BTreeMap::new();
    string_data.insert(key.to_string(), token.to_string());

    let secret = Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        string_data: Some(string_data),
        ..Default::default()
    };

    secrets.create(&PostParams::default(), &secret).await?;
    println!("Created token secret: {namespace}/{name}");
    Ok(())
}

/// Poll `api` until `check` accepts the named resource or the timeout expires
pub async fn wait_for<K, F>(
    api: &Api<K>,
    name: &str,
    timeout: Duration,
    check: F,
) -> Result<K, String>
where
    K: kube::Resource + Clone + serde::de::DeserializeOwned + Debug,
    F: Fn(&K) -> bool,
{
    let start = Instant::now();

    loop {
        if start.elapsed() > timeout {
            return Err(format!("Timeout waiting for {name}"));
        }

        match api.get(name).await {
            Ok(resource) if check(&resource) => return Ok(resource),
            Ok(_) => {}
            Err(kube::Error::Api(status)) if status.is_not_found() => {}
            Err(e) => return Err(format!("Error getting {name}: {e}")),
        }

        sleep(Duration::from_secs(2)).await;
    }
}
