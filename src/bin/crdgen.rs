// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Writes the issuer CRD manifests to `deploy/crds/`.
//!
//! `CertificateRequest` is owned by cert-manager and is not generated.
//!
//! Usage:
//!   cargo run --bin crdgen [OUTPUT_DIR]

use digicloud_issuer::crd::{DigicloudClusterIssuer, DigicloudIssuer};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::CustomResourceExt;
use std::fs;
use std::path::PathBuf;

const DEFAULT_OUTPUT_DIR: &str = "deploy/crds";

const HEADER: &str = "# Copyright (c) 2025 Erick Bourgeois, firestoned
# SPDX-License-Identifier: MIT
#
# Generated by `cargo run --bin crdgen` from src/crd.rs. Do not edit.
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output_dir = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR), PathBuf::from);
    fs::create_dir_all(&output_dir)?;

    let manifests: [(&str, CustomResourceDefinition); 2] = [
        ("digicloudissuers.crd.yaml", DigicloudIssuer::crd()),
        ("digicloudclusterissuers.crd.yaml", DigicloudClusterIssuer::crd()),
    ];

    for (file_name, crd) in &manifests {
        let path = output_dir.join(file_name);
        fs::write(&path, format!("{HEADER}{}", serde_yaml::to_string(crd)?))?;
        println!("wrote {}", path.display());
    }

    Ok(())
}
