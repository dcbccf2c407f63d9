// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes reconciliation controllers.
//!
//! # Available Reconcilers
//!
//! - [`reconcile_certificate_request`] - Drives cert-manager `CertificateRequest`
//!   resources through the DNS-01 challenge
//! - [`reconcile_digicloud_issuer`] - Validates namespaced `DigicloudIssuer` resources
//! - [`reconcile_digicloud_cluster_issuer`] - Validates cluster-scoped
//!   `DigicloudClusterIssuer` resources
//!
//! Every reconciler is level-triggered: it derives what to do from the object's
//! current status and never blocks waiting for DNS. Waiting is a requeue.

pub mod certificaterequest;
pub mod issuer;
pub mod retry;
pub mod status;

pub use certificaterequest::reconcile_certificate_request;
pub use issuer::{reconcile_digicloud_cluster_issuer, reconcile_digicloud_issuer};
