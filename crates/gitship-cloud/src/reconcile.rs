//! Garbage collection of functions a repository no longer declares.
//!
//! The inventory read is unscoped. Only names carrying the requesting
//! owner's `<owner>-` prefix are ever considered for deletion.

use std::collections::{BTreeSet, HashSet};

use gitship_core::{DeployedFunction, GarbageRequest};

use crate::gateway::{Gateway, GatewayError};

/// `<owner>-`
pub fn owner_prefix(owner: &str) -> String {
    format!("{owner}-")
}

/// Full deployed name for a manifest function.
pub fn qualified_name(owner: &str, function: &str) -> String {
    format!("{owner}-{function}")
}

/// Deployed functions owned by `owner` that are not in `desired`.
///
/// Returns full deployed names, sorted and without duplicates.
///
/// Ownership is inferred from the name alone. Logins that contain `-` can
/// overlap: owner `alex` also matches `alex-corp-fn`, deployed by
/// `alex-corp`. Inventory labels are not consulted.
pub fn orphans(owner: &str, desired: &[String], deployed: &[DeployedFunction]) -> Vec<String> {
    if owner.is_empty() {
        return Vec::new();
    }

    let prefix = owner_prefix(owner);
    let wanted: HashSet<String> = desired.iter().map(|d| qualified_name(owner, d)).collect();

    deployed
        .iter()
        .map(|f| f.name.as_str())
        .filter(|name| name.starts_with(&prefix) && !wanted.contains(*name))
        .map(str::to_owned)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub orphans: Vec<String>,
    pub deleted: Vec<String>,
    pub failed: Vec<(String, GatewayError)>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Computes orphans from the live inventory and deletes them.
pub struct Reconciler<G: Gateway> {
    gateway: G,
}

impl<G: Gateway> Reconciler<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    /// Delete every orphan. A failed delete is logged and does not stop
    /// the remaining ones.
    pub async fn collect(&self, request: &GarbageRequest) -> Result<ReconcileReport, ReconcileError> {
        if request.owner.trim().is_empty() {
            return Err(ReconcileError::MissingOwner);
        }

        tracing::info!(
            owner = %request.owner,
            repo = %request.repo,
            desired = request.functions.len(),
            "reconciling deployed functions"
        );

        let deployed = self
            .gateway
            .list_functions()
            .await
            .map_err(|e| ReconcileError::List { source: e })?;

        let mut report = ReconcileReport {
            orphans: orphans(&request.owner, &request.functions, &deployed),
            ..Default::default()
        };
        tracing::info!(owner = %request.owner, orphans = ?report.orphans, "orphaned functions");

        for name in report.orphans.clone() {
            tracing::info!(function = %name, "deleting");
            match self.gateway.delete_function(&name).await {
                Ok(body) => {
                    tracing::debug!(function = %name, response = %body.trim(), "deleted");
                    report.deleted.push(name);
                }
                Err(e) => {
                    tracing::warn!(function = %name, error = %e, "delete failed");
                    report.failed.push((name, e));
                }
            }
        }

        Ok(report)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("garbage-collect request has no owner")]
    MissingOwner,

    #[error("failed to list deployed functions")]
    List { source: GatewayError },
}
