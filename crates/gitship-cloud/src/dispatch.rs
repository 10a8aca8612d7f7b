use std::path::PathBuf;

use gitship_build::TarEntry;
use gitship_core::DispatchPolicy;

use crate::gateway::{DeployRequest, Gateway, GatewayError};

/// Ships packaged archives to the deploy function, one at a time.
pub struct Dispatcher<G: Gateway> {
    gateway: G,
    policy: DispatchPolicy,
}

#[derive(Debug)]
pub enum DeployOutcome {
    /// Request completed; the status is not otherwise interpreted.
    Deployed { status: u16 },
    Failed(DispatchError),
    /// Not attempted because an earlier entry failed under fail-fast.
    Skipped,
}

#[derive(Debug)]
pub struct FunctionDeploy {
    pub function: String,
    pub image: String,
    pub outcome: DeployOutcome,
}

/// Per-function outcomes, in dispatch order.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub results: Vec<FunctionDeploy>,
}

impl DispatchReport {
    pub fn deployed(&self) -> Vec<&str> {
        self.filter(|o| matches!(o, DeployOutcome::Deployed { .. }))
    }

    pub fn failed(&self) -> Vec<&str> {
        self.filter(|o| matches!(o, DeployOutcome::Failed(_)))
    }

    pub fn skipped(&self) -> Vec<&str> {
        self.filter(|o| matches!(o, DeployOutcome::Skipped))
    }

    pub fn first_error(&self) -> Option<&DispatchError> {
        self.results.iter().find_map(|r| match &r.outcome {
            DeployOutcome::Failed(e) => Some(e),
            _ => None,
        })
    }

    pub fn is_success(&self) -> bool {
        self.first_error().is_none()
    }

    /// Names of deployed functions, or the first failure.
    pub fn into_result(self) -> Result<Vec<String>, DispatchError> {
        let mut deployed = Vec::new();
        for result in self.results {
            match result.outcome {
                DeployOutcome::Deployed { .. } => deployed.push(result.function),
                DeployOutcome::Failed(e) => return Err(e),
                DeployOutcome::Skipped => {}
            }
        }
        Ok(deployed)
    }

    fn filter(&self, pred: impl Fn(&DeployOutcome) -> bool) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| pred(&r.outcome))
            .map(|r| r.function.as_str())
            .collect()
    }
}

impl<G: Gateway> Dispatcher<G> {
    pub fn new(gateway: G, policy: DispatchPolicy) -> Self {
        Self { gateway, policy }
    }

    pub async fn dispatch(&self, entries: &[TarEntry], owner: &str, repo: &str) -> DispatchReport {
        let mut report = DispatchReport::default();
        let mut halted = false;

        for entry in entries {
            let outcome = if halted {
                tracing::warn!(function = %entry.function_name, "skipping deploy after earlier failure");
                DeployOutcome::Skipped
            } else {
                match self.deploy_one(entry, owner, repo).await {
                    Ok(status) => DeployOutcome::Deployed { status },
                    Err(e) => {
                        tracing::error!(function = %entry.function_name, error = %e, "deploy failed");
                        halted = self.policy == DispatchPolicy::FailFast;
                        DeployOutcome::Failed(e)
                    }
                }
            };

            report.results.push(FunctionDeploy {
                function: entry.function_name.clone(),
                image: entry.image_ref.clone(),
                outcome,
            });
        }

        report
    }

    async fn deploy_one(
        &self,
        entry: &TarEntry,
        owner: &str,
        repo: &str,
    ) -> Result<u16, DispatchError> {
        tracing::info!(function = %entry.function_name, image = %entry.image_ref, "deploying");

        let archive = tokio::fs::File::open(&entry.archive_path)
            .await
            .map_err(|e| DispatchError::Open {
                path: entry.archive_path.clone(),
                source: e,
            })?;

        let request = DeployRequest {
            owner: owner.to_owned(),
            repo: repo.to_owned(),
            service: entry.function_name.clone(),
            image: entry.image_ref.clone(),
        };

        let status = self
            .gateway
            .deploy(&request, archive)
            .await
            .map_err(|e| DispatchError::Deploy {
                function: entry.function_name.clone(),
                source: e,
            })?;

        if (200..300).contains(&status) {
            tracing::info!(function = %entry.function_name, status, owner, "service deployed");
        } else {
            tracing::warn!(function = %entry.function_name, status, owner, "deploy function answered with non-success status");
        }
        Ok(status)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("failed to open archive {path}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to deploy '{function}'")]
    Deploy {
        function: String,
        source: GatewayError,
    },
}
