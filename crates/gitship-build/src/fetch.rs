use std::path::{Path, PathBuf};

use gitship_core::PushEvent;

use crate::runner::{CommandRunner, RealRunner, RunnerError};

/// Checks out the pushed commit into a local directory.
pub struct Fetcher<R: CommandRunner = RealRunner> {
    runner: R,
}

impl Fetcher<RealRunner> {
    pub fn new() -> Self {
        Self { runner: RealRunner }
    }
}

impl Default for Fetcher<RealRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> Fetcher<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }

    /// Clone `event`'s repository into `dest` and check out the pushed commit.
    ///
    /// An existing `dest` is removed first; nothing from a previous checkout
    /// survives.
    pub async fn fetch(&self, event: &PushEvent, dest: &Path) -> Result<PathBuf, FetchError> {
        let parent = dest
            .parent()
            .ok_or_else(|| FetchError::InvalidPath(dest.to_path_buf()))?;
        let dest_str = dest
            .to_str()
            .ok_or_else(|| FetchError::InvalidPath(dest.to_path_buf()))?;

        std::fs::create_dir_all(parent).map_err(|e| FetchError::Prepare {
            path: parent.to_path_buf(),
            source: e,
        })?;

        if dest.exists() {
            tracing::debug!(path = %dest.display(), "removing previous checkout");
            std::fs::remove_dir_all(dest).map_err(|e| FetchError::Cleanup {
                path: dest.to_path_buf(),
                source: e,
            })?;
        }

        tracing::info!(
            repo = %event.repository.full_name,
            url = %event.repository.clone_url,
            "cloning"
        );
        self.runner
            .exec(
                "git",
                &args(["clone", &event.repository.clone_url, dest_str]),
                parent,
            )
            .await
            .map_err(|e| FetchError::Clone { source: e })?;

        self.runner
            .exec("git", &args(["checkout", event.sha()]), dest)
            .await
            .map_err(|e| FetchError::Checkout {
                sha: event.sha().to_owned(),
                source: e,
            })?;
        tracing::info!(sha = %event.sha(), path = %dest.display(), "checked out");

        Ok(dest.to_path_buf())
    }
}

fn args<const N: usize>(a: [&str; N]) -> Vec<String> {
    a.iter().map(|s| (*s).to_owned()).collect()
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("checkout path is not usable: {0}")]
    InvalidPath(PathBuf),

    #[error("failed to create workspace directory {path}")]
    Prepare {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to remove previous checkout {path}")]
    Cleanup {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("git clone failed")]
    Clone { source: RunnerError },

    #[error("git checkout {sha} failed")]
    Checkout { sha: String, source: RunnerError },
}
