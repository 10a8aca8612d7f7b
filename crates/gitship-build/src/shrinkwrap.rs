use std::path::{Path, PathBuf};

use gitship_core::{BuildConfig, Stack};

use crate::runner::{CommandRunner, RealRunner, RunnerError};

/// Directory the builder leaves a function's build context in.
pub fn context_dir(checkout: &Path, function: &str) -> PathBuf {
    checkout.join("build").join(function)
}

/// Runs the external builder in shrinkwrap mode: build contexts only, no
/// images.
pub struct BuildOrchestrator<R: CommandRunner = RealRunner> {
    runner: R,
    builder: String,
    builder_args: Vec<String>,
}

impl BuildOrchestrator<RealRunner> {
    pub fn new(config: &BuildConfig) -> Self {
        Self::with_runner(RealRunner, config)
    }
}

impl<R: CommandRunner> BuildOrchestrator<R> {
    pub fn with_runner(runner: R, config: &BuildConfig) -> Self {
        Self {
            runner,
            builder: config.builder.clone(),
            builder_args: config.builder_args(),
        }
    }

    /// Invoke the builder once and verify every function got a context.
    pub async fn build(&self, checkout: &Path, stack: &Stack) -> Result<(), BuildError> {
        tracing::info!(
            builder = %self.builder,
            functions = stack.len(),
            "shrinkwrapping build contexts"
        );

        self.runner
            .exec(&self.builder, &self.builder_args, checkout)
            .await
            .map_err(|e| BuildError::Builder {
                program: self.builder.clone(),
                source: e,
            })?;

        for (name, _) in stack.functions() {
            let dir = context_dir(checkout, name);
            if !dir.is_dir() {
                return Err(BuildError::MissingContext {
                    function: name.to_owned(),
                    path: dir,
                });
            }
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("{program} build failed")]
    Builder {
        program: String,
        source: RunnerError,
    },

    #[error("builder produced no context for '{function}' at {path}")]
    MissingContext { function: String, path: PathBuf },
}
