use std::path::Path;
use std::process::Stdio;

/// Abstraction over subprocess execution for testability.
///
/// Production code uses [`RealRunner`], tests use mockall-generated mocks.
#[allow(async_fn_in_trait)]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` in `working_dir` and capture stdout.
    async fn exec(
        &self,
        program: &str,
        args: &[String],
        working_dir: &Path,
    ) -> Result<String, RunnerError>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    async fn exec(
        &self,
        program: &str,
        args: &[String],
        working_dir: &Path,
    ) -> Result<String, RunnerError> {
        (**self).exec(program, args, working_dir).await
    }
}

/// Spawns real processes with `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealRunner;

impl CommandRunner for RealRunner {
    async fn exec(
        &self,
        program: &str,
        args: &[String],
        working_dir: &Path,
    ) -> Result<String, RunnerError> {
        tracing::debug!(program, ?args, dir = %working_dir.display(), "exec");

        let output = tokio::process::Command::new(program)
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| RunnerError::Spawn {
                program: program.to_owned(),
                source: e,
            })?;

        if output.status.success() {
            String::from_utf8(output.stdout).map_err(|e| RunnerError::InvalidUtf8 {
                program: program.to_owned(),
                source: e,
            })
        } else {
            Err(RunnerError::CommandFailed {
                program: program.to_owned(),
                args: args.to_vec(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            })
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("failed to start {program}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} {args:?} failed ({status})\n{stderr}")]
    CommandFailed {
        program: String,
        args: Vec<String>,
        status: String,
        stderr: String,
    },

    #[error("{program} output was not valid UTF-8")]
    InvalidUtf8 {
        program: String,
        source: std::string::FromUtf8Error,
    },
}
