//! One run of the push pipeline.
//!
//! ```text
//! Init → Fetched → ManifestParsed → Built → Packaged → Deployed → Reconciled → Done
//! ```
//!
//! Every stage up to and including packaging is fatal. Deployment failures
//! are recorded per function and the run still asks the collector to
//! reconcile. A failed collector call is logged and the run completes.

use std::fmt;
use std::path::{Path, PathBuf};

use gitship_build::{
    BuildError, BuildOrchestrator, CommandRunner, FetchError, Fetcher, PackageError, Packager,
    TarEntry, WorkspaceAllocator,
};
use gitship_cloud::{DeployOutcome, DispatchReport, Dispatcher, Gateway, GatewayError, StatusReporter};
use gitship_core::status::{EMPTY_AUTH_TOKEN, STACK_CONTEXT, function_context};
use gitship_core::{
    CommitState, GarbageRequest, GitshipConfig, ManifestParser, PushEvent, Stack, Status,
    StatusEvent, YamlManifestParser,
};
use secrecy::SecretString;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Init,
    Fetched,
    ManifestParsed,
    Built,
    Packaged,
    Deployed,
    Reconciled,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Fetched => "fetched",
            Self::ManifestParsed => "manifest-parsed",
            Self::Built => "built",
            Self::Packaged => "packaged",
            Self::Deployed => "deployed",
            Self::Reconciled => "reconciled",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Outcome of asking the collector to reconcile.
#[derive(Debug)]
pub enum Reconciliation {
    Requested { response: String },
    Failed(GatewayError),
}

#[derive(Debug)]
pub struct RunSummary {
    pub stage: Stage,
    pub checkout: PathBuf,
    pub archives: Vec<TarEntry>,
    pub dispatch: DispatchReport,
    pub reconciliation: Reconciliation,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("fetch failed")]
    Fetch { source: FetchError },

    #[error("failed to read manifest")]
    Manifest { source: gitship_core::Error },

    #[error("build failed")]
    Build { source: BuildError },

    #[error("packaging failed")]
    Package { source: PackageError },

    #[error("packaging task did not complete")]
    PackageTask { source: tokio::task::JoinError },
}

impl PipelineError {
    /// Last stage the run reached before failing.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Fetch { .. } => Stage::Init,
            Self::Manifest { .. } => Stage::Fetched,
            Self::Build { .. } => Stage::ManifestParsed,
            Self::Package { .. } | Self::PackageTask { .. } => Stage::Built,
        }
    }
}

/// Everything produced by the fatal stages.
struct Prepared {
    checkout: PathBuf,
    stack: Stack,
    archives: Vec<TarEntry>,
}

pub struct Pipeline<R: CommandRunner, G: Gateway> {
    config: GitshipConfig,
    workspace: WorkspaceAllocator,
    runner: R,
    gateway: G,
}

impl<R: CommandRunner, G: Gateway> Pipeline<R, G> {
    pub fn new(config: GitshipConfig, runner: R, gateway: G) -> Self {
        let workspace = WorkspaceAllocator::from_config(&config.workspace);
        Self {
            config,
            workspace,
            runner,
            gateway,
        }
    }

    pub async fn run(&self, event: &PushEvent) -> Result<RunSummary, PipelineError> {
        let mut statuses = Statuses::new(&self.gateway, event, self.config.status.enabled);
        statuses.add(CommitState::Pending, "stack deploy in progress", STACK_CONTEXT);
        statuses.flush().await;

        let prepared = match self.prepare(event).await {
            Ok(prepared) => prepared,
            Err(e) => {
                tracing::error!(stage = %e.stage(), error = %e, "run aborted");
                statuses.add(CommitState::Failure, &e.to_string(), STACK_CONTEXT);
                statuses.flush().await;
                return Err(e);
            }
        };

        let dispatch = Dispatcher::new(&self.gateway, self.config.dispatch.policy)
            .dispatch(&prepared.archives, event.owner(), event.repo_name())
            .await;
        enter(Stage::Deployed);

        for result in &dispatch.results {
            let context = function_context(&result.function);
            match &result.outcome {
                DeployOutcome::Deployed { .. } => {
                    statuses.add(CommitState::Success, "function deployed", &context)
                }
                DeployOutcome::Failed(e) => statuses.add(
                    CommitState::Failure,
                    &format!("deploy failed: {e}"),
                    &context,
                ),
                DeployOutcome::Skipped => statuses.add(
                    CommitState::Failure,
                    "not deployed after an earlier failure",
                    &context,
                ),
            }
        }
        statuses.flush().await;

        let reconciliation = self.request_collection(event, &prepared.stack).await;
        enter(Stage::Reconciled);

        if dispatch.is_success() {
            statuses.add(CommitState::Success, "stack deployed", STACK_CONTEXT);
        } else {
            let failed = dispatch.failed().len();
            statuses.add(
                CommitState::Failure,
                &format!("{failed} function(s) failed to deploy"),
                STACK_CONTEXT,
            );
        }
        statuses.flush().await;
        enter(Stage::Done);

        Ok(RunSummary {
            stage: Stage::Done,
            checkout: prepared.checkout,
            archives: prepared.archives,
            dispatch,
            reconciliation,
        })
    }

    async fn prepare(&self, event: &PushEvent) -> Result<Prepared, PipelineError> {
        enter(Stage::Init);

        let dest = self.workspace.allocate(event);
        let checkout = Fetcher::with_runner(&self.runner)
            .fetch(event, &dest)
            .await
            .map_err(|e| PipelineError::Fetch { source: e })?;
        enter(Stage::Fetched);

        let stack = YamlManifestParser
            .parse(&checkout.join(&self.config.build.manifest))
            .map_err(|e| PipelineError::Manifest { source: e })?;
        tracing::info!(functions = ?stack.names(), "manifest parsed");
        enter(Stage::ManifestParsed);

        BuildOrchestrator::with_runner(&self.runner, &self.config.build)
            .build(&checkout, &stack)
            .await
            .map_err(|e| PipelineError::Build { source: e })?;
        enter(Stage::Built);

        let archives = package(
            Packager::new(&self.config.build),
            &checkout,
            &stack,
            event.sha(),
        )
        .await?;
        enter(Stage::Packaged);

        Ok(Prepared {
            checkout,
            stack,
            archives,
        })
    }

    async fn request_collection(&self, event: &PushEvent, stack: &Stack) -> Reconciliation {
        let request = GarbageRequest {
            functions: stack.names(),
            repo: event.repo_name().to_owned(),
            owner: event.owner().to_owned(),
        };

        match self.gateway.collect(&request).await {
            Ok(response) => {
                tracing::info!(owner = %request.owner, response = %response.trim(), "garbage collection requested");
                Reconciliation::Requested { response }
            }
            Err(e) => {
                tracing::warn!(owner = %request.owner, error = %e, "garbage collection request failed");
                Reconciliation::Failed(e)
            }
        }
    }
}

fn enter(stage: Stage) {
    tracing::debug!(stage = %stage, "stage reached");
}

/// Run the packager off the async runtime.
async fn package(
    packager: Packager,
    checkout: &Path,
    stack: &Stack,
    sha: &str,
) -> Result<Vec<TarEntry>, PipelineError> {
    let checkout = checkout.to_path_buf();
    let stack = stack.clone();
    let sha = sha.to_owned();

    tokio::task::spawn_blocking(move || packager.package(&checkout, &stack, &sha))
        .await
        .map_err(|e| PipelineError::PackageTask { source: e })?
        .map_err(|e| PipelineError::Package { source: e })
}

/// Commit-status reporting, active only when enabled in configuration.
/// Reporting failures never affect the run.
struct Statuses<'a, G: Gateway> {
    reporter: Option<StatusReporter<&'a G>>,
}

impl<'a, G: Gateway> Statuses<'a, G> {
    fn new(gateway: &'a G, event: &PushEvent, enabled: bool) -> Self {
        let reporter = enabled.then(|| {
            let status = Status::new(
                StatusEvent::from_push(event),
                SecretString::from(EMPTY_AUTH_TOKEN.to_owned()),
            );
            StatusReporter::new(gateway, status)
        });
        Self { reporter }
    }

    fn add(&mut self, state: CommitState, description: &str, context: &str) {
        if let Some(reporter) = &mut self.reporter {
            reporter.add(state, description, context);
        }
    }

    async fn flush(&mut self) {
        let Some(reporter) = &mut self.reporter else {
            return;
        };
        if let Err(e) = reporter.report().await {
            tracing::warn!(error = %e, "failed to report commit status");
        }
    }
}
