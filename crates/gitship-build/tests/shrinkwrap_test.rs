use std::path::Path;

use gitship_build::runner::{CommandRunner, RunnerError};
use gitship_build::{BuildError, BuildOrchestrator, context_dir};
use gitship_core::{BuildConfig, FunctionDefinition, Stack};
use mockall::mock;
use tempfile::TempDir;

mock! {
    Runner {}

    impl CommandRunner for Runner {
        async fn exec(
            &self,
            program: &str,
            args: &[String],
            working_dir: &Path,
        ) -> Result<String, RunnerError>;
    }
}

fn stack(names: &[&str]) -> Stack {
    names
        .iter()
        .map(|n| {
            (
                (*n).to_owned(),
                FunctionDefinition::new(format!("someuser/{n}"), format!("./{n}")),
            )
        })
        .collect()
}

#[tokio::test]
async fn builder_runs_once_in_checkout_with_configured_args() {
    let tmp = TempDir::new().unwrap();
    let checkout = tmp.path().to_path_buf();
    let mut mock = MockRunner::new();

    let expected_dir = checkout.clone();
    mock.expect_exec()
        .times(1)
        .withf(move |program, args, dir| {
            program == "faas-cli"
                && args.join(" ") == "build -f stack.yml --shrinkwrap"
                && dir == expected_dir
        })
        .returning(|_, _, dir| {
            for f in ["f1", "f2"] {
                std::fs::create_dir_all(dir.join("build").join(f)).unwrap();
            }
            Ok("Build complete\n".to_owned())
        });

    let orchestrator = BuildOrchestrator::with_runner(mock, &BuildConfig::default());
    orchestrator
        .build(&checkout, &stack(&["f1", "f2"]))
        .await
        .unwrap();

    assert!(context_dir(&checkout, "f1").is_dir());
    assert!(context_dir(&checkout, "f2").is_dir());
}

#[tokio::test]
async fn builder_reads_the_configured_manifest() {
    let tmp = TempDir::new().unwrap();
    let mut mock = MockRunner::new();

    mock.expect_exec()
        .times(1)
        .withf(|_, args, _| args.join(" ") == "build -f fns.yml --shrinkwrap")
        .returning(|_, _, dir| {
            std::fs::create_dir_all(dir.join("build/f1")).unwrap();
            Ok(String::new())
        });

    let config = BuildConfig {
        manifest: "fns.yml".to_owned(),
        ..Default::default()
    };
    BuildOrchestrator::with_runner(mock, &config)
        .build(tmp.path(), &stack(&["f1"]))
        .await
        .unwrap();
}

#[tokio::test]
async fn builder_failure_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let mut mock = MockRunner::new();

    mock.expect_exec().times(1).returning(|program, args, _| {
        Err(RunnerError::CommandFailed {
            program: program.to_owned(),
            args: args.to_vec(),
            status: "exit status: 1".to_owned(),
            stderr: "template not found".to_owned(),
        })
    });

    let orchestrator = BuildOrchestrator::with_runner(mock, &BuildConfig::default());
    let result = orchestrator.build(tmp.path(), &stack(&["f1"])).await;

    assert!(matches!(result, Err(BuildError::Builder { ref program, .. }) if program == "faas-cli"));
}

#[tokio::test]
async fn missing_context_for_any_function_fails_build() {
    let tmp = TempDir::new().unwrap();
    let mut mock = MockRunner::new();

    mock.expect_exec().times(1).returning(|_, _, dir| {
        std::fs::create_dir_all(dir.join("build/f1")).unwrap();
        Ok(String::new())
    });

    let orchestrator = BuildOrchestrator::with_runner(mock, &BuildConfig::default());
    let result = orchestrator.build(tmp.path(), &stack(&["f1", "f2"])).await;

    assert!(matches!(
        result,
        Err(BuildError::MissingContext { ref function, .. }) if function == "f2"
    ));
}
