use std::path::Path;

use gitship_build::RealRunner;
use gitship_cloud::{DeployOutcome, HttpGateway};
use gitship_core::PushEvent;

use crate::pipeline::{Pipeline, Reconciliation};

/// Run the full pipeline: fetch → build → package → deploy → collect.
pub async fn run(event: Option<&Path>, config: Option<&Path>) -> anyhow::Result<()> {
    let config = super::load_config(config)?;
    let event = PushEvent::from_json(&super::read_input(event)?)?;

    println!(
        "Deploying {} at {}",
        event.repository.full_name,
        event.sha()
    );

    let gateway = HttpGateway::new(&config.gateway)?;
    let pipeline = Pipeline::new(config, RealRunner, gateway);
    let summary = pipeline.run(&event).await?;

    for result in &summary.dispatch.results {
        match &result.outcome {
            DeployOutcome::Deployed { status } => {
                println!("  {} -> {} ({status})", result.function, result.image)
            }
            DeployOutcome::Failed(e) => println!("  {} failed: {e}", result.function),
            DeployOutcome::Skipped => println!("  {} skipped", result.function),
        }
    }

    match &summary.reconciliation {
        Reconciliation::Requested { response } if !response.trim().is_empty() => {
            println!("Garbage collection: {}", response.trim())
        }
        Reconciliation::Requested { .. } => println!("Garbage collection requested"),
        Reconciliation::Failed(e) => {
            println!("Warning: garbage collection was not requested: {e}")
        }
    }

    tracing::debug!(
        stage = %summary.stage,
        checkout = %summary.checkout.display(),
        archives = summary.archives.len(),
        "run finished"
    );

    if let Some(e) = summary.dispatch.first_error() {
        anyhow::bail!(
            "{} of {} function(s) were not deployed: {e}",
            summary.dispatch.results.len() - summary.dispatch.deployed().len(),
            summary.dispatch.results.len()
        );
    }

    println!("Done: {} function(s) deployed", summary.dispatch.deployed().len());
    Ok(())
}
