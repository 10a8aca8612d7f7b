use std::path::Path;

use gitship_cloud::{HttpGateway, Reconciler};
use gitship_core::GarbageRequest;

/// Reconcile an owner's deployed functions against a garbage-collect request.
pub async fn collect(request: Option<&Path>, config: Option<&Path>) -> anyhow::Result<()> {
    let config = super::load_config(config)?;
    let request = GarbageRequest::from_json(&super::read_input(request)?)?;

    let gateway = HttpGateway::new(&config.gateway)?;
    let report = Reconciler::new(gateway).collect(&request).await?;

    if report.orphans.is_empty() {
        println!("No orphaned functions for {}", request.owner);
        return Ok(());
    }

    for name in &report.deleted {
        println!("Deleted {name}");
    }
    for (name, e) in &report.failed {
        println!("Failed to delete {name}: {e}");
    }

    if !report.is_clean() {
        anyhow::bail!(
            "{} of {} orphaned function(s) could not be deleted",
            report.failed.len(),
            report.orphans.len()
        );
    }
    Ok(())
}
