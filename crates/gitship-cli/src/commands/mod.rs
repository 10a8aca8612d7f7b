mod collect;
mod run;
mod tag;

use std::io::Read;
use std::path::Path;

use gitship_core::GitshipConfig;
use gitship_core::config::GATEWAY_URL_ENV;

pub use collect::collect;
pub use run::run;
pub use tag::tag;

/// Load configuration and apply the `gateway_url` environment override.
pub(crate) fn load_config(path: Option<&Path>) -> anyhow::Result<GitshipConfig> {
    let config = match path {
        Some(path) => GitshipConfig::load_file(path)?,
        None => GitshipConfig::load(Path::new("."))?,
    };
    let gateway_url = std::env::var(GATEWAY_URL_ENV)
        // arch-lint: allow(no-silent-result-drop) reason="unset or non-UTF-8 gateway_url means the configured gateway is used"
        .ok();
    Ok(config.with_gateway_override(gateway_url)?)
}

/// Read a JSON document from `path`, or from stdin when absent or `-`.
pub(crate) fn read_input(path: Option<&Path>) -> anyhow::Result<Vec<u8>> {
    match path {
        Some(path) if path != Path::new("-") => std::fs::read(path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display())),
        _ => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}
