use std::path::Path;

use gitship_build::format_image_sha_tag;

/// Print the registry-qualified, SHA-suffixed image reference.
pub fn tag(
    registry: Option<&str>,
    image: &str,
    sha: &str,
    config: Option<&Path>,
) -> anyhow::Result<()> {
    let registry = match registry {
        Some(registry) => registry.to_owned(),
        None => super::load_config(config)?.build.registry,
    };

    println!("{}", format_image_sha_tag(&registry, image, sha));
    Ok(())
}
