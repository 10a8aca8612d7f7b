use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use gitship_core::{BuildConfig, FunctionDefinition, Stack};
use serde::Serialize;

use crate::shrinkwrap::context_dir;

/// Root entry holding the resolved image reference.
pub const CONFIG_ENTRY: &str = "config";

/// Prefix of every build-context entry.
pub const CONTEXT_DIR: &str = "context";

/// One packaged function, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TarEntry {
    pub archive_path: PathBuf,
    pub function_name: String,
    pub image_ref: String,
}

#[derive(Serialize)]
struct ImageConfig<'a> {
    #[serde(rename = "ref")]
    image_ref: &'a str,
}

/// Immutable image reference for a declared image at a commit.
///
/// The declared image is split at its last `:` (unless that colon is the
/// first character); the tag defaults to `:latest`. The commit SHA is
/// appended to the tag:
///
/// ```
/// use gitship_build::format_image_sha_tag;
///
/// assert_eq!(
///     format_image_sha_tag("registry:5000", "foo/bar:v2", "abc123"),
///     "registry:5000/foo/bar:v2-abc123"
/// );
/// assert_eq!(
///     format_image_sha_tag("registry:5000", "foo/bar", "abc123"),
///     "registry:5000/foo/bar:latest-abc123"
/// );
/// ```
pub fn format_image_sha_tag(registry: &str, image: &str, sha: &str) -> String {
    let (name, tag) = match image.rfind(':') {
        Some(idx) if idx > 0 => image.split_at(idx),
        _ => (image, ":latest"),
    };
    format!("{registry}/{name}{tag}-{sha}")
}

/// Serializes each function's build context into a deployable tar.
#[derive(Debug, Clone)]
pub struct Packager {
    registry: String,
    transient_file: String,
}

impl Packager {
    pub fn new(config: &BuildConfig) -> Self {
        Self {
            registry: config.registry.clone(),
            transient_file: config.transient_file.clone(),
        }
    }

    /// Package every function in `stack`. The first failure aborts the run.
    pub fn package(
        &self,
        checkout: &Path,
        stack: &Stack,
        sha: &str,
    ) -> Result<Vec<TarEntry>, PackageError> {
        tracing::info!(path = %checkout.display(), functions = stack.len(), "packaging build contexts");

        stack
            .functions()
            .map(|(name, def)| self.package_function(checkout, name, def, sha))
            .collect()
    }

    pub fn package_function(
        &self,
        checkout: &Path,
        name: &str,
        def: &FunctionDefinition,
        sha: &str,
    ) -> Result<TarEntry, PackageError> {
        let base = context_dir(checkout, name);
        if !base.is_dir() {
            return Err(PackageError::MissingContext {
                function: name.to_owned(),
                path: base,
            });
        }

        let image_ref = format_image_sha_tag(&self.registry, &def.image, sha);
        let archive_path = checkout.join(format!("{name}.tar"));

        tracing::info!(function = name, handler = %def.handler, image = %image_ref, "creating tar");
        self.write_archive(&base, &archive_path, &image_ref)?;

        Ok(TarEntry {
            archive_path,
            function_name: name.to_owned(),
            image_ref,
        })
    }

    fn write_archive(
        &self,
        base: &Path,
        archive_path: &Path,
        image_ref: &str,
    ) -> Result<(), PackageError> {
        let write_err = |entry: &Path| {
            let archive = archive_path.to_path_buf();
            let entry = entry.to_path_buf();
            move |e: std::io::Error| PackageError::WriteEntry {
                archive,
                entry,
                source: e,
            }
        };

        let file = File::create(archive_path).map_err(|e| PackageError::CreateArchive {
            path: archive_path.to_path_buf(),
            source: e,
        })?;
        let mut builder = tar::Builder::new(BufWriter::new(file));
        builder.follow_symlinks(false);

        let config = serde_json::to_vec(&ImageConfig { image_ref })
            .map_err(|e| PackageError::EncodeConfig { source: e })?;

        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(config.len() as u64);
        header.set_mode(0o600);
        builder
            .append_data(&mut header, CONFIG_ENTRY, config.as_slice())
            .map_err(write_err(Path::new(CONFIG_ENTRY)))?;

        builder
            .append_dir(CONTEXT_DIR, base)
            .map_err(write_err(base))?;

        let mut paths = Vec::new();
        walk(base, OsStr::new(&self.transient_file), &mut paths).map_err(|e| {
            PackageError::Walk {
                path: base.to_path_buf(),
                source: e,
            }
        })?;

        for path in paths {
            let relative = path
                .strip_prefix(base)
                .map_err(|e| PackageError::OutsideContext {
                    path: path.clone(),
                    source: e,
                })?;
            // The generated config is the only root-level config.
            if relative == Path::new(CONFIG_ENTRY) {
                continue;
            }

            let name = Path::new(CONTEXT_DIR).join(relative);
            tracing::debug!(entry = %name.display());

            let metadata = std::fs::symlink_metadata(&path).map_err(write_err(&path))?;
            if metadata.is_dir() {
                builder.append_dir(&name, &path).map_err(write_err(&path))?;
            } else {
                builder
                    .append_path_with_name(&path, &name)
                    .map_err(write_err(&path))?;
            }
        }

        builder
            .into_inner()
            .and_then(|mut w| w.flush())
            .map_err(write_err(archive_path))?;

        Ok(())
    }
}

/// Depth-first, name-sorted listing of `dir`. Entries named `skip` are
/// left out together with anything beneath them.
fn walk(dir: &Path, skip: &OsStr, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    let mut entries = std::fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        if entry.file_name().as_os_str() == skip {
            continue;
        }
        let path = entry.path();
        let is_dir = entry.file_type()?.is_dir();
        out.push(path.clone());
        if is_dir {
            walk(&path, skip, out)?;
        }
    }

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("no build context for '{function}' at {path}")]
    MissingContext { function: String, path: PathBuf },

    #[error("failed to create archive {path}")]
    CreateArchive {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode image config")]
    EncodeConfig { source: serde_json::Error },

    #[error("failed to walk build context {path}")]
    Walk {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path} is outside its build context")]
    OutsideContext {
        path: PathBuf,
        source: std::path::StripPrefixError,
    },

    #[error("failed to write {entry} into {archive}")]
    WriteEntry {
        archive: PathBuf,
        entry: PathBuf,
        source: std::io::Error,
    },
}
