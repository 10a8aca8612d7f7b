use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use gitship_build::{PackageError, Packager, format_image_sha_tag};
use gitship_core::{BuildConfig, FunctionDefinition, Stack};
use proptest::prelude::*;
use tempfile::TempDir;

struct ArchiveEntry {
    path: PathBuf,
    is_dir: bool,
    body: Vec<u8>,
}

fn read_archive(path: &Path) -> Vec<ArchiveEntry> {
    let file = std::fs::File::open(path).unwrap();
    let mut archive = tar::Archive::new(file);
    archive
        .entries()
        .unwrap()
        .map(|entry| {
            let mut entry = entry.unwrap();
            let path = entry.path().unwrap().into_owned();
            let is_dir = entry.header().entry_type().is_dir();
            let mut body = Vec::new();
            entry.read_to_end(&mut body).unwrap();
            ArchiveEntry {
                path,
                is_dir,
                body,
            }
        })
        .collect()
}

fn by_path(entries: &[ArchiveEntry]) -> HashMap<PathBuf, &ArchiveEntry> {
    entries.iter().map(|e| (e.path.clone(), e)).collect()
}

fn stack(names: &[(&str, &str)]) -> Stack {
    names
        .iter()
        .map(|(n, image)| ((*n).to_owned(), FunctionDefinition::new(*image, format!("./{n}"))))
        .collect()
}

/// Lay out `build/<function>/` the way a shrinkwrap build does.
fn write_context(checkout: &Path, function: &str) -> PathBuf {
    let base = checkout.join("build").join(function);
    std::fs::create_dir_all(base.join("function")).unwrap();
    std::fs::write(base.join("Dockerfile"), "FROM scratch\n").unwrap();
    std::fs::write(base.join("function/handler.go"), "package function\n").unwrap();
    base
}

// ── Image tagging ──

#[test]
fn tag_keeps_declared_tag_and_appends_sha() {
    assert_eq!(
        format_image_sha_tag("registry:5000", "foo:bar", "abc123"),
        "registry:5000/foo:bar-abc123"
    );
    assert_eq!(
        format_image_sha_tag("registry:5000", "foo/bar:v2", "abc123"),
        "registry:5000/foo/bar:v2-abc123"
    );
}

#[test]
fn tag_defaults_to_latest() {
    assert_eq!(
        format_image_sha_tag("registry:5000", "foo", "abc123"),
        "registry:5000/foo:latest-abc123"
    );
    assert_eq!(
        format_image_sha_tag("registry:5000", "foo/bar", "abc123"),
        "registry:5000/foo/bar:latest-abc123"
    );
}

#[test]
fn tag_splits_on_last_colon_only() {
    assert_eq!(
        format_image_sha_tag("registry:5000", "a:b:c", "abc123"),
        "registry:5000/a:b:c-abc123"
    );
}

#[test]
fn leading_colon_is_not_a_tag_separator() {
    assert_eq!(
        format_image_sha_tag("registry:5000", ":v1", "abc123"),
        "registry:5000/:v1:latest-abc123"
    );
}

proptest! {
    #[test]
    fn untagged_images_get_latest(image in "[a-z0-9/_.-]{1,40}", sha in "[0-9a-f]{7,40}") {
        let tagged = format_image_sha_tag("registry:5000", &image, &sha);
        prop_assert_eq!(tagged, format!("registry:5000/{image}:latest-{sha}"));
    }

    #[test]
    fn tag_always_embeds_registry_and_sha(image in "[a-z0-9/:_.-]{1,40}", sha in "[0-9a-f]{7,40}") {
        let tagged = format_image_sha_tag("registry:5000", &image, &sha);
        let suffix = format!("-{}", sha);
        prop_assert!(tagged.starts_with("registry:5000/"));
        prop_assert!(tagged.ends_with(&suffix));
        let reference = &tagged["registry:5000/".len()..tagged.len() - suffix.len()];
        prop_assert!(reference.contains(':'));
    }
}

// ── Archive layout ──

#[test]
fn archive_has_single_config_and_everything_else_under_context() {
    let tmp = TempDir::new().unwrap();
    let base = write_context(tmp.path(), "regex-go");
    std::fs::write(base.join("context.tar"), "transient").unwrap();
    std::fs::write(base.join("function/context.tar"), "transient").unwrap();
    std::fs::write(base.join("config"), "stale config").unwrap();

    let packager = Packager::new(&BuildConfig::default());
    let tars = packager
        .package(tmp.path(), &stack(&[("regex-go", "someuser/regex_go:0.2")]), "abc123")
        .unwrap();

    assert_eq!(tars.len(), 1);
    let entries = read_archive(&tars[0].archive_path);

    let configs: Vec<_> = entries
        .iter()
        .filter(|e| e.path == Path::new("config"))
        .collect();
    assert_eq!(configs.len(), 1);
    assert_eq!(entries[0].path, Path::new("config"));

    for entry in &entries[1..] {
        assert!(
            entry.path.starts_with("context"),
            "entry outside context/: {}",
            entry.path.display()
        );
        assert_ne!(
            entry.path.file_name().and_then(|n| n.to_str()),
            Some("context.tar"),
            "transient file packaged: {}",
            entry.path.display()
        );
    }

    let config: serde_json::Value = serde_json::from_slice(&configs[0].body).unwrap();
    assert_eq!(
        config,
        serde_json::json!({ "ref": "registry:5000/someuser/regex_go:0.2-abc123" })
    );
}

#[test]
fn archive_preserves_context_tree() {
    let tmp = TempDir::new().unwrap();
    let base = write_context(tmp.path(), "regex-go");
    std::fs::write(base.join("function/config"), "nested config").unwrap();

    let packager = Packager::new(&BuildConfig::default());
    let tars = packager
        .package(tmp.path(), &stack(&[("regex-go", "someuser/regex_go")]), "abc123")
        .unwrap();
    let entries = read_archive(&tars[0].archive_path);
    let index = by_path(&entries);

    let context = index[Path::new("context")];
    assert!(context.is_dir);
    assert!(context.body.is_empty());

    let function_dir = index[Path::new("context/function")];
    assert!(function_dir.is_dir);
    assert!(function_dir.body.is_empty());

    assert_eq!(index[Path::new("context/Dockerfile")].body, b"FROM scratch\n");
    assert_eq!(
        index[Path::new("context/function/handler.go")].body,
        b"package function\n"
    );
    // Only the root-level config is generated; nested ones are regular files.
    assert_eq!(
        index[Path::new("context/function/config")].body,
        b"nested config"
    );
}

#[test]
fn custom_transient_file_name_is_skipped() {
    let tmp = TempDir::new().unwrap();
    let base = write_context(tmp.path(), "f1");
    std::fs::write(base.join("ctx.tar"), "transient").unwrap();
    std::fs::write(base.join("context.tar"), "kept").unwrap();

    let config = BuildConfig {
        transient_file: "ctx.tar".to_owned(),
        ..Default::default()
    };
    let tars = Packager::new(&config)
        .package(tmp.path(), &stack(&[("f1", "f1")]), "abc123")
        .unwrap();
    let entries = read_archive(&tars[0].archive_path);
    let index = by_path(&entries);

    assert!(!index.contains_key(Path::new("context/ctx.tar")));
    assert!(index.contains_key(Path::new("context/context.tar")));
}

#[test]
fn one_archive_per_function_in_name_order() {
    let tmp = TempDir::new().unwrap();
    write_context(tmp.path(), "zeta");
    write_context(tmp.path(), "alpha");

    let config = BuildConfig {
        registry: "127.0.0.1:5000".to_owned(),
        ..Default::default()
    };
    let tars = Packager::new(&config)
        .package(
            tmp.path(),
            &stack(&[("zeta", "someuser/zeta:1.0"), ("alpha", "someuser/alpha")]),
            "abc123",
        )
        .unwrap();

    let names: Vec<_> = tars.iter().map(|t| t.function_name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "zeta"]);
    assert_eq!(tars[0].archive_path, tmp.path().join("alpha.tar"));
    assert_eq!(tars[0].image_ref, "127.0.0.1:5000/someuser/alpha:latest-abc123");
    assert_eq!(tars[1].archive_path, tmp.path().join("zeta.tar"));
    assert_eq!(tars[1].image_ref, "127.0.0.1:5000/someuser/zeta:1.0-abc123");
}

#[test]
fn missing_context_aborts_packaging() {
    let tmp = TempDir::new().unwrap();
    write_context(tmp.path(), "alpha");

    let result = Packager::new(&BuildConfig::default()).package(
        tmp.path(),
        &stack(&[("alpha", "alpha"), ("beta", "beta")]),
        "abc123",
    );

    assert!(matches!(
        result,
        Err(PackageError::MissingContext { ref function, .. }) if function == "beta"
    ));
}

#[cfg(unix)]
#[test]
fn symlinks_are_stored_as_links_and_not_followed() {
    let tmp = TempDir::new().unwrap();
    let base = write_context(tmp.path(), "f1");
    std::os::unix::fs::symlink("/etc", base.join("etc")).unwrap();

    let tars = Packager::new(&BuildConfig::default())
        .package(tmp.path(), &stack(&[("f1", "f1")]), "abc123")
        .unwrap();

    let file = std::fs::File::open(&tars[0].archive_path).unwrap();
    let mut archive = tar::Archive::new(file);
    let entries: Vec<(PathBuf, tar::EntryType, Option<PathBuf>)> = archive
        .entries()
        .unwrap()
        .map(|entry| {
            let entry = entry.unwrap();
            let target = entry.link_name().unwrap().map(|t| t.into_owned());
            (entry.path().unwrap().into_owned(), entry.header().entry_type(), target)
        })
        .collect();

    let link = entries
        .iter()
        .find(|(path, _, _)| path == Path::new("context/etc"))
        .unwrap();
    assert_eq!(link.1, tar::EntryType::Symlink);
    assert_eq!(link.2.as_deref(), Some(Path::new("/etc")));
    let below_link = entries
        .iter()
        .filter(|(path, _, _)| path.starts_with("context/etc") && path != Path::new("context/etc"))
        .count();
    assert_eq!(below_link, 0, "symlinked directory was followed");
}
