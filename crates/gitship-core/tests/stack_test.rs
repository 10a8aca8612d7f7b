use gitship_core::{Error, ManifestParser, YamlManifestParser};
use tempfile::TempDir;

const MANIFEST: &str = r#"
version: 1.0
provider:
  name: openfaas
  gateway: http://127.0.0.1:8080
functions:
  regex-go:
    lang: go
    handler: ./regex_go
    image: someuser/regex_go:0.2
  regex-py:
    lang: python3
    handler: ./regex_py
    image: someuser/regex_py
    build_options:
      - dev
    environment:
      write_debug: true
"#;

#[test]
fn parses_functions_from_stack_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("stack.yml");
    std::fs::write(&path, MANIFEST).unwrap();

    let stack = YamlManifestParser.parse(&path).unwrap();

    assert_eq!(stack.len(), 2);
    assert_eq!(stack.names(), vec!["regex-go", "regex-py"]);

    let go = stack.get("regex-go").unwrap();
    assert_eq!(go.image, "someuser/regex_go:0.2");
    assert_eq!(go.handler, "./regex_go");
    assert_eq!(go.lang.as_deref(), Some("go"));
    assert!(go.build_options.is_empty());

    let py = stack.get("regex-py").unwrap();
    assert_eq!(py.build_options, vec!["dev"]);
}

#[test]
fn missing_manifest_is_read_error() {
    let tmp = TempDir::new().unwrap();
    let result = YamlManifestParser.parse(&tmp.path().join("stack.yml"));

    assert!(matches!(result, Err(Error::ManifestRead { .. })));
}

#[test]
fn malformed_manifest_is_parse_error() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("stack.yml");
    std::fs::write(&path, "functions: [unterminated").unwrap();

    let result = YamlManifestParser.parse(&path);
    assert!(matches!(result, Err(Error::ManifestParse { .. })));
}

#[test]
fn manifest_without_functions_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("stack.yml");
    std::fs::write(&path, "provider:\n  name: openfaas\n").unwrap();

    let result = YamlManifestParser.parse(&path);
    assert!(matches!(result, Err(Error::EmptyManifest { .. })));
}

#[test]
fn function_without_image_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("stack.yml");
    std::fs::write(
        &path,
        "functions:\n  broken:\n    handler: ./broken\n    image: \"\"\n",
    )
    .unwrap();

    let result = YamlManifestParser.parse(&path);
    assert!(matches!(
        result,
        Err(Error::InvalidFunction { ref function, .. }) if function == "broken"
    ));
}

#[test]
fn function_names_are_trimmed() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("stack.yml");
    std::fs::write(
        &path,
        "functions:\n  \"padded \":\n    handler: ./p\n    image: p\n",
    )
    .unwrap();

    let stack = YamlManifestParser.parse(&path).unwrap();
    assert_eq!(stack.names(), vec!["padded"]);
}

#[test]
fn function_names_that_leave_the_checkout_are_rejected() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("stack.yml");

    // (quoted YAML key, parsed name)
    let cases = [
        (r#""../../victim""#, "../../victim"),
        (r#""nested/fn""#, "nested/fn"),
        (r#""win\\fn""#, r"win\fn"),
        (r#""..""#, ".."),
        (r#"".""#, "."),
        (r#""/abs""#, "/abs"),
        (r#""a..b""#, "a..b"),
    ];

    for (key, name) in cases {
        std::fs::write(
            &path,
            format!("functions:\n  {key}:\n    handler: ./f\n    image: someuser/f\n"),
        )
        .unwrap();

        let result = YamlManifestParser.parse(&path);
        assert!(
            matches!(result, Err(Error::InvalidFunction { ref function, .. }) if function == name),
            "{name} was accepted: {result:?}"
        );
    }
}

#[test]
fn plain_function_names_are_accepted() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("stack.yml");
    std::fs::write(
        &path,
        "functions:\n  regex.go_v2-x:\n    handler: ./f\n    image: someuser/f\n",
    )
    .unwrap();

    let stack = YamlManifestParser.parse(&path).unwrap();
    assert_eq!(stack.names(), vec!["regex.go_v2-x"]);
}
