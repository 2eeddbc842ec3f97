use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use exampledoc_config::{Config, ConfigError, ConfigSourceKind, LoadOptions};
use exampledoc_core::{DialectKind, DocumentFormat};
use tempfile::TempDir;

fn write_file(path: impl AsRef<Path>, contents: &str) {
    let mut file = fs::File::create(path).expect("create config");
    file.write_all(contents.as_bytes()).expect("write config");
}

fn canonical(path: impl AsRef<Path>) -> PathBuf {
    fs::canonicalize(path).expect("canonicalize path")
}

#[test]
fn loads_defaults_when_no_files_present() {
    let temp = TempDir::new().expect("tempdir");
    let working_dir = canonical(temp.path());

    let config = Config::load(LoadOptions::default().with_working_dir(working_dir.clone()))
        .expect("load defaults");

    assert_eq!(config.render.format, DocumentFormat::Rst);
    assert!(!config.render.strict);
    assert_eq!(config.markers.output, "###MARKER###");
    assert_eq!(config.markers.compiled, "MARKER");
    assert_eq!(config.markers.scripted, "marker()");
    assert_eq!(config.scripted.interpreter, "python3");
    assert!(config.pages.is_empty());
    assert_eq!(config.sources.working_directory, working_dir);
    assert_eq!(config.sources.layers.len(), 1);
    assert_eq!(config.sources.layers[0].kind, ConfigSourceKind::Default);
}

#[test]
fn applies_precedence_and_merges_fields() {
    let temp = TempDir::new().expect("tempdir");
    let git_root = canonical(temp.path());
    fs::create_dir(git_root.join(".git")).expect("create .git");

    write_file(
        git_root.join(".exampledoc.toml"),
        r#"
        [render]
        format = "markdown"
        strict = true

        [markers]
        compiled = "SECTION_END"

        [[page]]
        name = "tour"
        output = "doc/tour.gen.rst"
        executable = "build/tour"
        source = "examples/tour/main.cpp"
        "#,
    );

    let nested = git_root.join("docs");
    fs::create_dir(&nested).expect("create docs");
    write_file(
        nested.join(".exampledoc.toml"),
        r#"
        [render]
        format = "rst"

        [[page]]
        name = "tour"
        output = "tour.rst"
        executable = "../build/tour"
        source = "../examples/tour/main.cpp"
        script = "../examples/tour/main.py"
        listings = ["../examples/tour/CMakeLists.txt"]
        "#,
    );

    let config = Config::load(LoadOptions::default().with_working_dir(&nested))
        .expect("load layered config");

    assert_eq!(config.render.format, DocumentFormat::Rst);
    assert!(config.render.strict);
    assert_eq!(config.markers.compiled, "SECTION_END");
    assert_eq!(config.sources.layers.len(), 3);
    assert_eq!(config.sources.layers[1].kind, ConfigSourceKind::GitRoot);
    assert_eq!(config.sources.layers[2].kind, ConfigSourceKind::Local);

    assert_eq!(config.pages.len(), 1);
    let page = config.page("tour").expect("tour page");
    assert_eq!(page.output, nested.join("tour.rst"));
    assert_eq!(page.executable, nested.join("../build/tour"));
    assert_eq!(page.script, Some(nested.join("../examples/tour/main.py")));
    assert_eq!(page.listings.len(), 1);
    assert_eq!(page.origin.kind, ConfigSourceKind::Local);

    let dialect = config.dialect(DialectKind::Compiled);
    assert_eq!(dialect.code_sentinel, "SECTION_END");
    assert_eq!(dialect.output_sentinel, "###MARKER###");
}

#[test]
fn override_path_takes_highest_precedence() {
    let temp = TempDir::new().expect("tempdir");
    let working_dir = canonical(temp.path());
    write_file(
        working_dir.join(".exampledoc.toml"),
        "[scripted]\ninterpreter = \"python3\"\n",
    );
    write_file(
        working_dir.join("ci.toml"),
        "[scripted]\ninterpreter = \"/usr/bin/python3.11\"\n",
    );

    let config = Config::load(
        LoadOptions::default()
            .with_working_dir(&working_dir)
            .with_override_path("ci.toml"),
    )
    .expect("load override");

    assert_eq!(config.scripted.interpreter, "/usr/bin/python3.11");
    assert_eq!(
        config.sources.layers.last().map(|layer| layer.kind),
        Some(ConfigSourceKind::Override)
    );
}

#[test]
fn missing_override_is_reported() {
    let temp = TempDir::new().expect("tempdir");
    let err = Config::load(
        LoadOptions::default()
            .with_working_dir(temp.path())
            .with_override_path("absent.toml"),
    )
    .unwrap_err();

    assert!(matches!(err, ConfigError::OverrideNotFound { .. }));
}

#[test]
fn collects_every_validation_error() {
    let temp = TempDir::new().expect("tempdir");
    let working_dir = canonical(temp.path());
    write_file(
        working_dir.join(".exampledoc.toml"),
        r#"
        [render]
        format = "html"

        [markers]
        output = "  "

        [[page]]
        name = "broken"
        output = "broken.rst"

        [[page]]
        output = "ok.rst"
        executable = "ok"
        source = "ok.cpp"
        format = "pdf"
        "#,
    );

    let err = Config::load(LoadOptions::default().with_working_dir(&working_dir)).unwrap_err();
    let errors = match err {
        ConfigError::Validation(errors) => errors,
        other => panic!("expected validation error, got {other}"),
    };

    let messages: Vec<String> = errors.iter().map(|error| error.to_string()).collect();
    assert_eq!(messages.len(), 4, "{messages:#?}");
    assert!(messages[0].starts_with("render.format: unknown format 'html'"));
    assert!(messages[1].starts_with("markers.output: marker cannot be empty"));
    assert!(messages[2].contains("page.broken: missing required field(s): executable, source"));
    assert!(messages[3].starts_with("page.ok.format: unknown format 'pdf'"));
}

#[test]
fn rejects_unknown_keys() {
    let temp = TempDir::new().expect("tempdir");
    let working_dir = canonical(temp.path());
    write_file(
        working_dir.join(".exampledoc.toml"),
        "[render]\nfromat = \"rst\"\n",
    );

    let err = Config::load(LoadOptions::default().with_working_dir(&working_dir)).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}
