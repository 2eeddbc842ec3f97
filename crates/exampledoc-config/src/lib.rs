//! Configuration primitives and loader for exampledoc.
//!
//! Later layers win: built-in defaults, then `.exampledoc.toml` at the
//! repository root, then in the working directory, then a `--config` file.
//! Raw TOML is normalised into typed settings; validation problems from every
//! layer are collected and reported together.

use std::collections::HashSet;
use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use exampledoc_core::{Dialect, DialectKind, DocumentFormat, OUTPUT_SENTINEL};
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = ".exampledoc.toml";

const DEFAULT_INTERPRETER: &str = "python3";

/// Settings after every layer has been merged and validated.
#[derive(Clone, Debug)]
pub struct Config {
    pub render: RenderSettings,
    pub markers: MarkerSettings,
    pub scripted: ScriptedSettings,
    pub pages: Vec<PageSettings>,
    pub sources: ConfigSources,
}

impl Config {
    /// Built-in dialect for `kind` with configured sentinels applied.
    pub fn dialect(&self, kind: DialectKind) -> Dialect {
        let code_sentinel = match kind {
            DialectKind::Compiled => &self.markers.compiled,
            DialectKind::Scripted => &self.markers.scripted,
        };
        Dialect::for_kind(kind)
            .with_code_sentinel(code_sentinel.clone())
            .with_output_sentinel(self.markers.output.clone())
    }

    pub fn page(&self, name: &str) -> Option<&PageSettings> {
        self.pages.iter().find(|page| page.name == name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderSettings {
    pub format: DocumentFormat,
    /// Promote stream mismatches from warnings to errors.
    pub strict: bool,
}

/// Sentinel literals shared with the example programs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkerSettings {
    pub output: String,
    pub compiled: String,
    pub scripted: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptedSettings {
    pub interpreter: String,
}

/// One generated page. Paths are absolute, resolved against the directory of
/// the config file that declared them.
#[derive(Clone, Debug)]
pub struct PageSettings {
    pub name: String,
    pub output: PathBuf,
    pub executable: PathBuf,
    pub source: PathBuf,
    pub script: Option<PathBuf>,
    pub listings: Vec<PathBuf>,
    pub format: Option<DocumentFormat>,
    pub origin: ConfigSource,
}

/// Where the resolved configuration came from.
#[derive(Clone, Debug)]
pub struct ConfigSources {
    pub working_directory: PathBuf,
    /// Applied layers, lowest precedence first.
    pub layers: Vec<ConfigSource>,
}

/// One configuration layer. `base_dir` anchors the relative paths it declares.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigSource {
    pub kind: ConfigSourceKind,
    pub path: Option<PathBuf>,
    pub base_dir: PathBuf,
}

impl ConfigSource {
    fn builtin(base_dir: PathBuf) -> Self {
        Self {
            kind: ConfigSourceKind::Default,
            path: None,
            base_dir,
        }
    }

    fn file(kind: ConfigSourceKind, path: PathBuf) -> Self {
        let base_dir = match path.parent() {
            Some(parent) => parent.to_path_buf(),
            None => PathBuf::from("."),
        };
        Self {
            kind,
            path: Some(path),
            base_dir,
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) if self.kind != ConfigSourceKind::Default => {
                write!(f, "{} {}", self.kind, path.display())
            }
            _ => write!(f, "{}", self.kind),
        }
    }
}

/// Layer kinds, lowest precedence first.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub enum ConfigSourceKind {
    Default,
    GitRoot,
    Local,
    Override,
}

impl fmt::Display for ConfigSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConfigSourceKind::Default => "built-in defaults",
            ConfigSourceKind::GitRoot => "repository config",
            ConfigSourceKind::Local => "working-directory config",
            ConfigSourceKind::Override => "--config file",
        })
    }
}

/// What the CLI can tell the loader.
#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub override_path: Option<PathBuf>,
    pub working_dir: Option<PathBuf>,
}

impl LoadOptions {
    pub fn with_override_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.override_path = Some(path.into());
        self
    }

    pub fn with_working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(path.into());
        self
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot use {attempted} as the working directory: {source}")]
    WorkingDirectory {
        attempted: PathBuf,
        source: io::Error,
    },
    #[error("config file {path} given with --config does not exist")]
    OverrideNotFound { path: PathBuf },
    #[error("cannot read {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("{path} is not valid exampledoc TOML: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid exampledoc configuration:\n{0}")]
    Validation(ConfigValidationErrors),
}

impl Config {
    /// Resolves every layer, merges them in precedence order and validates
    /// the result.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let working_dir = match options.working_dir {
            Some(dir) => fs::canonicalize(&dir)
                .map_err(|source| ConfigError::WorkingDirectory {
                    attempted: dir,
                    source,
                })?,
            None => env::current_dir().map_err(|source| ConfigError::WorkingDirectory {
                attempted: PathBuf::from("."),
                source,
            })?,
        };
        let override_path = options.override_path.map(|path| {
            if path.is_absolute() {
                path
            } else {
                working_dir.join(path)
            }
        });

        let builtin = ConfigSource::builtin(working_dir.clone());
        let mut merged = defaults_layer(builtin.clone());
        let mut layers = vec![builtin];

        for source in discover_files(&working_dir, override_path)? {
            let path = source.path.as_deref().unwrap_or(&working_dir);
            merged.merge(load_layer(path, source.clone())?);
            layers.push(source);
        }

        let resolved = merged.finalize().map_err(ConfigError::Validation)?;
        Ok(Config {
            render: resolved.render,
            markers: resolved.markers,
            scripted: resolved.scripted,
            pages: resolved.pages,
            sources: ConfigSources {
                working_directory: working_dir,
                layers,
            },
        })
    }
}

/// Config files that apply, lowest precedence first. A file reachable as more
/// than one kind is only loaded once, as its highest-precedence kind.
fn discover_files(
    working_dir: &Path,
    override_path: Option<PathBuf>,
) -> Result<Vec<ConfigSource>, ConfigError> {
    let mut found: Vec<ConfigSource> = Vec::new();
    let mut add = |kind: ConfigSourceKind, path: PathBuf| {
        found.retain(|existing| existing.path.as_ref() != Some(&path));
        found.push(ConfigSource::file(kind, path));
    };

    if let Some(root) = working_dir.ancestors().find(|dir| dir.join(".git").exists()) {
        let path = root.join(CONFIG_FILE_NAME);
        if path.is_file() {
            add(ConfigSourceKind::GitRoot, path);
        }
    }

    let local = working_dir.join(CONFIG_FILE_NAME);
    if local.is_file() {
        add(ConfigSourceKind::Local, local);
    }

    if let Some(path) = override_path {
        if !path.exists() {
            return Err(ConfigError::OverrideNotFound { path });
        }
        add(ConfigSourceKind::Override, path);
    }

    Ok(found)
}

fn load_layer(path: &Path, source: ConfigSource) -> Result<PartialConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|err| ConfigError::Io {
        path: path.to_path_buf(),
        source: err,
    })?;
    let raw = toml::from_str::<RawConfig>(&text).map_err(|err| ConfigError::Parse {
        path: path.to_path_buf(),
        source: err,
    })?;
    Ok(raw.into_partial(source))
}

fn defaults_layer(source: ConfigSource) -> PartialConfig {
    let at = |value: &str| Some(Located::new(value.to_string(), source.clone()));
    PartialConfig {
        format: at(DocumentFormat::default().as_str()),
        strict: Some(Located::new(false, source.clone())),
        output_marker: at(OUTPUT_SENTINEL),
        compiled_marker: at(&Dialect::compiled().code_sentinel),
        scripted_marker: at(&Dialect::scripted().code_sentinel),
        interpreter: at(DEFAULT_INTERPRETER),
        pages: Vec::new(),
    }
}

#[derive(Clone, Debug)]
struct Located<T> {
    value: T,
    source: ConfigSource,
}

impl<T> Located<T> {
    fn new(value: T, source: ConfigSource) -> Self {
        Located { value, source }
    }
}

fn resolve_path(path: &Path, source: &ConfigSource) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        source.base_dir.join(path)
    }
}

#[derive(Clone, Debug, Default)]
struct PartialConfig {
    format: Option<Located<String>>,
    strict: Option<Located<bool>>,
    output_marker: Option<Located<String>>,
    compiled_marker: Option<Located<String>>,
    scripted_marker: Option<Located<String>>,
    interpreter: Option<Located<String>>,
    pages: Vec<Located<RawPage>>,
}

impl PartialConfig {
    fn merge(&mut self, other: PartialConfig) {
        if other.format.is_some() {
            self.format = other.format;
        }
        if other.strict.is_some() {
            self.strict = other.strict;
        }
        if other.output_marker.is_some() {
            self.output_marker = other.output_marker;
        }
        if other.compiled_marker.is_some() {
            self.compiled_marker = other.compiled_marker;
        }
        if other.scripted_marker.is_some() {
            self.scripted_marker = other.scripted_marker;
        }
        if other.interpreter.is_some() {
            self.interpreter = other.interpreter;
        }

        // A page redeclared by a higher-precedence layer replaces the earlier one.
        for page in other.pages {
            let name = page.value.effective_name();
            self.pages
                .retain(|existing| existing.value.effective_name() != name);
            self.pages.push(page);
        }
    }

    fn finalize(self) -> Result<ResolvedConfig, ConfigValidationErrors> {
        let mut errors = Vec::new();
        let fallback = || ConfigSource::builtin(PathBuf::from("."));

        let format_loc = self
            .format
            .unwrap_or_else(|| Located::new("rst".into(), fallback()));
        let format = parse_format(&format_loc, "render.format", &mut errors);

        let strict = self.strict.map(|located| located.value).unwrap_or(false);

        let output = require_marker(self.output_marker, "markers.output", &mut errors);
        let compiled = require_marker(self.compiled_marker, "markers.compiled", &mut errors);
        let scripted = require_marker(self.scripted_marker, "markers.scripted", &mut errors);

        let interpreter = self
            .interpreter
            .unwrap_or_else(|| Located::new(DEFAULT_INTERPRETER.into(), fallback()));
        if interpreter.value.trim().is_empty() {
            errors.push(
                ConfigValidationError::new(
                    Some(interpreter.source.clone()),
                    "interpreter cannot be empty".into(),
                )
                .with_context("scripted.interpreter"),
            );
        }

        let pages = finalize_pages(self.pages, &mut errors);

        if !errors.is_empty() {
            return Err(ConfigValidationErrors(errors));
        }

        Ok(ResolvedConfig {
            render: RenderSettings { format, strict },
            markers: MarkerSettings {
                output,
                compiled,
                scripted,
            },
            scripted: ScriptedSettings {
                interpreter: interpreter.value,
            },
            pages,
        })
    }
}

fn parse_format(
    located: &Located<String>,
    context: &str,
    errors: &mut Vec<ConfigValidationError>,
) -> DocumentFormat {
    match located.value.parse::<DocumentFormat>() {
        Ok(format) => format,
        Err(_) => {
            errors.push(
                ConfigValidationError::new(
                    Some(located.source.clone()),
                    format!(
                        "unknown format '{}' (expected 'rst' or 'markdown')",
                        located.value
                    ),
                )
                .with_context(context.to_string()),
            );
            DocumentFormat::default()
        }
    }
}

fn require_marker(
    located: Option<Located<String>>,
    context: &str,
    errors: &mut Vec<ConfigValidationError>,
) -> String {
    match located {
        Some(located) if !located.value.trim().is_empty() => located.value,
        Some(located) => {
            errors.push(
                ConfigValidationError::new(Some(located.source), "marker cannot be empty".into())
                    .with_context(context.to_string()),
            );
            String::new()
        }
        None => {
            errors.push(
                ConfigValidationError::new(None, "marker must be defined".into())
                    .with_context(context.to_string()),
            );
            String::new()
        }
    }
}

fn finalize_pages(
    entries: Vec<Located<RawPage>>,
    errors: &mut Vec<ConfigValidationError>,
) -> Vec<PageSettings> {
    let mut pages = Vec::new();
    let mut seen = HashSet::new();

    for entry in entries {
        let Located { value, source } = entry;
        let name = value.effective_name();
        let context = format!("page.{name}");

        if name.is_empty() {
            errors.push(
                ConfigValidationError::new(
                    Some(source.clone()),
                    "page needs a name or an output path".into(),
                )
                .with_context("page"),
            );
            continue;
        }
        if !seen.insert(name.clone()) {
            errors.push(
                ConfigValidationError::new(
                    Some(source.clone()),
                    format!("duplicate page name '{name}'"),
                )
                .with_context(context),
            );
            continue;
        }

        let mut missing = Vec::new();
        if value.output.is_none() {
            missing.push("output");
        }
        if value.executable.is_none() {
            missing.push("executable");
        }
        if value.source.is_none() {
            missing.push("source");
        }
        if !missing.is_empty() {
            errors.push(
                ConfigValidationError::new(
                    Some(source.clone()),
                    format!("missing required field(s): {}", missing.join(", ")),
                )
                .with_context(context),
            );
            continue;
        }

        let format = value.format.as_ref().map(|format| {
            parse_format(
                &Located::new(format.clone(), source.clone()),
                &format!("{context}.format"),
                errors,
            )
        });

        let (Some(output), Some(executable), Some(page_source)) =
            (&value.output, &value.executable, &value.source)
        else {
            continue;
        };

        pages.push(PageSettings {
            output: resolve_path(output, &source),
            executable: resolve_path(executable, &source),
            source: resolve_path(page_source, &source),
            script: value
                .script
                .as_ref()
                .map(|script| resolve_path(script, &source)),
            listings: value
                .listings
                .iter()
                .map(|listing| resolve_path(listing, &source))
                .collect(),
            format,
            name,
            origin: source,
        });
    }

    pages
}

#[derive(Clone, Debug)]
struct ResolvedConfig {
    render: RenderSettings,
    markers: MarkerSettings,
    scripted: ScriptedSettings,
    pages: Vec<PageSettings>,
}

/// Every problem found across all layers, one `- ` bullet per line.
#[derive(Debug)]
pub struct ConfigValidationErrors(pub Vec<ConfigValidationError>);

impl ConfigValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ConfigValidationError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ConfigValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bullets: Vec<String> = self.0.iter().map(|err| format!("- {err}")).collect();
        f.write_str(&bullets.join("\n"))
    }
}

#[derive(Clone, Debug)]
pub struct ConfigValidationError {
    /// Layer that supplied the offending value, when known.
    pub source: Option<ConfigSource>,
    pub message: String,
    /// Dotted key such as `markers.output` or `page.tour.format`.
    pub context: Option<String>,
}

impl ConfigValidationError {
    fn new(source: Option<ConfigSource>, message: String) -> Self {
        Self {
            source,
            message,
            context: None,
        }
    }

    fn with_context(self, context: impl Into<String>) -> Self {
        Self {
            context: Some(context.into()),
            ..self
        }
    }
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            Some(context) => write!(f, "{context}: {}", self.message)?,
            None => f.write_str(&self.message)?,
        }
        match &self.source {
            Some(source) => write!(f, " (from {source})"),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    render: Option<RawRender>,
    #[serde(default)]
    markers: Option<RawMarkers>,
    #[serde(default)]
    scripted: Option<RawScripted>,
    #[serde(default, rename = "page")]
    pages: Vec<RawPage>,
}

impl RawConfig {
    fn into_partial(self, source: ConfigSource) -> PartialConfig {
        let render = self.render.unwrap_or_default();
        let markers = self.markers.unwrap_or_default();
        let scripted = self.scripted.unwrap_or_default();
        let located = |value: String| Located::new(value, source.clone());

        PartialConfig {
            format: render.format.map(located),
            strict: render
                .strict
                .map(|value| Located::new(value, source.clone())),
            output_marker: markers.output.map(located),
            compiled_marker: markers.compiled.map(located),
            scripted_marker: markers.scripted.map(located),
            interpreter: scripted.interpreter.map(located),
            pages: self
                .pages
                .into_iter()
                .map(|page| Located::new(page, source.clone()))
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRender {
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    strict: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMarkers {
    #[serde(default)]
    output: Option<String>,
    #[serde(default)]
    compiled: Option<String>,
    #[serde(default)]
    scripted: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawScripted {
    #[serde(default)]
    interpreter: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPage {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    output: Option<PathBuf>,
    #[serde(default)]
    executable: Option<PathBuf>,
    #[serde(default)]
    source: Option<PathBuf>,
    #[serde(default)]
    script: Option<PathBuf>,
    #[serde(default)]
    listings: Vec<PathBuf>,
    #[serde(default)]
    format: Option<String>,
}

impl RawPage {
    /// Explicit name, else the output file stem with any `.gen` suffix removed.
    fn effective_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        self.output
            .as_ref()
            .and_then(|output| output.file_stem())
            .map(|stem| {
                let stem = stem.to_string_lossy();
                stem.strip_suffix(".gen").unwrap_or(&stem).to_string()
            })
            .unwrap_or_default()
    }
}
