use std::fs;
use std::path::{Path, PathBuf};

use exampledoc_config::{Config, PageSettings};
use exampledoc_core::{
    parse_sections, render_document, Dialect, DialectKind, DocumentFormat, FileListing,
    LineScanner, Mismatch, ParseOutcome, Section, Truncation,
};
use tracing::{debug, info, warn};

use crate::diff::page_diff;
use crate::error::{OperationError, OperationResult};
use crate::fs::write_atomic;
use crate::runner::ExampleRunner;

/// Inputs for one generated page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSpec {
    pub name: String,
    pub output: Option<PathBuf>,
    pub executable: PathBuf,
    pub source: PathBuf,
    pub script: Option<PathBuf>,
    pub listings: Vec<PathBuf>,
}

impl From<&PageSettings> for PageSpec {
    fn from(page: &PageSettings) -> Self {
        Self {
            name: page.name.clone(),
            output: Some(page.output.clone()),
            executable: page.executable.clone(),
            source: page.source.clone(),
            script: page.script.clone(),
            listings: page.listings.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateOptions {
    pub format: DocumentFormat,
    pub strict: bool,
}

/// What one dialect pass produced, for logging and callers that care.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub kind: DialectKind,
    pub sections: usize,
    pub truncation: Option<Truncation>,
    pub mismatch: Option<Mismatch>,
}

#[derive(Debug, Clone)]
pub struct Generated {
    pub document: String,
    pub passes: Vec<PassReport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStatus {
    UpToDate,
    Missing,
    Stale { diff: String },
}

impl PageStatus {
    pub fn is_current(&self) -> bool {
        matches!(self, PageStatus::UpToDate)
    }
}

/// Runs examples, parses both passes and renders the page.
#[derive(Debug, Clone)]
pub struct Pipeline {
    compiled: Dialect,
    scripted: Dialect,
    runner: ExampleRunner,
}

impl Pipeline {
    pub fn new(compiled: Dialect, scripted: Dialect, runner: ExampleRunner) -> Self {
        Self {
            compiled,
            scripted,
            runner,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.dialect(DialectKind::Compiled),
            config.dialect(DialectKind::Scripted),
            ExampleRunner::new(config.scripted.interpreter.clone()),
        )
    }

    pub fn dialect(&self, kind: DialectKind) -> &Dialect {
        match kind {
            DialectKind::Compiled => &self.compiled,
            DialectKind::Scripted => &self.scripted,
        }
    }

    pub fn generate(&self, page: &PageSpec, options: &GenerateOptions) -> OperationResult<Generated> {
        info!(page = %page.name, "generating page");

        let source = read_input(&page.source)?;
        let script = page
            .script
            .as_ref()
            .map(|path| read_input(path).map(|text| (path, text)))
            .transpose()?;
        let mut listings = page
            .listings
            .iter()
            .map(|path| FileListing::from_path(path).map_err(|err| OperationError::io(path, err)))
            .collect::<OperationResult<Vec<_>>>()?;

        let mut sections = Vec::new();
        let mut passes = Vec::new();

        let mut captured = self.runner.run_executable(&page.executable)?;
        let outcome = self.parse_pass(DialectKind::Compiled, &page.source, &source, &mut captured)?;
        passes.push(self.report(page, DialectKind::Compiled, outcome, options, &mut sections)?);
        listings.push(listing_for(&page.source, source));

        if let Some((path, text)) = script {
            let output_dir = output_dir_of(&page.executable);
            let mut captured = self.runner.run_script(path, &output_dir)?;
            let outcome = self.parse_pass(DialectKind::Scripted, path, &text, &mut captured)?;
            passes.push(self.report(page, DialectKind::Scripted, outcome, options, &mut sections)?);
            listings.push(listing_for(path, text));
        }

        let document = render_document(options.format, &sections, &listings);
        Ok(Generated { document, passes })
    }

    /// Renders the page and replaces its output file.
    pub fn write_page(&self, page: &PageSpec, options: &GenerateOptions) -> OperationResult<Generated> {
        let output = require_output(page)?;
        let generated = self.generate(page, options)?;
        write_atomic(output, &generated.document)?;
        info!(page = %page.name, path = %output.display(), "wrote page");
        Ok(generated)
    }

    /// Renders the page and compares it with what is on disk.
    pub fn check_page(&self, page: &PageSpec, options: &GenerateOptions) -> OperationResult<PageStatus> {
        let output = require_output(page)?;
        let generated = self.generate(page, options)?;

        let on_disk = match fs::read_to_string(output) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(PageStatus::Missing),
            Err(err) => return Err(OperationError::io(output, err)),
        };

        let label = output.display().to_string();
        Ok(match page_diff(&on_disk, &generated.document, &label) {
            Some(diff) => PageStatus::Stale { diff },
            None => PageStatus::UpToDate,
        })
    }

    pub(crate) fn parse_pass(
        &self,
        kind: DialectKind,
        path: &Path,
        source: &str,
        captured: &mut LineScanner,
    ) -> OperationResult<ParseOutcome> {
        let dialect = self.dialect(kind);
        let scoped = dialect
            .scope
            .narrow(source, &dialect.narrative_prefix)
            .map_err(|err| OperationError::Scope {
                path: path.to_path_buf(),
                source: err,
            })?;
        let mut lines = LineScanner::from_text(scoped);
        Ok(parse_sections(dialect, &mut lines, captured))
    }

    fn report(
        &self,
        page: &PageSpec,
        kind: DialectKind,
        outcome: ParseOutcome,
        options: &GenerateOptions,
        sections: &mut Vec<Section>,
    ) -> OperationResult<PassReport> {
        let mismatch = outcome.mismatch();
        debug!(
            page = %page.name,
            pass = %kind,
            sections = outcome.sections.len(),
            "parsed pass"
        );

        match (&outcome.truncation, &mismatch) {
            (_, Some(mismatch)) if options.strict => {
                return Err(OperationError::StreamMismatch {
                    page: page.name.clone(),
                    pass: kind,
                    mismatch: *mismatch,
                });
            }
            (_, Some(mismatch)) => {
                warn!(page = %page.name, pass = %kind, "{mismatch}");
            }
            (Some(truncation), None) => {
                debug!(page = %page.name, pass = %kind, "{truncation}");
            }
            (None, None) => {}
        }

        let report = PassReport {
            kind,
            sections: outcome.sections.len(),
            truncation: outcome.truncation,
            mismatch,
        };
        sections.extend(outcome.sections);
        Ok(report)
    }
}

fn read_input(path: &Path) -> OperationResult<String> {
    fs::read_to_string(path).map_err(|err| OperationError::io(path, err))
}

fn require_output(page: &PageSpec) -> OperationResult<&Path> {
    page.output.as_deref().ok_or_else(|| {
        OperationError::InvalidInput(format!("page '{}' has no output path", page.name))
    })
}

fn listing_for(path: &Path, contents: String) -> FileListing {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    FileListing::new(name, contents)
}

/// Directory the compiled example writes its fixtures to; handed to the script.
fn output_dir_of(executable: &Path) -> PathBuf {
    match executable.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_dir_defaults_to_current_directory() {
        assert_eq!(output_dir_of(Path::new("demo")), PathBuf::from("."));
        assert_eq!(
            output_dir_of(Path::new("build/bin/demo")),
            PathBuf::from("build/bin")
        );
    }

    #[test]
    fn listing_is_named_after_file_name() {
        let listing = listing_for(Path::new("examples/tour/main.cpp"), "int main() {}".into());
        assert_eq!(listing.name, "main.cpp");
        assert_eq!(listing.render_language, Some("C++"));
    }

    #[test]
    fn only_up_to_date_pages_are_current() {
        assert!(PageStatus::UpToDate.is_current());
        assert!(!PageStatus::Missing.is_current());
        assert!(!PageStatus::Stale { diff: String::new() }.is_current());
    }

    #[test]
    fn pages_without_output_cannot_be_written() {
        let page = PageSpec {
            name: "adhoc".into(),
            output: None,
            executable: PathBuf::from("demo"),
            source: PathBuf::from("main.cpp"),
            script: None,
            listings: Vec::new(),
        };
        let err = require_output(&page).unwrap_err();
        assert!(err.to_string().contains("has no output path"));
    }
}
