//! Page generation shared by the exampledoc commands: run the examples, pair
//! their source with the captured output and write the rendered page.

mod diff;
mod error;
mod fs;
mod generate;
mod runner;

use std::path::Path;

use exampledoc_config::{Config, PageSettings};
use exampledoc_core::{DialectKind, DocumentFormat, LineScanner, ParseOutcome};

pub use diff::page_diff;
pub use error::{ExitCode, OperationError, OperationResult};
pub use fs::write_atomic;
pub use generate::{GenerateOptions, Generated, PageSpec, PageStatus, PassReport, Pipeline};
pub use runner::{ExampleRunner, RunError, WorkingDirGuard};

/// Operation bundle the CLI drives, built once from resolved configuration.
pub struct Operations {
    config: Config,
    pipeline: Pipeline,
}

impl Operations {
    pub fn new(config: Config) -> Self {
        let pipeline = Pipeline::from_config(&config);
        Self { config, pipeline }
    }

    /// Configured pages named in `names`, or every page when `names` is empty.
    pub fn select_pages(&self, names: &[String]) -> OperationResult<Vec<&PageSettings>> {
        if self.config.pages.is_empty() {
            return Err(OperationError::InvalidInput(
                "no [[page]] entries are configured".into(),
            ));
        }
        if names.is_empty() {
            return Ok(self.config.pages.iter().collect());
        }
        names
            .iter()
            .map(|name| {
                self.config
                    .page(name)
                    .ok_or_else(|| OperationError::UnknownPage { name: name.clone() })
            })
            .collect()
    }

    /// Options for `page`: an explicit format wins over the page's own, which
    /// wins over `[render].format`. Strictness is on if either side asks for it.
    pub fn options_for(
        &self,
        page: Option<&PageSettings>,
        format: Option<DocumentFormat>,
        strict: bool,
    ) -> GenerateOptions {
        let format = format
            .or_else(|| page.and_then(|page| page.format))
            .unwrap_or(self.config.render.format);
        GenerateOptions {
            format,
            strict: strict || self.config.render.strict,
        }
    }

    pub fn generate(&self, page: &PageSpec, options: &GenerateOptions) -> OperationResult<Generated> {
        self.pipeline.generate(page, options)
    }

    pub fn write_page(&self, page: &PageSpec, options: &GenerateOptions) -> OperationResult<Generated> {
        self.pipeline.write_page(page, options)
    }

    pub fn check_page(&self, page: &PageSpec, options: &GenerateOptions) -> OperationResult<PageStatus> {
        self.pipeline.check_page(page, options)
    }

    /// Parses `source` against an already captured run without executing
    /// anything.
    pub fn parse_capture(
        &self,
        kind: DialectKind,
        source: &Path,
        capture: &Path,
    ) -> OperationResult<ParseOutcome> {
        let source_text = std::fs::read_to_string(source)
            .map_err(|err| OperationError::io(source, err))?;
        let capture_text = std::fs::read_to_string(capture)
            .map_err(|err| OperationError::io(capture, err))?;

        let mut output_lines = LineScanner::from_text(&capture_text);
        self.pipeline
            .parse_pass(kind, source, &source_text, &mut output_lines)
    }
}
