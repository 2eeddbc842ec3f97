//! Turn annotated example programs and their captured console output into
//! documentation pages.
//!
//! An example interleaves narrative comments with code. Each code block ends
//! at a sentinel statement and, when run, the program prints an output
//! sentinel at the same point. [`parse_sections`] walks both streams in
//! lock-step and [`render_document`] serialises the result.

mod dialect;
mod guard;
mod line;
mod listing;
mod parser;
mod render;
mod scope;
mod state;

pub use dialect::{strip_indent, Dialect, DialectKind, SourceLine, OUTPUT_SENTINEL};
pub use guard::{GuardStrategy, TailGuard};
pub use line::{LineScanner, Pull};
pub use listing::{listing_language, FileListing};
pub use parser::{parse_sections, parse_text, Mismatch, ParseOutcome, Truncation};
pub use render::{render_document, DocumentFormat, LISTINGS_TITLE};
pub use scope::{ScopeError, SourceScope};

use serde::Serialize;

/// One narrative unit, the code that follows it, and what that code printed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub text: String,
    pub code: String,
    pub language_tag: String,
    pub output: String,
}

impl Section {
    pub fn has_code(&self) -> bool {
        !self.code.trim().is_empty()
    }

    pub fn has_output(&self) -> bool {
        !self.output.trim().is_empty()
    }
}
