use crate::dialect::{strip_indent, Dialect};
use crate::Section;

/// Accumulates finished sections and the one currently being parsed.
pub struct State<'d> {
    dialect: &'d Dialect,
    sections: Vec<Section>,
    current: SectionBuilder,
}

impl<'d> State<'d> {
    pub fn new(dialect: &'d Dialect) -> Self {
        Self {
            dialect,
            sections: Vec::new(),
            current: SectionBuilder::default(),
        }
    }

    pub fn section_index(&self) -> usize {
        self.sections.len()
    }

    pub fn push_text(&mut self, line: String) {
        self.current.text.push(line);
    }

    pub fn set_strip_indent(&mut self, width: usize) {
        self.current.strip_indent = width;
    }

    pub fn push_code(&mut self, line: &str) {
        let stripped = strip_indent(line, self.current.strip_indent);
        self.current.code.push(stripped.to_string());
    }

    pub fn push_output(&mut self, line: String) {
        self.current.output.push(line);
    }

    /// Closes the current section and starts a fresh one.
    pub fn complete_section(&mut self) {
        let builder = std::mem::take(&mut self.current);
        self.sections.push(builder.into_section(self.dialect));
    }

    /// Returns the completed sections; an unfinished one is discarded.
    pub fn finalize(self) -> Vec<Section> {
        self.sections
    }
}

#[derive(Default)]
struct SectionBuilder {
    text: Vec<String>,
    code: Vec<String>,
    output: Vec<String>,
    strip_indent: usize,
}

impl SectionBuilder {
    fn into_section(self, dialect: &Dialect) -> Section {
        let code = match (&dialect.guard, self.code.is_empty()) {
            (Some(guard), false) => guard.strip(self.code),
            _ => self.code,
        };

        Section {
            text: self.text.join("\n").trim().to_string(),
            code: code.join("\n"),
            language_tag: dialect.language_tag.clone(),
            output: self.output.join("\n"),
        }
    }
}
