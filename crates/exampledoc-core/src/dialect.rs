use std::fmt;
use std::sync::Arc;

use crate::guard::{GuardStrategy, TailGuard};
use crate::scope::SourceScope;

/// Line printed by example programs between logical sections.
pub const OUTPUT_SENTINEL: &str = "###MARKER###";

/// The two supported source-annotation conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialectKind {
    Compiled,
    Scripted,
}

impl DialectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DialectKind::Compiled => "compiled",
            DialectKind::Scripted => "scripted",
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a source line while collecting narrative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLine {
    Blank,
    Narrative { text: String, indent: usize },
    Code,
}

/// Comment convention, sentinels and display rules for one kind of example.
#[derive(Debug, Clone)]
pub struct Dialect {
    pub kind: DialectKind,
    pub language_tag: String,
    pub narrative_prefix: String,
    pub code_sentinel: String,
    pub output_sentinel: String,
    pub guard: Option<Arc<dyn GuardStrategy>>,
    pub scope: SourceScope,
}

impl Dialect {
    /// `//` narrative inside `int main(`, blocks closed by a `MARKER` statement.
    pub fn compiled() -> Self {
        Self {
            kind: DialectKind::Compiled,
            language_tag: "C++".into(),
            narrative_prefix: "//".into(),
            code_sentinel: "MARKER".into(),
            output_sentinel: OUTPUT_SENTINEL.into(),
            guard: None,
            scope: SourceScope::main_function(),
        }
    }

    /// `# | ` narrative, blocks closed by a `marker()` call, `try:` guards hidden.
    pub fn scripted() -> Self {
        Self {
            kind: DialectKind::Scripted,
            language_tag: "python3".into(),
            narrative_prefix: "# | ".into(),
            code_sentinel: "marker()".into(),
            output_sentinel: OUTPUT_SENTINEL.into(),
            guard: Some(Arc::new(TailGuard::python_try())),
            scope: SourceScope::FromFirstNarrative,
        }
    }

    pub fn for_kind(kind: DialectKind) -> Self {
        match kind {
            DialectKind::Compiled => Self::compiled(),
            DialectKind::Scripted => Self::scripted(),
        }
    }

    pub fn with_code_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.code_sentinel = sentinel.into();
        self
    }

    pub fn with_output_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.output_sentinel = sentinel.into();
        self
    }

    pub fn with_scope(mut self, scope: SourceScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn classify(&self, line: &str) -> SourceLine {
        if line.trim().is_empty() {
            return SourceLine::Blank;
        }

        let Some(idx) = line.find(&self.narrative_prefix) else {
            return self.classify_bare_prefix(line);
        };
        let (lead, rest) = line.split_at(idx);
        if !lead.trim().is_empty() {
            return SourceLine::Code;
        }

        let comment = &rest[self.narrative_prefix.len()..];
        let text = comment.strip_prefix(' ').unwrap_or(comment);
        SourceLine::Narrative {
            text: text.to_string(),
            indent: lead.len(),
        }
    }

    // `# |` with the trailing space trimmed away by an editor is still an
    // empty narrative line.
    fn classify_bare_prefix(&self, line: &str) -> SourceLine {
        let bare = self.narrative_prefix.trim_end();
        if bare.len() < self.narrative_prefix.len() && line.trim_end().ends_with(bare) {
            let lead = &line[..line.trim_end().len() - bare.len()];
            if lead.trim().is_empty() {
                return SourceLine::Narrative {
                    text: String::new(),
                    indent: lead.len(),
                };
            }
        }
        SourceLine::Code
    }

    pub fn closes_code(&self, line: &str) -> bool {
        line.contains(&self.code_sentinel)
    }

    pub fn closes_output(&self, line: &str) -> bool {
        line.contains(&self.output_sentinel)
    }
}

/// Removes the first `width` columns of `line` when they are all whitespace.
pub fn strip_indent(line: &str, width: usize) -> &str {
    let split = line
        .char_indices()
        .nth(width)
        .map(|(idx, _)| idx)
        .unwrap_or(line.len());
    let (head, tail) = line.split_at(split);
    if head.trim().is_empty() {
        tail
    } else {
        line
    }
}
