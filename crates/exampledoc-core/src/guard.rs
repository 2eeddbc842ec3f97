use std::fmt;

/// Display-only rewrite applied to a parsed code block. The executed source is
/// never touched.
pub trait GuardStrategy: fmt::Debug + Send + Sync {
    fn strip(&self, code: Vec<String>) -> Vec<String>;
}

/// Removes a bare block opener (e.g. `try:`), the indentation it added, and a
/// fixed-shape tail of handler lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailGuard {
    pub opener: String,
    pub indent: usize,
    pub tail_lines: usize,
}

impl TailGuard {
    pub fn new(opener: impl Into<String>, indent: usize, tail_lines: usize) -> Self {
        Self {
            opener: opener.into(),
            indent,
            tail_lines,
        }
    }

    /// The `try:` / `except ...:` / `    pass` shape used by scripted examples.
    pub fn python_try() -> Self {
        Self::new("try:", 4, 2)
    }
}

impl GuardStrategy for TailGuard {
    fn strip(&self, code: Vec<String>) -> Vec<String> {
        if code.first().map(String::as_str) != Some(self.opener.as_str()) {
            return code;
        }
        if code.len() < 1 + self.tail_lines {
            return code;
        }

        let body_end = code.len() - self.tail_lines;
        code[1..body_end]
            .iter()
            .map(|line| drop_columns(line, self.indent).to_string())
            .collect()
    }
}

fn drop_columns(line: &str, count: usize) -> &str {
    match line.char_indices().nth(count) {
        Some((idx, _)) => &line[idx..],
        None => "",
    }
}
