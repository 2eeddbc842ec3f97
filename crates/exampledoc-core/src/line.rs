/// Outcome of pulling from a [`LineScanner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pull {
    Line(String),
    EndOfInput,
}

/// Restartable cursor over an ordered sequence of lines.
///
/// Running out of lines is reported as [`Pull::EndOfInput`] rather than an
/// error so callers decide at every pull site what exhaustion means.
#[derive(Debug, Clone, Default)]
pub struct LineScanner {
    lines: Vec<String>,
    cursor: usize,
}

impl LineScanner {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines, cursor: 0 }
    }

    /// Splits on `\n`. A trailing newline yields a final empty line, and a
    /// `\r` left over from CRLF endings is dropped.
    pub fn from_text(text: &str) -> Self {
        let lines = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect();
        Self::new(lines)
    }

    pub fn next_line(&mut self) -> Pull {
        match self.lines.get(self.cursor) {
            Some(line) => {
                self.cursor += 1;
                Pull::Line(line.clone())
            }
            None => Pull::EndOfInput,
        }
    }

    pub fn peek(&self) -> Option<&str> {
        self.lines.get(self.cursor).map(String::as_str)
    }

    /// Number of lines consumed so far.
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
