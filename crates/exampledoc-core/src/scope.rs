use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScopeError {
    #[error("entry point matching '{pattern}' not found")]
    MissingEntry { pattern: String },

    #[error("entry point matching '{pattern}' has no opening brace on its own line")]
    MissingBody { pattern: String },

    #[error("no narrative line starting with '{prefix}' found")]
    MissingNarrative { prefix: String },
}

/// Region of an annotated source that is actually documented.
#[derive(Debug, Clone)]
pub enum SourceScope {
    Whole,
    /// Lines between the `{` ending the line matched by `opener` and the first
    /// line that starts with `}`.
    FunctionBody { opener: Regex },
    /// Everything from the first line that starts with the narrative prefix.
    FromFirstNarrative,
}

impl SourceScope {
    pub fn main_function() -> Self {
        let opener = Regex::new(r"int\s+main\s*\(").expect("main() pattern is valid");
        SourceScope::FunctionBody { opener }
    }

    pub fn narrow<'a>(&self, source: &'a str, prefix: &str) -> Result<&'a str, ScopeError> {
        match self {
            SourceScope::Whole => Ok(source),
            SourceScope::FunctionBody { opener } => function_body(source, opener),
            SourceScope::FromFirstNarrative => from_first_narrative(source, prefix),
        }
    }
}

fn function_body<'a>(source: &'a str, opener: &Regex) -> Result<&'a str, ScopeError> {
    let entry = opener.find(source).ok_or_else(|| ScopeError::MissingEntry {
        pattern: opener.as_str().to_string(),
    })?;
    let after_entry = &source[entry.end()..];

    let body_start = after_entry
        .match_indices('{')
        .find_map(|(idx, _)| {
            let rest = &after_entry[idx + 1..];
            if rest.starts_with('\n') {
                Some(idx + 2)
            } else if rest.starts_with("\r\n") {
                Some(idx + 3)
            } else {
                None
            }
        })
        .ok_or_else(|| ScopeError::MissingBody {
            pattern: opener.as_str().to_string(),
        })?;
    let body = &after_entry[body_start..];

    match body.find("\n}") {
        Some(end) => Ok(&body[..end]),
        None => Ok(body),
    }
}

fn from_first_narrative<'a>(source: &'a str, prefix: &str) -> Result<&'a str, ScopeError> {
    if source.starts_with(prefix) {
        return Ok(source);
    }

    let needle = format!("\n{prefix}");
    match source.find(&needle) {
        Some(idx) => Ok(&source[idx + 1..]),
        None => Err(ScopeError::MissingNarrative {
            prefix: prefix.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_main_body() {
        let source = "#include <x>\n\nint main() {\n    // Hi\n    MARKER\n    return 0;\n}\n";
        let body = SourceScope::main_function().narrow(source, "//").unwrap();
        assert_eq!(body, "    // Hi\n    MARKER\n    return 0;");
    }

    #[test]
    fn extracts_main_body_from_crlf_source() {
        let source = "int main() {\r\n    // Hi\r\n    MARKER\r\n}\r\n";
        let body = SourceScope::main_function().narrow(source, "//").unwrap();
        assert_eq!(body, "    // Hi\r\n    MARKER\r");
    }

    #[test]
    fn main_body_requires_entry_point() {
        let err = SourceScope::main_function()
            .narrow("void f() {\n}\n", "//")
            .unwrap_err();
        assert!(matches!(err, ScopeError::MissingEntry { .. }));
    }

    #[test]
    fn drops_header_before_first_narrative() {
        let source = "import sys\n\n# note\n# | Title\nprint(1)\n";
        let scoped = SourceScope::FromFirstNarrative
            .narrow(source, "# | ")
            .unwrap();
        assert_eq!(scoped, "# | Title\nprint(1)\n");
    }

    #[test]
    fn whole_scope_is_identity() {
        assert_eq!(SourceScope::Whole.narrow("a\nb", "//").unwrap(), "a\nb");
    }
}
