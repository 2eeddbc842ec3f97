use std::fmt;

use crate::dialect::{Dialect, SourceLine};
use crate::line::{LineScanner, Pull};
use crate::state::State;
use crate::Section;

/// Where a pass stopped early because the two streams did not line up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truncation {
    /// The source ended inside a code block, before its sentinel.
    SourceEndedInCode { section: usize },
    /// The captured output ran out before the section's output sentinel.
    OutputExhausted { section: usize },
}

impl Truncation {
    pub fn section(&self) -> usize {
        match self {
            Truncation::SourceEndedInCode { section } | Truncation::OutputExhausted { section } => {
                *section
            }
        }
    }
}

impl fmt::Display for Truncation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Truncation::SourceEndedInCode { section } => write!(
                f,
                "source ended inside code block of section {} before its sentinel",
                section + 1
            ),
            Truncation::OutputExhausted { section } => write!(
                f,
                "captured output ran out before the output sentinel of section {}",
                section + 1
            ),
        }
    }
}

/// Disagreement between the number of code blocks and output segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mismatch {
    /// A code block had no output segment left to pair with.
    MissingOutput { section: usize },
    /// Output segments remained after the source ran out of code blocks.
    ExtraOutput { segments: usize },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::MissingOutput { section } => write!(
                f,
                "code block of section {} has no matching output segment",
                section + 1
            ),
            Mismatch::ExtraOutput { segments } => write!(
                f,
                "{segments} output segment(s) left over after the last code block"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutcome {
    pub sections: Vec<Section>,
    pub truncation: Option<Truncation>,
    /// Sentinel-terminated output segments never paired with a code block.
    pub leftover_output: usize,
}

impl ParseOutcome {
    /// Whether the two streams disagreed. A source that ends inside
    /// unterminated trailing code (an epilogue such as `return 0;`) while the
    /// output is also used up is not a mismatch.
    pub fn mismatch(&self) -> Option<Mismatch> {
        if let Some(Truncation::OutputExhausted { section }) = self.truncation {
            return Some(Mismatch::MissingOutput { section });
        }
        if self.leftover_output > 0 {
            return Some(Mismatch::ExtraOutput {
                segments: self.leftover_output,
            });
        }
        None
    }
}

enum Phase {
    Narrative,
    Code(String),
    Output,
}

/// Pairs sentinel-delimited code blocks of `source` with sentinel-delimited
/// segments of `output`, in order.
///
/// If either stream ends mid-section the in-flight section is dropped and
/// the pass ends; [`ParseOutcome::truncation`] records which stream ran out.
/// The output scanner is drained afterwards to count unpaired segments.
pub fn parse_sections(
    dialect: &Dialect,
    source: &mut LineScanner,
    output: &mut LineScanner,
) -> ParseOutcome {
    let mut state = State::new(dialect);
    let mut phase = Phase::Narrative;

    loop {
        phase = match phase {
            Phase::Narrative => {
                let Pull::Line(line) = source.next_line() else {
                    return finish(dialect, state, output, None);
                };
                match dialect.classify(&line) {
                    SourceLine::Blank => {
                        state.push_text(String::new());
                        Phase::Narrative
                    }
                    SourceLine::Narrative { text, indent } => {
                        state.push_text(text);
                        state.set_strip_indent(indent);
                        Phase::Narrative
                    }
                    SourceLine::Code => Phase::Code(line),
                }
            }
            Phase::Code(line) => {
                if dialect.closes_code(&line) {
                    Phase::Output
                } else {
                    state.push_code(&line);
                    match source.next_line() {
                        Pull::Line(next) => Phase::Code(next),
                        Pull::EndOfInput => {
                            let section = state.section_index();
                            let truncation = Truncation::SourceEndedInCode { section };
                            return finish(dialect, state, output, Some(truncation));
                        }
                    }
                }
            }
            Phase::Output => match output.next_line() {
                Pull::Line(line) if dialect.closes_output(&line) => {
                    state.complete_section();
                    Phase::Narrative
                }
                Pull::Line(line) => {
                    state.push_output(line);
                    Phase::Output
                }
                Pull::EndOfInput => {
                    let section = state.section_index();
                    let truncation = Truncation::OutputExhausted { section };
                    return finish(dialect, state, output, Some(truncation));
                }
            },
        };
    }
}

/// Convenience wrapper: narrows `source` to the dialect's scope and parses it
/// against captured `output` text.
pub fn parse_text(
    dialect: &Dialect,
    source: &str,
    output: &str,
) -> Result<ParseOutcome, crate::ScopeError> {
    let scoped = dialect.scope.narrow(source, &dialect.narrative_prefix)?;
    let mut source_lines = LineScanner::from_text(scoped);
    let mut output_lines = LineScanner::from_text(output);
    Ok(parse_sections(dialect, &mut source_lines, &mut output_lines))
}

fn finish(
    dialect: &Dialect,
    state: State<'_>,
    output: &mut LineScanner,
    truncation: Option<Truncation>,
) -> ParseOutcome {
    let mut leftover_output = 0usize;
    while let Pull::Line(line) = output.next_line() {
        if dialect.closes_output(&line) {
            leftover_output += 1;
        }
    }

    ParseOutcome {
        sections: state.finalize(),
        truncation,
        leftover_output,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SourceScope;
    use pretty_assertions::assert_eq;

    fn compiled() -> Dialect {
        Dialect::compiled().with_scope(SourceScope::Whole)
    }

    fn parse(dialect: &Dialect, source: &str, output: &str) -> ParseOutcome {
        parse_text(dialect, source, output).unwrap()
    }

    #[test]
    fn pairs_single_block_with_its_output() {
        let outcome = parse(&compiled(), "// Hello\nprintln()\nMARKER", "Hi\n###MARKER###\n");
        assert_eq!(
            outcome.sections,
            vec![Section {
                text: "Hello".into(),
                code: "println()".into(),
                language_tag: "C++".into(),
                output: "Hi".into(),
            }]
        );
        assert_eq!(outcome.truncation, None);
    }

    #[test]
    fn pairs_blocks_in_order() {
        let source = "// one\na();\nMARKER\n\n// two\n\n// more\nb();\nc();\nMARKER\n";
        let output = "A\n###MARKER###\nB\nC\n###MARKER###\n";
        let outcome = parse(&compiled(), source, output);

        assert_eq!(outcome.sections.len(), 2);
        assert_eq!(outcome.sections[0].code, "a();");
        assert_eq!(outcome.sections[0].output, "A");
        assert_eq!(outcome.sections[1].text, "two\n\nmore");
        assert_eq!(outcome.sections[1].code, "b();\nc();");
        assert_eq!(outcome.sections[1].output, "B\nC");
        assert_eq!(outcome.truncation, None);
    }

    #[test]
    fn strips_comment_indentation_from_code() {
        let source = "    // Indented\n    if (x) {\n        y();\n    }\n    MARKER;\n";
        let outcome = parse(&compiled(), source, "###MARKER###");
        assert_eq!(outcome.sections[0].code, "if (x) {\n    y();\n}");
    }

    #[test]
    fn drops_section_when_output_runs_out() {
        let source = "// a\nf();\nMARKER\n// b\ng();\nMARKER\n";
        let outcome = parse(&compiled(), source, "F\n###MARKER###\nG\n");
        assert_eq!(outcome.sections.len(), 1);
        assert_eq!(outcome.sections[0].output, "F");
        assert_eq!(
            outcome.truncation,
            Some(Truncation::OutputExhausted { section: 1 })
        );
        assert_eq!(
            outcome.mismatch(),
            Some(Mismatch::MissingOutput { section: 1 })
        );
    }

    #[test]
    fn epilogue_after_last_marker_is_not_a_mismatch() {
        let source = "// a\nf();\nMARKER\n\nreturn 0;";
        let outcome = parse(&compiled(), source, "F\n###MARKER###\n");
        assert_eq!(outcome.sections.len(), 1);
        assert_eq!(
            outcome.truncation,
            Some(Truncation::SourceEndedInCode { section: 1 })
        );
        assert_eq!(outcome.mismatch(), None);
    }

    #[test]
    fn counts_output_segments_left_unpaired() {
        let source = "// a\nf();\nMARKER\n";
        let outcome = parse(&compiled(), source, "F\n###MARKER###\nG\n###MARKER###\nH\n###MARKER###\n");
        assert_eq!(outcome.sections.len(), 1);
        assert_eq!(outcome.truncation, None);
        assert_eq!(outcome.leftover_output, 2);
        assert_eq!(outcome.mismatch(), Some(Mismatch::ExtraOutput { segments: 2 }));
    }

    #[test]
    fn drops_section_when_source_ends_inside_code() {
        let outcome = parse(&compiled(), "// a\nf();\n", "###MARKER###\n");
        assert!(outcome.sections.is_empty());
        assert_eq!(
            outcome.truncation,
            Some(Truncation::SourceEndedInCode { section: 0 })
        );
    }

    #[test]
    fn trailing_narrative_without_code_is_discarded() {
        let outcome = parse(&compiled(), "// a\nf();\nMARKER\n// dangling\n", "###MARKER###\n");
        assert_eq!(outcome.sections.len(), 1);
        assert_eq!(outcome.truncation, None);
    }

    #[test]
    fn narrative_directly_before_sentinel_keeps_output_cursor_aligned() {
        let source = "// just text\nMARKER\n// next\nh();\nMARKER\n";
        let output = "ignored\n###MARKER###\nH\n###MARKER###\n";
        let outcome = parse(&compiled(), source, output);

        assert_eq!(outcome.sections.len(), 2);
        assert_eq!(outcome.sections[0].code, "");
        assert_eq!(outcome.sections[0].text, "just text");
        assert_eq!(outcome.sections[1].output, "H");
    }

    #[test]
    fn scripted_guard_is_hidden_from_display() {
        let dialect = Dialect::scripted();
        let source = "# | Demo\ntry:\n    risky()\nexcept Err:\n    pass\nmarker()";
        let outcome = parse(&dialect, source, "Traceback\n###MARKER###");

        assert_eq!(outcome.sections[0].text, "Demo");
        assert_eq!(outcome.sections[0].code, "risky()");
        assert_eq!(outcome.sections[0].language_tag, "python3");
        assert_eq!(outcome.sections[0].output, "Traceback");
    }

    #[test]
    fn scripted_blocks_without_guard_are_verbatim() {
        let dialect = Dialect::scripted();
        let source = "# | Demo\nx = 1\nprint(x)\nmarker()\n";
        let outcome = parse(&dialect, source, "1\n###MARKER###\n");
        assert_eq!(outcome.sections[0].code, "x = 1\nprint(x)");
    }
}
