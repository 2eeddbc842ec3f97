use std::fmt;

use crate::listing::FileListing;
use crate::Section;

pub const LISTINGS_TITLE: &str = "Complete file listings";

const SEPARATOR: &str = "↓";

/// Markup emitted for the static-site generator downstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DocumentFormat {
    #[default]
    Rst,
    Markdown,
}

impl DocumentFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentFormat::Rst => "rst",
            DocumentFormat::Markdown => "markdown",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentFormat {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "rst" => Ok(DocumentFormat::Rst),
            "markdown" | "md" => Ok(DocumentFormat::Markdown),
            _ => Err(()),
        }
    }
}

/// Serialises sections (all passes, in order) followed by the listings appendix.
pub fn render_document(
    format: DocumentFormat,
    sections: &[Section],
    listings: &[FileListing],
) -> String {
    let mut out = Vec::new();
    for section in sections {
        match format {
            DocumentFormat::Rst => rst_section(&mut out, section),
            DocumentFormat::Markdown => markdown_section(&mut out, section),
        }
    }

    match format {
        DocumentFormat::Rst => rst_listings(&mut out, listings),
        DocumentFormat::Markdown => markdown_listings(&mut out, listings),
    }

    out.join("\n")
}

fn rst_section(out: &mut Vec<String>, section: &Section) {
    out.push(section.text.clone());
    out.push(String::new());
    if !section.has_code() {
        return;
    }

    rst_block(out, &section.language_tag, &section.code, false);
    if section.has_output() {
        out.push(".. rst-class:: center".into());
        out.push(String::new());
        out.push(SEPARATOR.into());
        out.push(String::new());
        rst_block(out, "none", &section.output, false);
    }
}

fn rst_listings(out: &mut Vec<String>, listings: &[FileListing]) {
    out.push(LISTINGS_TITLE.into());
    out.push(underline('=', LISTINGS_TITLE));
    out.push(String::new());
    for listing in listings {
        out.push(listing.name.clone());
        out.push(underline('-', &listing.name));
        out.push(String::new());
        let language = listing.render_language.unwrap_or("none");
        rst_block(out, language, &listing.contents, true);
    }
}

fn rst_block(out: &mut Vec<String>, language: &str, body: &str, line_numbers: bool) {
    out.push(format!(".. code-block:: {language}"));
    if line_numbers {
        out.push("  :linenos:".into());
    }
    out.push("  ".into());
    out.extend(body.split('\n').map(|line| format!("  {line}")));
    out.push(String::new());
}

fn underline(ch: char, title: &str) -> String {
    std::iter::repeat(ch).take(title.chars().count()).collect()
}

fn markdown_section(out: &mut Vec<String>, section: &Section) {
    out.push(section.text.clone());
    out.push(String::new());
    if !section.has_code() {
        return;
    }

    markdown_block(out, &section.language_tag, &section.code);
    if section.has_output() {
        out.push(SEPARATOR.into());
        out.push(String::new());
        markdown_block(out, "text", &section.output);
    }
}

fn markdown_listings(out: &mut Vec<String>, listings: &[FileListing]) {
    out.push(format!("## {LISTINGS_TITLE}"));
    out.push(String::new());
    for listing in listings {
        out.push(format!("### {}", listing.name));
        out.push(String::new());
        let body = listing
            .contents
            .strip_suffix('\n')
            .unwrap_or(&listing.contents);
        markdown_block(out, listing.render_language.unwrap_or(""), body);
    }
}

fn markdown_block(out: &mut Vec<String>, language: &str, body: &str) {
    let fence = fence_for(body);
    out.push(format!("{fence}{}", markdown_info(language)));
    out.extend(body.split('\n').map(str::to_string));
    out.push(fence);
    out.push(String::new());
}

// Longer than any backtick run in the body so listings of Markdown files
// cannot close the fence early.
fn fence_for(body: &str) -> String {
    let mut longest = 0usize;
    let mut run = 0usize;
    for ch in body.chars() {
        if ch == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat(longest.max(2) + 1)
}

fn markdown_info(language: &str) -> String {
    match language {
        "C++" => "cpp".into(),
        "python3" => "python".into(),
        "CMake" => "cmake".into(),
        other => other.to_lowercase(),
    }
}
