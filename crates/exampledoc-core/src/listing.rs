use std::fs;
use std::io;
use std::path::Path;

/// A file reproduced verbatim in the listings appendix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileListing {
    pub name: String,
    pub contents: String,
    pub render_language: Option<&'static str>,
}

impl FileListing {
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        let name = name.into();
        let render_language = listing_language(&name);
        Self {
            name,
            contents: contents.into(),
            render_language,
        }
    }

    /// Reads `path`, naming the listing after its file name.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, contents))
    }
}

/// Highlighting tag for a listing, by file extension. `None` renders untagged.
pub fn listing_language(name: &str) -> Option<&'static str> {
    let extension = Path::new(name).extension()?.to_str()?;
    match extension {
        "cpp" | "hpp" | "cc" | "h" => Some("C++"),
        "py" => Some("python3"),
        "txt" => Some("CMake"),
        _ => None,
    }
}
