use std::io::Write;
use std::path::Path;

use crate::error::{OperationError, OperationResult};

/// Writes `content` to a temp file beside `path` and renames it into place,
/// so readers never observe a partially written page.
pub fn write_atomic(path: &Path, content: &str) -> OperationResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".exampledoc")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|err| OperationError::io(dir, err))?;
    tmp.write_all(content.as_bytes())
        .map_err(|err| OperationError::io(tmp.path(), err))?;
    tmp.as_file()
        .sync_all()
        .map_err(|err| OperationError::io(tmp.path(), err))?;
    tmp.persist(path)
        .map_err(|err| OperationError::io(path, err.error))?;
    Ok(())
}
