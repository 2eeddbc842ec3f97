//! Shared test harness utilities for exampledoc crates.
//!
//! Example "programs" are `/bin/sh` scripts that print a canned capture, so
//! the process-running helpers are unix only.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use exampledoc_config::{Config, LoadOptions};
use tempfile::TempDir;

/// Annotated compiled-dialect source with two sections and an epilogue.
pub const TOUR_SOURCE: &str = r#"#include <iostream>

int main() {

    // Counting
    // ========
    //
    // Start from zero.
    int n = 0;
    std::cout << n << std::endl;
    MARKER

    // Then add one.
    n += 1;
    std::cout << n << std::endl;
    MARKER

    return 0;
}
"#;

/// What the compiled tour prints.
pub const TOUR_OUTPUT: &str = "0\n###MARKER###\n1\n###MARKER###\n";

/// Scripted-dialect example runnable by `sh`. The header defines nothing the
/// page shows; `: 'marker()'` is a no-op that still carries the sentinel.
pub const SCRIPT_SOURCE: &str = r#"#!/bin/sh
set -e

# | Scripting
# | ---------
# |
# | The script sees the compiled example's directory.
echo "fixtures in $(basename "$1")"
: 'marker()'
echo '###MARKER###'
"#;

static CWD_LOCK: Mutex<()> = Mutex::new(());

/// Serialises tests that move the process working directory.
pub fn cwd_lock() -> MutexGuard<'static, ()> {
    CWD_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create fixture directory");
    }
    fs::write(&path, contents).expect("write fixture file");
    path
}

/// Writes an executable `/bin/sh` script with `body` after the shebang.
#[cfg(unix)]
pub fn write_executable(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = write_file(dir, name, &format!("#!/bin/sh\n{body}"));
    let mut permissions = fs::metadata(&path).expect("stat script").permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(&path, permissions).expect("chmod script");
    path
}

/// An executable that prints `stdout` verbatim and exits 0.
#[cfg(unix)]
pub fn printing_executable(dir: &Path, name: &str, stdout: &str) -> PathBuf {
    write_executable(dir, name, &format!("cat <<'CAPTURE'\n{stdout}CAPTURE\n"))
}

/// A scratch project laid out like a real docs tree:
/// `build/tour` (executable), `src/main.cpp`, `src/main.sh`, `src/utils.hpp`
/// and `.exampledoc.toml` declaring one page at `doc/tour.gen.rst`.
pub struct ExampleProject {
    dir: TempDir,
    pub executable: PathBuf,
    pub source: PathBuf,
    pub script: PathBuf,
    pub listing: PathBuf,
    pub output: PathBuf,
}

#[cfg(unix)]
impl ExampleProject {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = fs::canonicalize(dir.path()).expect("canonicalize tempdir");

        let executable = printing_executable(&root, "build/tour", TOUR_OUTPUT);
        let source = write_file(&root, "src/main.cpp", TOUR_SOURCE);
        let script = write_file(&root, "src/main.sh", SCRIPT_SOURCE);
        let listing = write_file(&root, "src/utils.hpp", "#pragma once\n");
        fs::create_dir_all(root.join("doc")).expect("create doc dir");
        let output = root.join("doc/tour.gen.rst");

        let project = Self {
            dir,
            executable,
            source,
            script,
            listing,
            output,
        };
        project.write_config("");
        project
    }

    pub fn root(&self) -> PathBuf {
        fs::canonicalize(self.dir.path()).expect("canonicalize tempdir")
    }

    /// Rewrites `.exampledoc.toml`, appending `extra` TOML after the page.
    pub fn write_config(&self, extra: &str) {
        let contents = format!(
            r#"[scripted]
interpreter = "sh"

[[page]]
output = "doc/tour.gen.rst"
executable = "build/tour"
source = "src/main.cpp"
script = "src/main.sh"
listings = ["src/utils.hpp"]
{extra}"#
        );
        write_file(&self.root(), ".exampledoc.toml", &contents);
    }

    pub fn config(&self) -> Config {
        Config::load(LoadOptions::default().with_working_dir(self.root())).expect("load config")
    }
}

#[cfg(unix)]
impl Default for ExampleProject {
    fn default() -> Self {
        Self::new()
    }
}
