use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::string::FromUtf8Error;

use exampledoc_core::LineScanner;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("cannot resolve example {path}: {source}")]
    Resolve { path: PathBuf, source: io::Error },

    #[error("cannot change working directory to {path}: {source}")]
    WorkingDirectory { path: PathBuf, source: io::Error },

    #[error("failed to execute {program}: {source}")]
    Spawn { program: String, source: io::Error },

    #[error("{program} exited with {status}{}", stderr_tail(.stderr))]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("{program} printed non-UTF-8 output: {source}")]
    Utf8 {
        program: String,
        source: FromUtf8Error,
    },
}

fn stderr_tail(stderr: &str) -> String {
    let trimmed = stderr.trim_end();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(":\n{trimmed}")
    }
}

/// Moves the process working directory for as long as it is alive and moves
/// it back when dropped, on every exit path.
#[derive(Debug)]
pub struct WorkingDirGuard {
    original: PathBuf,
}

impl WorkingDirGuard {
    pub fn enter(dir: &Path) -> Result<Self, RunError> {
        let original = env::current_dir().map_err(|source| RunError::WorkingDirectory {
            path: PathBuf::from("."),
            source,
        })?;
        env::set_current_dir(dir).map_err(|source| RunError::WorkingDirectory {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(Self { original })
    }

    pub fn original(&self) -> &Path {
        &self.original
    }
}

impl Drop for WorkingDirGuard {
    fn drop(&mut self) {
        if let Err(err) = env::set_current_dir(&self.original) {
            error!(
                path = %self.original.display(),
                "failed to restore working directory: {err}"
            );
        }
    }
}

/// Runs built examples from their own directory and captures stdout.
#[derive(Debug, Clone)]
pub struct ExampleRunner {
    interpreter: String,
}

impl ExampleRunner {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }

    /// Runs `executable` without arguments.
    pub fn run_executable(&self, executable: &Path) -> Result<LineScanner, RunError> {
        let executable = resolve(executable)?;
        let dir = parent_dir(&executable);
        let command = Command::new(&executable);
        let stdout = run_in(&dir, command, executable.display().to_string())?;
        Ok(LineScanner::from_text(&stdout))
    }

    /// Runs `<interpreter> <script name> <output_dir>` from the script's directory.
    pub fn run_script(&self, script: &Path, output_dir: &Path) -> Result<LineScanner, RunError> {
        let script = resolve(script)?;
        let output_dir = resolve(output_dir)?;
        let dir = parent_dir(&script);
        let file_name = script
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| script.clone().into_os_string());

        let mut command = Command::new(&self.interpreter);
        command.arg(&file_name).arg(&output_dir);
        let program = format!("{} {}", self.interpreter, script.display());
        let stdout = run_in(&dir, command, program)?;
        Ok(LineScanner::from_text(&stdout))
    }
}

impl Default for ExampleRunner {
    fn default() -> Self {
        Self::new("python3")
    }
}

fn resolve(path: &Path) -> Result<PathBuf, RunError> {
    fs::canonicalize(path).map_err(|source| RunError::Resolve {
        path: path.to_path_buf(),
        source,
    })
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/"))
}

fn run_in(dir: &Path, mut command: Command, program: String) -> Result<String, RunError> {
    let _guard = WorkingDirGuard::enter(dir)?;
    debug!(program = %program, dir = %dir.display(), "running example");

    let output = match command.output() {
        Ok(output) => output,
        Err(source) => return Err(RunError::Spawn { program, source }),
    };

    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if !output.status.success() {
        return Err(RunError::Failed {
            program,
            status: output.status,
            stderr,
        });
    }
    if !stderr.trim().is_empty() {
        debug!(program = %program, "example stderr:\n{}", stderr.trim_end());
    }

    String::from_utf8(output.stdout).map_err(|source| RunError::Utf8 { program, source })
}
