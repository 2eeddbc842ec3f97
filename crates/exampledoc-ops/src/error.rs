use std::io;
use std::path::PathBuf;

use exampledoc_config::ConfigError;
use exampledoc_core::{DialectKind, Mismatch, ScopeError};
use thiserror::Error;

use crate::runner::RunError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Success = 0,
    Stale = 1,
    InvalidInput = 2,
    RunFailed = 3,
    Io = 4,
}

impl ExitCode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Success),
            1 => Some(Self::Stale),
            2 => Some(Self::InvalidInput),
            3 => Some(Self::RunFailed),
            4 => Some(Self::Io),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        self as i32
    }
}

#[derive(Debug, Error)]
pub enum OperationError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("page '{name}' is not configured")]
    UnknownPage { name: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("i/o error on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("{path}: {source}")]
    Scope { path: PathBuf, source: ScopeError },

    #[error(transparent)]
    Run(#[from] RunError),

    #[error("{pass} pass of page '{page}' does not line up with its output: {mismatch}")]
    StreamMismatch {
        page: String,
        pass: DialectKind,
        mismatch: Mismatch,
    },
}

impl OperationError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::InvalidInput(_) | Self::UnknownPage { .. } | Self::Config(_) => {
                ExitCode::InvalidInput
            }
            Self::Scope { .. } => ExitCode::InvalidInput,
            Self::Io { .. } => ExitCode::Io,
            Self::Run(_) => ExitCode::RunFailed,
            Self::StreamMismatch { .. } => ExitCode::Stale,
        }
    }
}

pub type OperationResult<T> = Result<T, OperationError>;
