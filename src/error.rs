// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PanelError {
    // --- Missing state ---
    #[error("site configuration for {domain} not found")]
    SiteNotFound { domain: String },

    #[error("{cadence} backup is not enabled for {subject}")]
    NotScheduled { subject: String, cadence: String },

    #[error("module {name} not found")]
    ModuleNotFound { name: String },

    // --- Precondition violations (user-correctable) ---
    #[error("module {module} is already enabled for {domain}")]
    AlreadyEnabled { module: String, domain: String },

    #[error("module {module} is not enabled for {domain}")]
    NotEnabled { module: String, domain: String },

    #[error("{cadence} backup is already enabled for {subject}")]
    AlreadyScheduled { subject: String, cadence: String },

    #[error("{what} {name} already exists")]
    AlreadyExists { what: &'static str, name: String },

    #[error("invalid {what} '{name}': {reason}")]
    InvalidName {
        what: &'static str,
        name: String,
        reason: String,
    },

    // --- Content & system failures ---
    #[error("malformed configuration {}: {reason}", .path.display())]
    MalformedDocument { path: PathBuf, reason: String },

    #[error("backup source {} does not exist", .path.display())]
    SourceMissing { path: PathBuf },

    #[error("failed to create backup archive {}: {reason}", .path.display())]
    ArchiveFailed { path: PathBuf, reason: String },

    #[error("failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl PanelError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// 1 for mistakes the operator can fix by changing the request, 2 for
    /// failures of the host or of the files on it.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Io { .. }
            | Self::Encode(_)
            | Self::ArchiveFailed { .. }
            | Self::MalformedDocument { .. } => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, PanelError>;
