//! Boot-time integrity checking and self-healing for a live filesystem.
//!
//! A golden copy of the application's trees is kept under a recovery mirror.
//! On every boot the [`RecoveryController`] decides whether the mirror must be
//! refreshed from the live trees (first boot, or after a completed software
//! update) and then walks the checksum manifest, repairing every live file
//! that is missing or differs from its mirror counterpart.
//!
//! ```text
//! RecoveryController
//!   ├── UpdateImporter ──┐
//!   ├── copy_tree ───────┤ (fsops)
//!   ├── ManifestGenerator ── IntegrityTools (native | external → CommandRunner)
//!   └── ManifestVerifier ─── copy_file (fsops)
//! ```

pub mod config;
pub mod fsops;
pub mod logging;
pub mod manifest;
pub mod recovery_controller;
pub mod tools;
pub mod ui;
pub mod update;

pub use config::{HashBackend, LoggingConfig, RecoveryConfig};
pub use manifest::{GenerateReport, ManifestGenerator, ManifestVerifier, VerifyReport};
pub use recovery_controller::{RebuildReason, RecoveryController, RecoveryOutcome};
pub use tools::{CommandRunner, ExternalTools, IntegrityTools, NativeTools};
pub use ui::{ProgressSink, ProgressState};
pub use update::UpdateImporter;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecoveryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Recovery mirror does not exist: {}", .0.display())]
    MirrorMissing(PathBuf),

    #[error("Source not found: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("Malformed line {line_no} in {}: {reason}", source_file.display())]
    MalformedLine {
        source_file: PathBuf,
        line_no: usize,
        reason: String,
    },

    #[error("Command `{program}` failed ({status}): {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Hashing failed for {}: {reason}", path.display())]
    Hash { path: PathBuf, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<anyhow::Error> for RecoveryError {
    fn from(err: anyhow::Error) -> Self {
        // Keep the io::ErrorKind of the root cause so callers can still match on NotFound.
        let kind = err
            .root_cause()
            .downcast_ref::<std::io::Error>()
            .map(|e| e.kind())
            .unwrap_or(std::io::ErrorKind::Other);

        match err.downcast::<RecoveryError>() {
            Ok(recovery) => recovery,
            Err(other) => RecoveryError::Io(std::io::Error::new(kind, format!("{:#}", other))),
        }
    }
}

pub type RecoveryResult<T> = Result<T, RecoveryError>;
