//! Checksum manifest: one `<digest><two spaces><mirror path>` line per
//! tracked mirror entry.
//!
//! The manifest is the sole source of truth about which files are
//! protected. It is only ever appended to while being generated and is
//! discarded whole whenever the mirror is rebuilt.

pub mod generator;
pub mod record;
pub mod verifier;

pub use generator::{GenerateReport, ManifestGenerator};
pub use record::{parse_manifest_line, ManifestRecord, ParseOutcome};
pub use verifier::{ManifestVerifier, VerifyReport};

use crate::config::RecoveryConfig;
use crate::fsops::STAGING_PREFIX;
use std::path::{Path, PathBuf};

/// Which mirror paths are never tracked nor repaired
#[derive(Debug, Clone)]
pub struct ExclusionRules {
    markers: Vec<String>,
    control_files: Vec<PathBuf>,
}

impl ExclusionRules {
    pub fn from_config(config: &RecoveryConfig) -> Self {
        Self {
            markers: config.excluded_markers.clone(),
            control_files: config.control_files().to_vec(),
        }
    }

    /// True when `path` is a control file, a staged partial copy, or
    /// contains any excluded marker
    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.control_files.iter().any(|c| c == path) {
            return true;
        }

        if is_staged_copy(path) {
            return true;
        }

        let text = path.to_string_lossy();
        self.markers.iter().any(|m| text.contains(m.as_str()))
    }
}

fn is_staged_copy(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with(STAGING_PREFIX))
        .unwrap_or(false)
}
