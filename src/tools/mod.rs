//! Hashing and enumeration capability used by the manifest generator and verifier.
//!
//! Two implementations satisfy [`IntegrityTools`]:
//! - [`NativeTools`]: in-process SHA-1 and directory walk (default)
//! - [`ExternalTools`]: the `sha1sum` / `find` subprocess contract, via [`CommandRunner`]

pub mod command;
pub mod external;
pub mod native;

pub use command::{CommandOutput, CommandRunner};
pub use external::ExternalTools;
pub use native::NativeTools;

use crate::config::{HashBackend, RecoveryConfig};
use crate::RecoveryResult;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Lowercase hex SHA-1 digest, always 40 characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    pub const HEX_LEN: usize = 40;

    /// Parse a hex digest, normalising to lowercase.
    pub fn parse(text: &str) -> Option<Self> {
        if text.len() != Self::HEX_LEN || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self(text.to_ascii_lowercase()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait IntegrityTools {
    /// Digest of a regular file's content, or of a symlink itself
    fn hash(&self, path: &Path) -> RecoveryResult<Digest>;

    /// Every regular file below `root`, not following symlinks
    fn list_files(&self, root: &Path) -> RecoveryResult<Vec<PathBuf>>;

    /// Every symbolic link below `root`
    fn list_symlinks(&self, root: &Path) -> RecoveryResult<Vec<PathBuf>>;
}

/// Build the backend selected by `config.hash_backend`
pub fn from_config(config: &RecoveryConfig) -> Box<dyn IntegrityTools> {
    match config.hash_backend {
        HashBackend::Native => Box::new(NativeTools::new(&config.mirror_root)),
        HashBackend::External => Box::new(ExternalTools::new(
            CommandRunner::new(),
            &config.hash_program,
            &config.find_program,
        )),
    }
}

#[cfg(test)]
mod tools_tests;
