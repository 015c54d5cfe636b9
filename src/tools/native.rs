/// In-process SHA-1 hashing and directory enumeration
///
/// Symlinks are hashed on the link itself: the digest is the SHA-1 of the
/// target path after the mirror-root prefix has been removed. A mirror link
/// and its live counterpart therefore hash equal exactly when they resolve to
/// the same live location, and dangling links remain hashable.
use super::{Digest, IntegrityTools};
use crate::fsops::rewrite_link_target;
use crate::{RecoveryError, RecoveryResult};
use anyhow::Context;
use sha1::{Digest as _, Sha1};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const READ_BUFFER_SIZE: usize = 8192;

pub struct NativeTools {
    mirror_root: PathBuf,
}

impl NativeTools {
    pub fn new(mirror_root: impl Into<PathBuf>) -> Self {
        Self {
            mirror_root: mirror_root.into(),
        }
    }

    fn hash_file(&self, path: &Path) -> RecoveryResult<Digest> {
        let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;

        let mut reader = BufReader::new(file);
        let mut hasher = Sha1::new();
        let mut buffer = [0u8; READ_BUFFER_SIZE];

        loop {
            let bytes_read = reader
                .read(&mut buffer)
                .with_context(|| format!("Failed to read {}", path.display()))?;

            if bytes_read == 0 {
                break;
            }

            hasher.update(&buffer[..bytes_read]);
        }

        Ok(Digest::from_bytes(&hasher.finalize()))
    }

    fn hash_link(&self, path: &Path) -> RecoveryResult<Digest> {
        let target =
            fs::read_link(path).with_context(|| format!("Failed to read link {}", path.display()))?;
        let live_target = rewrite_link_target(&self.mirror_root, &target);

        let mut hasher = Sha1::new();
        hasher.update(live_target.as_os_str().as_bytes());
        Ok(Digest::from_bytes(&hasher.finalize()))
    }

    fn walk(&self, root: &Path, want_symlinks: bool) -> RecoveryResult<Vec<PathBuf>> {
        if fs::symlink_metadata(root).is_err() {
            return Err(RecoveryError::SourceMissing(root.to_path_buf()));
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(root = %root.display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            let file_type = entry.file_type();
            let wanted = if want_symlinks {
                file_type.is_symlink()
            } else {
                file_type.is_file()
            };

            if wanted && entry.depth() > 0 {
                paths.push(entry.into_path());
            }
        }

        Ok(paths)
    }
}

impl IntegrityTools for NativeTools {
    fn hash(&self, path: &Path) -> RecoveryResult<Digest> {
        let meta = fs::symlink_metadata(path)?;

        if meta.file_type().is_symlink() {
            self.hash_link(path)
        } else if meta.is_file() {
            self.hash_file(path)
        } else {
            Err(RecoveryError::Hash {
                path: path.to_path_buf(),
                reason: "not a regular file or symlink".to_string(),
            })
        }
    }

    fn list_files(&self, root: &Path) -> RecoveryResult<Vec<PathBuf>> {
        self.walk(root, false)
    }

    fn list_symlinks(&self, root: &Path) -> RecoveryResult<Vec<PathBuf>> {
        self.walk(root, true)
    }
}
