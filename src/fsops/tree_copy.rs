/// Recursive, symlink-aware tree copy
///
/// Every copy is a destructive overwrite: the destination entry is replaced
/// whole, never merged or appended to. File content is staged in a sibling
/// temporary file and renamed into place, so an interrupted copy never
/// leaves a truncated file under the final name. Symlinks are recreated
/// rather than followed, with mirror-absolute targets rewritten to their
/// live-root equivalent.
use super::paths::rewrite_link_target;
use crate::{RecoveryError, RecoveryResult};
use anyhow::Context;
use serde::Serialize;
use std::fs;
use std::io;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use tempfile::Builder;

/// File-name prefix of content staged by `copy_file`; never tracked
pub const STAGING_PREFIX: &str = ".mirror-heal-staging.";

/// Counters for one `copy_tree` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CopyStats {
    pub files: usize,
    pub symlinks: usize,
    pub directories: usize,
    pub skipped: usize,
    pub failures: usize,
}

impl CopyStats {
    pub fn absorb(&mut self, other: CopyStats) {
        self.files += other.files;
        self.symlinks += other.symlinks;
        self.directories += other.directories;
        self.skipped += other.skipped;
        self.failures += other.failures;
    }
}

/// What `copy_file` produced at the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopiedKind {
    File,
    Symlink,
}

pub struct TreeCopier {
    mirror_root: PathBuf,
}

impl TreeCopier {
    /// `mirror_root` is the prefix stripped from symlink targets
    pub fn new(mirror_root: impl Into<PathBuf>) -> Self {
        Self {
            mirror_root: mirror_root.into(),
        }
    }

    pub fn mirror_root(&self) -> &Path {
        &self.mirror_root
    }

    /// Copy `src` recursively into `dst`.
    ///
    /// A missing `src` is a no-op. `src` itself may be a symlink to a
    /// directory; links found inside the tree are copied as links. Failures on individual entries are logged
    /// and counted; the walk continues with the remaining siblings. Only a
    /// failure to create `dst` or to list `src` is returned as an error.
    pub fn copy_tree(&self, src: &Path, dst: &Path) -> RecoveryResult<CopyStats> {
        match fs::metadata(src) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                tracing::warn!(src = %src.display(), "Tree source is not a directory, skipping");
                return Ok(CopyStats {
                    skipped: 1,
                    ..Default::default()
                });
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(src = %src.display(), "Tree source absent, nothing to copy");
                return Ok(CopyStats::default());
            }
            Err(e) => return Err(e.into()),
        }

        fs::create_dir_all(dst)
            .with_context(|| format!("Failed to create directory {}", dst.display()))?;

        let mut stats = CopyStats {
            directories: 1,
            ..Default::default()
        };

        let entries = fs::read_dir(src)
            .with_context(|| format!("Failed to read directory {}", src.display()))?;

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::error!(dir = %src.display(), error = %e, "Failed to read directory entry");
                    stats.failures += 1;
                    continue;
                }
            };

            let src_path = entry.path();
            let dst_path = dst.join(entry.file_name());

            if entry.file_name().to_string_lossy().starts_with(STAGING_PREFIX) {
                tracing::debug!(path = %src_path.display(), "Skipping leftover staged copy");
                stats.skipped += 1;
                continue;
            }

            let file_type = match entry.file_type() {
                Ok(ft) => ft,
                Err(e) => {
                    tracing::error!(path = %src_path.display(), error = %e, "Failed to stat entry");
                    stats.failures += 1;
                    continue;
                }
            };

            if file_type.is_dir() {
                match self.copy_tree(&src_path, &dst_path) {
                    Ok(sub) => stats.absorb(sub),
                    Err(e) => {
                        tracing::error!(
                            src = %src_path.display(),
                            dst = %dst_path.display(),
                            error = %e,
                            "Failed to copy subtree"
                        );
                        stats.failures += 1;
                    }
                }
            } else if file_type.is_file() || file_type.is_symlink() {
                match self.copy_file(&src_path, &dst_path) {
                    Ok(CopiedKind::File) => stats.files += 1,
                    Ok(CopiedKind::Symlink) => stats.symlinks += 1,
                    Err(e) => {
                        tracing::error!(
                            src = %src_path.display(),
                            dst = %dst_path.display(),
                            error = %e,
                            "Failed to copy file"
                        );
                        stats.failures += 1;
                    }
                }
            } else {
                // Sockets, FIFOs and device nodes are not part of a golden copy
                tracing::debug!(path = %src_path.display(), "Skipping special file");
                stats.skipped += 1;
            }
        }

        Ok(stats)
    }

    /// Copy one file or symlink from `src` to `dst`, replacing whatever is at `dst`.
    ///
    /// The source is checked before anything at the destination is touched,
    /// so a missing source never destroys an existing destination.
    pub fn copy_file(&self, src: &Path, dst: &Path) -> RecoveryResult<CopiedKind> {
        let meta = match fs::symlink_metadata(src) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(RecoveryError::SourceMissing(src.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };

        if meta.is_dir() {
            return Err(RecoveryError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is a directory", src.display()),
            )));
        }

        let parent = match dst.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create parent directory {}", parent.display()))?;

        if meta.file_type().is_symlink() {
            let target = fs::read_link(src)
                .with_context(|| format!("Failed to read link {}", src.display()))?;
            let rewritten = rewrite_link_target(&self.mirror_root, &target);

            remove_existing(dst)?;
            symlink(&rewritten, dst)
                .with_context(|| format!("Failed to create symlink {}", dst.display()))?;

            tracing::debug!(
                src = %src.display(),
                dst = %dst.display(),
                target = %rewritten.display(),
                "Symlink copied"
            );
            return Ok(CopiedKind::Symlink);
        }

        let staged = Builder::new()
            .prefix(STAGING_PREFIX)
            .tempfile_in(parent)
            .with_context(|| format!("Failed to stage copy in {}", parent.display()))?;

        // fs::copy carries the permission bits; mtime is restored separately
        fs::copy(src, staged.path()).with_context(|| {
            format!("Failed to copy {} to {}", src.display(), staged.path().display())
        })?;

        if let Ok(modified) = meta.modified() {
            if let Err(e) = staged.as_file().set_modified(modified) {
                tracing::debug!(dst = %dst.display(), error = %e, "Could not preserve mtime");
            }
        }
        staged
            .as_file()
            .sync_all()
            .with_context(|| format!("fsync failed for {}", staged.path().display()))?;

        // rename replaces files and links in one step, but not directories
        if fs::symlink_metadata(dst).map(|m| m.is_dir()).unwrap_or(false) {
            remove_existing(dst)?;
        }
        staged
            .persist(dst)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to move staged copy onto {}", dst.display()))?;

        Ok(CopiedKind::File)
    }
}

/// Remove any entry at `path`, including dangling symlinks and directories.
fn remove_existing(path: &Path) -> RecoveryResult<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => {
            fs::remove_dir_all(path)
                .with_context(|| format!("Failed to remove directory {}", path.display()))?;
        }
        Ok(_) => {
            fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
