/// Subprocess-backed hashing and enumeration
///
/// Hashing runs `<hash_program> <path>` and expects one
/// `<hex digest><two spaces><path>` line on stdout. Enumeration runs
/// `<find_program> <root> -type f|l` and expects one absolute path per line.
/// Symlinks are hashed however the hashing program treats them (`sha1sum`
/// follows the link and hashes the referent).
use super::command::CommandRunner;
use super::{Digest, IntegrityTools};
use crate::manifest::record::{parse_digest, split_line};
use crate::{RecoveryError, RecoveryResult};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

pub struct ExternalTools {
    runner: CommandRunner,
    hash_program: String,
    find_program: String,
}

impl ExternalTools {
    pub fn new(
        runner: CommandRunner,
        hash_program: impl Into<String>,
        find_program: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            hash_program: hash_program.into(),
            find_program: find_program.into(),
        }
    }

    fn find(&self, root: &Path, type_selector: &str) -> RecoveryResult<Vec<PathBuf>> {
        let output = self.runner.run(
            &self.find_program,
            [root.as_os_str(), OsStr::new("-type"), OsStr::new(type_selector)],
        )?;
        Ok(output.path_lines())
    }
}

impl IntegrityTools for ExternalTools {
    fn hash(&self, path: &Path) -> RecoveryResult<Digest> {
        let output = self.runner.run(&self.hash_program, [path.as_os_str()])?;

        let first = output
            .stdout
            .split(|&b| b == b'\n')
            .next()
            .unwrap_or_default();
        // coreutils prefixes the line with '\' when the file name needed escaping
        let first = first.strip_prefix(b"\\").unwrap_or(first);

        split_line(first)
            .ok_or_else(|| "missing two-space separator".to_string())
            .and_then(|(digest, _)| parse_digest(digest))
            .map_err(|reason| RecoveryError::Hash {
                path: path.to_path_buf(),
                reason: format!("unexpected {} output: {}", self.hash_program, reason),
            })
    }

    fn list_files(&self, root: &Path) -> RecoveryResult<Vec<PathBuf>> {
        self.find(root, "f")
    }

    fn list_symlinks(&self, root: &Path) -> RecoveryResult<Vec<PathBuf>> {
        self.find(root, "l")
    }
}
