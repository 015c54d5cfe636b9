/// Stand-in programs for the subprocess backend
///
/// Stock utilities with predictable behaviour, used in place of `sha1sum`
/// and `find` to drive the error paths of the subprocess backend.
use std::process::Command;

/// Exits non-zero for any argument
#[allow(dead_code)]
pub const FAILING_PROGRAM: &str = "false";

/// Exits zero and echoes its argument: no digest, no separator
#[allow(dead_code)]
pub const GARBAGE_HASHER: &str = "echo";

/// Exits zero and prints nothing: enumerates an empty tree
#[allow(dead_code)]
pub const SILENT_FINDER: &str = "true";

/// True when the real coreutils programs are on PATH
#[allow(dead_code)]
pub fn coreutils_available() -> bool {
    Command::new("sha1sum").arg("--version").output().is_ok()
        && Command::new("find").arg("--version").output().is_ok()
}
