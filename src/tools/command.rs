/// Synchronous subprocess execution with captured output
///
/// Each call blocks until the child exits. Stdout is captured whole and
/// exposed as a line stream; there is no streaming, no timeout and no
/// cancellation.
use crate::{RecoveryError, RecoveryResult};
use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStringExt;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Captured result of a successful command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// Non-empty stdout lines, lossily decoded
    pub fn lines(&self) -> Vec<String> {
        self.raw_lines()
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect()
    }

    /// Non-empty stdout lines as paths, byte-exact
    pub fn path_lines(&self) -> Vec<PathBuf> {
        self.raw_lines()
            .map(|line| PathBuf::from(OsString::from_vec(line.to_vec())))
            .collect()
    }

    fn raw_lines(&self) -> impl Iterator<Item = &[u8]> {
        self.stdout
            .split(|&b| b == b'\n')
            .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
            .filter(|line| !line.is_empty())
    }
}

#[derive(Debug, Clone, Default)]
pub struct CommandRunner;

impl CommandRunner {
    pub fn new() -> Self {
        Self
    }

    /// Run `program` with `args` and wait for it to exit.
    ///
    /// Spawn failures and non-zero exit statuses are returned as
    /// `RecoveryError::CommandFailed`.
    pub fn run<I, S>(&self, program: &str, args: I) -> RecoveryResult<CommandOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();

        tracing::trace!(program, args = ?args, "Running command");

        let output = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| RecoveryError::CommandFailed {
                program: program.to_string(),
                status: "spawn failed".to_string(),
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(RecoveryError::CommandFailed {
                program: program.to_string(),
                status: output.status.to_string(),
                stderr,
            });
        }

        if !output.stderr.is_empty() {
            tracing::debug!(
                program,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "Command wrote to stderr"
            );
        }

        Ok(CommandOutput {
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
