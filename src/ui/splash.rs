use super::{ProgressSink, ProgressState};
use chrono::Utc;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::NamedTempFile;

const SPINNER_TICK: Duration = Duration::from_millis(120);

/// Spinner on the controlling terminal showing the current state
///
/// Repeated notifications of the state already on screen are dropped, so a
/// verify pass repairing many files redraws the warning once.
pub struct TerminalSplash {
    bar: ProgressBar,
    last: Mutex<Option<ProgressState>>,
}

impl TerminalSplash {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.enable_steady_tick(SPINNER_TICK);
        Self::with_bar(bar)
    }

    /// Splash that tracks state but draws nothing
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(bar: ProgressBar) -> Self {
        let template = ProgressStyle::with_template("{spinner:.cyan} [{elapsed}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(template);

        Self {
            bar,
            last: Mutex::new(None),
        }
    }

    /// Message currently displayed
    pub fn message(&self) -> String {
        self.bar.message()
    }

    pub fn current(&self) -> Option<ProgressState> {
        self.last.lock().ok().and_then(|last| *last)
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    pub(crate) fn render(state: ProgressState) -> String {
        let text = match state {
            ProgressState::Idle => style("Filesystem check idle").green().to_string(),
            ProgressState::Updating => style("Updating recovery partition").yellow().bold().to_string(),
            ProgressState::Warning => style("Repairing files from recovery partition")
                .red()
                .bold()
                .to_string(),
        };
        format!("{} ({})", text, state.splash_name())
    }
}

impl Default for TerminalSplash {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for TerminalSplash {
    fn notify(&self, state: ProgressState) {
        let Ok(mut last) = self.last.lock() else {
            return;
        };

        if *last == Some(state) {
            return;
        }
        *last = Some(state);

        self.bar.set_message(Self::render(state));
    }
}

impl Drop for TerminalSplash {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

/// Rewrites a small status file for an external splash renderer
///
/// File layout, one value per line: splash image name, state name, RFC 3339
/// timestamp. The file is replaced atomically so a reader never observes a
/// partial write. Write failures are logged and otherwise ignored.
pub struct StatusFileSink {
    path: PathBuf,
}

impl StatusFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_state(&self, state: ProgressState) -> std::io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        writeln!(tmp, "{}", state.splash_name())?;
        writeln!(tmp, "{}", state.as_str())?;
        writeln!(tmp, "{}", Utc::now().to_rfc3339())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl ProgressSink for StatusFileSink {
    fn notify(&self, state: ProgressState) {
        if let Err(e) = self.write_state(state) {
            tracing::warn!(
                path = %self.path.display(),
                state = %state,
                error = %e,
                "Failed to update status file"
            );
        }
    }
}
