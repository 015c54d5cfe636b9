// Recovery Controller - decides whether the mirror needs rebuilding, then
// verifies the live trees against it
//
// Decision order, first match wins:
//   1. mirror root absent          -> give up for this boot
//   2. mirror root empty           -> rebuild from live, then verify
//   3. success flag in mirror root -> rebuild from live, verify, then drop the flag
//   4. rebuild marker left behind  -> rebuild from live again, then verify
//   5. otherwise                   -> verify
//
// A rebuild is bracketed by a marker in the mirror root; while it exists the
// mirror holds a partial copy and must not be trusted as golden.
//
// Sub-step failures are logged and the workflow carries on; an unprotected
// boot is worse than a partial pass.

use crate::config::RecoveryConfig;
use crate::fsops::{CopyStats, TreeCopier};
use crate::manifest::generator::{remove_if_present, write_marker};
use crate::manifest::{GenerateReport, ManifestGenerator, ManifestVerifier, VerifyReport};
use crate::tools::IntegrityTools;
use crate::ui::{ProgressSink, ProgressState};
use crate::update::{ImportReport, UpdateImporter};
use crate::{RecoveryError, RecoveryResult};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

/// Why the mirror was refreshed from the live trees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RebuildReason {
    /// Mirror root exists but holds nothing
    EmptyMirror,
    /// The updater left its success flag
    UpdateCompleted,
    /// A previous rebuild never finished
    Interrupted,
    /// Requested explicitly by the operator
    Forced,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RebuildReport {
    pub reason: RebuildReason,
    pub copied: CopyStats,
    pub imported: ImportReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecoveryOutcome {
    /// No mirror to recover from; the device runs unprotected this boot
    MirrorMissing { mirror_root: PathBuf },
    Verified {
        rebuild: Option<RebuildReport>,
        report: VerifyReport,
    },
    /// Verification could not run at all
    Aborted {
        rebuild: Option<RebuildReport>,
        reason: String,
    },
}

impl RecoveryOutcome {
    pub fn verify_report(&self) -> Option<&VerifyReport> {
        match self {
            RecoveryOutcome::Verified { report, .. } => Some(report),
            _ => None,
        }
    }

    pub fn rebuild(&self) -> Option<&RebuildReport> {
        match self {
            RecoveryOutcome::Verified { rebuild, .. } | RecoveryOutcome::Aborted { rebuild, .. } => {
                rebuild.as_ref()
            }
            RecoveryOutcome::MirrorMissing { .. } => None,
        }
    }
}

pub struct RecoveryController {
    config: RecoveryConfig,
    tools: Box<dyn IntegrityTools>,
    progress: Box<dyn ProgressSink>,
}

impl RecoveryController {
    pub fn new(
        config: RecoveryConfig,
        tools: Box<dyn IntegrityTools>,
        progress: Box<dyn ProgressSink>,
    ) -> Self {
        Self {
            config,
            tools,
            progress,
        }
    }

    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    /// Run the boot-time workflow
    pub fn run(&self) -> RecoveryOutcome {
        self.execute(false)
    }

    /// Same as [`run`](Self::run), but always refreshes the mirror first
    pub fn run_forced_rebuild(&self) -> RecoveryOutcome {
        self.execute(true)
    }

    fn execute(&self, force: bool) -> RecoveryOutcome {
        let start = Instant::now();
        self.progress.notify(ProgressState::Idle);

        tracing::info!(
            mirror = %self.config.mirror_root.display(),
            live_roots = ?self.config.live_roots,
            "Starting recovery check"
        );

        let outcome = self.execute_steps(force);

        self.progress.notify(ProgressState::Idle);

        match &outcome {
            RecoveryOutcome::MirrorMissing { mirror_root } => {
                tracing::error!(
                    mirror = %mirror_root.display(),
                    "Recovery mirror does not exist, skipping recovery check"
                );
            }
            RecoveryOutcome::Verified { report, .. } => {
                tracing::info!(
                    repairs = report.repairs(),
                    clean = report.is_clean(),
                    elapsed = %humantime::format_duration(start.elapsed()),
                    "Recovery check finished"
                );
            }
            RecoveryOutcome::Aborted { reason, .. } => {
                tracing::error!(reason = %reason, "Recovery check aborted");
            }
        }

        outcome
    }

    fn execute_steps(&self, force: bool) -> RecoveryOutcome {
        let mirror_root = &self.config.mirror_root;

        if !mirror_root.is_dir() {
            return RecoveryOutcome::MirrorMissing {
                mirror_root: mirror_root.clone(),
            };
        }

        let reason = if force {
            Some(RebuildReason::Forced)
        } else {
            match self.rebuild_reason() {
                Ok(reason) => reason,
                Err(e) => {
                    return RecoveryOutcome::Aborted {
                        rebuild: None,
                        reason: e.to_string(),
                    }
                }
            }
        };

        let rebuild = reason.map(|reason| self.rebuild(reason));
        let verified = self.verify();

        if reason == Some(RebuildReason::UpdateCompleted) {
            // Only once rebuild and verification have run, so an interrupted pass is retried next boot
            self.clear_update_flag();
        }

        match verified {
            Ok(report) => RecoveryOutcome::Verified { rebuild, report },
            Err(e) => RecoveryOutcome::Aborted {
                rebuild,
                reason: e.to_string(),
            },
        }
    }

    fn clear_update_flag(&self) {
        let flag = self.config.success_flag_path();
        match remove_if_present(&flag) {
            Ok(()) => tracing::info!(flag = %flag.display(), "Update flag cleared"),
            Err(e) => {
                tracing::error!(flag = %flag.display(), error = %e, "Failed to clear update flag")
            }
        }
    }

    fn rebuild_reason(&self) -> RecoveryResult<Option<RebuildReason>> {
        let mut entries = fs::read_dir(&self.config.mirror_root)?;
        if entries.next().is_none() {
            tracing::warn!("Recovery mirror is empty, building it from the live trees");
            return Ok(Some(RebuildReason::EmptyMirror));
        }

        let flag = self.config.success_flag_path();
        if fs::symlink_metadata(&flag).is_ok() {
            tracing::warn!(
                flag = %flag.display(),
                "Previous update was successful, refreshing recovery mirror"
            );
            return Ok(Some(RebuildReason::UpdateCompleted));
        }

        let marker = self.config.rebuild_marker_path();
        if fs::symlink_metadata(&marker).is_ok() {
            tracing::warn!(
                marker = %marker.display(),
                "Previous mirror rebuild was interrupted, starting it over"
            );
            return Ok(Some(RebuildReason::Interrupted));
        }

        tracing::info!("No update detected, checking files against recovery mirror");
        Ok(None)
    }

    /// Refresh the mirror from the live trees and discard the manifest.
    ///
    /// Never fails as a whole; every step runs regardless of earlier errors.
    /// The rebuild marker is only removed once every step has run.
    pub fn rebuild(&self, reason: RebuildReason) -> RebuildReport {
        self.progress.notify(ProgressState::Updating);
        tracing::info!(reason = ?reason, "Rebuilding recovery mirror");

        let marker = self.config.rebuild_marker_path();
        if let Err(e) = write_marker(&marker) {
            tracing::error!(marker = %marker.display(), error = %e, "Failed to write rebuild marker");
        }

        let copier = TreeCopier::new(&self.config.mirror_root);
        let mut copied = CopyStats::default();

        for live_root in &self.config.live_roots {
            let target = self.config.mirrored_path(live_root);
            match copier.copy_tree(live_root, &target) {
                Ok(stats) => {
                    tracing::info!(
                        src = %live_root.display(),
                        dst = %target.display(),
                        files = stats.files,
                        symlinks = stats.symlinks,
                        failures = stats.failures,
                        "Live tree copied into mirror"
                    );
                    copied.absorb(stats);
                }
                Err(e) => {
                    tracing::error!(
                        src = %live_root.display(),
                        dst = %target.display(),
                        error = %e,
                        "Failed to copy live tree into mirror"
                    );
                    copied.failures += 1;
                }
            }
        }

        let imported = match UpdateImporter::new(&self.config).import() {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(error = %e, "Failed to import update descriptor");
                ImportReport {
                    failures: 1,
                    ..Default::default()
                }
            }
        };

        let manifest = self.config.manifest_path();
        if let Err(e) = remove_if_present(&manifest) {
            tracing::error!(manifest = %manifest.display(), error = %e, "Failed to discard manifest");
        }

        if let Err(e) = remove_if_present(&marker) {
            tracing::error!(marker = %marker.display(), error = %e, "Failed to remove rebuild marker");
        }

        RebuildReport {
            reason,
            copied,
            imported,
        }
    }

    /// Verify-and-repair against the current manifest
    pub fn verify(&self) -> RecoveryResult<VerifyReport> {
        self.ensure_mirror()?;
        ManifestVerifier::new(&self.config, self.tools.as_ref(), self.progress.as_ref())
            .verify_and_repair()
    }

    /// Regenerate the manifest from the current mirror contents
    pub fn generate(&self) -> RecoveryResult<GenerateReport> {
        self.ensure_mirror()?;
        ManifestGenerator::new(&self.config, self.tools.as_ref()).generate()
    }

    fn ensure_mirror(&self) -> RecoveryResult<()> {
        if self.config.mirror_root.is_dir() {
            Ok(())
        } else {
            Err(RecoveryError::MirrorMissing(self.config.mirror_root.clone()))
        }
    }
}
