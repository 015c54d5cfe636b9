/// Manifest verification and repair
///
/// Each manifest line names a mirror entry and the digest it had when the
/// manifest was generated. The live counterpart is hashed and, when it is
/// missing or differs, replaced from the mirror. A bad line never stops the
/// pass; it is counted and the walk moves on.
use super::generator::{remove_if_present, GenerateReport, ManifestGenerator};
use super::record::{parse_manifest_line, ManifestRecord, ParseOutcome};
use super::ExclusionRules;
use crate::config::RecoveryConfig;
use crate::fsops::{live_path_for, TreeCopier};
use crate::tools::IntegrityTools;
use crate::ui::{ProgressSink, ProgressState};
use crate::{RecoveryError, RecoveryResult};
use anyhow::Context;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    /// Well-formed records examined
    pub checked: usize,
    /// Live entries already matching
    pub matched: usize,
    /// Live entries that were absent and have been restored
    pub repaired_missing: usize,
    /// Live entries whose digest differed and have been replaced
    pub repaired_drift: usize,
    /// Records skipped by the exclusion rules
    pub excluded: usize,
    /// Lines that could not be parsed or lie outside the mirror
    pub malformed: usize,
    /// Repairs whose result still differs from the recorded digest
    pub unresolved: usize,
    /// Repairs that could not be carried out
    pub failures: usize,
    /// Set when the manifest had to be generated before verifying
    pub generated: Option<GenerateReport>,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl VerifyReport {
    pub fn repairs(&self) -> usize {
        self.repaired_missing + self.repaired_drift
    }

    /// Nothing needed repairing and nothing went wrong
    pub fn is_clean(&self) -> bool {
        self.repairs() == 0 && self.malformed == 0 && self.unresolved == 0 && self.failures == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RepairCause {
    Missing,
    Drift,
}

impl RepairCause {
    fn as_str(&self) -> &'static str {
        match self {
            RepairCause::Missing => "missing",
            RepairCause::Drift => "drift",
        }
    }
}

pub struct ManifestVerifier<'a> {
    config: &'a RecoveryConfig,
    tools: &'a dyn IntegrityTools,
    progress: &'a dyn ProgressSink,
    copier: TreeCopier,
    rules: ExclusionRules,
}

impl<'a> ManifestVerifier<'a> {
    pub fn new(
        config: &'a RecoveryConfig,
        tools: &'a dyn IntegrityTools,
        progress: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            config,
            tools,
            progress,
            copier: TreeCopier::new(&config.mirror_root),
            rules: ExclusionRules::from_config(config),
        }
    }

    /// Check every manifest record against the live filesystem, repairing
    /// entries that are missing or differ.
    ///
    /// A manifest that is absent, or whose generation was interrupted, is
    /// regenerated from the mirror first.
    pub fn verify_and_repair(&self) -> RecoveryResult<VerifyReport> {
        let start = Instant::now();
        let manifest = self.config.manifest_path();
        let marker = self.config.generation_marker_path();

        let mut report = VerifyReport::default();

        if marker.exists() {
            tracing::warn!(
                manifest = %manifest.display(),
                "Previous manifest generation was interrupted, regenerating"
            );
            remove_if_present(&manifest)?;
            report.generated = Some(self.generate()?);
        } else if !manifest.exists() {
            tracing::info!(manifest = %manifest.display(), "No checksum manifest, generating");
            report.generated = Some(self.generate()?);
        }

        let file = File::open(&manifest)
            .with_context(|| format!("Failed to open manifest {}", manifest.display()))?;

        tracing::info!(manifest = %manifest.display(), "Verifying live files against manifest");

        for (index, line) in BufReader::new(file).split(b'\n').enumerate() {
            let line_no = index + 1;
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::error!(
                        manifest = %manifest.display(),
                        line_no,
                        error = %e,
                        "Failed to read manifest, stopping verification"
                    );
                    report.failures += 1;
                    break;
                }
            };

            if line.iter().all(|b| b.is_ascii_whitespace()) {
                continue;
            }

            let record = match parse_manifest_line(&line) {
                ParseOutcome::Parsed(record) => record,
                ParseOutcome::Malformed(reason) => {
                    let err = RecoveryError::MalformedLine {
                        source_file: manifest.clone(),
                        line_no,
                        reason,
                    };
                    tracing::warn!(error = %err, "Skipping manifest line");
                    report.malformed += 1;
                    continue;
                }
            };

            self.check_record(&manifest, line_no, &record, &mut report);
        }

        report.elapsed = start.elapsed();

        tracing::info!(
            checked = report.checked,
            matched = report.matched,
            repaired_missing = report.repaired_missing,
            repaired_drift = report.repaired_drift,
            malformed = report.malformed,
            unresolved = report.unresolved,
            failures = report.failures,
            elapsed = %humantime::format_duration(report.elapsed),
            "Verification complete"
        );

        Ok(report)
    }

    fn generate(&self) -> RecoveryResult<GenerateReport> {
        ManifestGenerator::new(self.config, self.tools).generate()
    }

    fn check_record(
        &self,
        manifest: &Path,
        line_no: usize,
        record: &ManifestRecord,
        report: &mut VerifyReport,
    ) {
        let Some(live) = live_path_for(&self.config.mirror_root, &record.path) else {
            let err = RecoveryError::MalformedLine {
                source_file: manifest.to_path_buf(),
                line_no,
                reason: format!("{} is outside the mirror root", record.path.display()),
            };
            tracing::warn!(error = %err, "Skipping manifest line");
            report.malformed += 1;
            return;
        };

        if self.rules.is_excluded(&record.path) {
            tracing::debug!(path = %record.path.display(), "Excluded record, not verifying");
            report.excluded += 1;
            return;
        }

        report.checked += 1;

        let cause = match fs::symlink_metadata(&live) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => RepairCause::Missing,
            Err(e) => {
                tracing::warn!(live = %live.display(), error = %e, "Cannot stat live entry");
                RepairCause::Drift
            }
            Ok(_) => match self.tools.hash(&live) {
                Ok(digest) if digest == record.digest => {
                    tracing::trace!(live = %live.display(), "Digest matches");
                    report.matched += 1;
                    return;
                }
                Ok(digest) => {
                    tracing::debug!(
                        live = %live.display(),
                        expected = %record.digest,
                        actual = %digest,
                        "Digest mismatch"
                    );
                    RepairCause::Drift
                }
                Err(e) => {
                    tracing::warn!(live = %live.display(), error = %e, "Cannot hash live entry");
                    RepairCause::Drift
                }
            },
        };

        self.repair(record, &live, cause, report);
    }

    fn repair(
        &self,
        record: &ManifestRecord,
        live: &Path,
        cause: RepairCause,
        report: &mut VerifyReport,
    ) {
        self.progress.notify(ProgressState::Warning);

        tracing::warn!(
            live = %live.display(),
            mirror = %record.path.display(),
            cause = cause.as_str(),
            "Repairing live entry from recovery mirror"
        );

        if let Err(e) = self.copier.copy_file(&record.path, live) {
            tracing::error!(
                live = %live.display(),
                mirror = %record.path.display(),
                error = %e,
                "Repair failed"
            );
            report.failures += 1;
            return;
        }

        match self.tools.hash(live) {
            Ok(digest) if digest == record.digest => match cause {
                RepairCause::Missing => report.repaired_missing += 1,
                RepairCause::Drift => report.repaired_drift += 1,
            },
            Ok(digest) => {
                tracing::error!(
                    live = %live.display(),
                    expected = %record.digest,
                    actual = %digest,
                    "Repaired entry still differs from manifest; mirror copy may be damaged"
                );
                report.unresolved += 1;
            }
            Err(e) => {
                tracing::error!(live = %live.display(), error = %e, "Cannot hash repaired entry");
                report.unresolved += 1;
            }
        }
    }
}
