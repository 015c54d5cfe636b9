use super::descriptor::{parse_descriptor_line, DescriptorLine, UpdateOperation, UpdateRecord};
use crate::config::RecoveryConfig;
use crate::fsops::TreeCopier;
use crate::{RecoveryError, RecoveryResult};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Files copied into the mirror
    pub added: usize,
    /// ADD records whose live file did not exist
    pub missing: usize,
    /// Records with another operation, or aimed at the mirror itself
    pub ignored: usize,
    pub malformed: usize,
    pub failures: usize,
}

/// Pulls files named by an update descriptor from the live tree into the
/// mirror. Never writes to the live tree.
pub struct UpdateImporter<'a> {
    config: &'a RecoveryConfig,
    copier: TreeCopier,
}

impl<'a> UpdateImporter<'a> {
    pub fn new(config: &'a RecoveryConfig) -> Self {
        Self {
            config,
            copier: TreeCopier::new(&config.mirror_root),
        }
    }

    /// Import the configured descriptor in the mirror root. Absent is a no-op.
    pub fn import(&self) -> RecoveryResult<ImportReport> {
        self.import_from(&self.config.update_descriptor_path())
    }

    pub fn import_from(&self, descriptor: &Path) -> RecoveryResult<ImportReport> {
        let raw = match fs::read(descriptor) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(descriptor = %descriptor.display(), "No update descriptor");
                return Ok(ImportReport::default());
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(descriptor = %descriptor.display(), "Importing update descriptor");

        let text = String::from_utf8_lossy(&raw);
        let mut report = ImportReport::default();

        for (index, line) in text.lines().enumerate() {
            let record = match parse_descriptor_line(line) {
                DescriptorLine::Parsed(record) => record,
                DescriptorLine::Blank => continue,
                DescriptorLine::Malformed(reason) => {
                    let err = RecoveryError::MalformedLine {
                        source_file: descriptor.to_path_buf(),
                        line_no: index + 1,
                        reason,
                    };
                    tracing::warn!(error = %err, "Skipping descriptor line");
                    report.malformed += 1;
                    continue;
                }
            };

            self.apply(&record, &mut report);
        }

        tracing::info!(
            added = report.added,
            missing = report.missing,
            ignored = report.ignored,
            malformed = report.malformed,
            failures = report.failures,
            "Update descriptor imported"
        );

        Ok(report)
    }

    fn apply(&self, record: &UpdateRecord, report: &mut ImportReport) {
        if record.operation != UpdateOperation::Add {
            tracing::debug!(operation = %record.operation, "Ignoring descriptor operation");
            report.ignored += 1;
            return;
        }

        if record.destination.starts_with(&self.config.mirror_root) {
            tracing::debug!(
                destination = %record.destination.display(),
                "Descriptor entry targets the recovery mirror, ignoring"
            );
            report.ignored += 1;
            return;
        }

        let src = record.live_path();
        let dst = self.config.mirrored_path(&src);

        match self.copier.copy_file(&src, &dst) {
            Ok(_) => {
                tracing::info!(src = %src.display(), dst = %dst.display(), "Imported updated file");
                report.added += 1;
            }
            Err(RecoveryError::SourceMissing(_)) => {
                tracing::warn!(src = %src.display(), "Updated file not present on live tree, skipping");
                report.missing += 1;
            }
            Err(e) => {
                tracing::error!(
                    src = %src.display(),
                    dst = %dst.display(),
                    error = %e,
                    "Failed to import updated file"
                );
                report.failures += 1;
            }
        }
    }
}
