/// Manifest generation
///
/// Walks the whole mirror in two passes (regular files, then symlinks) and
/// appends one record per tracked entry. Every append reopens the manifest,
/// writes one line, syncs and closes it, so an interruption loses at most
/// the line in flight. A generation marker brackets the run; while it exists
/// the manifest on disk is known to be incomplete.
use super::record::ManifestRecord;
use super::ExclusionRules;
use crate::config::RecoveryConfig;
use crate::tools::IntegrityTools;
use crate::RecoveryResult;
use anyhow::Context;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GenerateReport {
    /// Regular files recorded
    pub files: usize,
    /// Symlinks recorded
    pub symlinks: usize,
    /// Entries skipped by the exclusion rules
    pub excluded: usize,
    /// Entries that could not be hashed or appended
    pub failures: usize,
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
}

impl GenerateReport {
    pub fn recorded(&self) -> usize {
        self.files + self.symlinks
    }
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

pub struct ManifestGenerator<'a> {
    config: &'a RecoveryConfig,
    tools: &'a dyn IntegrityTools,
    rules: ExclusionRules,
}

impl<'a> ManifestGenerator<'a> {
    pub fn new(config: &'a RecoveryConfig, tools: &'a dyn IntegrityTools) -> Self {
        Self {
            config,
            tools,
            rules: ExclusionRules::from_config(config),
        }
    }

    /// Produce a fresh manifest for the current mirror contents.
    ///
    /// Any previous manifest is truncated first, so a mirror with nothing to
    /// track still ends up with an empty, valid manifest. Enumeration failure of the
    /// mirror root aborts with the marker left in place, so the next run
    /// starts over.
    pub fn generate(&self) -> RecoveryResult<GenerateReport> {
        let start = Instant::now();
        let manifest = self.config.manifest_path();
        let marker = self.config.generation_marker_path();

        tracing::info!(
            mirror = %self.config.mirror_root.display(),
            manifest = %manifest.display(),
            "Generating checksum manifest"
        );

        write_marker(&marker)?;
        start_manifest(&manifest)?;

        let mut report = GenerateReport::default();

        let files = self.tools.list_files(&self.config.mirror_root)?;
        for path in files {
            if self.record(&manifest, &path, &mut report) {
                report.files += 1;
            }
        }

        let links = self.tools.list_symlinks(&self.config.mirror_root)?;
        for path in links {
            if self.record(&manifest, &path, &mut report) {
                report.symlinks += 1;
            }
        }

        remove_if_present(&marker)?;
        report.elapsed = start.elapsed();

        tracing::info!(
            files = report.files,
            symlinks = report.symlinks,
            excluded = report.excluded,
            failures = report.failures,
            elapsed = %humantime::format_duration(report.elapsed),
            "Checksum manifest generated"
        );

        Ok(report)
    }

    /// Hash and append one entry; false when it was excluded or failed.
    fn record(&self, manifest: &Path, path: &Path, report: &mut GenerateReport) -> bool {
        if self.rules.is_excluded(path) {
            tracing::trace!(path = %path.display(), "Excluded from manifest");
            report.excluded += 1;
            return false;
        }

        let digest = match self.tools.hash(path) {
            Ok(digest) => digest,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to hash mirror entry");
                report.failures += 1;
                return false;
            }
        };

        let record = ManifestRecord::new(digest, path);
        if let Err(e) = append_record(manifest, &record) {
            tracing::error!(
                manifest = %manifest.display(),
                path = %path.display(),
                error = %e,
                "Failed to append manifest record"
            );
            report.failures += 1;
            return false;
        }

        true
    }
}

fn append_record(manifest: &Path, record: &ManifestRecord) -> anyhow::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(manifest)
        .with_context(|| format!("Failed to open manifest {}", manifest.display()))?;

    file.write_all(&record.to_line())
        .context("Failed to write manifest record")?;
    file.sync_data().context("Failed to sync manifest")?;

    Ok(())
}

fn start_manifest(manifest: &Path) -> RecoveryResult<()> {
    let file = File::create(manifest)
        .with_context(|| format!("Failed to create manifest {}", manifest.display()))?;
    file.sync_all()
        .with_context(|| format!("Failed to sync manifest {}", manifest.display()))?;
    Ok(())
}

pub(crate) fn write_marker(marker: &Path) -> RecoveryResult<()> {
    let file = File::create(marker)
        .with_context(|| format!("Failed to create marker {}", marker.display()))?;
    file.sync_all()
        .with_context(|| format!("Failed to sync marker {}", marker.display()))?;
    Ok(())
}

pub(crate) fn remove_if_present(path: &Path) -> RecoveryResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(anyhow::Error::new(e)
            .context(format!("Failed to remove {}", path.display()))
            .into()),
    }
}
