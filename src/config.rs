//! Engine configuration.
//!
//! The configuration is an immutable value handed to the controller at
//! construction. Values are layered: built-in defaults, then an optional
//! TOML/JSON file, then `MIRROR_HEAL_*` environment overrides.

use crate::{RecoveryError, RecoveryResult};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "/etc/mirror-heal/config.toml";

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "MIRROR_HEAL";

/// Marker present while a manifest is being generated
const GENERATION_MARKER: &str = "manifest.generating.flag";

/// Marker present while the mirror is being refreshed from the live trees
const REBUILD_MARKER: &str = "rebuild.inprogress.flag";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashBackend {
    /// In-process SHA-1 and directory walk
    Native,
    /// `sha1sum` and `find` subprocesses
    External,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for daily-rolling log files; stderr only when unset
    pub log_dir: Option<PathBuf>,
    /// Write the file layer as JSON lines
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Root of the golden copy on the recovery partition
    pub mirror_root: PathBuf,

    /// Live trees mirrored under `mirror_root` path-for-path
    pub live_roots: Vec<PathBuf>,

    /// Marker left by the updater after a successful update
    pub success_flag: String,

    /// Comma-separated list of files added by the last update
    pub update_descriptor: String,

    /// Checksum manifest file name
    pub manifest: String,

    /// Any mirror path containing one of these is never tracked
    pub excluded_markers: Vec<String>,

    pub hash_backend: HashBackend,
    pub hash_program: String,
    pub find_program: String,

    /// Optional file rewritten with the current splash name
    pub status_file: Option<PathBuf>,

    pub logging: LoggingConfig,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            mirror_root: PathBuf::from("/mnt/recovery"),
            live_roots: vec![PathBuf::from("/mnt/app"), PathBuf::from("/mnt/appdata")],
            success_flag: "updateSuccessful.flag".to_string(),
            update_descriptor: "insp_LinuxUpdate.txt".to_string(),
            manifest: "sha1sum.sha1".to_string(),
            excluded_markers: vec![".db".to_string(), ".sha1".to_string(), ".flag".to_string()],
            hash_backend: HashBackend::Native,
            hash_program: "sha1sum".to_string(),
            find_program: "find".to_string(),
            status_file: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl RecoveryConfig {
    /// Config rooted at `mirror_root` protecting `live_roots`, other values default
    pub fn new(mirror_root: impl Into<PathBuf>, live_roots: Vec<PathBuf>) -> Self {
        Self {
            mirror_root: mirror_root.into(),
            live_roots,
            ..Default::default()
        }
    }

    /// Load layered configuration.
    ///
    /// A missing file is not an error; a present but unparsable one is.
    pub fn load(path: Option<&Path>) -> RecoveryResult<Self> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));

        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path).required(false))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("live_roots")
                    .with_list_parse_key("excluded_markers"),
            )
            .build()
            .map_err(|e| RecoveryError::Config(format!("{}: {}", path.display(), e)))?;

        let config: RecoveryConfig = settings
            .try_deserialize()
            .map_err(|e| RecoveryError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RecoveryResult<()> {
        if !self.mirror_root.is_absolute() {
            return Err(RecoveryError::Config(format!(
                "mirror_root must be absolute: {}",
                self.mirror_root.display()
            )));
        }

        if self.live_roots.is_empty() {
            return Err(RecoveryError::Config(
                "at least one live root is required".to_string(),
            ));
        }

        for root in &self.live_roots {
            if !root.is_absolute() {
                return Err(RecoveryError::Config(format!(
                    "live root must be absolute: {}",
                    root.display()
                )));
            }
            if root.starts_with(&self.mirror_root) {
                return Err(RecoveryError::Config(format!(
                    "live root {} lies inside the mirror",
                    root.display()
                )));
            }
        }

        for (key, name) in [
            ("success_flag", &self.success_flag),
            ("update_descriptor", &self.update_descriptor),
            ("manifest", &self.manifest),
        ] {
            if name.is_empty() || name.contains('/') {
                return Err(RecoveryError::Config(format!(
                    "{} must be a plain file name, got {:?}",
                    key, name
                )));
            }
        }

        if self.excluded_markers.iter().any(|m| m.is_empty()) {
            return Err(RecoveryError::Config(
                "excluded_markers may not contain an empty marker".to_string(),
            ));
        }

        Ok(())
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.mirror_root.join(&self.manifest)
    }

    pub fn success_flag_path(&self) -> PathBuf {
        self.mirror_root.join(&self.success_flag)
    }

    pub fn update_descriptor_path(&self) -> PathBuf {
        self.mirror_root.join(&self.update_descriptor)
    }

    pub fn generation_marker_path(&self) -> PathBuf {
        self.mirror_root.join(GENERATION_MARKER)
    }

    pub fn rebuild_marker_path(&self) -> PathBuf {
        self.mirror_root.join(REBUILD_MARKER)
    }

    /// Control files in the mirror root that never have a live counterpart
    pub fn control_files(&self) -> [PathBuf; 5] {
        [
            self.manifest_path(),
            self.success_flag_path(),
            self.update_descriptor_path(),
            self.generation_marker_path(),
            self.rebuild_marker_path(),
        ]
    }

    /// Location of an absolute live path inside the mirror: `<mirror_root><live>`
    pub fn mirrored_path(&self, live: &Path) -> PathBuf {
        let relative: PathBuf = live
            .components()
            .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
            .collect();
        self.mirror_root.join(relative)
    }
}
