/// Device fixture and controller builders
use mirror_heal::tools::Digest;
use mirror_heal::ui::RecordingSink;
use mirror_heal::{
    IntegrityTools, NativeTools, RecoveryConfig, RecoveryController, RecoveryResult,
};
use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// A simulated device: `<tmp>/recovery` mirrors `<tmp>/mnt/app` and
/// `<tmp>/mnt/appdata`. Live paths are absolute, so the mirrored path of a
/// live path `L` is `<tmp>/recovery` followed by `L`.
pub struct Device {
    temp: TempDir,
    pub config: RecoveryConfig,
    pub app: PathBuf,
    pub appdata: PathBuf,
    pub sink: Arc<RecordingSink>,
}

#[allow(dead_code)]
impl Device {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("tempdir");
        let mirror = temp.path().join("recovery");
        let app = temp.path().join("mnt/app");
        let appdata = temp.path().join("mnt/appdata");

        fs::create_dir_all(&mirror).unwrap();
        fs::create_dir_all(&app).unwrap();
        fs::create_dir_all(&appdata).unwrap();

        let config = RecoveryConfig::new(&mirror, vec![app.clone(), appdata.clone()]);
        config.validate().expect("fixture config is valid");

        Self {
            temp,
            config,
            app,
            appdata,
            sink: Arc::new(RecordingSink::new()),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn mirror(&self) -> &Path {
        &self.config.mirror_root
    }

    pub fn mirrored(&self, live: &Path) -> PathBuf {
        self.config.mirrored_path(live)
    }

    pub fn write(&self, path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    pub fn link(&self, path: &Path, target: impl AsRef<Path>) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        if fs::symlink_metadata(path).is_ok() {
            fs::remove_file(path).unwrap();
        }
        symlink(target, path).unwrap();
    }

    pub fn read(&self, path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    /// Typical application tree on the live side
    pub fn populate(&self) {
        self.write(&self.app.join("bin/healthmonitor"), "#!/bin/sh\necho ok\n");
        self.write(&self.app.join("lib/libcore.so.1.2"), "ELF core");
        self.link(&self.app.join("lib/libcore.so.1"), "libcore.so.1.2");
        self.write(&self.appdata.join("cfg/a.ini"), "[section]\nkey=value\n");
        self.write(&self.appdata.join("cfg/two  spaces.ini"), "spaced");
        self.write(&self.appdata.join("db/inspections.db"), "sqlite rows");
    }

    pub fn controller(&self) -> RecoveryController {
        self.controller_with(Box::new(NativeTools::new(self.mirror())))
    }

    pub fn controller_with(&self, tools: Box<dyn IntegrityTools>) -> RecoveryController {
        RecoveryController::new(self.config.clone(), tools, Box::new(self.sink.clone()))
    }

    pub fn manifest_lines(&self) -> Vec<String> {
        fs::read_to_string(self.config.manifest_path())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

/// Native tools that panic once `limit` hashes have been served,
/// standing in for power loss part-way through manifest generation
#[allow(dead_code)]
pub struct InterruptingTools {
    inner: NativeTools,
    served: AtomicUsize,
    limit: usize,
}

#[allow(dead_code)]
impl InterruptingTools {
    pub fn new(mirror_root: &Path, limit: usize) -> Self {
        Self {
            inner: NativeTools::new(mirror_root),
            served: AtomicUsize::new(0),
            limit,
        }
    }
}

impl IntegrityTools for InterruptingTools {
    fn hash(&self, path: &Path) -> RecoveryResult<Digest> {
        if self.served.fetch_add(1, Ordering::SeqCst) >= self.limit {
            panic!("simulated power loss while hashing {}", path.display());
        }
        self.inner.hash(path)
    }

    fn list_files(&self, root: &Path) -> RecoveryResult<Vec<PathBuf>> {
        self.inner.list_files(root)
    }

    fn list_symlinks(&self, root: &Path) -> RecoveryResult<Vec<PathBuf>> {
        self.inner.list_symlinks(root)
    }
}
