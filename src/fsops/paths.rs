/// Mirror/live path correspondence.
///
/// For any mirror path P the live path is P with the mirror-root prefix
/// removed. There is no mapping table; this module is the whole addressing
/// scheme.
use std::path::{Path, PathBuf};

/// Live counterpart of a path recorded under the mirror.
///
/// Returns `None` when `mirror_path` is not strictly below `mirror_root`.
pub fn live_path_for(mirror_root: &Path, mirror_path: &Path) -> Option<PathBuf> {
    let relative = mirror_path.strip_prefix(mirror_root).ok()?;
    if relative.as_os_str().is_empty() {
        return None;
    }
    Some(Path::new("/").join(relative))
}

/// Rewrite a symlink target so that it resolves from the live root.
///
/// Absolute targets inside the mirror lose the mirror prefix; every other
/// target (relative, or pointing outside the mirror) is kept verbatim.
pub fn rewrite_link_target(mirror_root: &Path, target: &Path) -> PathBuf {
    if target.is_absolute() {
        if let Some(live) = live_path_for(mirror_root, target) {
            return live;
        }
    }
    target.to_path_buf()
}
