//! Filesystem primitives shared by the rebuild, import and repair paths.
//!
//! - `paths`: the mirror ↔ live path bijection
//! - `tree_copy`: recursive, symlink-aware copy with destructive overwrite

pub mod paths;
pub mod tree_copy;

pub use paths::{live_path_for, rewrite_link_target};
pub use tree_copy::{CopiedKind, CopyStats, TreeCopier, STAGING_PREFIX};
