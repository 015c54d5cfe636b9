// Tests for the integrity tool backends
//
// Tests cover: digest parsing, native SHA-1 against known vectors, symlink
// digests across the mirror/live boundary, enumeration, the command runner,
// and agreement between the native and subprocess backends.

use super::*;
use crate::RecoveryError;
use std::fs;
use std::os::unix::fs::symlink;
use std::process::Command;
use tempfile::TempDir;

const SHA1_EMPTY: &str = "da39a3ee5e6b4b0d3255bfef95601890afd80709";
const SHA1_ABC: &str = "a9993e364706816aba3e25717850c26c9cd0d89d";

fn coreutils_available() -> bool {
    Command::new("sha1sum").arg("--version").output().is_ok()
        && Command::new("find").arg("--version").output().is_ok()
}

// ==================== DIGEST TESTS ====================

#[test]
fn test_digest_parse_accepts_40_hex_chars() {
    let digest = Digest::parse(SHA1_ABC).unwrap();
    assert_eq!(digest.as_str(), SHA1_ABC);
    assert_eq!(digest.to_string(), SHA1_ABC);
}

#[test]
fn test_digest_parse_normalises_case() {
    let digest = Digest::parse(&SHA1_ABC.to_uppercase()).unwrap();
    assert_eq!(digest.as_str(), SHA1_ABC);
}

#[test]
fn test_digest_parse_rejects_bad_input() {
    assert!(Digest::parse("").is_none());
    assert!(Digest::parse(&SHA1_ABC[..39]).is_none());
    assert!(Digest::parse(&format!("{}0", SHA1_ABC)).is_none());
    assert!(Digest::parse("zz993e364706816aba3e25717850c26c9cd0d89d").is_none());
}

// ==================== NATIVE HASHING TESTS ====================

#[test]
fn test_native_hash_known_vectors() {
    let temp = TempDir::new().unwrap();
    let empty = temp.path().join("empty");
    let abc = temp.path().join("abc");
    fs::write(&empty, b"").unwrap();
    fs::write(&abc, b"abc").unwrap();

    let tools = NativeTools::new(temp.path().join("recovery"));
    assert_eq!(tools.hash(&empty).unwrap().as_str(), SHA1_EMPTY);
    assert_eq!(tools.hash(&abc).unwrap().as_str(), SHA1_ABC);
}

#[test]
fn test_native_hash_large_file_spans_buffers() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("large.bin");
    fs::write(&path, vec![0xABu8; 100 * 1024 + 7]).unwrap();

    let tools = NativeTools::new(temp.path().join("recovery"));
    let first = tools.hash(&path).unwrap();
    let second = tools.hash(&path).unwrap();
    assert_eq!(first, second);
    assert_ne!(first.as_str(), SHA1_EMPTY);
}

#[test]
fn test_native_hash_missing_file_is_error() {
    let temp = TempDir::new().unwrap();
    let tools = NativeTools::new(temp.path().join("recovery"));
    let result = tools.hash(&temp.path().join("absent"));
    assert!(matches!(result, Err(RecoveryError::Io(_))));
}

#[test]
fn test_native_hash_directory_is_error() {
    let temp = TempDir::new().unwrap();
    let tools = NativeTools::new(temp.path().join("recovery"));
    let result = tools.hash(temp.path());
    assert!(matches!(result, Err(RecoveryError::Hash { .. })));
}

#[test]
fn test_native_symlink_digest_matches_across_mirror_boundary() {
    let temp = TempDir::new().unwrap();
    let mirror = temp.path().join("recovery");
    fs::create_dir_all(&mirror).unwrap();

    let mirror_link = mirror.join("current");
    symlink(mirror.join("data/x"), &mirror_link).unwrap();

    let live_link = temp.path().join("current");
    symlink("/data/x", &live_link).unwrap();

    let tools = NativeTools::new(&mirror);
    assert_eq!(tools.hash(&mirror_link).unwrap(), tools.hash(&live_link).unwrap());
}

#[test]
fn test_native_symlink_digest_detects_retarget() {
    let temp = TempDir::new().unwrap();
    let a = temp.path().join("a");
    let b = temp.path().join("b");
    symlink("/data/x", &a).unwrap();
    symlink("/data/y", &b).unwrap();

    let tools = NativeTools::new(temp.path().join("recovery"));
    assert_ne!(tools.hash(&a).unwrap(), tools.hash(&b).unwrap());
}

// ==================== ENUMERATION TESTS ====================

#[test]
fn test_native_enumeration_separates_files_and_links() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("tree");
    fs::create_dir_all(root.join("sub/deeper")).unwrap();
    fs::write(root.join("b.txt"), "b").unwrap();
    fs::write(root.join("a.txt"), "a").unwrap();
    fs::write(root.join("sub/deeper/c.txt"), "c").unwrap();
    symlink("a.txt", root.join("link-a")).unwrap();
    symlink(root.join("sub"), root.join("link-sub")).unwrap();

    let tools = NativeTools::new(temp.path().join("recovery"));

    let files = tools.list_files(&root).unwrap();
    assert_eq!(
        files,
        vec![
            root.join("a.txt"),
            root.join("b.txt"),
            root.join("sub/deeper/c.txt"),
        ]
    );

    let links = tools.list_symlinks(&root).unwrap();
    assert_eq!(links, vec![root.join("link-a"), root.join("link-sub")]);
}

#[test]
fn test_native_enumeration_missing_root() {
    let temp = TempDir::new().unwrap();
    let tools = NativeTools::new(temp.path().join("recovery"));
    assert!(matches!(
        tools.list_files(&temp.path().join("absent")),
        Err(RecoveryError::SourceMissing(_))
    ));
}

// ==================== COMMAND RUNNER TESTS ====================

#[test]
fn test_command_runner_captures_lines() {
    let runner = CommandRunner::new();
    let output = runner.run("printf", ["one\\ntwo\\n\\nthree"]).unwrap();
    assert_eq!(output.lines(), vec!["one", "two", "three"]);
}

#[test]
fn test_command_runner_missing_program() {
    let runner = CommandRunner::new();
    let result = runner.run("definitely-not-a-real-program-xyz", Vec::<&str>::new());
    match result {
        Err(RecoveryError::CommandFailed { program, status, .. }) => {
            assert_eq!(program, "definitely-not-a-real-program-xyz");
            assert_eq!(status, "spawn failed");
        }
        other => panic!("expected CommandFailed, got {:?}", other),
    }
}

#[test]
fn test_command_runner_non_zero_exit() {
    let runner = CommandRunner::new();
    let result = runner.run("false", Vec::<&str>::new());
    assert!(matches!(result, Err(RecoveryError::CommandFailed { .. })));
}

#[test]
fn test_command_output_path_lines() {
    let output = CommandOutput {
        stdout: b"/mnt/recovery/a\n/mnt/recovery/dir with space/b\r\n\n".to_vec(),
        stderr: Vec::new(),
    };
    assert_eq!(
        output.path_lines(),
        vec![
            std::path::PathBuf::from("/mnt/recovery/a"),
            std::path::PathBuf::from("/mnt/recovery/dir with space/b"),
        ]
    );
}

// ==================== EXTERNAL BACKEND TESTS ====================

#[test]
fn test_external_hash_agrees_with_native_for_regular_files() {
    if !coreutils_available() {
        return;
    }

    let temp = TempDir::new().unwrap();
    let path = temp.path().join("file with  two spaces.txt");
    fs::write(&path, b"abc").unwrap();

    let external = ExternalTools::new(CommandRunner::new(), "sha1sum", "find");
    let native = NativeTools::new(temp.path().join("recovery"));

    assert_eq!(external.hash(&path).unwrap().as_str(), SHA1_ABC);
    assert_eq!(external.hash(&path).unwrap(), native.hash(&path).unwrap());
}

#[test]
fn test_external_enumeration() {
    if !coreutils_available() {
        return;
    }

    let temp = TempDir::new().unwrap();
    let root = temp.path().join("tree");
    fs::create_dir_all(root.join("sub")).unwrap();
    fs::write(root.join("a.txt"), "a").unwrap();
    fs::write(root.join("sub/b.txt"), "b").unwrap();
    symlink("a.txt", root.join("link")).unwrap();

    let external = ExternalTools::new(CommandRunner::new(), "sha1sum", "find");

    let mut files = external.list_files(&root).unwrap();
    files.sort();
    assert_eq!(files, vec![root.join("a.txt"), root.join("sub/b.txt")]);

    assert_eq!(external.list_symlinks(&root).unwrap(), vec![root.join("link")]);
}

#[test]
fn test_external_hash_missing_file_fails() {
    if !coreutils_available() {
        return;
    }

    let temp = TempDir::new().unwrap();
    let external = ExternalTools::new(CommandRunner::new(), "sha1sum", "find");
    assert!(matches!(
        external.hash(&temp.path().join("absent")),
        Err(RecoveryError::CommandFailed { .. })
    ));
}

#[test]
fn test_from_config_selects_backend() {
    let mut config = crate::RecoveryConfig::default();
    config.hash_backend = crate::HashBackend::External;
    let _external = from_config(&config);

    config.hash_backend = crate::HashBackend::Native;
    let _native = from_config(&config);
}
