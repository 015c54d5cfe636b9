/// Tree and manifest assertions
use mirror_heal::manifest::{parse_manifest_line, ParseOutcome};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Every file and symlink under `live` exists under `mirror` with the same
/// content or link target.
#[allow(dead_code)]
pub fn assert_mirror_covers(live: &Path, mirror: &Path) {
    for entry in WalkDir::new(live).follow_links(false) {
        let entry = entry.unwrap();
        let rel = entry.path().strip_prefix(live).unwrap();
        let counterpart = mirror.join(rel);
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            assert_eq!(
                fs::read_link(entry.path()).unwrap(),
                fs::read_link(&counterpart).unwrap(),
                "link target differs for {}",
                rel.display()
            );
        } else if file_type.is_file() {
            assert_eq!(
                fs::read(entry.path()).unwrap(),
                fs::read(&counterpart).unwrap(),
                "content differs for {}",
                rel.display()
            );
        }
    }
}

/// Every manifest line parses and names an existing mirror entry, and no
/// path appears twice. Returns the number of records.
#[allow(dead_code)]
pub fn assert_manifest_consistent(manifest: &Path, mirror: &Path) -> usize {
    let raw = fs::read(manifest).unwrap();
    let mut seen = HashSet::new();

    for line in raw.split(|&b| b == b'\n').filter(|l| !l.is_empty()) {
        let record = match parse_manifest_line(line) {
            ParseOutcome::Parsed(record) => record,
            ParseOutcome::Malformed(reason) => panic!("malformed manifest line: {}", reason),
        };
        assert!(
            record.path.starts_with(mirror),
            "{} outside mirror",
            record.path.display()
        );
        assert!(
            fs::symlink_metadata(&record.path).is_ok(),
            "{} missing from mirror",
            record.path.display()
        );
        assert!(
            seen.insert(record.path.clone()),
            "duplicate {}",
            record.path.display()
        );
    }

    seen.len()
}
