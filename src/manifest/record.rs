/// Manifest line format
///
/// `<40 lowercase hex chars><two spaces><absolute mirror path>\n`. Paths are
/// raw bytes; anything after the first two-space separator belongs to the
/// path, so names containing double spaces round-trip.
use crate::tools::Digest;
use std::ffi::OsString;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::PathBuf;

pub const SEPARATOR: &[u8] = b"  ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRecord {
    pub digest: Digest,
    pub path: PathBuf,
}

impl ManifestRecord {
    pub fn new(digest: Digest, path: impl Into<PathBuf>) -> Self {
        Self {
            digest,
            path: path.into(),
        }
    }

    /// Serialized line, newline included
    pub fn to_line(&self) -> Vec<u8> {
        let path = self.path.as_os_str().as_bytes();
        let mut line = Vec::with_capacity(Digest::HEX_LEN + SEPARATOR.len() + path.len() + 1);
        line.extend_from_slice(self.digest.as_str().as_bytes());
        line.extend_from_slice(SEPARATOR);
        line.extend_from_slice(path);
        line.push(b'\n');
        line
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Parsed(ManifestRecord),
    Malformed(String),
}

/// Split a checksum line at the first separator into digest and path bytes.
pub fn split_line(line: &[u8]) -> Option<(&[u8], &[u8])> {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let line = line.strip_suffix(b"\r").unwrap_or(line);

    let split = line.windows(SEPARATOR.len()).position(|w| w == SEPARATOR)?;
    let (digest, rest) = line.split_at(split);
    Some((digest, &rest[SEPARATOR.len()..]))
}

/// Parse the digest half of a checksum line.
pub fn parse_digest(bytes: &[u8]) -> Result<Digest, String> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(Digest::parse)
        .ok_or_else(|| format!("invalid digest {:?}", String::from_utf8_lossy(bytes)))
}

/// Parse one manifest line. A trailing `\n` or `\r\n` is ignored.
pub fn parse_manifest_line(line: &[u8]) -> ParseOutcome {
    let Some((digest_bytes, path_bytes)) = split_line(line) else {
        return ParseOutcome::Malformed("missing two-space separator".to_string());
    };

    let digest = match parse_digest(digest_bytes) {
        Ok(digest) => digest,
        Err(reason) => return ParseOutcome::Malformed(reason),
    };

    if path_bytes.is_empty() {
        return ParseOutcome::Malformed("empty path".to_string());
    }

    if path_bytes[0] != b'/' {
        return ParseOutcome::Malformed(format!(
            "path is not absolute: {}",
            String::from_utf8_lossy(path_bytes)
        ));
    }

    ParseOutcome::Parsed(ManifestRecord {
        digest,
        path: PathBuf::from(OsString::from_vec(path_bytes.to_vec())),
    })
}
