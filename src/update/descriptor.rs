/// Descriptor line format
///
/// `<operation>,<filename>,<destination directory>`. Only the first two
/// commas split; anything after the second belongs to the destination.
/// Fields are trimmed.
use std::fmt;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOperation {
    Add,
    /// Any operation this engine does not act on
    Other(String),
}

impl UpdateOperation {
    fn parse(text: &str) -> Self {
        match text {
            "ADD" => UpdateOperation::Add,
            other => UpdateOperation::Other(other.to_string()),
        }
    }
}

impl fmt::Display for UpdateOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateOperation::Add => f.write_str("ADD"),
            UpdateOperation::Other(op) => f.write_str(op),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRecord {
    pub operation: UpdateOperation,
    pub filename: PathBuf,
    pub destination: PathBuf,
}

impl UpdateRecord {
    /// Live location of the added file
    pub fn live_path(&self) -> PathBuf {
        self.destination.join(&self.filename)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorLine {
    Parsed(UpdateRecord),
    Blank,
    Malformed(String),
}

pub fn parse_descriptor_line(line: &str) -> DescriptorLine {
    if line.trim().is_empty() {
        return DescriptorLine::Blank;
    }

    let mut fields = line.splitn(3, ',').map(str::trim);
    let (Some(operation), Some(filename), Some(destination)) =
        (fields.next(), fields.next(), fields.next())
    else {
        return DescriptorLine::Malformed(format!(
            "expected 3 comma-separated fields in {:?}",
            line.trim()
        ));
    };

    if operation.is_empty() {
        return DescriptorLine::Malformed("empty operation".to_string());
    }
    if filename.is_empty() {
        return DescriptorLine::Malformed("empty filename".to_string());
    }
    if destination.is_empty() {
        return DescriptorLine::Malformed("empty destination".to_string());
    }

    let filename = Path::new(filename);
    let escapes = filename
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return DescriptorLine::Malformed(format!(
            "filename must be relative and stay inside the destination: {}",
            filename.display()
        ));
    }

    let destination = Path::new(destination);
    if !destination.is_absolute() {
        return DescriptorLine::Malformed(format!(
            "destination is not absolute: {}",
            destination.display()
        ));
    }

    DescriptorLine::Parsed(UpdateRecord {
        operation: UpdateOperation::parse(operation),
        filename: filename.to_path_buf(),
        destination: destination.to_path_buf(),
    })
}
