//! Update descriptor import.
//!
//! After a successful software update the updater leaves a descriptor in the
//! mirror root listing the files it added. Each `ADD` record is pulled from
//! the live tree into the mirror so the next manifest covers it.

pub mod descriptor;
pub mod importer;

pub use descriptor::{parse_descriptor_line, DescriptorLine, UpdateOperation, UpdateRecord};
pub use importer::{ImportReport, UpdateImporter};
