//! RDA bag output
//!
//! Everything needed to turn a loaded deposit into a zipped, checksummed bag:
//! digesting readers, the manifest bookkeeping, archive containers, the
//! derived metadata documents and the assembler that writes them in order.

pub mod archive;
pub mod assembler;
pub mod checksum;
pub mod datacite;
pub mod manifest;
pub mod oai_ore;
pub mod original_metadata;
pub mod pid_mapping;

pub use archive::{ArchiveError, ArchiveWriter, MemoryArchiveWriter, PackageFile, ZipArchiveWriter};
pub use assembler::{AssemblyError, PackageAssembler};
pub use checksum::{ChecksumError, ChecksumReader, DigestAlgorithm, DigestMap};
pub use manifest::{ManifestAccumulator, ManifestEntry, ManifestError};

/// Escape text for use in XML content and attribute values. Control
/// characters XML 1.0 cannot carry are dropped.
pub(crate) fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if c.is_control() && c < '\u{80}' => {}
            '\u{FFFE}' | '\u{FFFF}' => {}
            _ => out.push(c),
        }
    }
    out
}
