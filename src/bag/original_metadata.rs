//! `original-metadata.zip`: the deposit's metadata documents, bundled

use super::archive::{ArchiveError, ArchiveWriter, ZipArchiveWriter};
use crate::deposit::MetadataFile;
use std::io::Cursor;

pub const ORIGINAL_METADATA_PATH: &str = "original-metadata.zip";

pub fn bundle(files: &[MetadataFile]) -> Result<Vec<u8>, ArchiveError> {
    let mut writer = ZipArchiveWriter::new(Cursor::new(Vec::new()));
    for file in files {
        let mut content = file.source.open()?;
        writer.write_entry(&file.path, &mut content)?;
    }
    Ok(writer.finish()?.into_inner())
}
