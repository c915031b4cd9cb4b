//! Output containers for bag entries

use std::fs;
use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("archive already exists: {0}")]
    AlreadyExists(PathBuf),
}

pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Sink for named archive entries.
///
/// Entries are streamed: the writer reads `content` to the end and never
/// hands the bytes back, so callers that need digests wrap `content` first.
pub trait ArchiveWriter {
    /// Write one entry and return the number of bytes consumed from `content`
    fn write_entry(&mut self, path: &str, content: &mut dyn Read) -> Result<u64>;
}

/// Zip container over any seekable sink
pub struct ZipArchiveWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
}

impl<W: Write + Seek> ZipArchiveWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            zip: ZipWriter::new(inner),
        }
    }

    /// Write the central directory and return the underlying sink
    pub fn finish(self) -> Result<W> {
        Ok(self.zip.finish()?)
    }

    fn entry_options() -> SimpleFileOptions {
        SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644)
            .large_file(true)
    }
}

impl<W: Write + Seek> ArchiveWriter for ZipArchiveWriter<W> {
    fn write_entry(&mut self, path: &str, content: &mut dyn Read) -> Result<u64> {
        self.zip.start_file(path, Self::entry_options())?;
        let written = io::copy(content, &mut self.zip)?;
        tracing::trace!(path, bytes = written, "Wrote archive entry");
        Ok(written)
    }
}

/// Zip archive that only appears at its target path once committed.
///
/// Entries go to a hidden temporary file next to the target; `commit` moves it
/// into place without ever replacing an existing file. Dropping an uncommitted
/// package removes the temporary file.
pub struct PackageFile {
    target: PathBuf,
    writer: ZipArchiveWriter<NamedTempFile>,
}

impl PackageFile {
    pub fn create(target: impl Into<PathBuf>) -> Result<Self> {
        let target = target.into();
        if target.exists() {
            return Err(ArchiveError::AlreadyExists(target));
        }

        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let temp = tempfile::Builder::new()
            .prefix(".")
            .suffix(".partial")
            .tempfile_in(&dir)?;

        tracing::debug!(target = %target.display(), temp = %temp.path().display(), "Opened package file");

        Ok(Self {
            target,
            writer: ZipArchiveWriter::new(temp),
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Finish the zip, flush it to disk and move it to the target path
    pub fn commit(self) -> Result<PathBuf> {
        let temp = self.writer.finish()?;
        temp.as_file().sync_all()?;

        temp.persist_noclobber(&self.target).map_err(|e| {
            if e.error.kind() == io::ErrorKind::AlreadyExists {
                ArchiveError::AlreadyExists(self.target.clone())
            } else {
                ArchiveError::Io(e.error)
            }
        })?;

        tracing::info!(path = %self.target.display(), "Package written");
        Ok(self.target)
    }
}

impl ArchiveWriter for PackageFile {
    fn write_entry(&mut self, path: &str, content: &mut dyn Read) -> Result<u64> {
        self.writer.write_entry(path, content)
    }
}

/// Keeps every entry in memory; handy for inspecting assembled bags
#[derive(Debug, Default)]
pub struct MemoryArchiveWriter {
    entries: Vec<(String, Vec<u8>)>,
}

impl MemoryArchiveWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[(String, Vec<u8>)] {
        &self.entries
    }

    pub fn paths(&self) -> Vec<&str> {
        self.entries.iter().map(|(p, _)| p.as_str()).collect()
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, data)| data.as_slice())
    }
}

impl ArchiveWriter for MemoryArchiveWriter {
    fn write_entry(&mut self, path: &str, content: &mut dyn Read) -> Result<u64> {
        let mut data = Vec::new();
        content.read_to_end(&mut data)?;
        let size = data.len() as u64;
        self.entries.push((path.to_string(), data));
        Ok(size)
    }
}
