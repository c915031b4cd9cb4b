use super::archive::{ArchiveError, ArchiveWriter};
use super::checksum::{ChecksumError, ChecksumReader, DigestAlgorithm};
use super::manifest::{ManifestAccumulator, ManifestError, manifest_name, tag_manifest_name};
use super::oai_ore::{OAI_ORE_JSONLD_PATH, OAI_ORE_RDF_PATH, ResourceMap};
use super::original_metadata::ORIGINAL_METADATA_PATH;
use super::{datacite, original_metadata, pid_mapping};
use crate::deposit::loader::{BAG_INFO_FILE, BAGIT_FILE};
use crate::deposit::Deposit;
use chrono::Datelike;
use std::io::{self, Cursor, Read};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("checksum error: {0}")]
    Checksum(#[from] ChecksumError),

    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("deposit has no {0}")]
    MissingMetadata(&'static str),

    #[error("deposit has no archival identifier (NBN)")]
    MissingIdentifier,

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AssemblyError>;

/// Writes a deposit as an RDA bag.
///
/// Entries are written in a fixed order: payload, derived metadata, the
/// deposit's own tag files and metadata, the original metadata bundle,
/// payload manifests and finally the tag manifests. Each entry except the
/// tag manifests is digested while it is written and recorded in the
/// returned [`ManifestAccumulator`].
#[derive(Debug, Clone)]
pub struct PackageAssembler {
    algorithms: Vec<DigestAlgorithm>,
    publisher: String,
}

impl PackageAssembler {
    pub fn new(algorithms: Vec<DigestAlgorithm>, publisher: impl Into<String>) -> Self {
        Self {
            algorithms,
            publisher: publisher.into(),
        }
    }

    pub fn algorithms(&self) -> &[DigestAlgorithm] {
        &self.algorithms
    }

    pub fn assemble(
        &self,
        deposit: &Deposit,
        writer: &mut dyn ArchiveWriter,
    ) -> Result<ManifestAccumulator> {
        let mut manifest = ManifestAccumulator::new(&self.algorithms);

        self.write_payload(deposit, writer, &mut manifest)?;
        debug!(deposit_id = %deposit.id, files = deposit.payload_files.len(), "Payload written");

        let year = chrono::Utc::now().year();
        let datacite_xml = datacite::render(deposit, &self.publisher, year);
        self.write_bytes(writer, &mut manifest, datacite::DATACITE_PATH, datacite_xml.into_bytes())?;

        let resource_map = ResourceMap::new(deposit).ok_or(AssemblyError::MissingIdentifier)?;
        self.write_bytes(writer, &mut manifest, OAI_ORE_RDF_PATH, resource_map.to_rdf_xml().into_bytes())?;
        self.write_bytes(writer, &mut manifest, OAI_ORE_JSONLD_PATH, resource_map.to_json_ld()?.into_bytes())?;

        let pids = pid_mapping::render(deposit);
        self.write_bytes(writer, &mut manifest, pid_mapping::PID_MAPPING_PATH, pids.into_bytes())?;
        debug!(deposit_id = %deposit.id, "Derived metadata written");

        for name in [BAG_INFO_FILE, BAGIT_FILE] {
            let file = deposit
                .metadata_file(name)
                .ok_or(AssemblyError::MissingMetadata(name))?;
            let content = file.source.open().map_err(read_error(name))?;
            self.write_stream(writer, &mut manifest, name, content)?;
        }

        for file in deposit
            .metadata_files
            .iter()
            .filter(|m| m.path != BAG_INFO_FILE && m.path != BAGIT_FILE)
        {
            let content = file.source.open().map_err(read_error(&file.path))?;
            self.write_stream(writer, &mut manifest, &file.path, content)?;
        }

        let bundle = original_metadata::bundle(&deposit.metadata_files)?;
        self.write_bytes(writer, &mut manifest, ORIGINAL_METADATA_PATH, bundle)?;
        debug!(deposit_id = %deposit.id, "Deposit metadata written");

        for algorithm in &self.algorithms {
            let text = manifest.payload_manifest(*algorithm)?;
            self.write_bytes(writer, &mut manifest, &manifest_name(*algorithm), text.into_bytes())?;
        }

        // Rendered before any is written; none of them is recorded
        let tag_manifests = self
            .algorithms
            .iter()
            .map(|algorithm| Ok((tag_manifest_name(*algorithm), manifest.tag_manifest(*algorithm)?)))
            .collect::<Result<Vec<_>>>()?;
        for (name, text) in tag_manifests {
            writer.write_entry(&name, &mut Cursor::new(text.into_bytes()))?;
        }

        info!(
            deposit_id = %deposit.id,
            entries = manifest.entries().len(),
            "Bag assembled"
        );

        Ok(manifest)
    }

    /// Step 1: payload files, only hashing for algorithms the deposit did not supply
    fn write_payload(
        &self,
        deposit: &Deposit,
        writer: &mut dyn ArchiveWriter,
        manifest: &mut ManifestAccumulator,
    ) -> Result<()> {
        for file in &deposit.payload_files {
            let path = file.bag_path();
            if manifest.contains(&path) {
                return Err(ManifestError::DuplicateEntry(path).into());
            }

            let missing: Vec<DigestAlgorithm> = self
                .algorithms
                .iter()
                .copied()
                .filter(|algorithm| !file.digests.contains_key(algorithm))
                .collect();

            let content = file.source.open().map_err(read_error(&path))?;
            let mut reader = ChecksumReader::new(content, &missing);
            writer.write_entry(&path, &mut reader)?;

            let mut digests = reader.into_digests()?;
            digests.extend(file.digests.iter().map(|(a, d)| (*a, d.clone())));

            manifest.record(path, digests)?;
        }
        Ok(())
    }

    fn write_bytes(
        &self,
        writer: &mut dyn ArchiveWriter,
        manifest: &mut ManifestAccumulator,
        path: &str,
        content: Vec<u8>,
    ) -> Result<()> {
        self.write_stream(writer, manifest, path, Cursor::new(content))
    }

    fn write_stream<R: Read>(
        &self,
        writer: &mut dyn ArchiveWriter,
        manifest: &mut ManifestAccumulator,
        path: &str,
        content: R,
    ) -> Result<()> {
        if manifest.contains(path) {
            return Err(ManifestError::DuplicateEntry(path.to_string()).into());
        }

        let mut reader = ChecksumReader::new(content, &self.algorithms);
        writer.write_entry(path, &mut reader)?;
        manifest.record(path, reader.into_digests()?)?;
        Ok(())
    }
}

fn read_error(path: &str) -> impl FnOnce(io::Error) -> AssemblyError + '_ {
    move |source| AssemblyError::Read {
        path: path.to_string(),
        source,
    }
}
