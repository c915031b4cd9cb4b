use crate::bag::checksum::DigestMap;
use crate::bag::manifest::PAYLOAD_ROOT;
use bon::Builder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Lifecycle state persisted in `deposit.properties`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum State {
    Pending,
    Accepted,
    Rejected,
    Failed,
}

impl State {
    pub fn label(&self) -> &'static str {
        match self {
            State::Pending => "PENDING",
            State::Accepted => "ACCEPTED",
            State::Rejected => "REJECTED",
            State::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, State::Pending)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for State {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(State::Pending),
            "ACCEPTED" => Ok(State::Accepted),
            "REJECTED" => Ok(State::Rejected),
            "FAILED" => Ok(State::Failed),
            other => Err(format!("unknown deposit state '{}'", other)),
        }
    }
}

/// Where the bytes of a payload or metadata file come from.
///
/// Every call to [`FileSource::open`] yields a fresh reader positioned at the
/// start, so a file can be streamed more than once.
#[derive(Debug, Clone)]
pub enum FileSource {
    Path(PathBuf),
    Bytes(Arc<[u8]>),
}

impl FileSource {
    pub fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        match self {
            FileSource::Path(path) => Ok(Box::new(File::open(path)?)),
            FileSource::Bytes(bytes) => Ok(Box::new(Cursor::new(Arc::clone(bytes)))),
        }
    }
}

impl From<&[u8]> for FileSource {
    fn from(bytes: &[u8]) -> Self {
        FileSource::Bytes(Arc::from(bytes))
    }
}

impl From<&str> for FileSource {
    fn from(text: &str) -> Self {
        FileSource::from(text.as_bytes())
    }
}

impl From<PathBuf> for FileSource {
    fn from(path: PathBuf) -> Self {
        FileSource::Path(path)
    }
}

/// One payload entry of a deposit
#[derive(Debug, Clone, Builder)]
pub struct PayloadFile {
    /// `urn:uuid:` identifier used in the resource map and pid mapping
    #[builder(into)]
    pub id: String,
    /// Normalized path relative to the payload root
    #[builder(into)]
    pub path: String,
    /// Path as listed in the deposit, before normalization
    #[builder(into)]
    pub original_path: String,
    #[builder(into)]
    pub source: FileSource,
    /// Digests supplied by the deposit, trusted as-is
    #[builder(default)]
    pub digests: DigestMap,
    #[builder(default)]
    pub restricted: bool,
    #[builder(default, into)]
    pub description: String,
}

impl PayloadFile {
    /// Entry path inside the bag
    pub fn bag_path(&self) -> String {
        format!("{}{}", PAYLOAD_ROOT, self.path)
    }

    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Parent directory of the file, empty for files at the payload root
    pub fn directory_label(&self) -> &str {
        match self.path.rfind('/') {
            Some(idx) => &self.path[..idx],
            None => "",
        }
    }
}

/// A metadata document exposed by the deposit, at its path relative to the bag root
#[derive(Debug, Clone)]
pub struct MetadataFile {
    pub path: String,
    pub source: FileSource,
}

impl MetadataFile {
    pub fn new(path: impl Into<String>, source: impl Into<FileSource>) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Author {
    pub name: String,
    pub affiliation: Option<String>,
}

/// A deposit loaded from the inbox.
///
/// Identity fields are fixed at load time; `nbn`, `object_version`, `state`
/// and `state_description` are filled in while the deposit is converted.
#[derive(Debug, Clone, Builder)]
pub struct Deposit {
    #[builder(into)]
    pub id: String,
    /// Deposit directory in the inbox
    #[builder(into)]
    pub path: PathBuf,
    /// The single bag directory inside `path`
    #[builder(into)]
    pub bag_dir: PathBuf,
    #[builder(into)]
    pub title: String,
    #[builder(default)]
    pub descriptions: Vec<String>,
    #[builder(default)]
    pub authors: Vec<Author>,
    #[builder(into)]
    pub depositor_id: String,
    /// Organisation the depositor delivers data for, as known to the catalog
    #[builder(into)]
    pub data_supplier: Option<String>,
    #[builder(into)]
    pub doi: Option<String>,
    #[builder(into)]
    pub nbn: Option<String>,
    #[builder(into)]
    pub bag_id: Option<String>,
    /// Token identifying this deposit to the catalog
    #[builder(into)]
    pub sword_token: Option<String>,
    #[builder(default)]
    pub is_update: bool,
    /// Catalog reference token of the predecessor, set for updates
    #[builder(into)]
    pub is_version_of: Option<String>,
    #[builder(default)]
    pub payload_files: Vec<PayloadFile>,
    #[builder(default)]
    pub metadata_files: Vec<MetadataFile>,
    #[builder(default = State::Pending)]
    pub state: State,
    #[builder(default, into)]
    pub state_description: String,
    pub object_version: Option<u64>,
}

impl Deposit {
    /// Identifier the bag is published under
    pub fn bag_id(&self) -> String {
        self.bag_id
            .clone()
            .unwrap_or_else(|| format!("urn:uuid:{}", self.id))
    }

    /// Token used to reference this deposit in the catalog
    pub fn reference_token(&self) -> String {
        self.sword_token
            .clone()
            .unwrap_or_else(|| format!("sword:{}", self.id))
    }

    /// Supplier the catalog knows this deposit by, falling back to the depositor
    pub fn supplier(&self) -> &str {
        self.data_supplier.as_deref().unwrap_or(&self.depositor_id)
    }

    pub fn set_state(&mut self, state: State, description: impl Into<String>) {
        self.state = state;
        self.state_description = description.into();
    }

    /// File name of the archive for the given catalog version, or `None` if
    /// the bag id does not yield a plain file name
    pub fn archive_file_name(&self, version: u64) -> Option<String> {
        archive_stem(&self.bag_id()).map(|stem| format!("{}-v{}.zip", stem, version))
    }

    pub fn metadata_file(&self, path: &str) -> Option<&MetadataFile> {
        self.metadata_files.iter().find(|m| m.path == path)
    }
}

/// The bag id with everything up to its last `:` removed, lowercased.
/// Anything that could leave the archive directory is refused.
pub fn archive_stem(bag_id: &str) -> Option<String> {
    let stem = bag_id.rsplit(':').next().unwrap_or(bag_id);
    if stem.is_empty() || stem == "." || stem == ".." || stem.contains(['/', '\\', '\0']) {
        return None;
    }
    Some(stem.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deposit() -> Deposit {
        Deposit::builder()
            .id("A1B2C3")
            .path("/inbox/A1B2C3")
            .bag_dir("/inbox/A1B2C3/bag")
            .title("Title")
            .depositor_id("user001")
            .build()
    }

    #[test]
    fn test_state_labels_round_trip() {
        for state in [State::Pending, State::Accepted, State::Rejected, State::Failed] {
            assert_eq!(state.label().parse::<State>().unwrap(), state);
        }
        assert!("DONE".parse::<State>().is_err());
        assert!(!State::Pending.is_terminal());
        assert!(State::Failed.is_terminal());
    }

    #[test]
    fn test_archive_file_name() {
        let mut deposit = deposit();
        assert_eq!(deposit.bag_id(), "urn:uuid:A1B2C3");
        assert_eq!(deposit.archive_file_name(1).as_deref(), Some("a1b2c3-v1.zip"));

        deposit.bag_id = Some("urn:uuid:0B9BB5EE-3187-4387-BB39-2C09536C79F7".into());
        assert_eq!(
            deposit.archive_file_name(3).as_deref(),
            Some("0b9bb5ee-3187-4387-bb39-2c09536c79f7-v3.zip")
        );
    }

    #[test]
    fn test_archive_stem_refuses_paths() {
        assert_eq!(archive_stem("urn:uuid:ABC").as_deref(), Some("abc"));
        assert_eq!(archive_stem("plain").as_deref(), Some("plain"));

        for bag_id in [
            "urn:uuid:../../escaped",
            "urn:uuid:",
            "urn:uuid:..",
            "urn:uuid:.",
            "a/b",
            "urn:uuid:dir\\file",
            "",
        ] {
            assert_eq!(archive_stem(bag_id), None, "{}", bag_id);
        }

        let mut deposit = deposit();
        deposit.bag_id = Some("urn:uuid:../x".into());
        assert_eq!(deposit.archive_file_name(1), None);
    }

    #[test]
    fn test_payload_file_path_parts() {
        let file = PayloadFile::builder()
            .id("urn:uuid:1")
            .path("a/b/c.txt")
            .original_path("a/b/c.txt")
            .source("x")
            .build();

        assert_eq!(file.bag_path(), "data/a/b/c.txt");
        assert_eq!(file.file_name(), "c.txt");
        assert_eq!(file.directory_label(), "a/b");

        let root = PayloadFile::builder()
            .id("urn:uuid:2")
            .path("top.txt")
            .original_path("top.txt")
            .source("x")
            .build();
        assert_eq!(root.directory_label(), "");
    }

    #[test]
    fn test_file_source_reopens() {
        let source = FileSource::from("content");
        for _ in 0..2 {
            let mut text = String::new();
            source.open().unwrap().read_to_string(&mut text).unwrap();
            assert_eq!(text, "content");
        }
    }
}
