use super::model::{Author, Deposit, FileSource, MetadataFile, PayloadFile, State, archive_stem};
use super::paths::{escapes_root, normalize_path};
use super::properties::{
    BAG_STORE_BAG_ID, DEPOSITOR_USER_ID, IDENTIFIER_DOI, IDENTIFIER_URN, Properties,
    STATE_DESCRIPTION, STATE_LABEL, SWORD_TOKEN,
};
use super::{DepositError, PROPERTIES_FILE, Result, find_bag_dir, io_error};
use crate::bag::checksum::{DigestAlgorithm, DigestMap};
use crate::bag::manifest::{MANIFEST_PREFIX, PAYLOAD_ROOT};
use roxmltree::{Document, Node};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

pub const BAGIT_FILE: &str = "bagit.txt";
pub const BAG_INFO_FILE: &str = "bag-info.txt";
pub const METADATA_DIR: &str = "metadata";
pub const DATASET_XML: &str = "metadata/dataset.xml";
pub const FILES_XML: &str = "metadata/files.xml";

const IS_VERSION_OF: &str = "Is-Version-Of";
const OPEN_ACCESS: &str = "OPEN_ACCESS";
const ANONYMOUS: &str = "ANONYMOUS";

/// Strategy for turning a deposit directory into a [`Deposit`]
pub trait DepositLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Deposit>;
}

/// Loads deposits in the common deposit format (DDM `dataset.xml` plus
/// `files.xml` inside a BagIt bag)
#[derive(Debug, Clone, Default)]
pub struct CommonDepositLoader {
    detect_updates: bool,
    data_suppliers: HashMap<String, String>,
}

impl CommonDepositLoader {
    pub fn new(detect_updates: bool, data_suppliers: HashMap<String, String>) -> Self {
        Self {
            detect_updates,
            data_suppliers,
        }
    }
}

impl DepositLoader for CommonDepositLoader {
    fn load(&self, path: &Path) -> Result<Deposit> {
        let id = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| DepositError::MissingFile(path.to_path_buf()))?;

        let properties = read_properties(path)?;
        let bag_dir = find_bag_dir(path)?;

        let bag_info = parse_bag_info(&read_text(&bag_dir.join(BAG_INFO_FILE))?);
        let dataset = DatasetMetadata::parse(&bag_dir.join(DATASET_XML))?;
        let file_entries = parse_files_xml(&bag_dir.join(FILES_XML))?;
        let manifests = read_manifests(&bag_dir)?;

        let payload_files = build_payload_files(&bag_dir, file_entries, &manifests, &dataset)?;
        let metadata_files = collect_metadata_files(&bag_dir)?;

        let depositor_id = properties
            .get_non_empty(DEPOSITOR_USER_ID)
            .ok_or(DepositError::MissingProperty(DEPOSITOR_USER_ID))?
            .to_string();

        let state = match properties.get_non_empty(STATE_LABEL) {
            Some(label) => label.parse::<State>().map_err(DepositError::InvalidState)?,
            None => State::Pending,
        };

        let bag_id = properties.get_non_empty(BAG_STORE_BAG_ID).map(String::from);
        if let Some(invalid) = bag_id.as_ref().filter(|id| archive_stem(id).is_none()) {
            return Err(DepositError::InvalidBagId(invalid.clone()));
        }

        let is_version_of = if self.detect_updates {
            bag_info
                .iter()
                .find(|(key, value)| key.eq_ignore_ascii_case(IS_VERSION_OF) && !value.trim().is_empty())
                .map(|(_, value)| value.trim().to_string())
        } else {
            None
        };

        let deposit = Deposit::builder()
            .id(id)
            .path(path)
            .bag_dir(bag_dir)
            .title(dataset.title)
            .descriptions(dataset.descriptions)
            .authors(dataset.authors)
            .maybe_data_supplier(self.data_suppliers.get(&depositor_id).cloned())
            .depositor_id(depositor_id)
            .maybe_doi(properties.get_non_empty(IDENTIFIER_DOI).map(String::from))
            .maybe_nbn(properties.get_non_empty(IDENTIFIER_URN).map(String::from))
            .maybe_bag_id(bag_id)
            .maybe_sword_token(properties.get_non_empty(SWORD_TOKEN).map(String::from))
            .is_update(is_version_of.is_some())
            .maybe_is_version_of(is_version_of)
            .payload_files(payload_files)
            .metadata_files(metadata_files)
            .state(state)
            .state_description(properties.get(STATE_DESCRIPTION).unwrap_or_default())
            .build();

        debug!(
            deposit_id = %deposit.id,
            payload_files = deposit.payload_files.len(),
            metadata_files = deposit.metadata_files.len(),
            is_update = deposit.is_update,
            "Deposit loaded"
        );

        Ok(deposit)
    }
}

pub(crate) fn read_properties(deposit_dir: &Path) -> Result<Properties> {
    let path = deposit_dir.join(PROPERTIES_FILE);
    if !path.is_file() {
        return Err(DepositError::MissingFile(path));
    }
    Ok(Properties::parse(&read_text(&path)?))
}

fn read_text(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(DepositError::MissingFile(path.to_path_buf()));
    }
    fs::read_to_string(path).map_err(io_error(path))
}

/// `Key: value` lines; lines starting with whitespace continue the previous value
pub fn parse_bag_info(text: &str) -> Vec<(String, String)> {
    let mut entries: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }

        if line.starts_with([' ', '\t']) {
            if let Some((_, value)) = entries.last_mut() {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }

        match line.split_once(':') {
            Some((key, value)) => entries.push((key.trim().to_string(), value.trim().to_string())),
            None => warn!(line, "Ignoring malformed bag-info line"),
        }
    }

    entries
}

#[derive(Debug, Default)]
struct DatasetMetadata {
    title: String,
    descriptions: Vec<String>,
    authors: Vec<Author>,
    access_rights: Option<String>,
}

impl DatasetMetadata {
    fn parse(path: &Path) -> Result<Self> {
        let text = read_text(path)?;
        let doc = Document::parse(&text).map_err(|e| DepositError::Xml {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let title = elements(&doc, "title")
            .map(|n| element_text(&n))
            .find(|t| !t.is_empty())
            .ok_or(DepositError::MissingTitle)?;

        let descriptions = elements(&doc, "description")
            .map(|n| element_text(&n))
            .filter(|t| !t.is_empty())
            .collect();

        let mut authors = Vec::new();
        for node in doc.descendants().filter(|n| n.is_element()) {
            match node.tag_name().name() {
                "creator" => {
                    let name = element_text(&node);
                    if !name.is_empty() {
                        authors.push(Author {
                            name,
                            affiliation: None,
                        });
                    }
                }
                "creatorDetails" => authors.extend(creator_details(&node)),
                _ => {}
            }
        }

        let access_rights = elements(&doc, "accessRights")
            .map(|n| element_text(&n))
            .find(|t| !t.is_empty());

        Ok(Self {
            title,
            descriptions,
            authors,
            access_rights,
        })
    }
}

fn elements<'a, 'input>(
    doc: &'a Document<'input>,
    local_name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    doc.descendants()
        .filter(move |n| n.is_element() && n.tag_name().name() == local_name)
}

fn child<'a, 'input>(node: &Node<'a, 'input>, local_name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == local_name)
}

/// All text below `node`, with whitespace runs collapsed
fn element_text(node: &Node) -> String {
    let raw: String = node
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn creator_details(node: &Node) -> Option<Author> {
    if let Some(author) = child(node, "author") {
        let name = ["titles", "initials", "insertions", "surname"]
            .iter()
            .filter_map(|part| child(&author, part))
            .map(|n| element_text(&n))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let affiliation = child(&author, "organization")
            .and_then(|org| child(&org, "name"))
            .map(|n| element_text(&n))
            .filter(|t| !t.is_empty());

        return (!name.is_empty()).then_some(Author { name, affiliation });
    }

    child(node, "organization")
        .and_then(|org| child(&org, "name"))
        .map(|n| element_text(&n))
        .filter(|t| !t.is_empty())
        .map(|name| Author {
            name,
            affiliation: None,
        })
}

struct FileEntry {
    filepath: String,
    accessible_to: Option<String>,
}

fn parse_files_xml(path: &Path) -> Result<Vec<FileEntry>> {
    let text = read_text(path)?;
    let doc = Document::parse(&text).map_err(|e| DepositError::Xml {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut entries = Vec::new();
    for node in elements(&doc, "file") {
        let filepath = node.attribute("filepath").ok_or_else(|| DepositError::Xml {
            path: path.to_path_buf(),
            message: "file element without filepath attribute".to_string(),
        })?;

        entries.push(FileEntry {
            filepath: filepath.to_string(),
            accessible_to: child(&node, "accessibleToRights").map(|n| element_text(&n)),
        });
    }

    Ok(entries)
}

/// Digests from every `manifest-<alg>.txt` in the bag, keyed by bag path
fn read_manifests(bag_dir: &Path) -> Result<BTreeMap<DigestAlgorithm, HashMap<String, String>>> {
    let mut manifests = BTreeMap::new();

    for entry in fs::read_dir(bag_dir).map_err(io_error(bag_dir))? {
        let entry = entry.map_err(io_error(bag_dir))?;
        let file_name = entry.file_name().to_string_lossy().into_owned();

        let Some(name) = file_name
            .strip_prefix(MANIFEST_PREFIX)
            .and_then(|rest| rest.strip_suffix(".txt"))
        else {
            continue;
        };

        let algorithm = match name.parse::<DigestAlgorithm>() {
            Ok(algorithm) => algorithm,
            Err(e) => {
                debug!(file = %file_name, error = %e, "Skipping manifest");
                continue;
            }
        };

        let text = read_text(&entry.path())?;
        let mut digests = HashMap::new();
        for (digest, path) in text
            .lines()
            .filter_map(|line| line.trim().split_once(char::is_whitespace))
        {
            let path = path.trim().to_string();
            if digest.len() != algorithm.hex_len() || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(DepositError::InvalidDigest {
                    algorithm,
                    path,
                    digest: digest.to_string(),
                });
            }
            digests.insert(path, digest.to_ascii_lowercase());
        }

        manifests.insert(algorithm, digests);
    }

    Ok(manifests)
}

fn build_payload_files(
    bag_dir: &Path,
    entries: Vec<FileEntry>,
    manifests: &BTreeMap<DigestAlgorithm, HashMap<String, String>>,
    dataset: &DatasetMetadata,
) -> Result<Vec<PayloadFile>> {
    let dataset_restricted = !matches!(dataset.access_rights.as_deref(), None | Some(OPEN_ACCESS));

    let mut seen = HashSet::new();
    let mut files = Vec::with_capacity(entries.len());

    for entry in entries {
        let relative = entry
            .filepath
            .strip_prefix(PAYLOAD_ROOT)
            .filter(|rest| !rest.is_empty() && !escapes_root(rest))
            .ok_or_else(|| DepositError::InvalidPayloadPath(entry.filepath.clone()))?;

        let normalized = normalize_path(relative);
        if !seen.insert(normalized.clone()) {
            return Err(DepositError::DuplicatePayloadPath(normalized));
        }

        let source = bag_dir.join(&entry.filepath);
        if !source.is_file() {
            return Err(DepositError::MissingFile(source));
        }

        let digests: DigestMap = manifests
            .iter()
            .filter_map(|(algorithm, digests)| {
                digests
                    .get(&entry.filepath)
                    .map(|digest| (*algorithm, digest.clone()))
            })
            .collect();

        let description = if normalized == relative {
            String::new()
        } else {
            format!("original_filepath: {}", relative)
        };

        let restricted = match entry.accessible_to.as_deref() {
            Some(rights) => rights != ANONYMOUS,
            None => dataset_restricted,
        };

        files.push(
            PayloadFile::builder()
                .id(format!("urn:uuid:{}", Uuid::new_v4()))
                .original_path(relative)
                .path(normalized)
                .source(source)
                .digests(digests)
                .restricted(restricted)
                .description(description)
                .build(),
        );
    }

    Ok(files)
}

fn collect_metadata_files(bag_dir: &Path) -> Result<Vec<MetadataFile>> {
    let mut files = Vec::new();

    for name in [BAGIT_FILE, BAG_INFO_FILE] {
        let path = bag_dir.join(name);
        if !path.is_file() {
            return Err(DepositError::MissingFile(path));
        }
        files.push(MetadataFile::new(name, path));
    }

    let mut nested = Vec::new();
    walk_files(&bag_dir.join(METADATA_DIR), METADATA_DIR, &mut nested)?;
    nested.sort();

    files.extend(
        nested
            .into_iter()
            .map(|(relative, path)| MetadataFile::new(relative, FileSource::Path(path))),
    );

    Ok(files)
}

fn walk_files(dir: &Path, prefix: &str, out: &mut Vec<(String, PathBuf)>) -> Result<()> {
    for entry in fs::read_dir(dir).map_err(io_error(dir))? {
        let entry = entry.map_err(io_error(dir))?;
        let path = entry.path();
        let relative = format!("{}/{}", prefix, entry.file_name().to_string_lossy());

        if path.is_dir() {
            walk_files(&path, &relative, out)?;
        } else {
            out.push((relative, path));
        }
    }
    Ok(())
}
