//! Digest bookkeeping for every entry written to a bag

use super::checksum::{DigestAlgorithm, DigestMap};
use thiserror::Error;

/// Root of the payload entries inside a bag
pub const PAYLOAD_ROOT: &str = "data/";
/// File name prefix of the payload manifests
pub const MANIFEST_PREFIX: &str = "manifest-";
/// File name prefix of the tag manifests
pub const TAG_MANIFEST_PREFIX: &str = "tagmanifest-";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("entry '{0}' was recorded twice")]
    DuplicateEntry(String),

    #[error("entry '{path}' has no {algorithm} digest")]
    MissingDigest {
        path: String,
        algorithm: DigestAlgorithm,
    },
}

/// One recorded archive entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub path: String,
    pub digests: DigestMap,
}

/// Insertion-ordered record of the digests of every written entry.
///
/// The accumulator is owned by a single assembly run and threaded through
/// its steps; manifests are rendered from what has been recorded so far.
#[derive(Debug, Clone)]
pub struct ManifestAccumulator {
    required: Vec<DigestAlgorithm>,
    entries: Vec<ManifestEntry>,
}

impl ManifestAccumulator {
    pub fn new(required: &[DigestAlgorithm]) -> Self {
        Self {
            required: required.to_vec(),
            entries: Vec::new(),
        }
    }

    pub fn required_algorithms(&self) -> &[DigestAlgorithm] {
        &self.required
    }

    pub fn record(&mut self, path: impl Into<String>, digests: DigestMap) -> Result<(), ManifestError> {
        let path = path.into();
        if self.contains(&path) {
            return Err(ManifestError::DuplicateEntry(path));
        }

        self.entries.push(ManifestEntry { path, digests });
        Ok(())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.iter().any(|e| e.path == path)
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn get(&self, path: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    /// Render `<digest>  <path>` lines for the selected entries, in write order.
    ///
    /// Every selected entry must carry a digest for every required algorithm.
    pub fn manifest_lines<F>(
        &self,
        algorithm: DigestAlgorithm,
        select: F,
    ) -> Result<Vec<String>, ManifestError>
    where
        F: Fn(&str) -> bool,
    {
        let mut lines = Vec::new();

        for entry in self.entries.iter().filter(|e| select(&e.path)) {
            self.check_complete(entry)?;

            let digest = entry
                .digests
                .get(&algorithm)
                .ok_or_else(|| ManifestError::MissingDigest {
                    path: entry.path.clone(),
                    algorithm,
                })?;

            lines.push(format!("{}  {}", digest, entry.path));
        }

        Ok(lines)
    }

    /// Lines of `manifest-<algorithm>.txt`: every entry under the payload root
    pub fn payload_manifest(&self, algorithm: DigestAlgorithm) -> Result<String, ManifestError> {
        self.manifest_lines(algorithm, is_payload_path).map(join_lines)
    }

    /// Lines of `tagmanifest-<algorithm>.txt`: every entry outside the payload
    /// root, excluding tag manifests themselves
    pub fn tag_manifest(&self, algorithm: DigestAlgorithm) -> Result<String, ManifestError> {
        self.manifest_lines(algorithm, is_tag_path).map(join_lines)
    }

    fn check_complete(&self, entry: &ManifestEntry) -> Result<(), ManifestError> {
        match self.required.iter().find(|a| !entry.digests.contains_key(*a)) {
            Some(algorithm) => Err(ManifestError::MissingDigest {
                path: entry.path.clone(),
                algorithm: *algorithm,
            }),
            None => Ok(()),
        }
    }
}

pub fn is_payload_path(path: &str) -> bool {
    path.starts_with(PAYLOAD_ROOT)
}

pub fn is_tag_path(path: &str) -> bool {
    !is_payload_path(path) && !path.starts_with(TAG_MANIFEST_PREFIX)
}

pub fn manifest_name(algorithm: DigestAlgorithm) -> String {
    format!("{}{}.txt", MANIFEST_PREFIX, algorithm.name())
}

pub fn tag_manifest_name(algorithm: DigestAlgorithm) -> String {
    format!("{}{}.txt", TAG_MANIFEST_PREFIX, algorithm.name())
}

fn join_lines(lines: Vec<String>) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(&line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [DigestAlgorithm; 2] = [DigestAlgorithm::Sha1, DigestAlgorithm::Md5];

    fn digests(sha1: &str, md5: &str) -> DigestMap {
        [
            (DigestAlgorithm::Sha1, sha1.to_string()),
            (DigestAlgorithm::Md5, md5.to_string()),
        ]
        .into()
    }

    #[test]
    fn test_payload_manifest_keeps_write_order() {
        let mut acc = ManifestAccumulator::new(&REQUIRED);
        acc.record("data/z.txt", digests("s1", "m1")).unwrap();
        acc.record("metadata/datacite.xml", digests("s2", "m2")).unwrap();
        acc.record("data/a.txt", digests("s3", "m3")).unwrap();

        let manifest = acc.payload_manifest(DigestAlgorithm::Sha1).unwrap();
        assert_eq!(manifest, "s1  data/z.txt\ns3  data/a.txt\n");
    }

    #[test]
    fn test_tag_manifest_excludes_payload_and_tag_manifests() {
        let mut acc = ManifestAccumulator::new(&REQUIRED);
        acc.record("data/file.txt", digests("s1", "m1")).unwrap();
        acc.record("bagit.txt", digests("s2", "m2")).unwrap();
        acc.record("manifest-sha1.txt", digests("s3", "m3")).unwrap();
        acc.record("tagmanifest-md5.txt", digests("s4", "m4")).unwrap();

        let manifest = acc.tag_manifest(DigestAlgorithm::Md5).unwrap();
        assert_eq!(manifest, "m2  bagit.txt\nm3  manifest-sha1.txt\n");
    }

    #[test]
    fn test_missing_required_digest_is_rejected() {
        let mut acc = ManifestAccumulator::new(&REQUIRED);
        acc.record(
            "metadata/pid-mapping.txt",
            [(DigestAlgorithm::Sha1, "s1".to_string())].into(),
        )
        .unwrap();

        // Even the algorithm that is present must not be reported alone
        let result = acc.tag_manifest(DigestAlgorithm::Sha1);
        assert!(matches!(
            result,
            Err(ManifestError::MissingDigest {
                algorithm: DigestAlgorithm::Md5,
                ..
            })
        ));
    }

    #[test]
    fn test_duplicate_entry() {
        let mut acc = ManifestAccumulator::new(&REQUIRED);
        acc.record("bagit.txt", digests("a", "b")).unwrap();

        let result = acc.record("bagit.txt", digests("c", "d"));
        assert!(matches!(result, Err(ManifestError::DuplicateEntry(_))));
        assert_eq!(acc.entries().len(), 1);
    }

    #[test]
    fn test_empty_manifests() {
        let acc = ManifestAccumulator::new(&REQUIRED);
        assert_eq!(acc.payload_manifest(DigestAlgorithm::Sha1).unwrap(), "");
        assert_eq!(acc.tag_manifest(DigestAlgorithm::Sha1).unwrap(), "");
    }

    #[test]
    fn test_manifest_names() {
        assert_eq!(manifest_name(DigestAlgorithm::Sha1), "manifest-sha1.txt");
        assert_eq!(tag_manifest_name(DigestAlgorithm::Md5), "tagmanifest-md5.txt");
    }
}
