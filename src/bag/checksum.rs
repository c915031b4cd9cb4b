//! Digest algorithms and a pass-through reader that hashes what it reads

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Read};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChecksumError {
    #[error("stream was not fully consumed, digests are unavailable")]
    NotDrained,

    #[error("unknown digest algorithm: {0}")]
    UnknownAlgorithm(String),
}

/// Digest algorithms a bag manifest can be written for, named as in BagIt
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

/// Algorithm → lowercase hex digest
pub type DigestMap = BTreeMap<DigestAlgorithm, String>;

impl DigestAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Md5 => "md5",
            DigestAlgorithm::Sha1 => "sha1",
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Sha512 => "sha512",
        }
    }

    /// Length of the hex encoded digest
    pub fn hex_len(&self) -> usize {
        match self {
            DigestAlgorithm::Md5 => 32,
            DigestAlgorithm::Sha1 => 40,
            DigestAlgorithm::Sha256 => 64,
            DigestAlgorithm::Sha512 => 128,
        }
    }

    fn hasher(&self) -> Hasher {
        match self {
            DigestAlgorithm::Md5 => Hasher::Md5(Md5::new()),
            DigestAlgorithm::Sha1 => Hasher::Sha1(Sha1::new()),
            DigestAlgorithm::Sha256 => Hasher::Sha256(Sha256::new()),
            DigestAlgorithm::Sha512 => Hasher::Sha512(Sha512::new()),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = ChecksumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md5" => Ok(DigestAlgorithm::Md5),
            "sha1" | "sha-1" => Ok(DigestAlgorithm::Sha1),
            "sha256" | "sha-256" => Ok(DigestAlgorithm::Sha256),
            "sha512" | "sha-512" => Ok(DigestAlgorithm::Sha512),
            other => Err(ChecksumError::UnknownAlgorithm(other.to_string())),
        }
    }
}

enum Hasher {
    Md5(Md5),
    Sha1(Sha1),
    Sha256(Sha256),
    Sha512(Sha512),
}

impl Hasher {
    fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Md5(h) => h.update(data),
            Hasher::Sha1(h) => h.update(data),
            Hasher::Sha256(h) => h.update(data),
            Hasher::Sha512(h) => h.update(data),
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Hasher::Md5(h) => hex::encode(h.finalize()),
            Hasher::Sha1(h) => hex::encode(h.finalize()),
            Hasher::Sha256(h) => hex::encode(h.finalize()),
            Hasher::Sha512(h) => hex::encode(h.finalize()),
        }
    }
}

/// Reader adapter feeding every configured algorithm while bytes pass through.
///
/// Digests can only be taken with [`ChecksumReader::into_digests`], which
/// consumes the reader (and drops the wrapped stream) and refuses to hand out
/// anything unless the wrapped stream reported end-of-file.
pub struct ChecksumReader<R> {
    inner: R,
    hashers: Vec<(DigestAlgorithm, Hasher)>,
    bytes_read: u64,
    drained: bool,
}

impl<R: Read> ChecksumReader<R> {
    pub fn new(inner: R, algorithms: &[DigestAlgorithm]) -> Self {
        let mut hashers: Vec<(DigestAlgorithm, Hasher)> = Vec::with_capacity(algorithms.len());
        for algorithm in algorithms {
            if !hashers.iter().any(|(a, _)| a == algorithm) {
                hashers.push((*algorithm, algorithm.hasher()));
            }
        }

        Self {
            inner,
            hashers,
            bytes_read: 0,
            drained: false,
        }
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Finish hashing and return the digest map
    pub fn into_digests(self) -> Result<DigestMap, ChecksumError> {
        if !self.drained {
            return Err(ChecksumError::NotDrained);
        }

        Ok(self
            .hashers
            .into_iter()
            .map(|(algorithm, hasher)| (algorithm, hasher.finalize_hex()))
            .collect())
    }
}

impl<R: Read> Read for ChecksumReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;

        if n == 0 {
            if !buf.is_empty() {
                self.drained = true;
            }
            return Ok(0);
        }

        for (_, hasher) in self.hashers.iter_mut() {
            hasher.update(&buf[..n]);
        }
        self.bytes_read += n as u64;

        Ok(n)
    }
}

/// Hash a complete in-memory buffer
pub fn digest_bytes(data: &[u8], algorithms: &[DigestAlgorithm]) -> DigestMap {
    let mut hashers: Vec<(DigestAlgorithm, Hasher)> =
        algorithms.iter().map(|a| (*a, a.hasher())).collect();

    for (_, hasher) in hashers.iter_mut() {
        hasher.update(data);
    }

    hashers
        .into_iter()
        .map(|(algorithm, hasher)| (algorithm, hasher.finalize_hex()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const ALL: [DigestAlgorithm; 4] = [
        DigestAlgorithm::Md5,
        DigestAlgorithm::Sha1,
        DigestAlgorithm::Sha256,
        DigestAlgorithm::Sha512,
    ];

    fn drain(data: &[u8], algorithms: &[DigestAlgorithm]) -> DigestMap {
        let mut reader = ChecksumReader::new(Cursor::new(data.to_vec()), algorithms);
        io::copy(&mut reader, &mut io::sink()).unwrap();
        reader.into_digests().unwrap()
    }

    #[test]
    fn test_known_digests() {
        let digests = drain(b"hello world", &ALL);

        assert_eq!(digests[&DigestAlgorithm::Md5], "5eb63bbbe01eeed093cb22bb8f5acdc3");
        assert_eq!(
            digests[&DigestAlgorithm::Sha1],
            "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed"
        );
        assert_eq!(
            digests[&DigestAlgorithm::Sha256],
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_digest_lengths_and_case() {
        let digests = drain(b"some payload bytes", &ALL);

        for algorithm in ALL {
            let hex = &digests[&algorithm];
            assert_eq!(hex.len(), algorithm.hex_len(), "{algorithm}");
            assert!(hex.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        }
    }

    #[test]
    fn test_deterministic() {
        let data = vec![7u8; 100_000];
        assert_eq!(drain(&data, &ALL), drain(&data, &ALL));
    }

    #[test]
    fn test_empty_stream_is_drained() {
        let digests = drain(b"", &[DigestAlgorithm::Md5]);
        assert_eq!(digests[&DigestAlgorithm::Md5], "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_partial_read_refuses_digests() {
        let mut reader =
            ChecksumReader::new(Cursor::new(b"0123456789".to_vec()), &[DigestAlgorithm::Sha1]);
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf).unwrap();

        assert_eq!(reader.bytes_read(), 4);
        assert!(matches!(reader.into_digests(), Err(ChecksumError::NotDrained)));
    }

    #[test]
    fn test_only_requested_algorithms() {
        let digests = drain(b"abc", &[DigestAlgorithm::Md5, DigestAlgorithm::Md5]);
        assert_eq!(digests.len(), 1);
        assert!(digests.contains_key(&DigestAlgorithm::Md5));
    }

    #[test]
    fn test_digest_bytes_matches_reader() {
        let data = b"matching content";
        assert_eq!(digest_bytes(data, &ALL), drain(data, &ALL));
    }

    #[test]
    fn test_parse_algorithm_names() {
        assert_eq!("SHA-1".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha1);
        assert_eq!("md5".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Md5);
        assert!("crc32".parse::<DigestAlgorithm>().is_err());
    }
}
