//! SHA-256 content digests
//!
//! Digests are computed incrementally over readers or alongside writes, so an
//! artifact is never held in memory as a whole.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::{self, Read, Write};
use std::str::FromStr;

/// Length of a hex-encoded SHA-256 digest
pub const HASH_HEX_LEN: usize = 64;

const CHUNK_SIZE: usize = 8 * 1024;

/// A SHA-256 digest in lowercase hex
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ArtifactHash(String);

impl ArtifactHash {
    /// Digest of an in-memory byte slice
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ArtifactHash {
    type Err = String;

    /// Parse a 64 character hex string, normalizing to lowercase
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != HASH_HEX_LEN {
            return Err(format!(
                "hash must be {} hex characters, found {}",
                HASH_HEX_LEN,
                s.len()
            ));
        }
        if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err("hash contains non-hex characters".to_string());
        }
        Ok(Self(s.to_ascii_lowercase()))
    }
}

impl fmt::Display for ArtifactHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Consume `reader` to the end and return its digest
pub fn digest_reader<R: Read + ?Sized>(reader: &mut R) -> io::Result<ArtifactHash> {
    let mut hasher = Sha256::new();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(ArtifactHash(hex::encode(hasher.finalize())))
}

/// Exact comparison of a computed digest against the pinned one
pub fn matches(computed: &ArtifactHash, expected: &ArtifactHash) -> bool {
    computed.as_str() == expected.as_str()
}

/// Writer adapter that digests everything written through it
pub struct HashingWriter<W> {
    inner: W,
    hasher: Sha256,
    written: u64,
}

impl<W: Write> HashingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            written: 0,
        }
    }

    /// Number of bytes accepted by the inner writer
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Finish hashing, returning the inner writer and the digest
    pub fn finish(self) -> (W, ArtifactHash) {
        (self.inner, ArtifactHash(hex::encode(self.hasher.finalize())))
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        // Only hash what actually reached the inner writer
        self.hasher.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABC: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    #[test]
    fn digest_known_value() {
        let hash = digest_reader(&mut &b"abc"[..]).unwrap();
        assert_eq!(hash.as_str(), ABC);
        assert_eq!(ArtifactHash::of_bytes(b"abc").as_str(), ABC);
    }

    #[test]
    fn digest_spans_chunks() {
        let data = vec![7u8; CHUNK_SIZE * 3 + 17];
        let streamed = digest_reader(&mut data.as_slice()).unwrap();
        assert_eq!(streamed, ArtifactHash::of_bytes(&data));
    }

    #[test]
    fn parse_normalizes_case() {
        let upper: ArtifactHash = ABC.to_ascii_uppercase().parse().unwrap();
        assert_eq!(upper.as_str(), ABC);
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!("abc".parse::<ArtifactHash>().is_err());
        let non_hex = "g".repeat(HASH_HEX_LEN);
        assert!(non_hex.parse::<ArtifactHash>().is_err());
    }

    #[test]
    fn matches_is_exact() {
        let a: ArtifactHash = ABC.parse().unwrap();
        let b = ArtifactHash::of_bytes(b"abd");
        assert!(matches(&a, &ArtifactHash::of_bytes(b"abc")));
        assert!(!matches(&a, &b));
    }

    #[test]
    fn hashing_writer_tracks_written_bytes() {
        let mut writer = HashingWriter::new(Vec::new());
        writer.write_all(b"ab").unwrap();
        writer.write_all(b"c").unwrap();
        assert_eq!(writer.bytes_written(), 3);

        let (inner, hash) = writer.finish();
        assert_eq!(inner, b"abc");
        assert_eq!(hash.as_str(), ABC);
    }
}
