//! Content-addressed artifact store
//!
//! Artifacts live at `<root>/<sha256>.artifact`. New content is streamed into
//! a `.partial` temp file inside the root, digested on the way, and renamed
//! into place only when the digest matches.

use crate::digest::{self, ArtifactHash, HashingWriter};
use crate::error::{BootError, BootResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};
use url::Url;

/// Extension of committed artifacts
pub const ARTIFACT_EXT: &str = "artifact";

/// Suffix of in-flight downloads
pub const PARTIAL_SUFFIX: &str = ".partial";

const COPY_BUF_SIZE: usize = 64 * 1024;

/// A committed artifact found in the store
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntry {
    pub hash: ArtifactHash,
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// Hash-addressed artifact storage under a single root directory
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Create a store rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final location of the artifact with digest `hash`
    pub fn path_for(&self, hash: &ArtifactHash) -> PathBuf {
        self.root.join(format!("{}.{}", hash, ARTIFACT_EXT))
    }

    /// Whether something sits at the artifact's final location
    pub fn exists(&self, hash: &ArtifactHash) -> bool {
        self.path_for(hash).is_file()
    }

    /// Re-digest a present artifact and return its path if it still matches
    ///
    /// A mismatch is an `Integrity` error; the file is left untouched so it
    /// can be inspected.
    pub fn verify(&self, hash: &ArtifactHash) -> BootResult<PathBuf> {
        let path = self.path_for(hash);
        let mut file = File::open(&path)
            .map_err(|e| BootError::io(format!("opening cached artifact {}", path.display()), e))?;
        let actual = digest::digest_reader(&mut file)
            .map_err(|e| BootError::io(format!("reading cached artifact {}", path.display()), e))?;

        if !digest::matches(&actual, hash) {
            return Err(BootError::Integrity {
                expected: hash.to_string(),
                actual: actual.to_string(),
                location: path.display().to_string(),
            });
        }
        debug!("Verified cached artifact {}", path.display());
        Ok(path)
    }

    /// Stream `source` into the store under `hash`
    ///
    /// The root is created before the temp file is opened inside it, which
    /// keeps the final rename on one filesystem. On a digest mismatch the temp
    /// file is removed and nothing appears at the final path. Losing a rename
    /// race against another process committing the same hash is a success.
    pub fn commit(
        &self,
        hash: &ArtifactHash,
        source: &mut dyn Read,
        origin: &Url,
    ) -> BootResult<PathBuf> {
        self.ensure_root()?;

        let temp = tempfile::Builder::new()
            .prefix(".pinboot-")
            .suffix(PARTIAL_SUFFIX)
            .tempfile_in(&self.root)
            .map_err(|e| BootError::io(format!("creating temp file in {}", self.root.display()), e))?;
        debug!("Streaming {} into {}", origin, temp.path().display());

        let mut writer = HashingWriter::new(BufWriter::new(temp));
        let mut buf = vec![0u8; COPY_BUF_SIZE];
        loop {
            let n = match source.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(BootError::fetch(origin, e)),
            };
            writer
                .write_all(&buf[..n])
                .map_err(|e| BootError::io("writing downloaded artifact", e))?;
        }

        let size = writer.bytes_written();
        let (buffered, actual) = writer.finish();
        let temp = buffered
            .into_inner()
            .map_err(|e| BootError::io("flushing downloaded artifact", e.into_error()))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| BootError::io("syncing downloaded artifact", e))?;
        debug!("Calculated hash of {} byte download as {}", size, actual);

        if !digest::matches(&actual, hash) {
            // Dropping `temp` deletes the partial file
            return Err(BootError::Integrity {
                expected: hash.to_string(),
                actual: actual.to_string(),
                location: origin.to_string(),
            });
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(temp.path(), fs::Permissions::from_mode(0o444))
                .map_err(|e| BootError::io("setting artifact permissions", e))?;
        }

        // Never replace a committed file; the loser's temp file is dropped
        let dest = self.path_for(hash);
        match temp.persist_noclobber(&dest) {
            Ok(_) => {}
            Err(e) if dest.is_file() => {
                debug!(
                    "{} was committed concurrently ({}), keeping existing file",
                    dest.display(),
                    e.error
                );
            }
            Err(e) => {
                return Err(BootError::io(
                    format!("moving artifact into place at {}", dest.display()),
                    e.error,
                ))
            }
        }

        Ok(dest)
    }

    /// List committed artifacts, sorted by hash
    pub fn entries(&self) -> BootResult<Vec<CacheEntry>> {
        let mut entries = Vec::new();
        for path in self.read_root()? {
            let Some(hash) = artifact_hash_of(&path) else {
                continue;
            };
            let meta = fs::metadata(&path)
                .map_err(|e| BootError::io(format!("reading metadata of {}", path.display()), e))?;
            entries.push(CacheEntry {
                hash,
                size: meta.len(),
                modified: meta.modified().ok().map(DateTime::<Utc>::from),
                path,
            });
        }
        entries.sort_by(|a, b| a.hash.cmp(&b.hash));
        Ok(entries)
    }

    /// Delete `.partial` files older than `min_age` left by interrupted runs
    pub fn prune_partials(&self, min_age: Duration) -> BootResult<usize> {
        let now = SystemTime::now();
        let mut removed = 0;
        for path in self.read_root()? {
            let is_partial = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(PARTIAL_SUFFIX));
            if !is_partial {
                continue;
            }
            let age = fs::metadata(&path)
                .and_then(|m| m.modified())
                .ok()
                .and_then(|m| now.duration_since(m).ok())
                .unwrap_or_default();
            if age < min_age {
                debug!("Keeping recent partial file {}", path.display());
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(BootError::io(
                        format!("removing partial file {}", path.display()),
                        e,
                    ))
                }
            }
        }
        Ok(removed)
    }

    /// Remove one artifact. Returns whether it existed.
    pub fn remove(&self, hash: &ArtifactHash) -> BootResult<bool> {
        let path = self.path_for(hash);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(BootError::io(
                format!("removing artifact {}", path.display()),
                e,
            )),
        }
    }

    /// Remove every committed artifact
    pub fn clear(&self) -> BootResult<usize> {
        let mut removed = 0;
        for entry in self.entries()? {
            if self.remove(&entry.hash)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn ensure_root(&self) -> BootResult<()> {
        fs::create_dir_all(&self.root)
            .map_err(|e| BootError::io(format!("creating cache directory {}", self.root.display()), e))
    }

    /// Files directly under the root; empty when the root does not exist yet
    fn read_root(&self) -> BootResult<Vec<PathBuf>> {
        let dir = match fs::read_dir(&self.root) {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(BootError::io(
                    format!("listing cache directory {}", self.root.display()),
                    e,
                ))
            }
        };

        let mut paths = Vec::new();
        for entry in dir {
            let entry = entry.map_err(|e| BootError::io("listing cache directory", e))?;
            match entry.file_type() {
                Ok(ft) if ft.is_file() => paths.push(entry.path()),
                Ok(_) => {}
                Err(e) => warn!("Skipping {}: {}", entry.path().display(), e),
            }
        }
        Ok(paths)
    }
}

/// Digest encoded in a committed artifact's file name
fn artifact_hash_of(path: &Path) -> Option<ArtifactHash> {
    if path.extension()? != ARTIFACT_EXT {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let hash: ArtifactHash = stem.parse().ok()?;
    // Upper-case names are not ours
    (hash.as_str() == stem).then_some(hash)
}
