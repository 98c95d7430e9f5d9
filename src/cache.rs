//! Content-addressed file caches.
//!
//! A logical key string is hashed with SHA-256 and the hex digest, truncated
//! to a fixed prefix length, becomes the file name under the cache root. The
//! same key always maps to the same path. Truncation means distinct keys may
//! collide; that risk is accepted.
//!
//! There is no locking. Concurrent writers of one key race and the last
//! write wins, which is fine because an entry is a function of its key.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

pub const JSON_KEY_LEN: usize = 16;
pub const HTML_KEY_LEN: usize = 24;

/// First `len` hex characters of the SHA-256 digest of `input`.
pub fn short_digest(input: &str, len: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(len);
    digest
}

fn entry_path(root: &Path, key: &str, key_len: usize, extension: &str) -> PathBuf {
    root.join(format!("{}.{}", short_digest(key, key_len), extension))
}

/// Deletes entry files under `root` with the given extension whose
/// modification time is older than `max_age`.
fn prune_dir(root: &Path, extension: &str, max_age: Duration) -> io::Result<usize> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let now = SystemTime::now();
    let mut removed = 0;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        let age = now.duration_since(modified).unwrap_or_default();
        if age >= max_age {
            fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// JSON documents keyed by an arbitrary string.
#[derive(Debug, Clone)]
pub struct JsonCache {
    root: PathBuf,
}

impl JsonCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        entry_path(&self.root, key, JSON_KEY_LEN, "json")
    }

    /// Returns the cached value, or `None` when the entry is missing or does
    /// not deserialize. Corrupt entries are misses, never errors.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.path_for(key);
        let raw = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!(path = %path.display(), "json cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable json cache entry, treating as miss");
                None
            }
        }
    }

    /// Writes `value` as pretty-printed JSON (2-space indent, non-ASCII kept
    /// literally), creating the cache root if needed.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.root)?;
        let path = self.path_for(key);
        let body = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        fs::write(&path, body)?;
        debug!(path = %path.display(), "json cache write");
        Ok(path)
    }

    pub fn prune_older_than(&self, max_age: Duration) -> io::Result<usize> {
        prune_dir(&self.root, "json", max_age)
    }
}

/// Raw HTML bodies keyed by URL.
#[derive(Debug, Clone)]
pub struct HtmlCache {
    root: PathBuf,
}

impl HtmlCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, url: &str) -> PathBuf {
        entry_path(&self.root, url, HTML_KEY_LEN, "html")
    }

    /// Cached body for `url`, regardless of age. Invalid UTF-8 is replaced
    /// rather than rejected.
    pub fn get(&self, url: &str) -> Option<String> {
        let bytes = fs::read(self.path_for(url)).ok()?;
        Some(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn set(&self, url: &str, html: &str) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.root)?;
        let path = self.path_for(url);
        fs::write(&path, html)?;
        Ok(path)
    }

    pub fn prune_older_than(&self, max_age: Duration) -> io::Result<usize> {
        prune_dir(&self.root, "html", max_age)
    }
}
