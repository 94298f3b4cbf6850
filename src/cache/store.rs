// Cache store for conditional-request metadata.
// Handles request fingerprinting, JSON serialization, and filesystem persistence.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Environment variable overriding the cache file location.
pub const CACHE_FILE_ENV: &str = "GITHUB_CACHE_FILE";

/// Default cache file name, relative to the working directory.
pub const DEFAULT_CACHE_FILE: &str = ".github-cache";

/// One cached response: the raw body plus the validators and pagination
/// continuation needed to revalidate and resume it later.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Raw JSON response body.
    pub body: String,
    /// `ETag` response header value, empty if the server sent none.
    pub etag: String,
    /// `Last-Modified` response header value, empty if absent.
    pub last_modified: String,
    /// URL of the next results page, empty on the last page.
    pub next_link: String,
}

impl CacheEntry {
    /// An entry with no usable content: an empty body or an empty
    /// JSON array literal.
    pub fn is_empty(&self) -> bool {
        self.body.is_empty() || self.body == "[]"
    }

    /// Whether this entry links to a further results page.
    pub fn has_next(&self) -> bool {
        !self.next_link.is_empty()
    }
}

/// Compute the cache key for a request from its identifying fields.
///
/// Each (name, value) pair is folded into a SHA-256 digest in order, so the
/// same pairs in a different order produce a different key. For plain GETs
/// the only pair is `("url", url)`.
pub fn fingerprint(parts: &[(&str, &str)]) -> String {
    let mut hasher = Sha256::new();
    for (name, value) in parts {
        hasher.update(name.as_bytes());
        hasher.update(value.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Persistent fingerprint → [`CacheEntry`] map backing the conditional
/// request cache.
///
/// The whole map is loaded at open and rewritten on every [`persist`].
/// A missing backing file is an empty store, not an error. The store is
/// not internally synchronized; [`CachingClient`](crate::client::CachingClient)
/// serializes access behind a mutex.
#[derive(Debug)]
pub struct CacheStore {
    path: PathBuf,
    entries: HashMap<String, CacheEntry>,
}

impl CacheStore {
    /// Open the store backed by the given file, loading any existing
    /// entries. A file that exists but cannot be parsed is an error;
    /// a file that does not exist yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| Error::CorruptCache(e.to_string()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        info!(path = %path.display(), entries = entries.len(), "opened cache store");
        Ok(Self { path, entries })
    }

    /// Open the store at the default location: `$GITHUB_CACHE_FILE` if
    /// set, otherwise `.github-cache` in the working directory.
    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path())
    }

    /// The cache file location selected by the environment.
    pub fn default_path() -> PathBuf {
        std::env::var(CACHE_FILE_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CACHE_FILE))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up the entry for a fingerprint.
    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Insert or replace the entry for a fingerprint.
    pub fn put(&mut self, key: impl Into<String>, entry: CacheEntry) {
        self.entries.insert(key.into(), entry);
    }

    /// Remove the entry for a fingerprint, reporting whether one was
    /// present. A no-op for absent keys.
    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the full in-memory map to the backing file, replacing any
    /// previous contents. Atomic via a temp file rename.
    pub fn persist(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| Error::Storage(e.to_string()))?;

        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(&temp_path, &self.path)?;

        debug!(path = %self.path.display(), entries = self.entries.len(), "persisted cache store");
        Ok(())
    }
}
