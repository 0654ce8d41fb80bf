//! Directory-backed cache store
//!
//! Layout: `<root>/<sha256(key)>/entry.json` plus `cache.tar.gz`. Entries are
//! immutable once written, matching the hosted cache service.

use super::{archive, CacheBackend};
use crate::blocking;
use crate::error::{ActionError, ActionResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const METADATA_FILE: &str = "entry.json";
const ARCHIVE_FILE: &str = "cache.tar.gz";

/// Metadata stored next to each archive
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryMeta {
    pub key: String,
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
}

/// Cache backend storing entries in a local directory
#[derive(Debug, Clone)]
pub struct LocalCache {
    root: PathBuf,
}

impl LocalCache {
    /// Create a store rooted at `root` (created on first save)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_dir(&self, key: &str) -> PathBuf {
        self.root.join(hex::encode(Sha256::digest(key.as_bytes())))
    }

    /// All readable entries; unreadable ones are skipped
    fn entries(&self) -> ActionResult<Vec<(PathBuf, EntryMeta)>> {
        let dir = match std::fs::read_dir(&self.root) {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(ActionError::io(
                    format!("reading cache store {}", self.root.display()),
                    e,
                ))
            }
        };

        let mut entries = Vec::new();
        for item in dir.flatten() {
            let path = item.path();
            let meta = std::fs::read(path.join(METADATA_FILE))
                .ok()
                .and_then(|raw| serde_json::from_slice::<EntryMeta>(&raw).ok());
            match meta {
                Some(meta) => entries.push((path, meta)),
                None => debug!(path = %path.display(), "Skipping unreadable cache entry"),
            }
        }
        Ok(entries)
    }

    fn restore_blocking(
        &self,
        paths: &[PathBuf],
        primary_key: &str,
        restore_keys: &[String],
        version: &str,
    ) -> ActionResult<Option<String>> {
        let entries = self.entries()?;
        let Some((dir, meta)) = select_entry(&entries, primary_key, restore_keys, version) else {
            return Ok(None);
        };

        archive::unpack(&dir.join(ARCHIVE_FILE), paths).map_err(|e| {
            ActionError::CacheService(format!("restoring {}: {}", meta.key, e))
        })?;
        Ok(Some(meta.key.clone()))
    }

    fn save_blocking(&self, paths: &[PathBuf], key: &str, version: &str) -> ActionResult<u64> {
        let target = self.entry_dir(key);
        if target.join(METADATA_FILE).exists() {
            return Err(ActionError::CacheEntryExists(key.to_string()));
        }

        std::fs::create_dir_all(&self.root).map_err(|e| {
            ActionError::io(format!("creating cache store {}", self.root.display()), e)
        })?;

        let staging = tempfile::Builder::new()
            .prefix(".entry-")
            .tempdir_in(&self.root)
            .map_err(|e| ActionError::io("creating cache staging directory", e))?;

        let size_bytes = archive::pack(paths, &staging.path().join(ARCHIVE_FILE))
            .map_err(|e| ActionError::CacheService(format!("archiving {}: {}", key, e)))?;

        let meta = EntryMeta {
            key: key.to_string(),
            version: version.to_string(),
            created_at: Utc::now(),
            size_bytes,
        };
        std::fs::write(
            staging.path().join(METADATA_FILE),
            serde_json::to_vec_pretty(&meta)?,
        )
        .map_err(|e| ActionError::io("writing cache entry metadata", e))?;

        // Another saver may have won the race since the check above
        if let Err(e) = std::fs::rename(staging.path(), &target) {
            return Err(if target.join(METADATA_FILE).exists() {
                ActionError::CacheEntryExists(key.to_string())
            } else {
                ActionError::io(format!("storing cache entry {}", key), e)
            });
        }

        Ok(size_bytes)
    }
}

/// Pick the entry to restore.
///
/// Exact primary key first, then each restore key in order as a prefix with
/// the newest entry winning. Entries written for another version never match.
pub fn select_entry<'a>(
    entries: &'a [(PathBuf, EntryMeta)],
    primary_key: &str,
    restore_keys: &[String],
    version: &str,
) -> Option<&'a (PathBuf, EntryMeta)> {
    let candidates = || entries.iter().filter(|(_, meta)| meta.version == version);

    if let Some(exact) = candidates().find(|(_, meta)| meta.key == primary_key) {
        return Some(exact);
    }

    restore_keys.iter().find_map(|prefix| {
        candidates()
            .filter(|(_, meta)| meta.key.starts_with(prefix.as_str()))
            .max_by_key(|(_, meta)| meta.created_at)
    })
}

#[async_trait]
impl CacheBackend for LocalCache {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn restore(
        &self,
        paths: &[PathBuf],
        primary_key: &str,
        restore_keys: &[String],
        version: &str,
    ) -> ActionResult<Option<String>> {
        let this = self.clone();
        let paths = paths.to_vec();
        let primary_key = primary_key.to_string();
        let restore_keys = restore_keys.to_vec();
        let version = version.to_string();

        blocking(move || this.restore_blocking(&paths, &primary_key, &restore_keys, &version)).await
    }

    async fn save(&self, paths: &[PathBuf], key: &str, version: &str) -> ActionResult<()> {
        let this = self.clone();
        let paths = paths.to_vec();
        let owned_key = key.to_string();
        let version = version.to_string();

        let size = blocking(move || this.save_blocking(&paths, &owned_key, &version)).await?;
        info!(%key, size, store = %self.root.display(), "Saved cache entry");
        Ok(())
    }
}
