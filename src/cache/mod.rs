//! Persistent sccache directory across CI runs
//!
//! Restore runs at setup, save at teardown. Keys follow the hosted cache
//! service rules: an exact primary key, then prefix-matched restore keys,
//! newest entry first. Entries are immutable.
//!
//! | Step    | Key                              |
//! |---------|----------------------------------|
//! | restore | `<cache-key>-<RFC 3339 now>`     |
//! |         | fallback prefix `<cache-key>`    |
//! | save    | `<cache-key>`                    |
//!
//! The timestamped primary key never matches a previous run, so restores
//! always land on the fallback prefix.

pub mod actions;
pub mod archive;
pub mod local;

pub use actions::ActionsCache;
pub use local::LocalCache;

use crate::config::schema::{CacheBackendKind, CacheConfig};
use crate::config::ConfigManager;
use crate::error::{ActionError, ActionResult};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Compression method recorded in every entry version
pub const COMPRESSION: &str = "gzip";

const VERSION_SALT: &str = "1.0";

/// Outcome of a restore
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreResult {
    /// Whether any entry was restored
    pub hit: bool,
    /// Key of the restored entry
    pub matched_key: Option<String>,
}

/// Outcome of a save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A new entry was stored
    Saved,
    /// An entry with this key already exists and was left untouched
    AlreadyExists,
}

/// Storage for cache entries
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Materialize the best matching entry onto `paths`, returning its key
    async fn restore(
        &self,
        paths: &[PathBuf],
        primary_key: &str,
        restore_keys: &[String],
        version: &str,
    ) -> ActionResult<Option<String>>;

    /// Store `paths` under `key`; fails with `CacheEntryExists` if taken
    async fn save(&self, paths: &[PathBuf], key: &str, version: &str) -> ActionResult<()>;
}

/// Create the backend selected by configuration
pub fn create_backend(config: &CacheConfig) -> ActionResult<Box<dyn CacheBackend>> {
    let local = || {
        let root = config
            .store_dir
            .clone()
            .unwrap_or_else(ConfigManager::default_store_dir);
        Box::new(LocalCache::new(root)) as Box<dyn CacheBackend>
    };

    let backend = match config.backend {
        CacheBackendKind::Auto if ActionsCache::is_configured() => {
            Box::new(ActionsCache::from_env()?) as Box<dyn CacheBackend>
        }
        CacheBackendKind::Auto | CacheBackendKind::Local => local(),
        CacheBackendKind::Actions => Box::new(ActionsCache::from_env()?),
    };
    debug!(backend = backend.name(), "Selected cache backend");
    Ok(backend)
}

/// Local directories holding the cached payload
pub fn cache_paths(config: &CacheConfig) -> ActionResult<Vec<PathBuf>> {
    match &config.dir {
        Some(dir) => Ok(vec![dir.clone()]),
        None => Ok(vec![ConfigManager::default_cache_dir()?]),
    }
}

/// Version tag binding entries to the cached path set and archive format
pub fn cache_version(paths: &[PathBuf]) -> String {
    let mut components: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    components.push(COMPRESSION.to_string());
    if cfg!(windows) {
        components.push("windows-only".to_string());
    }
    components.push(VERSION_SALT.to_string());
    hex::encode(Sha256::digest(components.join("|").as_bytes()))
}

/// Primary restore key: the cache key suffixed with the restore time
pub fn primary_key(cache_key: &str, now: DateTime<Utc>) -> String {
    format!(
        "{}-{}",
        cache_key,
        now.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

/// Restore the newest entry saved under `cache_key` onto `paths`.
///
/// A miss is a normal outcome for the first run and is not an error.
pub async fn restore(
    backend: &dyn CacheBackend,
    cache_key: &str,
    paths: &[PathBuf],
    now: DateTime<Utc>,
) -> ActionResult<RestoreResult> {
    let primary = primary_key(cache_key, now);
    let restore_keys = vec![cache_key.to_string()];
    let version = cache_version(paths);

    info!(backend = backend.name(), %primary, "Restoring cache");
    let matched_key = backend
        .restore(paths, &primary, &restore_keys, &version)
        .await?;

    match &matched_key {
        Some(key) => info!(%key, "Cache restored"),
        None => info!(%cache_key, "Cache not found"),
    }

    Ok(RestoreResult {
        hit: matched_key.is_some(),
        matched_key,
    })
}

/// Save `paths` under `cache_key` verbatim.
///
/// An existing entry under the same key is left alone and reported as
/// [`SaveOutcome::AlreadyExists`].
pub async fn save(
    backend: &dyn CacheBackend,
    cache_key: &str,
    paths: &[PathBuf],
) -> ActionResult<SaveOutcome> {
    if !paths.iter().any(|p| p.exists()) {
        return Err(ActionError::CacheValidation {
            paths: paths.to_vec(),
        });
    }

    let version = cache_version(paths);
    info!(backend = backend.name(), key = %cache_key, "Saving cache");

    match backend.save(paths, cache_key, &version).await {
        Ok(()) => Ok(SaveOutcome::Saved),
        Err(e) if e.is_entry_exists() => {
            warn!(key = %cache_key, "Cache entry already exists, not saving");
            Ok(SaveOutcome::AlreadyExists)
        }
        Err(e) => Err(e),
    }
}
