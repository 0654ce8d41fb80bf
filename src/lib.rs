//! sccache-action - sccache for CI pipelines
//!
//! Installs a prebuilt sccache release, points cargo at it, and keeps the
//! sccache directory warm between CI runs through a persistent cache.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod install;
pub mod release;
pub mod stats;
pub mod toolchain;
pub mod ui;

pub use error::{ActionError, ActionResult};

/// Run blocking work (HTTP, archives) on the blocking pool and wait for it
pub async fn blocking<T, F>(f: F) -> ActionResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> ActionResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ActionError::Internal(format!("blocking task failed: {}", e)))?
}
