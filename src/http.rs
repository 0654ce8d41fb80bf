//! Shared HTTP agent for GitHub and cache service requests
//!
//! ureq is blocking; callers run requests inside `spawn_blocking` and await
//! them before moving on.

use crate::error::{ActionError, ActionResult};
use crate::ui::{DownloadProgress, UiContext};
use std::path::Path;
use tracing::debug;
use ureq::Agent;

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("sccache-action/", env!("CARGO_PKG_VERSION"));

/// Responses larger than this are refused when buffered in memory
const JSON_BODY_LIMIT: u64 = 64 * 1024 * 1024;

/// Build an agent that reports HTTP error statuses as responses
pub fn agent() -> Agent {
    Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .into()
}

/// Attach the user agent and an optional bearer token
pub fn authorized<B>(
    request: ureq::RequestBuilder<B>,
    token: Option<&str>,
) -> ureq::RequestBuilder<B> {
    let request = request.header("User-Agent", USER_AGENT);
    match token {
        Some(token) => request.header("Authorization", format!("Bearer {}", token)),
        None => request,
    }
}

/// Read a JSON body with a generous size limit
pub fn read_json<T: serde::de::DeserializeOwned>(
    response: &mut ureq::http::Response<ureq::Body>,
) -> Result<T, String> {
    let bytes = response
        .body_mut()
        .with_config()
        .limit(JSON_BODY_LIMIT)
        .read_to_vec()
        .map_err(|e| e.to_string())?;
    serde_json::from_slice(&bytes).map_err(|e| e.to_string())
}

/// Stream `url` into `dest`, returning the number of bytes written.
///
/// Blocking; call from inside [`crate::blocking`].
pub fn download_to_file(
    agent: &Agent,
    url: &str,
    token: Option<&str>,
    dest: &Path,
    ctx: &UiContext,
    label: &str,
) -> ActionResult<u64> {
    debug!(%url, dest = %dest.display(), "Downloading");

    let response = authorized(agent.get(url), token)
        .call()
        .map_err(|e| ActionError::download(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ActionError::download(
            url,
            format!("HTTP {}", status.as_u16()),
        ));
    }

    let total = response
        .headers()
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    let progress = DownloadProgress::new(ctx, label, total);
    let mut reader = progress.wrap(response.into_body().into_reader());
    let mut file = std::fs::File::create(dest).map_err(|e| ActionError::download(url, e))?;
    let written = std::io::copy(&mut reader, &mut file).map_err(|e| ActionError::download(url, e))?;
    progress.finish();

    debug!(bytes = written, "Download complete");
    Ok(written)
}
