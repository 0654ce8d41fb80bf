//! GitHub Actions cache service backend
//!
//! Talks to the results service (twirp, JSON) advertised to each job through
//! `ACTIONS_RESULTS_URL` and `ACTIONS_RUNTIME_TOKEN`. Payloads travel to and
//! from blob storage through the signed URLs it hands out.

use super::{archive, CacheBackend};
use crate::blocking;
use crate::error::{ActionError, ActionResult};
use crate::http;
use crate::ui::UiContext;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::PathBuf;
use tracing::{debug, info};

const SERVICE: &str = "twirp/github.actions.results.api.v1.CacheService";
const RESULTS_URL_VAR: &str = "ACTIONS_RESULTS_URL";
const RUNTIME_TOKEN_VAR: &str = "ACTIONS_RUNTIME_TOKEN";

#[derive(Debug, Serialize)]
struct GetDownloadUrlRequest {
    key: String,
    restore_keys: Vec<String>,
    version: String,
}

#[derive(Debug, Default, Deserialize)]
struct GetDownloadUrlResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default, alias = "signedDownloadUrl")]
    signed_download_url: String,
    #[serde(default, alias = "matchedKey")]
    matched_key: String,
}

#[derive(Debug, Serialize)]
struct CreateEntryRequest {
    key: String,
    version: String,
}

#[derive(Debug, Deserialize)]
struct CreateEntryResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default, alias = "signedUploadUrl")]
    signed_upload_url: String,
}

#[derive(Debug, Serialize)]
struct FinalizeUploadRequest {
    key: String,
    // int64 travels as a string in protobuf JSON
    size_bytes: String,
    version: String,
}

#[derive(Debug, Deserialize)]
struct FinalizeUploadResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default, alias = "entryId")]
    entry_id: serde_json::Value,
}

/// Non-success reply from the cache service
#[derive(Debug)]
struct RpcFailure {
    status: u16,
    message: String,
}

/// Cache backend using the GitHub Actions cache service
#[derive(Clone)]
pub struct ActionsCache {
    agent: ureq::Agent,
    base_url: String,
    token: String,
}

impl ActionsCache {
    /// Create a client for `base_url` authenticated with `token`
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            agent: http::agent(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Whether the runner exposes the cache service to this process
    pub fn is_configured() -> bool {
        [RESULTS_URL_VAR, RUNTIME_TOKEN_VAR]
            .iter()
            .all(|var| std::env::var(var).is_ok_and(|v| !v.is_empty()))
    }

    /// Build a client from the runner environment
    pub fn from_env() -> ActionResult<Self> {
        let read = |var: &str| {
            std::env::var(var)
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| {
                    ActionError::CacheService(format!(
                        "{} is not set; the Actions cache is only reachable from a workflow job",
                        var
                    ))
                })
        };
        Ok(Self::new(read(RESULTS_URL_VAR)?, read(RUNTIME_TOKEN_VAR)?))
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}/{}", self.base_url, SERVICE, method)
    }

    /// Call a twirp method; blocking
    fn rpc<Req, Resp>(&self, method: &str, request: &Req) -> ActionResult<Result<Resp, RpcFailure>>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let url = self.method_url(method);
        debug!(%method, "Calling cache service");

        let mut response = http::authorized(self.agent.post(&url), Some(&self.token))
            .header("Content-Type", "application/json")
            .send_json(request)
            .map_err(|e| ActionError::CacheService(format!("{}: {}", method, e)))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let message = response
                .body_mut()
                .read_to_string()
                .unwrap_or_default();
            return Ok(Err(RpcFailure { status, message }));
        }

        http::read_json(&mut response)
            .map(Ok)
            .map_err(|reason| ActionError::CacheService(format!("{}: {}", method, reason)))
    }

    fn restore_blocking(
        &self,
        paths: &[PathBuf],
        request: GetDownloadUrlRequest,
    ) -> ActionResult<Option<String>> {
        let primary_key = request.key.clone();
        let reply: GetDownloadUrlResponse =
            match self.rpc("GetCacheEntryDownloadURL", &request)? {
                Ok(reply) => reply,
                Err(failure) if failure.status == 404 => GetDownloadUrlResponse::default(),
                Err(failure) => return Err(service_error("GetCacheEntryDownloadURL", failure)),
            };

        if !reply.ok || reply.signed_download_url.is_empty() {
            return Ok(None);
        }

        let matched = if reply.matched_key.is_empty() {
            primary_key
        } else {
            reply.matched_key
        };

        let staging = tempfile::tempdir()
            .map_err(|e| ActionError::io("creating cache download directory", e))?;
        let archive_path = staging.path().join("cache.tar.gz");
        http::download_to_file(
            &self.agent,
            &reply.signed_download_url,
            None,
            &archive_path,
            &UiContext::non_interactive(),
            "cache",
        )
        .map_err(|e| ActionError::CacheService(e.to_string()))?;

        archive::unpack(&archive_path, paths)
            .map_err(|e| ActionError::CacheService(format!("restoring {}: {}", matched, e)))?;
        Ok(Some(matched))
    }

    fn save_blocking(&self, paths: &[PathBuf], key: String, version: String) -> ActionResult<u64> {
        let staging = tempfile::tempdir()
            .map_err(|e| ActionError::io("creating cache upload directory", e))?;
        let archive_path = staging.path().join("cache.tar.gz");
        let size = archive::pack(paths, &archive_path)
            .map_err(|e| ActionError::CacheService(format!("archiving {}: {}", key, e)))?;

        let create = CreateEntryRequest {
            key: key.clone(),
            version: version.clone(),
        };
        let created: CreateEntryResponse = match self.rpc("CreateCacheEntry", &create)? {
            Ok(reply) => reply,
            Err(failure) if failure.status == 409 => {
                return Err(ActionError::CacheEntryExists(key));
            }
            Err(failure) => return Err(service_error("CreateCacheEntry", failure)),
        };
        if !created.ok || created.signed_upload_url.is_empty() {
            return Err(ActionError::CacheEntryExists(key));
        }

        self.upload(&created.signed_upload_url, &archive_path, size)?;

        let finalize = FinalizeUploadRequest {
            key: key.clone(),
            size_bytes: size.to_string(),
            version,
        };
        let finalized: FinalizeUploadResponse = self
            .rpc("FinalizeCacheEntryUpload", &finalize)?
            .map_err(|failure| service_error("FinalizeCacheEntryUpload", failure))?;
        if !finalized.ok {
            return Err(ActionError::CacheService(format!(
                "cache service did not accept the upload for {}",
                key
            )));
        }

        debug!(entry_id = %finalized.entry_id, "Finalized cache entry");
        Ok(size)
    }

    /// PUT the archive to blob storage as a single block blob
    fn upload(&self, url: &str, archive_path: &std::path::Path, size: u64) -> ActionResult<()> {
        let file = File::open(archive_path)
            .map_err(|e| ActionError::io("opening cache archive", e))?;

        let response = self
            .agent
            .put(url)
            .header("x-ms-blob-type", "BlockBlob")
            .header("Content-Length", size.to_string())
            .send(ureq::SendBody::from_owned_reader(file))
            .map_err(|e| ActionError::CacheService(format!("uploading cache: {}", e)))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(ActionError::CacheService(format!(
                "uploading cache: HTTP {}",
                status
            )));
        }
        Ok(())
    }
}

fn service_error(method: &str, failure: RpcFailure) -> ActionError {
    ActionError::CacheService(format!(
        "{} failed (HTTP {}): {}",
        method,
        failure.status,
        failure.message.trim()
    ))
}

#[async_trait]
impl CacheBackend for ActionsCache {
    fn name(&self) -> &'static str {
        "actions"
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
        let request = GetDownloadUrlRequest {
            key: primary_key.to_string(),
            restore_keys: restore_keys.to_vec(),
            version: version.to_string(),
        };

        blocking(move || this.restore_blocking(&paths, request)).await
    }

    async fn save(&self, paths: &[PathBuf], key: &str, version: &str) -> ActionResult<()> {
        let this = self.clone();
        let paths = paths.to_vec();
        let owned_key = key.to_string();
        let version = version.to_string();

        let size = blocking(move || this.save_blocking(&paths, owned_key, version)).await?;
        info!(%key, size, "Saved cache entry to the Actions cache");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_urls() {
        let cache = ActionsCache::new("https://results.example/", "token");
        assert_eq!(
            cache.method_url("CreateCacheEntry"),
            "https://results.example/twirp/github.actions.results.api.v1.CacheService/CreateCacheEntry"
        );
    }

    #[test]
    fn requests_use_proto_field_names() {
        let request = GetDownloadUrlRequest {
            key: "sccache-2024-01-01T00:00:00.000Z".to_string(),
            restore_keys: vec!["sccache".to_string()],
            version: "abc".to_string(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["restore_keys"][0], "sccache");

        let finalize = FinalizeUploadRequest {
            key: "k".to_string(),
            size_bytes: 42u64.to_string(),
            version: "v".to_string(),
        };
        assert_eq!(serde_json::to_value(&finalize).unwrap()["size_bytes"], "42");
    }

    #[test]
    fn responses_accept_either_casing() {
        let snake: GetDownloadUrlResponse = serde_json::from_str(
            r#"{"ok": true, "signed_download_url": "https://blob/x", "matched_key": "sccache"}"#,
        )
        .unwrap();
        let camel: GetDownloadUrlResponse = serde_json::from_str(
            r#"{"ok": true, "signedDownloadUrl": "https://blob/x", "matchedKey": "sccache"}"#,
        )
        .unwrap();
        assert_eq!(snake.matched_key, camel.matched_key);
        assert_eq!(snake.signed_download_url, camel.signed_download_url);

        let miss: GetDownloadUrlResponse = serde_json::from_str(r#"{"ok": false}"#).unwrap();
        assert!(!miss.ok);
        assert!(miss.signed_download_url.is_empty());
    }
}
