//! Release asset resolution
//!
//! Picks the sccache archive for a target triple out of a GitHub release.
//! Asset names follow `sccache-<tag>-<arch>.tar.gz`; for `latest` the tag is
//! not known up front, so any `v<version>` is accepted.

use crate::blocking;
use crate::config::schema::ReleaseConfig;
use crate::error::{ActionError, ActionResult};
use crate::http;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info};

/// Release identifier meaning "whatever GitHub marks as latest"
pub const LATEST: &str = "latest";

const PER_PAGE: usize = 100;

/// GitHub release metadata
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

/// GitHub release asset
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Asset {
    pub name: String,
    pub browser_download_url: String,
}

impl Asset {
    /// Asset name without the `.tar.gz` suffix; the archive's top-level directory
    pub fn archive_stem(&self) -> &str {
        self.name.strip_suffix(".tar.gz").unwrap_or(&self.name)
    }

    /// Semantic version embedded in the asset name, if it has one
    pub fn version(&self, arch: &str) -> Option<semver::Version> {
        let raw = self
            .name
            .strip_prefix("sccache-")?
            .strip_suffix(".tar.gz")?
            .strip_suffix(arch)?
            .strip_suffix('-')?;
        semver::Version::parse(raw.trim_start_matches('v')).ok()
    }
}

/// Source of release metadata
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Repository the releases belong to, for error messages
    fn repo(&self) -> &str;

    /// Fetch the release GitHub marks as latest
    async fn latest(&self) -> ActionResult<Release>;

    /// Fetch every release
    async fn list(&self) -> ActionResult<Vec<Release>>;
}

/// Build the asset name pattern for a release identifier and arch
pub fn asset_pattern(release_name: &str, arch: &str) -> ActionResult<Regex> {
    let pattern = if release_name == LATEST {
        format!(r"^sccache-v(.*?)-{}\.tar\.gz$", regex::escape(arch))
    } else {
        format!(
            r"^sccache-{}-{}\.tar\.gz$",
            regex::escape(release_name),
            regex::escape(arch)
        )
    };
    Regex::new(&pattern).map_err(|e| ActionError::Internal(format!("asset pattern: {}", e)))
}

/// Pick the first asset of `release` whose name matches `pattern`
pub fn select_asset(release: &Release, pattern: &Regex) -> ActionResult<Asset> {
    release
        .assets
        .iter()
        .find(|asset| pattern.is_match(&asset.name))
        .cloned()
        .ok_or_else(|| ActionError::AssetNotFound {
            release: release.tag_name.clone(),
            pattern: pattern.as_str().to_string(),
            available: release.assets.iter().map(|a| a.name.clone()).collect(),
        })
}

/// Resolve the downloadable archive for `release_name` and `arch`
pub async fn resolve(
    source: &dyn ReleaseSource,
    release_name: &str,
    arch: &str,
) -> ActionResult<Asset> {
    let pattern = asset_pattern(release_name, arch)?;
    info!(repo = source.repo(), release = release_name, %arch, "Resolving sccache release");

    let release = if release_name == LATEST {
        source.latest().await?
    } else {
        source
            .list()
            .await?
            .into_iter()
            .find(|r| r.tag_name == release_name)
            .ok_or_else(|| ActionError::ReleaseNotFound {
                repo: source.repo().to_string(),
                release: release_name.to_string(),
            })?
    };

    let asset = select_asset(&release, &pattern)?;
    debug!(tag = %release.tag_name, asset = %asset.name, "Resolved asset");
    Ok(asset)
}

/// Release source backed by the GitHub REST API
pub struct GitHubReleases {
    agent: ureq::Agent,
    api_url: String,
    repo: String,
    token: Option<String>,
}

impl GitHubReleases {
    /// Create a source from release settings
    pub fn new(config: &ReleaseConfig) -> Self {
        Self {
            agent: http::agent(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            repo: config.repo.clone(),
            token: config.token.clone(),
        }
    }

    fn releases_url(&self) -> String {
        format!("{}/repos/{}/releases", self.api_url, self.repo)
    }

    /// GET a JSON document; `Ok(None)` on 404
    async fn get_json<T>(&self, url: String) -> ActionResult<Option<T>>
    where
        T: serde::de::DeserializeOwned + Send + 'static,
    {
        let agent = self.agent.clone();
        let token = self.token.clone();

        blocking(move || {
            debug!(%url, "Fetching GitHub releases");
            let request = agent
                .get(&url)
                .header("Accept", "application/vnd.github+json")
                .header("X-GitHub-Api-Version", "2022-11-28");

            let mut response = http::authorized(request, token.as_deref())
                .call()
                .map_err(|e| ActionError::ReleaseFetch {
                    url: url.clone(),
                    reason: e.to_string(),
                })?;

            let status = response.status().as_u16();
            match status {
                404 => return Ok(None),
                403 | 429 => return Err(ActionError::RateLimited { url, status }),
                s if !(200..300).contains(&s) => {
                    return Err(ActionError::ReleaseFetch {
                        url,
                        reason: format!("HTTP {}", s),
                    })
                }
                _ => {}
            }

            http::read_json(&mut response)
                .map(Some)
                .map_err(|reason| ActionError::ReleaseFetch { url, reason })
        })
        .await
    }
}

#[async_trait]
impl ReleaseSource for GitHubReleases {
    fn repo(&self) -> &str {
        &self.repo
    }

    async fn latest(&self) -> ActionResult<Release> {
        let url = format!("{}/latest", self.releases_url());
        self.get_json(url)
            .await?
            .ok_or_else(|| ActionError::ReleaseNotFound {
                repo: self.repo.clone(),
                release: LATEST.to_string(),
            })
    }

    async fn list(&self) -> ActionResult<Vec<Release>> {
        let mut releases = Vec::new();
        for page in 1.. {
            let url = format!("{}?per_page={}&page={}", self.releases_url(), PER_PAGE, page);
            let batch: Vec<Release> = self.get_json(url).await?.unwrap_or_default();
            let done = batch.len() < PER_PAGE;
            releases.extend(batch);
            if done {
                break;
            }
        }
        debug!(count = releases.len(), "Listed releases");
        Ok(releases)
    }
}
