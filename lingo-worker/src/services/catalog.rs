//! Upstream catalog API client
//!
//! Talks to the Modrinth-style catalog for project metadata, release
//! listings, and artifact downloads. A small politeness delay spaces out
//! consecutive requests. The `Catalog` trait is the seam the pipelines
//! depend on, so tests can substitute a stub.

use async_trait::async_trait;
use lingo_common::{Error, Result};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

const USER_AGENT: &str = "lingo/0.1.0 (translation backend)";
const REQUEST_TIMEOUT_SECS: u64 = 30;
const POLITENESS_DELAY_MS: u64 = 250;

/// Project metadata from the catalog
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogProject {
    pub id: String,
    pub slug: String,
    #[serde(default)]
    pub title: String,
}

/// One downloadable file attached to a release
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogFile {
    pub url: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub primary: bool,
}

/// One release listed by the catalog
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogVersion {
    pub id: String,
    #[serde(default)]
    pub files: Vec<CatalogFile>,
}

impl CatalogVersion {
    /// The primary artifact, falling back to the first file
    pub fn primary_file(&self) -> Option<&CatalogFile> {
        self.files
            .iter()
            .find(|f| f.primary)
            .or_else(|| self.files.first())
    }
}

/// Read access to the upstream catalog
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Project metadata; `Error::NotFound` if the catalog does not know it
    async fn get_project(&self, project_id: &str) -> Result<CatalogProject>;

    /// All releases of a project
    async fn get_versions(&self, project_id: &str) -> Result<Vec<CatalogVersion>>;

    /// Download an artifact as raw bytes
    async fn download(&self, url: &str) -> Result<Vec<u8>>;
}

/// Spaces consecutive requests apart
struct PolitenessDelay {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl PolitenessDelay {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Modrinth catalog client
pub struct ModrinthCatalog {
    http_client: reqwest::Client,
    base_url: String,
    delay: Arc<PolitenessDelay>,
}

impl ModrinthCatalog {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
            delay: Arc::new(PolitenessDelay::new(POLITENESS_DELAY_MS)),
        })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        self.delay.wait().await;
        debug!(url = %url, "Querying catalog");

        let response = self.http_client.get(url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(url.to_string()));
        }

        Ok(response.error_for_status()?)
    }
}

#[async_trait]
impl Catalog for ModrinthCatalog {
    async fn get_project(&self, project_id: &str) -> Result<CatalogProject> {
        let url = format!("{}/project/{}", self.base_url, project_id);
        let project = self.get(&url).await?.json::<CatalogProject>().await?;
        Ok(project)
    }

    async fn get_versions(&self, project_id: &str) -> Result<Vec<CatalogVersion>> {
        let url = format!("{}/project/{}/version", self.base_url, project_id);
        let versions = self.get(&url).await?.json::<Vec<CatalogVersion>>().await?;
        Ok(versions)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let bytes = self.get(url).await?.bytes().await?;
        debug!(url = %url, size = bytes.len(), "Downloaded artifact");
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_file_prefers_primary_flag() {
        let version = CatalogVersion {
            id: "v1".to_string(),
            files: vec![
                CatalogFile {
                    url: "a".to_string(),
                    filename: "a.jar".to_string(),
                    primary: false,
                },
                CatalogFile {
                    url: "b".to_string(),
                    filename: "b.jar".to_string(),
                    primary: true,
                },
            ],
        };
        assert_eq!(version.primary_file().unwrap().url, "b");
    }

    #[test]
    fn primary_file_falls_back_to_first() {
        let version = CatalogVersion {
            id: "v1".to_string(),
            files: vec![CatalogFile {
                url: "a".to_string(),
                filename: "a.jar".to_string(),
                primary: false,
            }],
        };
        assert_eq!(version.primary_file().unwrap().url, "a");
    }

    #[test]
    fn primary_file_none_when_no_files() {
        let version = CatalogVersion {
            id: "v1".to_string(),
            files: vec![],
        };
        assert!(version.primary_file().is_none());
    }
}
