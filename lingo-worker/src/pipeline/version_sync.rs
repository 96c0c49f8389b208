//! Version sync pipeline
//!
//! Ingests new upstream releases for one project: validates the opt-in,
//! diffs the catalog's release list against known ids, downloads each new
//! release's primary artifact with bounded concurrency, extracts translatable
//! strings, and inserts releases/items/links while deduplicating items by
//! (key, value) content.
//!
//! A release whose artifact fails to download or parse is skipped with a
//! warning; partial failure is tolerated here, unlike the batch runner's
//! all-or-nothing contract.

use crate::db::{items, projects, versions};
use crate::services::catalog::{Catalog, CatalogVersion};
use crate::services::extractor::{extract_strings, TranslationStrings};
use crate::tasks::{ProgressHandle, TaskRunner};
use futures::future::join_all;
use lingo_common::db::models::Version;
use lingo_common::Result;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

/// Final payload of one sync task
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Project is not opted in or the catalog rejected it
    ProjectInvalid,
    /// Catalog listing had nothing we have not seen
    NoNewVersions,
    Synced {
        versions_found: usize,
        versions_ingested: usize,
        versions_skipped: usize,
        /// Item rows actually inserted; strings already known by content
        /// are linked but not counted
        new_items: usize,
        links_created: usize,
    },
}

/// Ingests new releases and their translatable strings
pub struct VersionSyncPipeline {
    pool: SqlitePool,
    catalog: Arc<dyn Catalog>,
    runner: TaskRunner,
    source_language: String,
    concurrency: usize,
}

impl VersionSyncPipeline {
    pub fn new(
        pool: SqlitePool,
        catalog: Arc<dyn Catalog>,
        runner: TaskRunner,
        source_language: impl Into<String>,
        concurrency: usize,
    ) -> Self {
        Self {
            pool,
            catalog,
            runner,
            source_language: source_language.into(),
            concurrency: concurrency.max(1),
        }
    }

    /// Sync one project under a registry-tracked task
    pub async fn sync_project(&self, project_id: &str) -> Result<SyncOutcome> {
        let task_id = self
            .runner
            .registry()
            .create(format!("Syncing releases for project {}", project_id));

        self.runner
            .run(task_id, |progress| self.sync_inner(project_id, progress))
            .await
    }

    async fn sync_inner(&self, project_id: &str, progress: ProgressHandle) -> Result<SyncOutcome> {
        if !self.validate_project(project_id).await? {
            info!(project_id, "Project not valid for sync");
            return Ok(SyncOutcome::ProjectInvalid);
        }
        progress.report(5);

        let catalog_versions = self.catalog.get_versions(project_id).await?;
        let known: HashSet<String> = versions::list_for_project(&self.pool, project_id)
            .await?
            .into_iter()
            .map(|v| v.id)
            .collect();

        let new_versions: Vec<CatalogVersion> = catalog_versions
            .into_iter()
            .filter(|v| !known.contains(&v.id))
            .collect();

        if new_versions.is_empty() {
            info!(project_id, "No new releases");
            return Ok(SyncOutcome::NoNewVersions);
        }

        let versions_found = new_versions.len();
        info!(project_id, versions_found, "Found new releases");
        progress.report(10);

        // Download and extract with bounded concurrency; failures skip the
        // release, they never fail the task.
        let mut extracted: Vec<(String, TranslationStrings)> = Vec::new();
        let mut versions_skipped = 0usize;
        let mut processed = 0usize;

        let mut iter = new_versions.into_iter();
        loop {
            let chunk: Vec<CatalogVersion> = iter.by_ref().take(self.concurrency).collect();
            if chunk.is_empty() {
                break;
            }
            let chunk_len = chunk.len();

            let results = join_all(chunk.iter().map(|v| self.fetch_release(project_id, v))).await;

            for (version, strings) in chunk.iter().zip(results) {
                match strings {
                    Some(strings) => extracted.push((version.id.clone(), strings)),
                    None => versions_skipped += 1,
                }
            }

            processed += chunk_len;
            // Download phase spans the 10..=80 progress band
            progress.report(10 + (processed as f64 / versions_found as f64 * 70.0) as u8);
        }

        // Insert releases, then items (deduplicated by content), then links
        let mut links_created = 0usize;
        let mut new_items = 0usize;
        let mut item_ids: HashMap<(String, String), i64> = HashMap::new();

        for (version_id, strings) in &extracted {
            versions::insert_version(
                &self.pool,
                &Version {
                    id: version_id.clone(),
                    project_id: project_id.to_string(),
                },
            )
            .await?;

            for (key, value) in strings {
                let content = (key.clone(), value.clone());
                let item_id = match item_ids.get(&content) {
                    Some(id) => *id,
                    None => {
                        let (id, created) = items::insert_or_get(&self.pool, key, value).await?;
                        if created {
                            new_items += 1;
                        }
                        item_ids.insert(content, id);
                        id
                    }
                };

                items::link_version_item(&self.pool, version_id, item_id).await?;
                links_created += 1;
            }
        }

        progress.report(95);

        let versions_ingested = extracted.len();
        info!(
            project_id,
            versions_ingested,
            versions_skipped,
            new_items,
            links_created,
            "Release sync complete"
        );

        Ok(SyncOutcome::Synced {
            versions_found,
            versions_ingested,
            versions_skipped,
            new_items,
            links_created,
        })
    }

    /// A project is valid when its owner opted in and the catalog still
    /// recognizes it. Catalog failures count as invalid rather than fatal.
    async fn validate_project(&self, project_id: &str) -> Result<bool> {
        let record = projects::get_project(&self.pool, project_id).await?;
        let opted_in = matches!(record, Some(p) if p.opt_in.is_some());
        if !opted_in {
            return Ok(false);
        }

        match self.catalog.get_project(project_id).await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!(project_id, error = %e, "Catalog rejected project");
                Ok(false)
            }
        }
    }

    /// Download and extract one release's strings; None on any failure
    async fn fetch_release(
        &self,
        project_id: &str,
        version: &CatalogVersion,
    ) -> Option<TranslationStrings> {
        let file = match version.primary_file() {
            Some(file) => file,
            None => {
                warn!(project_id, version_id = %version.id, "Release has no files");
                return None;
            }
        };

        let data = match self.catalog.download(&file.url).await {
            Ok(data) => data,
            Err(e) => {
                warn!(
                    project_id,
                    version_id = %version.id,
                    url = %file.url,
                    error = %e,
                    "Artifact download failed, skipping release"
                );
                return None;
            }
        };

        match extract_strings(&data, &self.source_language) {
            Ok(strings) => {
                info!(
                    project_id,
                    version_id = %version.id,
                    count = strings.len(),
                    "Extracted strings"
                );
                Some(strings)
            }
            Err(e) => {
                warn!(
                    project_id,
                    version_id = %version.id,
                    error = %e,
                    "Artifact extraction failed, skipping release"
                );
                None
            }
        }
    }
}

/// Revalidate every opted-in project against the catalog, clearing the
/// opt-in marker for projects the catalog no longer accepts. Runs as one
/// batch task with bounded concurrency.
pub async fn check_projects_valid(
    pool: &SqlitePool,
    catalog: Arc<dyn Catalog>,
    runner: &TaskRunner,
) -> Result<usize> {
    let opted_in = projects::list_opted_in(pool).await?;
    if opted_in.is_empty() {
        return Ok(0);
    }

    let results = runner
        .run_batch(
            opted_in,
            "Validating opted-in projects",
            |project| {
                let pool = pool.clone();
                let catalog = Arc::clone(&catalog);
                async move {
                    match catalog.get_project(&project.id).await {
                        Ok(_) => Ok(false),
                        Err(e) => {
                            warn!(project_id = %project.id, error = %e, "Project invalid, clearing opt-in");
                            projects::clear_opt_in(&pool, &project.id).await?;
                            Ok(true)
                        }
                    }
                }
            },
            10,
        )
        .await?;

    Ok(results.into_iter().filter(|cleared| *cleared).count())
}
