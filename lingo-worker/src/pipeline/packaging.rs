//! Packaging pipeline
//!
//! Turns dirty (release, language) pairs into distributable resource packs:
//! backfills status rows for untracked languages, applies the release
//! threshold policy, groups releases by a SHA-256 hash of their accepted
//! translation content, and builds one archive per distinct hash. An archive
//! whose hash already exists on disk is reused instead of regenerated.
//!
//! Failures are caught per release+language unit and per hash group; they are
//! recorded in the task result and never abort the remaining units.

use crate::db::{items, pack_status, packs, projects, translations, versions};
use crate::tasks::{ProgressHandle, TaskRunner};
use lingo_common::config::ReleaseThreshold;
use lingo_common::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// `{language: {namespaced key: translated value}}`, ordered for stable hashing
pub type TranslationFiles = BTreeMap<String, BTreeMap<String, String>>;

const DEFAULT_NAMESPACE: &str = "minecraft";
const PACK_FORMAT: u32 = 9;

/// Outcome of one release+language unit or one hash group
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnitResult {
    /// Unit below the release threshold, left dirty for a later pass
    BelowThreshold {
        version_id: String,
        language_code: String,
        translated: u32,
        total: u32,
    },
    /// Release has no items at all
    Empty { version_id: String },
    /// A pack covering these releases was built or reused
    Packed {
        content_hash: String,
        version_ids: Vec<String>,
        language_codes: Vec<String>,
        path: PathBuf,
        reused: bool,
    },
    /// Unit or group failed; recorded, not fatal
    Failed { scope: String, error: String },
}

/// Per-project packaging result
#[derive(Debug, Clone, Serialize)]
pub struct ProjectPackResult {
    pub project_id: String,
    pub units: Vec<UnitResult>,
}

/// Final payload of one packaging task
#[derive(Debug, Clone, Serialize)]
pub struct PackagingSummary {
    pub statuses_backfilled: usize,
    pub processed_projects: usize,
    pub results: Vec<ProjectPackResult>,
}

/// Groups releases by identical accepted content
#[derive(Debug, Default)]
struct HashGroup {
    version_ids: Vec<String>,
    language_codes: Vec<String>,
    /// Every (release, language) pair covered by this group; marked clean
    /// only once the group's archive exists
    pairs: Vec<(String, String)>,
    files: TranslationFiles,
}

/// Builds translation packs from accepted proposals
pub struct PackagingPipeline {
    pool: SqlitePool,
    runner: TaskRunner,
    output_dir: PathBuf,
    threshold: ReleaseThreshold,
}

impl PackagingPipeline {
    pub fn new(
        pool: SqlitePool,
        runner: TaskRunner,
        output_dir: impl Into<PathBuf>,
        threshold: ReleaseThreshold,
    ) -> Self {
        Self {
            pool,
            runner,
            output_dir: output_dir.into(),
            threshold,
        }
    }

    /// Run a full packaging pass under a registry-tracked task
    pub async fn run(&self) -> Result<PackagingSummary> {
        let task_id = self.runner.registry().create("Processing translation packs");
        self.runner
            .run(task_id, |progress| self.run_inner(progress))
            .await
    }

    async fn run_inner(&self, progress: ProgressHandle) -> Result<PackagingSummary> {
        let statuses_backfilled = self.backfill_statuses().await?;
        progress.report(5);

        let dirty = pack_status::list_dirty(&self.pool).await?;
        if dirty.is_empty() {
            info!("No translation packs to update");
            return Ok(PackagingSummary {
                statuses_backfilled,
                processed_projects: 0,
                results: Vec::new(),
            });
        }
        progress.report(10);

        // Group dirty pairs by owning project
        let version_owner: HashMap<String, String> = versions::list_all(&self.pool)
            .await?
            .into_iter()
            .map(|v| (v.id, v.project_id))
            .collect();

        let mut by_project: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
        for status in dirty {
            match version_owner.get(&status.version_id) {
                Some(project_id) => by_project
                    .entry(project_id.clone())
                    .or_default()
                    .push((status.version_id, status.language_code)),
                None => warn!(version_id = %status.version_id, "Dirty status for unknown release"),
            }
        }

        let total_projects = by_project.len();
        let mut results = Vec::with_capacity(total_projects);

        for (index, (project_id, pairs)) in by_project.into_iter().enumerate() {
            let result = match self.process_project(&project_id, pairs).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(project_id = %project_id, error = %e, "Project packaging failed");
                    ProjectPackResult {
                        project_id: project_id.clone(),
                        units: vec![UnitResult::Failed {
                            scope: format!("project {}", project_id),
                            error: e.to_string(),
                        }],
                    }
                }
            };
            results.push(result);

            progress.report(10 + ((index + 1) as f64 / total_projects as f64 * 90.0) as u8);
        }

        Ok(PackagingSummary {
            statuses_backfilled,
            processed_projects: results.len(),
            results,
        })
    }

    /// Create `needs_release` rows for (release, language) pairs that have
    /// accepted content but no status row yet. Releases without items are
    /// skipped. Returns the number of rows created.
    async fn backfill_statuses(&self) -> Result<usize> {
        let mut created = 0usize;

        for version in versions::list_all(&self.pool).await? {
            if items::count_for_version(&self.pool, &version.id).await? == 0 {
                continue;
            }

            let available = translations::languages_with_accepted(&self.pool, &version.id).await?;
            if available.is_empty() {
                continue;
            }

            let tracked = pack_status::tracked_languages(&self.pool, &version.id).await?;
            for language in available {
                if !tracked.contains(&language) {
                    pack_status::mark_dirty(&self.pool, &version.id, &language).await?;
                    created += 1;
                }
            }
        }

        if created > 0 {
            info!(created, "Backfilled packaging status rows");
        }
        Ok(created)
    }

    /// Package one project's dirty (release, language) pairs
    async fn process_project(
        &self,
        project_id: &str,
        pairs: Vec<(String, String)>,
    ) -> Result<ProjectPackResult> {
        let slug = projects::get_project(&self.pool, project_id)
            .await?
            .map(|p| p.slug)
            .unwrap_or_else(|| project_id.to_string());

        let mut units = Vec::new();
        let mut groups: BTreeMap<String, HashGroup> = BTreeMap::new();

        // First pass: threshold check and content gathering per unit
        for (version_id, language_code) in pairs {
            match self.gather_unit(&version_id, &language_code, &mut groups).await {
                Ok(Some(unit)) => units.push(unit),
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        version_id = %version_id,
                        language = %language_code,
                        error = %e,
                        "Packaging unit failed"
                    );
                    units.push(UnitResult::Failed {
                        scope: format!("{}/{}", version_id, language_code),
                        error: e.to_string(),
                    });
                }
            }
        }

        // Second pass: one archive per distinct content hash. Status rows are
        // only marked clean once the group's archive exists, so a failed
        // build leaves its pairs dirty for the next pass.
        for (content_hash, group) in groups {
            if group.files.is_empty() {
                self.mark_group_clean(&group).await?;
                continue;
            }

            match self.build_pack(&slug, &content_hash, &group.files) {
                Ok((path, reused)) => {
                    info!(
                        project_id,
                        hash = %content_hash,
                        reused,
                        path = %path.display(),
                        "Translation pack ready"
                    );
                    self.mark_group_clean(&group).await?;
                    packs::touch(&self.pool, project_id).await?;
                    units.push(UnitResult::Packed {
                        content_hash,
                        version_ids: group.version_ids,
                        language_codes: group.language_codes,
                        path,
                        reused,
                    });
                }
                Err(e) => {
                    warn!(project_id, hash = %content_hash, error = %e, "Pack build failed");
                    units.push(UnitResult::Failed {
                        scope: format!("hash group {}", content_hash),
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(ProjectPackResult {
            project_id: project_id.to_string(),
            units,
        })
    }

    /// Threshold-check one unit and, if it qualifies, add its release's
    /// accepted content to the matching hash group. Returns a recordable
    /// unit result for skips, None when gathered.
    async fn gather_unit(
        &self,
        version_id: &str,
        language_code: &str,
        groups: &mut BTreeMap<String, HashGroup>,
    ) -> Result<Option<UnitResult>> {
        let total = items::count_for_version(&self.pool, version_id).await?;
        if total == 0 {
            return Ok(Some(UnitResult::Empty {
                version_id: version_id.to_string(),
            }));
        }

        let translated = translations::count_accepted(&self.pool, version_id, language_code).await?;
        if !self.threshold.qualifies(translated, total) {
            return Ok(Some(UnitResult::BelowThreshold {
                version_id: version_id.to_string(),
                language_code: language_code.to_string(),
                translated,
                total,
            }));
        }

        // The content map covers every language of the release, so releases
        // with identical accepted content land in the same group regardless
        // of which language made them dirty.
        let files = translation_files_for_version(&self.pool, version_id).await?;
        let content_hash = content_hash(&files);

        let group = groups.entry(content_hash).or_default();
        if !group.version_ids.iter().any(|v| v == version_id) {
            group.version_ids.push(version_id.to_string());
        }
        if !group.language_codes.iter().any(|l| l == language_code) {
            group.language_codes.push(language_code.to_string());
        }
        group
            .pairs
            .push((version_id.to_string(), language_code.to_string()));
        if group.files.is_empty() {
            group.files = files;
        }

        Ok(None)
    }

    async fn mark_group_clean(&self, group: &HashGroup) -> Result<()> {
        for (version_id, language_code) in &group.pairs {
            pack_status::mark_clean(&self.pool, version_id, language_code).await?;
        }
        Ok(())
    }

    /// Build a pack archive, or reuse an existing one with the same hash.
    /// Returns the archive path and whether it was reused.
    fn build_pack(
        &self,
        slug: &str,
        content_hash: &str,
        files: &TranslationFiles,
    ) -> Result<(PathBuf, bool)> {
        std::fs::create_dir_all(&self.output_dir)?;

        if let Some(existing) = find_existing_pack(&self.output_dir, slug, content_hash)? {
            return Ok((existing, true));
        }

        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H-%M-%S");
        let pack_name = format!("{}_{}_{}.zip", slug, content_hash, timestamp);
        let pack_path = self.output_dir.join(pack_name);

        let file = std::fs::File::create(&pack_path)?;
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default();

        let manifest = serde_json::json!({
            "pack": {
                "pack_format": PACK_FORMAT,
                "description": format!("Translations for {} provided by Lingo", slug),
            }
        });
        zip.start_file("pack.mcmeta", options)?;
        zip.write_all(serde_json::to_string_pretty(&manifest)?.as_bytes())?;

        // Reorganize {lang: {ns:key: value}} into per-namespace lang tables
        let mut namespaces: BTreeMap<&str, BTreeMap<&str, BTreeMap<&str, &str>>> = BTreeMap::new();
        for (language, table) in files {
            for (full_key, value) in table {
                let (namespace, key) = match full_key.split_once(':') {
                    Some((namespace, key)) => (namespace, key),
                    None => (DEFAULT_NAMESPACE, full_key.as_str()),
                };
                namespaces
                    .entry(namespace)
                    .or_default()
                    .entry(language.as_str())
                    .or_default()
                    .insert(key, value.as_str());
            }
        }

        for (namespace, languages) in &namespaces {
            for (language, table) in languages {
                let entry_path = format!("assets/{}/lang/{}.json", namespace, language);
                zip.start_file(entry_path, options)?;
                zip.write_all(serde_json::to_string_pretty(table)?.as_bytes())?;
            }
        }

        zip.finish()?;
        Ok((pack_path, false))
    }
}

/// Accepted `{language: {key: value}}` content for one release
pub async fn translation_files_for_version(
    pool: &SqlitePool,
    version_id: &str,
) -> Result<TranslationFiles> {
    let rows = translations::accepted_for_version(pool, version_id).await?;

    let mut files = TranslationFiles::new();
    for row in rows {
        files
            .entry(row.language_code)
            .or_default()
            .insert(row.key, row.value);
    }
    Ok(files)
}

/// Stable SHA-256 hash of a translation map.
///
/// BTreeMap ordering makes the serialization canonical, so identical content
/// always hashes identically.
pub fn content_hash(files: &TranslationFiles) -> String {
    let serialized = serde_json::to_vec(files).unwrap_or_default();
    let digest = Sha256::digest(&serialized);
    format!("{:x}", digest)
}

/// Look for an archive whose name embeds the same slug and content hash
fn find_existing_pack(dir: &Path, slug: &str, content_hash: &str) -> Result<Option<PathBuf>> {
    let prefix = format!("{}_{}_", slug, content_hash);

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(&prefix) {
            return Ok(Some(entry.path()));
        }
    }
    Ok(None)
}
