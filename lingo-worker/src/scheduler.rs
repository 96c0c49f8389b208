//! Periodic background work
//!
//! Three loops run for the lifetime of the process:
//! - hourly eviction of finished tasks past their retention age
//! - daily sweep that drops opt-in for projects the catalog no longer serves
//! - a 48 hour cycle that syncs releases for every opted-in project and then
//!   runs a packaging pass

use crate::db::projects;
use crate::pipeline::{version_sync, PackagingPipeline, VersionSyncPipeline};
use crate::services::catalog::Catalog;
use crate::tasks::{TaskRegistry, TaskRunner};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

const EVICTION_INTERVAL: Duration = Duration::from_secs(60 * 60);
const VALIDITY_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
const CONTENT_INTERVAL: Duration = Duration::from_secs(48 * 60 * 60);

/// Owns the periodic loops and the resources they operate on
pub struct Scheduler {
    pool: SqlitePool,
    catalog: Arc<dyn Catalog>,
    registry: Arc<TaskRegistry>,
    runner: TaskRunner,
    sync: Arc<VersionSyncPipeline>,
    packaging: Arc<PackagingPipeline>,
    task_max_age: Duration,
}

impl Scheduler {
    pub fn new(
        pool: SqlitePool,
        catalog: Arc<dyn Catalog>,
        registry: Arc<TaskRegistry>,
        runner: TaskRunner,
        sync: Arc<VersionSyncPipeline>,
        packaging: Arc<PackagingPipeline>,
        task_max_age: Duration,
    ) -> Self {
        Self {
            pool,
            catalog,
            registry,
            runner,
            sync,
            packaging,
            task_max_age,
        }
    }

    /// Spawn all loops. Returns immediately; the loops run until the
    /// process exits.
    pub fn start(self: Arc<Self>) {
        let scheduler = Arc::clone(&self);
        tokio::spawn(async move {
            scheduler.eviction_loop().await;
        });

        let scheduler = Arc::clone(&self);
        tokio::spawn(async move {
            scheduler.validity_loop().await;
        });

        tokio::spawn(async move {
            self.content_loop().await;
        });

        info!("Scheduler started");
    }

    async fn eviction_loop(&self) {
        let mut ticker = interval(EVICTION_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick fires immediately; skip it so startup stays quiet
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let evicted = self.registry.evict_older_than(self.task_max_age);
            if evicted > 0 {
                info!(evicted, "Evicted finished tasks");
            }
        }
    }

    async fn validity_loop(&self) {
        let mut ticker = interval(VALIDITY_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match version_sync::check_projects_valid(
                &self.pool,
                Arc::clone(&self.catalog),
                &self.runner,
            )
            .await
            {
                Ok(cleared) if cleared > 0 => {
                    info!(cleared, "Dropped opt-in for unavailable projects");
                }
                Ok(_) => {}
                Err(e) => error!("Project validity sweep failed: {}", e),
            }
        }
    }

    async fn content_loop(&self) {
        let mut ticker = interval(CONTENT_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.sync_and_package().await;
        }
    }

    /// Sync every opted-in project, then run one packaging pass. Per-project
    /// sync failures are logged and do not block the rest of the cycle.
    async fn sync_and_package(&self) {
        let opted_in = match projects::list_opted_in(&self.pool).await {
            Ok(projects) => projects,
            Err(e) => {
                error!("Could not list opted-in projects: {}", e);
                return;
            }
        };

        info!(count = opted_in.len(), "Starting content cycle");
        for project in opted_in {
            if let Err(e) = self.sync.sync_project(&project.id).await {
                error!(project_id = %project.id, "Release sync failed: {}", e);
            }
        }

        if let Err(e) = self.packaging.run().await {
            error!("Packaging pass failed: {}", e);
        }
    }
}
