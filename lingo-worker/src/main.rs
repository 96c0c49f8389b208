//! lingo-worker - Background content pipeline for the Lingo translation platform
//!
//! Ingests upstream releases for opted-in projects, tracks community proposal
//! consensus, and bundles accepted translations into resource packs on a
//! fixed schedule.

use anyhow::Result;
use lingo_common::config::Config;
use lingo_common::db::init_database;
use lingo_worker::pipeline::{PackagingPipeline, VersionSyncPipeline};
use lingo_worker::scheduler::Scheduler;
use lingo_worker::services::catalog::ModrinthCatalog;
use lingo_worker::tasks::{TaskRegistry, TaskRunner};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting Lingo worker v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    std::fs::create_dir_all(&config.data_dir)?;

    let db_path = config.database_path();
    info!("Database path: {}", db_path.display());

    let pool = match init_database(&db_path).await {
        Ok(pool) => {
            info!("Connected to database");
            pool
        }
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    let registry = Arc::new(TaskRegistry::new());
    let runner = TaskRunner::new(Arc::clone(&registry));
    let catalog: Arc<dyn lingo_worker::services::catalog::Catalog> =
        Arc::new(ModrinthCatalog::new(&config.catalog_url)?);

    let sync = Arc::new(VersionSyncPipeline::new(
        pool.clone(),
        Arc::clone(&catalog),
        runner.clone(),
        config.source_language.clone(),
        config.sync_concurrency,
    ));
    let packaging = Arc::new(PackagingPipeline::new(
        pool.clone(),
        runner.clone(),
        &config.pack_output_dir,
        config.packaging.clone(),
    ));

    let scheduler = Arc::new(Scheduler::new(
        pool,
        catalog,
        registry,
        runner,
        sync,
        packaging,
        config.task_max_age,
    ));
    scheduler.start();

    info!("Lingo worker running");
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    Ok(())
}
