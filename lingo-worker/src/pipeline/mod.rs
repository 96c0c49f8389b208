//! Content pipelines: release ingestion and translation packaging

pub mod packaging;
pub mod version_sync;

pub use packaging::PackagingPipeline;
pub use version_sync::VersionSyncPipeline;
