//! # Lingo Worker
//!
//! Core content pipeline for the Lingo translation backend:
//! - In-memory task registry + runner with live progress events
//! - Consensus engine deciding the accepted proposal per translation slot
//! - Version sync pipeline ingesting new upstream releases
//! - Packaging pipeline bundling accepted translations into resource packs

pub mod consensus;
pub mod db;
pub mod pipeline;
pub mod proposals;
pub mod scheduler;
pub mod services;
pub mod tasks;
