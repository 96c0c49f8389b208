//! # Lingo Common Library
//!
//! Shared code for the Lingo translation backend:
//! - Database initialization and row models
//! - Task and task-event types (TaskEvent enum)
//! - Configuration loading
//! - Common error type

pub mod config;
pub mod db;
pub mod error;
pub mod events;

pub use error::{Error, Result};
