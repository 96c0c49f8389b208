//! Background task engine: registry, runner, progress reporting

pub mod registry;
pub mod runner;

pub use registry::TaskRegistry;
pub use runner::{ProgressHandle, TaskRunner};
