//! External-facing services: upstream catalog client, artifact string extraction

pub mod catalog;
pub mod extractor;

pub use catalog::{Catalog, CatalogFile, CatalogProject, CatalogVersion, ModrinthCatalog};
