//! Loading, translation and export for entity schema models.
//!
//! This crate turns schema definition files into a resolved
//! [`Model`](entity_schema_core::Model) and back out into hashed export
//! bundles:
//!
//! - [`SchemaDatabase`] reads JSON or YAML definition files from directories
//!   or single files, with a [`DatabaseBuilder`] fallback chain.
//! - [`LoaderConfig`] describes sources, catalog and namespace in YAML.
//! - [`load_catalog`] reads a message catalog for display text.
//! - [`ModelBundle`] is the verified export format.
//!
//! # Quick start
//!
//! ```no_run
//! use entity_schema_db::{load_catalog, ModelBundle, SchemaDatabase};
//! use std::sync::Arc;
//!
//! let db = SchemaDatabase::builder()
//!     .from_dir("schema/")
//!     .from_file("schema.yaml")
//!     .build()
//!     .unwrap();
//!
//! let catalog = load_catalog("locale/de.yaml").unwrap();
//! let model = db.model(Arc::new(catalog), None).unwrap();
//!
//! let bundle = ModelBundle::new(&model, "2024-01-15T10:30:00Z").unwrap();
//! bundle.save("model.json").unwrap();
//! ```

mod bundle;
mod config;
mod error;
mod loader;

pub use bundle::{BUNDLE_FORMAT_VERSION, ModelBundle};
pub use config::{CatalogFile, LoaderConfig, load_catalog};
pub use error::{DatabaseError, Result};
pub use loader::{DatabaseBuilder, DatabaseSource, DefinitionFormat, SchemaDatabase};
