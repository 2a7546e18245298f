//! Exported model bundles.
//!
//! A [`ModelBundle`] is the resolved, serializable form of a [`Model`] as
//! consumed by front ends. It carries a SHA-256 hash of the canonical JSON of
//! the model so that stale or hand-edited exports can be detected.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use entity_schema_core::Identity;
//! use entity_schema_db::{ModelBundle, SchemaDatabase};
//!
//! let db = SchemaDatabase::from_dir("schema/").unwrap();
//! let model = db.model(Arc::new(Identity), None).unwrap();
//!
//! let bundle = ModelBundle::new(&model, "2024-01-15T10:30:00Z").unwrap();
//! bundle.save("model.json").unwrap();
//!
//! let loaded = ModelBundle::load("model.json").unwrap();
//! loaded.verify().unwrap();
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use entity_schema_core::{Model, ModelDict};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{DatabaseError, Result};

/// Bundle format version written by [`ModelBundle::new`].
pub const BUNDLE_FORMAT_VERSION: &str = "1.0";

/// A resolved model together with provenance metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelBundle {
    /// Bundle format version (e.g., `"1.0"`).
    pub version: String,
    /// ISO-8601 timestamp of the export.
    pub generated_at: String,
    /// SHA-256 hex digest of the canonical JSON of `model`.
    pub bundle_hash: String,
    pub model: ModelDict,
}

impl ModelBundle {
    /// Snapshots `model` and hashes it.
    ///
    /// # Errors
    ///
    /// Returns [`JsonError`](DatabaseError::JsonError) if the model cannot be
    /// serialized.
    pub fn new(model: &Model, generated_at: impl Into<String>) -> Result<Self> {
        let model = model.to_dict();
        Ok(Self {
            version: BUNDLE_FORMAT_VERSION.to_string(),
            generated_at: generated_at.into(),
            bundle_hash: Self::compute_hash(&model)?,
            model,
        })
    }

    /// SHA-256 hex digest of the compact JSON encoding of `model`.
    ///
    /// Maps in [`ModelDict`] are ordered, so equal models hash equally.
    pub fn compute_hash(model: &ModelDict) -> Result<String> {
        let bytes = serde_json::to_vec(model)?;
        let hash = Sha256::digest(&bytes);
        Ok(format!("{:x}", hash))
    }

    /// Checks that `bundle_hash` matches the embedded model.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidChecksum`](DatabaseError::InvalidChecksum) on mismatch.
    pub fn verify(&self) -> Result<()> {
        let actual = Self::compute_hash(&self.model)?;
        if actual != self.bundle_hash {
            return Err(DatabaseError::InvalidChecksum(format!(
                "expected {}, computed {}",
                self.bundle_hash, actual
            )));
        }
        Ok(())
    }

    /// Loads a bundle from a JSON file.
    ///
    /// The hash is not checked; call [`verify`](Self::verify) for that.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let bundle = serde_json::from_reader(reader)?;
        Ok(bundle)
    }

    /// Saves the bundle as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Saves the bundle as YAML.
    pub fn save_yaml(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use entity_schema_core::{Identity, ModelBuilder, SchemaConfig};
    use serde_json::json;

    use super::*;

    fn model() -> Model {
        let definitions: std::collections::BTreeMap<String, SchemaConfig> =
            serde_json::from_value(json!({
                "Thing": {"properties": {"name": {"type": "name"}}},
                "Person": {"extends": "Thing", "label": "Person", "plural": "People"}
            }))
            .unwrap();
        let mut builder = ModelBuilder::new(Arc::new(Identity));
        builder.add_schemata(&definitions).unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn test_new_hashes_model() {
        let bundle = ModelBundle::new(&model(), "2024-01-15T10:30:00Z").unwrap();
        assert_eq!(bundle.version, BUNDLE_FORMAT_VERSION);
        assert_eq!(bundle.bundle_hash.len(), 64);
        assert!(bundle.model.schemata.contains_key("Person"));
        bundle.verify().unwrap();
    }

    #[test]
    fn test_hash_is_stable() {
        let first = ModelBundle::new(&model(), "2024-01-15T10:30:00Z").unwrap();
        let second = ModelBundle::new(&model(), "2025-06-01T00:00:00Z").unwrap();
        assert_eq!(first.bundle_hash, second.bundle_hash);
    }

    #[test]
    fn test_verify_detects_tampering() {
        let mut bundle = ModelBundle::new(&model(), "2024-01-15T10:30:00Z").unwrap();
        if let Some(person) = bundle.model.schemata.get_mut("Person") {
            person.label = "Human".into();
        }
        assert!(matches!(bundle.verify(), Err(DatabaseError::InvalidChecksum(_))));
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = std::env::temp_dir().join("es_db_test_bundle_rt");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("model.json");

        let bundle = ModelBundle::new(&model(), "2024-01-15T10:30:00Z").unwrap();
        bundle.save(&path).unwrap();
        let loaded = ModelBundle::load(&path).unwrap();
        assert_eq!(loaded, bundle);
        loaded.verify().unwrap();

        std::fs::remove_dir_all(&dir).ok();
    }
}
