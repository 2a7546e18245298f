//! Loader configuration and translation catalogs.
//!
//! A [`LoaderConfig`] names where schema definitions live, which message
//! catalog to translate display text with, and the URI namespace to assign.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! sources:
//!   - /etc/entity-schema/schema
//!   - schema.yaml
//! catalog: locale/de.yaml
//! namespace: "https://example.org/schema/"
//! ```

use std::collections::HashMap;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use entity_schema_core::{Catalog, Identity, Model, Translator};
use serde::{Deserialize, Serialize};

use crate::error::{DatabaseError, Result};
use crate::loader::{DatabaseBuilder, DatabaseSource, DefinitionFormat, SchemaDatabase};

/// Where to load a model from and how to present it.
///
/// # Examples
///
/// ```no_run
/// use entity_schema_db::LoaderConfig;
///
/// let config = LoaderConfig::load("entity-schema.yml").unwrap();
/// let model = config.load_model().unwrap();
/// println!("{} schemata", model.len());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Configuration format version (e.g., `"1.0"`).
    pub version: String,
    /// Definition directories or files, tried in order as a fallback chain.
    #[serde(default)]
    pub sources: Vec<PathBuf>,
    /// Message catalog used to translate labels and validation messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<PathBuf>,
    /// URI namespace overriding the default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            sources: Vec::new(),
            catalog: None,
            namespace: None,
        }
    }
}

impl LoaderConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::DatabaseError::IoError) if the file cannot
    /// be read, or [`YamlError`](crate::DatabaseError::YamlError) if parsing
    /// fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::DatabaseError::IoError) if the file cannot
    /// be written, or [`YamlError`](crate::DatabaseError::YamlError) if
    /// serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Fallback chain over the configured sources.
    pub fn builder(&self) -> DatabaseBuilder {
        self.sources
            .iter()
            .fold(SchemaDatabase::builder(), |builder, path| {
                builder.source(DatabaseSource::from_path(path.clone()))
            })
    }

    /// Translator for the configured catalog, or [`Identity`] without one.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog file cannot be loaded.
    pub fn translator(&self) -> Result<Arc<dyn Translator>> {
        match &self.catalog {
            Some(path) => Ok(Arc::new(load_catalog(path)?)),
            None => Ok(Arc::new(Identity)),
        }
    }

    /// Loads the definitions and resolves them into a [`Model`].
    ///
    /// # Errors
    ///
    /// Returns [`NoSourcesAvailable`](crate::DatabaseError::NoSourcesAvailable)
    /// if no source loads, a catalog error, or a model error.
    pub fn load_model(&self) -> Result<Model> {
        let db = self.builder().build()?;
        db.model(self.translator()?, self.namespace.as_deref())
    }
}

/// On-disk form of a message catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogFile {
    pub locale: String,
    #[serde(default)]
    pub messages: HashMap<String, String>,
}

/// Loads a JSON or YAML message catalog.
///
/// ```yaml
/// locale: de
/// messages:
///   Person: Person
///   People: Personen
///   Required: Pflichtfeld
/// ```
///
/// # Errors
///
/// Returns [`UnsupportedFormat`](crate::DatabaseError::UnsupportedFormat) for
/// unknown extensions, or an I/O or parse error.
pub fn load_catalog(path: impl AsRef<Path>) -> Result<Catalog> {
    let path = path.as_ref();
    let format = DefinitionFormat::detect(path)
        .ok_or_else(|| DatabaseError::UnsupportedFormat(path.display().to_string()))?;
    let reader = BufReader::new(std::fs::File::open(path)?);
    let file: CatalogFile = match format {
        DefinitionFormat::Json => serde_json::from_reader(reader)?,
        DefinitionFormat::Yaml => serde_yaml::from_reader(reader)?,
    };
    tracing::debug!(locale = %file.locale, messages = file.messages.len(), "loaded catalog");
    Ok(Catalog::from_messages(file.locale, file.messages))
}
