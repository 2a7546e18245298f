//! Schema definition loading with builder pattern and fallback chains.
//!
//! Provides [`SchemaDatabase`], an in-memory collection of raw schema
//! definitions, and [`DatabaseBuilder`] for loading one from several
//! candidate sources with automatic fallback.
//!
//! Definition files are JSON or YAML documents mapping schema names to
//! [`SchemaConfig`] entries. A directory source reads every `*.json`,
//! `*.yml` and `*.yaml` file in it.
//!
//! # Loading patterns
//!
//! ```no_run
//! use std::sync::Arc;
//! use entity_schema_core::Identity;
//! use entity_schema_db::SchemaDatabase;
//!
//! // Load every definition file in a directory
//! let db = SchemaDatabase::from_dir("schema/").unwrap();
//! assert!(db.contains("Person"));
//!
//! // Use the builder for a fallback chain
//! let db = SchemaDatabase::builder()
//!     .from_dir("/etc/entity-schema/")
//!     .from_file("schema.yaml")
//!     .build()
//!     .unwrap();
//!
//! let model = db.model(Arc::new(Identity), None).unwrap();
//! ```

use std::collections::BTreeMap;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use entity_schema_core::{Model, ModelBuilder, SchemaConfig, Translator};
use tracing::{debug, info};

use crate::error::{DatabaseError, Result};

/// Serialization format of a definition file, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionFormat {
    Json,
    Yaml,
}

impl DefinitionFormat {
    /// Detects the format of `path`, or `None` for unsupported extensions.
    pub fn detect(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Some(Self::Json),
            Some("yml" | "yaml") => Some(Self::Yaml),
            _ => None,
        }
    }
}

/// Describes where a [`SchemaDatabase`] was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseSource {
    /// Loaded from a directory of definition files.
    Directory(PathBuf),
    /// Loaded from a single definition file.
    File(PathBuf),
    /// Assembled from several sources, or via a fallback chain.
    Multiple(Vec<DatabaseSource>),
}

impl DatabaseSource {
    /// Classifies `path` as a directory or file source.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.is_dir() {
            Self::Directory(path)
        } else {
            Self::File(path)
        }
    }

    fn load(&self) -> Result<SchemaDatabase> {
        match self {
            Self::Directory(path) => SchemaDatabase::from_dir(path),
            Self::File(path) => SchemaDatabase::from_file(path),
            Self::Multiple(sources) => {
                let mut db = SchemaDatabase::empty(self.clone());
                for source in sources {
                    db.merge(source.load()?)?;
                }
                Ok(db)
            }
        }
    }
}

/// Raw schema definitions keyed by schema name.
///
/// The database only holds unresolved [`SchemaConfig`]s; call
/// [`model`](Self::model) to resolve them into a frozen [`Model`]. Every
/// definition remembers the file it came from so that clashes between files
/// can be reported precisely.
#[derive(Debug, Clone)]
pub struct SchemaDatabase {
    definitions: BTreeMap<String, SchemaConfig>,
    origins: BTreeMap<String, PathBuf>,
    source: DatabaseSource,
}

impl SchemaDatabase {
    /// Returns a new [`DatabaseBuilder`] for configuring a fallback chain.
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    fn empty(source: DatabaseSource) -> Self {
        Self {
            definitions: BTreeMap::new(),
            origins: BTreeMap::new(),
            source,
        }
    }

    /// Loads every definition file in a directory.
    ///
    /// Files are read in name order. Files with other extensions are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::IoError`] if the directory or a file cannot be
    /// read, a parse error for malformed files, or
    /// [`DatabaseError::DuplicateSchema`] if two files define the same name.
    pub fn from_dir(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut files = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let file_path = entry?.path();
            if file_path.is_file() && DefinitionFormat::detect(&file_path).is_some() {
                files.push(file_path);
            } else {
                debug!(path = %file_path.display(), "skipping non-definition entry");
            }
        }
        files.sort();

        let mut db = Self::empty(DatabaseSource::Directory(path.to_path_buf()));
        for file in &files {
            db.absorb(file, read_definitions(file)?)?;
        }
        info!(
            dir = %path.display(),
            files = files.len(),
            schemata = db.len(),
            "loaded schema definitions"
        );
        Ok(db)
    }

    /// Loads a single JSON or YAML definition file.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::UnsupportedFormat`] for unknown extensions,
    /// [`DatabaseError::IoError`] if the file cannot be read, or a parse error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut db = Self::empty(DatabaseSource::File(path.to_path_buf()));
        db.absorb(path, read_definitions(path)?)?;
        debug!(file = %path.display(), schemata = db.len(), "loaded schema definitions");
        Ok(db)
    }

    /// Loads and merges several files or directories.
    ///
    /// Unlike the [`DatabaseBuilder`] fallback chain, every path must load.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::NoSourcesAvailable`] when `paths` is empty,
    /// otherwise the first load or merge failure.
    pub fn from_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        if paths.is_empty() {
            return Err(DatabaseError::NoSourcesAvailable);
        }
        let sources = paths
            .iter()
            .map(|p| DatabaseSource::from_path(p.as_ref().to_path_buf()))
            .collect();
        DatabaseSource::Multiple(sources).load()
    }

    /// Moves every definition of `other` into this database.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::DuplicateSchema`] if a name is already present.
    pub fn merge(&mut self, other: SchemaDatabase) -> Result<()> {
        for (name, config) in other.definitions {
            let origin = other.origins.get(&name).cloned().unwrap_or_default();
            self.claim(&name, &origin)?;
            self.definitions.insert(name, config);
        }
        Ok(())
    }

    fn absorb(&mut self, path: &Path, definitions: BTreeMap<String, SchemaConfig>) -> Result<()> {
        for (name, config) in definitions {
            self.claim(&name, path)?;
            self.definitions.insert(name, config);
        }
        Ok(())
    }

    fn claim(&mut self, name: &str, path: &Path) -> Result<()> {
        if let Some(first) = self.origins.get(name) {
            return Err(DatabaseError::DuplicateSchema {
                name: name.to_string(),
                first: first.display().to_string(),
                second: path.display().to_string(),
            });
        }
        self.origins.insert(name.to_string(), path.to_path_buf());
        Ok(())
    }

    /// Looks up the raw definition of a schema.
    pub fn get(&self, name: &str) -> Option<&SchemaConfig> {
        self.definitions.get(name)
    }

    /// File a definition was loaded from, if it came from disk.
    pub fn origin(&self, name: &str) -> Option<&Path> {
        self.origins
            .get(name)
            .map(PathBuf::as_path)
            .filter(|p| !p.as_os_str().is_empty())
    }

    /// Inserts a definition, replacing any existing entry for the same name.
    pub fn insert(&mut self, name: String, config: SchemaConfig) {
        self.origins.insert(name.clone(), PathBuf::new());
        self.definitions.insert(name, config);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Schema names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn definitions(&self) -> &BTreeMap<String, SchemaConfig> {
        &self.definitions
    }

    pub fn source(&self) -> &DatabaseSource {
        &self.source
    }

    /// Resolves the loaded definitions into a frozen [`Model`].
    ///
    /// `namespace` overrides the default URI namespace of the schemata.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Model`] if the definitions are inconsistent.
    pub fn model(&self, translator: Arc<dyn Translator>, namespace: Option<&str>) -> Result<Model> {
        let mut builder = ModelBuilder::new(translator);
        if let Some(namespace) = namespace {
            builder = builder.with_namespace(namespace);
        }
        builder.add_schemata(&self.definitions)?;
        let model = builder.build()?;
        info!(schemata = model.len(), "resolved model");
        Ok(model)
    }
}

fn read_definitions(path: &Path) -> Result<BTreeMap<String, SchemaConfig>> {
    let format = DefinitionFormat::detect(path)
        .ok_or_else(|| DatabaseError::UnsupportedFormat(path.display().to_string()))?;
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);
    let definitions = match format {
        DefinitionFormat::Json => serde_json::from_reader(reader)?,
        DefinitionFormat::Yaml => serde_yaml::from_reader(reader)?,
    };
    Ok(definitions)
}

/// Builder for constructing a [`SchemaDatabase`] with a fallback chain.
///
/// Sources are tried in the order they are added. The first successful load
/// wins; if all fail, [`DatabaseError::NoSourcesAvailable`] is returned.
///
/// # Example
///
/// ```no_run
/// use entity_schema_db::SchemaDatabase;
///
/// let db = SchemaDatabase::builder()
///     .from_dir("/opt/schema/")
///     .from_file("/opt/schema.json")
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Default)]
pub struct DatabaseBuilder {
    sources: Vec<DatabaseSource>,
}

impl DatabaseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a directory of definition files as a source.
    pub fn from_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(DatabaseSource::Directory(path.into()));
        self
    }

    /// Adds a single definition file as a source.
    pub fn from_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(DatabaseSource::File(path.into()));
        self
    }

    /// Adds an arbitrary source, such as a [`DatabaseSource::Multiple`] group.
    pub fn source(mut self, source: DatabaseSource) -> Self {
        self.sources.push(source);
        self
    }

    /// Attempts to load definitions from the configured sources in order.
    ///
    /// Returns the first successfully loaded database, with its source set
    /// to the whole chain.
    pub fn build(self) -> Result<SchemaDatabase> {
        for source in &self.sources {
            match source.load() {
                Ok(mut db) => {
                    db.source = DatabaseSource::Multiple(self.sources.clone());
                    return Ok(db);
                }
                Err(err) => debug!(?source, %err, "schema source failed, trying next"),
            }
        }
        Err(DatabaseError::NoSourcesAvailable)
    }
}
