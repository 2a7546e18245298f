//! Text lookup for display strings.
//!
//! Labels, plurals, descriptions and validation messages are stored as raw
//! text keys and resolved through a [`Translator`] passed to
//! [`ModelBuilder::new`](crate::ModelBuilder::new).

use std::collections::HashMap;

/// Maps a raw text key to a display string.
pub trait Translator: Send + Sync {
    /// Returns the display text for `key`.
    fn gettext(&self, key: &str) -> String;
}

/// Returns every key unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Translator for Identity {
    fn gettext(&self, key: &str) -> String {
        key.to_string()
    }
}

/// In-memory message catalog, falling back to the key for unknown entries.
///
/// # Examples
///
/// ```
/// use entity_schema_core::{Catalog, Translator};
///
/// let catalog = Catalog::new("de").with_message("Person", "Person").with_message("People", "Personen");
/// assert_eq!(catalog.gettext("People"), "Personen");
/// assert_eq!(catalog.gettext("Company"), "Company");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    locale: String,
    messages: HashMap<String, String>,
}

impl Catalog {
    /// Creates an empty catalog for `locale`.
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            messages: HashMap::new(),
        }
    }

    /// Creates a catalog from an existing key → text map.
    pub fn from_messages(locale: impl Into<String>, messages: HashMap<String, String>) -> Self {
        Self {
            locale: locale.into(),
            messages,
        }
    }

    /// Adds a translation.
    pub fn with_message(mut self, key: &str, text: &str) -> Self {
        self.messages.insert(key.to_string(), text.to_string());
        self
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Translator for Catalog {
    fn gettext(&self, key: &str) -> String {
        self.messages
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}
