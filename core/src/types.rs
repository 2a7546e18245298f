//! Scalar property types.
//!
//! Every [`Property`](crate::Property) carries exactly one [`PropertyType`].
//! The type decides how a raw value is validated, whether values of that
//! type are useful for cross-entity matching, and whether they become value
//! nodes when an entity is projected into a [`Graph`](crate::Graph).

use std::net::IpAddr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}(-[01]\d(-[0-3]\d(T[0-2]\d(:[0-5]\d(:[0-5]\d)?)?)?)?)?$")
        .expect("static regex must compile")
});
static COUNTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2}(-[a-z0-9]{1,8})?$").expect("static regex must compile"));
static LANGUAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{3}$").expect("static regex must compile"));
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static regex must compile")
});
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[0-9][0-9 ()./-]{3,}$").expect("static regex must compile")
});
static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)(https?|ftp)://[^\s/$.?#][^\s]*$").expect("static regex must compile")
});
static ENTITY_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._:-]+$").expect("static regex must compile"));

/// Value kind of a property.
///
/// The serialized form is the lowercase type name used in raw schema
/// definitions (`type: date`).
///
/// # Examples
///
/// ```
/// use entity_schema_core::PropertyType;
///
/// let kind = PropertyType::from_name("date").unwrap();
/// assert_eq!(kind, PropertyType::Date);
/// assert!(kind.validate("2021-04-01"));
/// assert!(!kind.validate("yesterday"));
/// assert_eq!(PropertyType::default(), PropertyType::String);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    /// Short free-form text (the default).
    #[default]
    String,
    /// Long free-form text.
    Text,
    /// Name of a person, organization or thing.
    Name,
    /// Registration number, code or other identifier.
    Identifier,
    /// Postal address.
    Address,
    /// ISO 8601 date prefix (`2021`, `2021-04`, `2021-04-01T10:00`).
    Date,
    /// Decimal number, thousands separators allowed.
    Number,
    /// Lowercase ISO 3166 country code, optionally with a subdivision suffix.
    Country,
    /// Lowercase ISO 639-2 language code.
    Language,
    /// E-mail address.
    Email,
    /// Phone number.
    Phone,
    /// Absolute HTTP(S) or FTP URL.
    Url,
    /// IPv4 or IPv6 address.
    Ip,
    /// Arbitrary JSON document.
    Json,
    /// Reference to another entity by id.
    Entity,
}

impl PropertyType {
    /// All known property types in registry order.
    pub const ALL: [PropertyType; 15] = [
        PropertyType::String,
        PropertyType::Text,
        PropertyType::Name,
        PropertyType::Identifier,
        PropertyType::Address,
        PropertyType::Date,
        PropertyType::Number,
        PropertyType::Country,
        PropertyType::Language,
        PropertyType::Email,
        PropertyType::Phone,
        PropertyType::Url,
        PropertyType::Ip,
        PropertyType::Json,
        PropertyType::Entity,
    ];

    /// Returns the type name used in raw schema definitions.
    pub fn name(&self) -> &'static str {
        match self {
            PropertyType::String => "string",
            PropertyType::Text => "text",
            PropertyType::Name => "name",
            PropertyType::Identifier => "identifier",
            PropertyType::Address => "address",
            PropertyType::Date => "date",
            PropertyType::Number => "number",
            PropertyType::Country => "country",
            PropertyType::Language => "language",
            PropertyType::Email => "email",
            PropertyType::Phone => "phone",
            PropertyType::Url => "url",
            PropertyType::Ip => "ip",
            PropertyType::Json => "json",
            PropertyType::Entity => "entity",
        }
    }

    /// Looks up a type by its name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Untranslated display label.
    pub fn label(&self) -> &'static str {
        match self {
            PropertyType::String => "Label",
            PropertyType::Text => "Text",
            PropertyType::Name => "Name",
            PropertyType::Identifier => "Identifier",
            PropertyType::Address => "Address",
            PropertyType::Date => "Date",
            PropertyType::Number => "Number",
            PropertyType::Country => "Country",
            PropertyType::Language => "Language",
            PropertyType::Email => "E-Mail Address",
            PropertyType::Phone => "Phone number",
            PropertyType::Url => "URL",
            PropertyType::Ip => "IP Address",
            PropertyType::Json => "Nested data",
            PropertyType::Entity => "Entity",
        }
    }

    /// Values of matchable types are meaningful evidence when comparing two
    /// entities.
    pub fn matchable(&self) -> bool {
        !matches!(
            self,
            PropertyType::Text | PropertyType::Json | PropertyType::Number
        )
    }

    /// Pivot types connect entities that share a value, so they are
    /// projected as value nodes in a graph.
    pub fn pivot(&self) -> bool {
        matches!(
            self,
            PropertyType::Name
                | PropertyType::Identifier
                | PropertyType::Address
                | PropertyType::Email
                | PropertyType::Phone
                | PropertyType::Url
                | PropertyType::Ip
                | PropertyType::Entity
        )
    }

    /// Checks a single raw value against this type.
    ///
    /// # Examples
    ///
    /// ```
    /// use entity_schema_core::PropertyType;
    ///
    /// assert!(PropertyType::Email.validate("info@example.com"));
    /// assert!(!PropertyType::Email.validate("example.com"));
    /// assert!(PropertyType::Number.validate("1,250.5"));
    /// assert!(PropertyType::Country.validate("de"));
    /// assert!(!PropertyType::String.validate("   "));
    /// ```
    pub fn validate(&self, value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() {
            return false;
        }
        match self {
            PropertyType::String
            | PropertyType::Text
            | PropertyType::Name
            | PropertyType::Identifier
            | PropertyType::Address => true,
            PropertyType::Date => DATE_RE.is_match(value),
            PropertyType::Number => value.replace(',', "").parse::<f64>().is_ok(),
            PropertyType::Country => COUNTRY_RE.is_match(value),
            PropertyType::Language => LANGUAGE_RE.is_match(value),
            PropertyType::Email => EMAIL_RE.is_match(value),
            PropertyType::Phone => PHONE_RE.is_match(value),
            PropertyType::Url => URL_RE.is_match(value),
            PropertyType::Ip => value.parse::<IpAddr>().is_ok(),
            PropertyType::Json => serde_json::from_str::<serde_json::Value>(value).is_ok(),
            PropertyType::Entity => ENTITY_ID_RE.is_match(value),
        }
    }

    /// Graph node identifier for a value of this type.
    ///
    /// Entity references share the `id:` prefix so that an entity node and
    /// a reference to it collapse into one node.
    pub fn node_id(&self, value: &str) -> String {
        match self {
            PropertyType::Entity => format!("id:{value}"),
            other => format!("{}:{value}", other.name()),
        }
    }

    /// Serializable description of this type.
    pub fn to_dict(&self) -> TypeDict {
        TypeDict {
            label: self.label().to_string(),
            matchable: self.matchable(),
            pivot: self.pivot(),
        }
    }
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Exported form of a [`PropertyType`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDict {
    /// Display label.
    pub label: String,
    /// See [`PropertyType::matchable`].
    pub matchable: bool,
    /// See [`PropertyType::pivot`].
    pub pivot: bool,
}
