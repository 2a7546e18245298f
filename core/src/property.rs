//! Property definitions.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{PropertyConfig, ReverseConfig};
use crate::error::{ModelError, Result};
use crate::text::Translator;
use crate::types::PropertyType;

/// A named, typed attribute of a schema.
///
/// A property is owned by the schema that declares it (or, for a reverse
/// stub, the schema it was synthesized on). Schemas that inherit it hold a
/// copy with the same owner, so [`schema`](Self::schema) always names the
/// declaring schema.
#[derive(Clone)]
pub struct Property {
    name: String,
    schema: String,
    label: Option<String>,
    description: Option<String>,
    kind: PropertyType,
    hidden: bool,
    stub: bool,
    matchable: bool,
    range: Option<String>,
    reverse: Option<ReverseConfig>,
    translator: Arc<dyn Translator>,
}

impl Property {
    /// Builds a property of `schema` from its raw configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownPropertyType`] if the configured type
    /// name is not in the registry.
    pub fn new(
        schema: &str,
        name: &str,
        config: &PropertyConfig,
        translator: Arc<dyn Translator>,
    ) -> Result<Self> {
        let kind = PropertyType::from_name(&config.type_name).ok_or_else(|| {
            ModelError::UnknownPropertyType {
                property: format!("{schema}:{name}"),
                type_name: config.type_name.clone(),
            }
        })?;
        Ok(Self {
            name: name.to_string(),
            schema: schema.to_string(),
            label: config.label.clone(),
            description: config.description.clone(),
            kind,
            hidden: config.hidden,
            stub: config.stub,
            matchable: config.matchable.unwrap_or_else(|| kind.matchable()),
            range: config.range.clone(),
            reverse: config.reverse.clone(),
            translator,
        })
    }

    /// Synthesizes the back-reference for `origin` on schema `target`.
    pub(crate) fn reverse_of(target: &str, name: &str, fragment: &ReverseConfig, origin: &Property) -> Self {
        Self {
            name: name.to_string(),
            schema: target.to_string(),
            label: fragment.label.clone(),
            description: None,
            kind: PropertyType::Entity,
            hidden: fragment.hidden.unwrap_or(origin.hidden),
            stub: true,
            matchable: PropertyType::Entity.matchable(),
            range: Some(origin.schema.clone()),
            reverse: Some(ReverseConfig::named(&origin.name)),
            translator: Arc::clone(&origin.translator),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the owning schema.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Qualified name, `Schema:property`.
    pub fn qname(&self) -> String {
        format!("{}:{}", self.schema, self.name)
    }

    /// Display label, defaulting to the property name.
    pub fn label(&self) -> String {
        self.translator
            .gettext(self.label.as_deref().unwrap_or(&self.name))
    }

    pub fn description(&self) -> Option<String> {
        self.description
            .as_deref()
            .map(|key| self.translator.gettext(key))
    }

    pub fn kind(&self) -> PropertyType {
        self.kind
    }

    pub fn hidden(&self) -> bool {
        self.hidden
    }

    /// `true` for synthesized back-references.
    pub fn stub(&self) -> bool {
        self.stub
    }

    pub fn matchable(&self) -> bool {
        self.matchable
    }

    /// Schema referenced by an entity-valued property.
    pub fn range(&self) -> Option<&str> {
        self.range.as_deref()
    }

    /// Name of the paired property on the range schema.
    pub fn reverse(&self) -> Option<&str> {
        self.reverse.as_ref().and_then(|r| r.name.as_deref())
    }

    pub(crate) fn reverse_config(&self) -> Option<&ReverseConfig> {
        self.reverse.as_ref()
    }

    /// Validates the values supplied for this property.
    ///
    /// Objects are reduced to their `id` member and nulls are skipped.
    /// Returns the translated message for the first bad value.
    pub fn validate(&self, values: &[Value]) -> Option<String> {
        for value in values {
            let value = match value {
                Value::Object(map) => map.get("id").unwrap_or(&Value::Null),
                other => other,
            };
            let valid = match value {
                Value::Null => true,
                Value::String(text) => self.kind.validate(text),
                Value::Number(number) => self.kind.validate(&number.to_string()),
                Value::Bool(flag) => self.kind.validate(&flag.to_string()),
                Value::Array(_) | Value::Object(_) => false,
            };
            if !valid {
                return Some(self.translator.gettext("Invalid value"));
            }
        }
        None
    }

    /// Serializable snapshot of this property.
    pub fn to_dict(&self) -> PropertyDict {
        PropertyDict {
            name: self.name.clone(),
            qname: self.qname(),
            label: self.label(),
            kind: self.kind,
            description: self.description(),
            hidden: self.hidden,
            stub: self.stub,
            matchable: self.matchable,
            range: self.range.clone(),
            reverse: self.reverse().map(str::to_string),
        }
    }
}

impl PartialEq for Property {
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema && self.name == other.name
    }
}

impl Eq for Property {}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("qname", &self.qname())
            .field("kind", &self.kind)
            .field("hidden", &self.hidden)
            .field("stub", &self.stub)
            .field("range", &self.range)
            .field("reverse", &self.reverse())
            .finish()
    }
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

/// Exported form of a [`Property`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDict {
    pub name: String,
    pub qname: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: PropertyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub stub: bool,
    pub matchable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse: Option<String>,
}
