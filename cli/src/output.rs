//! Output formatting for resolved schemas.

use std::collections::BTreeMap;

use entity_schema_core::{Property, PropertyDict, Schema, SchemaDict};
use serde::Serialize;

/// Supported output formats for `show`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
    Markdown,
    Table,
}

/// Supported formats for exported bundles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BundleFormat {
    Json,
    Yaml,
}

/// Serialized view of one schema: its own export plus everything it inherits.
#[derive(Debug, Serialize)]
struct SchemaView {
    name: String,
    #[serde(flatten)]
    schema: SchemaDict,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    inherited: BTreeMap<String, PropertyDict>,
}

impl SchemaView {
    fn new(schema: &Schema) -> Self {
        let inherited = schema
            .properties()
            .values()
            .filter(|prop| prop.schema() != schema.name())
            .map(|prop| (prop.name().to_string(), prop.to_dict()))
            .collect();
        Self {
            name: schema.name().to_string(),
            schema: schema.to_dict(),
            inherited,
        }
    }
}

/// Formats a schema in the requested output format.
pub fn format_schema(schema: &Schema, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&SchemaView::new(schema))
            .map_err(|e| format!("JSON serialization failed: {e}")),
        OutputFormat::Yaml => serde_yaml::to_string(&SchemaView::new(schema))
            .map_err(|e| format!("YAML serialization failed: {e}")),
        OutputFormat::Markdown => Ok(schema_to_markdown(schema)),
        OutputFormat::Table => Ok(schema_to_table(schema)),
    }
}

fn flags(schema: &Schema, prop: &Property) -> String {
    let mut flags = Vec::new();
    if schema.required().iter().any(|name| name == prop.name()) {
        flags.push("required");
    }
    if schema.featured().iter().any(|name| name == prop.name()) {
        flags.push("featured");
    }
    if prop.hidden() {
        flags.push("hidden");
    }
    if prop.stub() {
        flags.push("stub");
    }
    flags.join(", ")
}

fn schema_to_markdown(schema: &Schema) -> String {
    let mut out = String::new();

    out.push_str(&format!("# {} (`{}`)\n\n", schema.label(), schema.name()));

    if let Some(desc) = schema.description() {
        out.push_str(&format!("{desc}\n\n"));
    }

    out.push_str(&format!("**URI:** {}\n\n", schema.uri()));
    if !schema.extends().is_empty() {
        out.push_str(&format!("**Extends:** {}\n\n", schema.extends().join(", ")));
    }
    if schema.is_abstract() {
        out.push_str("**Abstract**\n\n");
    }

    if let (Some(source), Some(target)) = (schema.edge_source(), schema.edge_target()) {
        let arrow = if schema.edge_directed() { "->" } else { "--" };
        out.push_str(&format!(
            "**Edge:** `{source}` {arrow} `{target}` ({})\n\n",
            schema.edge_label()
        ));
    }

    let props = schema.sorted_properties();
    if !props.is_empty() {
        out.push_str("## Properties\n\n");
        out.push_str("| Property | Label | Type | Range | Defined in | Flags |\n");
        out.push_str("|----------|-------|------|-------|------------|-------|\n");
        for prop in props {
            out.push_str(&format!(
                "| `{}` | {} | {} | {} | {} | {} |\n",
                prop.name(),
                prop.label(),
                prop.kind(),
                prop.range().unwrap_or(""),
                prop.schema(),
                flags(schema, prop),
            ));
        }
        out.push('\n');
    }

    out
}

fn schema_to_table(schema: &Schema) -> String {
    let mut out = String::new();

    out.push_str(&format!("Schema: {}  Label: {}", schema.name(), schema.label()));
    if !schema.extends().is_empty() {
        out.push_str(&format!("  Extends: {}", schema.extends().join(", ")));
    }
    out.push('\n');

    if let Some(desc) = schema.description() {
        out.push_str(&format!("  {desc}\n"));
    }

    let props = schema.sorted_properties();
    if props.is_empty() {
        return out;
    }

    out.push_str("\nProperties:\n");
    let max_name = props.iter().map(|p| p.name().len()).max().unwrap_or(8);
    let max_type = props
        .iter()
        .map(|p| p.kind().name().len())
        .max()
        .unwrap_or(4);
    for prop in props {
        let mut line = format!(
            "  {:<max_name$}  {:<max_type$}  {}",
            prop.name(),
            prop.kind().name(),
            prop.label(),
        );
        if let Some(range) = prop.range() {
            line.push_str(&format!(" -> {range}"));
        }
        let flags = flags(schema, prop);
        if !flags.is_empty() {
            line.push_str(&format!(" [{flags}]"));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}
