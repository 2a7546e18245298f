use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::{Value, json};
use tempfile::TempDir;

fn entity_schema(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_entity-schema"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run entity-schema")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("temp path must be UTF-8")
}

/// Writes a small schema set split over a YAML and a JSON file.
fn write_schema_dir(dir: &TempDir) -> PathBuf {
    let schema_dir = dir.path().join("schema");
    fs::create_dir_all(&schema_dir).unwrap();
    fs::write(
        schema_dir.join("thing.yaml"),
        r#"
Thing:
  abstract: true
  label: Thing
  caption: name
  properties:
    name:
      label: Name
      type: name
LegalEntity:
  extends: Thing
  label: Legal entity
  required: name
  properties:
    email:
      label: E-Mail
      type: email
"#,
    )
    .unwrap();
    let relations = json!({
        "Person": {"extends": "LegalEntity", "label": "Person", "required": ["name"]},
        "Company": {"extends": "LegalEntity", "label": "Company"},
        "Address": {"extends": "Thing", "label": "Address", "matchable": false},
        "Ownership": {
            "label": "Ownership",
            "edge": {"source": "owner", "target": "asset", "label": "owns"},
            "properties": {
                "owner": {"type": "entity", "range": "LegalEntity",
                          "reverse": {"name": "ownershipOwner", "label": "Assets"}},
                "asset": {"type": "entity", "range": "Thing",
                          "reverse": {"name": "ownershipAsset", "label": "Owners"}}
            }
        }
    });
    fs::write(
        schema_dir.join("relations.json"),
        serde_json::to_string_pretty(&relations).unwrap(),
    )
    .unwrap();
    schema_dir
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

#[test]
fn check_reports_resolved_schemata() {
    let dir = TempDir::new().unwrap();
    let schema_dir = write_schema_dir(&dir);

    let output = entity_schema(&["check", path_str(&schema_dir)]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(
        stdout(&output).trim(),
        "Resolved 6 schema(s): 1 abstract, 1 edge."
    );
}

#[test]
fn check_fails_on_missing_parent() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("broken.yaml");
    fs::write(&file, "Orphan:\n  extends: Nowhere\n").unwrap();

    let output = entity_schema(&["check", path_str(&file)]);
    assert!(!output.status.success());
    assert!(
        stderr(&output).contains("error: model error: schema Orphan extends missing schema: Nowhere"),
        "stderr: {}",
        stderr(&output)
    );
}

#[test]
fn check_without_inputs_is_an_error() {
    let output = entity_schema(&["check"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("No schema inputs given"));
}

#[test]
fn check_uses_loader_config() {
    let dir = TempDir::new().unwrap();
    let schema_dir = write_schema_dir(&dir);
    let config = dir.path().join("entity-schema.yml");
    fs::write(
        &config,
        format!("version: \"1.0\"\nsources:\n  - {}\n", path_str(&schema_dir)),
    )
    .unwrap();

    let output = entity_schema(&["--config", path_str(&config), "check"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).starts_with("Resolved 6 schema(s)"));
}

// ---------------------------------------------------------------------------
// export
// ---------------------------------------------------------------------------

#[test]
fn export_writes_verifiable_bundle() {
    let dir = TempDir::new().unwrap();
    let schema_dir = write_schema_dir(&dir);
    let bundle_path = dir.path().join("out").join("model.json");

    let output = entity_schema(&[
        "export",
        path_str(&schema_dir),
        "--output",
        path_str(&bundle_path),
        "--namespace",
        "urn:test:",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Exported 6 schema(s)"));

    let bundle = entity_schema_db::ModelBundle::load(&bundle_path).unwrap();
    bundle.verify().unwrap();
    let person = &bundle.model.schemata["Person"];
    assert_eq!(person.uri, "urn:test:Person");
    assert_eq!(person.schemata, vec!["LegalEntity", "Person", "Thing"]);
    assert!(bundle.model.schemata["LegalEntity"]
        .properties
        .contains_key("ownershipOwner"));
}

#[test]
fn export_yaml_format() {
    let dir = TempDir::new().unwrap();
    let schema_dir = write_schema_dir(&dir);
    let bundle_path = dir.path().join("model.yaml");

    let output = entity_schema(&[
        "export",
        path_str(&schema_dir),
        "--output",
        path_str(&bundle_path),
        "--format",
        "yaml",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let raw = fs::read_to_string(&bundle_path).unwrap();
    assert!(raw.contains("bundle_hash:"));
    assert!(raw.contains("Ownership:"));
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

#[test]
fn show_json_includes_inherited_properties() {
    let dir = TempDir::new().unwrap();
    let schema_dir = write_schema_dir(&dir);

    let output = entity_schema(&[
        "show",
        path_str(&schema_dir),
        "--schema",
        "Person",
        "--format",
        "json",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let value: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["name"], "Person");
    assert_eq!(value["inherited"]["email"]["qname"], "LegalEntity:email");
    assert_eq!(value["inherited"]["ownershipOwner"]["stub"], true);
}

#[test]
fn show_markdown_with_catalog() {
    let dir = TempDir::new().unwrap();
    let schema_dir = write_schema_dir(&dir);
    let catalog = dir.path().join("de.json");
    fs::write(
        &catalog,
        json!({"locale": "de", "messages": {"Company": "Unternehmen", "Name": "Name"}}).to_string(),
    )
    .unwrap();

    let output = entity_schema(&[
        "show",
        path_str(&schema_dir),
        "--schema",
        "Company",
        "--format",
        "markdown",
        "--catalog",
        path_str(&catalog),
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let md = stdout(&output);
    assert!(md.starts_with("# Unternehmen (`Company`)"));
    assert!(md.contains("**Extends:** LegalEntity"));
    assert!(md.contains("| `ownershipAsset` | Owners | entity | Ownership | Thing | stub |"));
}

#[test]
fn show_unknown_schema_fails() {
    let dir = TempDir::new().unwrap();
    let schema_dir = write_schema_dir(&dir);

    let output = entity_schema(&["show", path_str(&schema_dir), "--schema", "Vessel"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Unknown schema 'Vessel'"));
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

#[test]
fn validate_accepts_good_data() {
    let dir = TempDir::new().unwrap();
    let schema_dir = write_schema_dir(&dir);
    let data = dir.path().join("people.json");
    fs::write(
        &data,
        json!([
            {"properties": {"name": "Jane Doe", "email": "jane@example.com"}},
            {"properties": {"name": ["John Doe"], "unknownField": "ignored"}}
        ])
        .to_string(),
    )
    .unwrap();

    let output = entity_schema(&[
        "validate",
        path_str(&schema_dir),
        "--schema",
        "Person",
        "--data",
        path_str(&data),
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("ok (2 entities)"));
}

#[test]
fn validate_reports_bad_files_and_fails() {
    let dir = TempDir::new().unwrap();
    let schema_dir = write_schema_dir(&dir);
    let good = dir.path().join("good.json");
    let bad = dir.path().join("bad.json");
    fs::write(&good, json!({"properties": {"name": "Jane Doe"}}).to_string()).unwrap();
    fs::write(&bad, json!({"properties": {"email": "not-an-email"}}).to_string()).unwrap();

    let output = entity_schema(&[
        "validate",
        path_str(&schema_dir),
        "--schema",
        "Person",
        "--data",
        path_str(&good),
        path_str(&bad),
    ]);
    assert!(!output.status.success());
    let out = stdout(&output);
    assert!(out.contains("good.json: ok (1 entities)"));
    assert!(out.contains("bad.json: 1 of 1 entities invalid"));
    assert!(out.contains("#0: Entity validation failed (email: Invalid value, name: Required)"));
    assert!(stderr(&output).contains("1 of 2 data file(s) failed validation"));
}

// ---------------------------------------------------------------------------
// matchable
// ---------------------------------------------------------------------------

#[test]
fn matchable_lists_family() {
    let dir = TempDir::new().unwrap();
    let schema_dir = write_schema_dir(&dir);

    let output = entity_schema(&["matchable", path_str(&schema_dir), "--schema", "LegalEntity"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let names: Vec<String> = stdout(&output).lines().map(str::to_string).collect();
    assert!(names.contains(&"LegalEntity".to_string()));
    assert!(names.contains(&"Person".to_string()));
    assert!(names.contains(&"Company".to_string()));
    assert!(!names.contains(&"Address".to_string()));

    let output = entity_schema(&["matchable", path_str(&schema_dir), "--schema", "Address"]);
    assert!(output.status.success());
    assert!(stdout(&output).trim().is_empty());
}

// ---------------------------------------------------------------------------
// graph
// ---------------------------------------------------------------------------

#[test]
fn graph_projects_entities_and_edges() {
    let dir = TempDir::new().unwrap();
    let schema_dir = write_schema_dir(&dir);
    let entities = dir.path().join("entities.jsonl");
    let lines = [
        json!({"id": "jane", "schema": "Person", "properties": {"name": ["Jane Doe"], "email": ["jane@example.com"]}}),
        json!({"id": "acme", "schema": "Company", "properties": {"name": ["ACME"]}}),
        json!({"id": "own1", "schema": "Ownership", "properties": {"owner": ["jane"], "asset": ["acme"]}}),
        json!({"id": "x", "schema": "Vessel"}),
    ];
    let body: Vec<String> = lines.iter().map(Value::to_string).collect();
    fs::write(&entities, body.join("\n") + "\n\n").unwrap();

    let output = entity_schema(&[
        "graph",
        path_str(&schema_dir),
        "--entities",
        path_str(&entities),
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let graph: Value = serde_json::from_str(&stdout(&output)).unwrap();

    let node_ids: Vec<&str> = graph["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["id"].as_str().unwrap())
        .collect();
    assert!(node_ids.contains(&"id:jane"));
    assert!(node_ids.contains(&"id:acme"));
    assert!(node_ids.contains(&"email:jane@example.com"));
    assert!(!node_ids.contains(&"id:x"));

    let edge_ids: Vec<&str> = graph["edges"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap())
        .collect();
    assert!(edge_ids.contains(&"id:jane<own1>id:acme"));
    assert!(edge_ids.contains(&"id:jane<>email:jane@example.com"));
}
