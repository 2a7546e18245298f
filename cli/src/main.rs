mod output;

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use entity_schema_core::{EntityRecord, Graph, Model, Schema};
use entity_schema_db::{LoaderConfig, ModelBundle, SchemaDatabase};
use rayon::prelude::*;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::output::{BundleFormat, OutputFormat, format_schema};

const PACKAGE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "entity-schema")]
#[command(version = PACKAGE_VERSION)]
#[command(about = "Resolve, inspect and validate entity schema models")]
struct Cli {
    /// Log resolution details to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,
    /// Loader configuration (YAML) naming sources, catalog and namespace.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Message catalog (JSON or YAML) for labels and validation messages.
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,
    /// URI namespace for schema URIs.
    #[arg(long, global = true)]
    namespace: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load and resolve schema definitions, reporting any model error.
    Check(CheckArgs),
    /// Write the resolved model as a hashed bundle.
    Export(ExportArgs),
    /// Print one resolved schema.
    Show(ShowArgs),
    /// Validate entity data files against a schema.
    Validate(ValidateArgs),
    /// List the schemas entities of a schema can be matched against.
    Matchable(MatchableArgs),
    /// Project entity records (JSON lines) into a graph.
    Graph(GraphArgs),
}

#[derive(Debug, Args)]
struct ModelArgs {
    /// Definition files and/or directories of definition files.
    inputs: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct CheckArgs {
    #[command(flatten)]
    model: ModelArgs,
}

#[derive(Debug, Args)]
struct ExportArgs {
    #[command(flatten)]
    model: ModelArgs,
    /// Output bundle path.
    #[arg(long)]
    output: PathBuf,
    /// Bundle format.
    #[arg(long, default_value = "json")]
    format: BundleFormat,
}

#[derive(Debug, Args)]
struct ShowArgs {
    #[command(flatten)]
    model: ModelArgs,
    /// Schema name.
    #[arg(long)]
    schema: String,
    /// Output format.
    #[arg(long, default_value = "table")]
    format: OutputFormat,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    #[command(flatten)]
    model: ModelArgs,
    /// Schema name.
    #[arg(long)]
    schema: String,
    /// Entity data files, each a JSON object or array of objects.
    #[arg(long = "data", required = true, num_args = 1..)]
    data: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct MatchableArgs {
    #[command(flatten)]
    model: ModelArgs,
    /// Schema name.
    #[arg(long)]
    schema: String,
}

#[derive(Debug, Args)]
struct GraphArgs {
    #[command(flatten)]
    model: ModelArgs,
    /// Entity records, one JSON object per line.
    #[arg(long)]
    entities: PathBuf,
}

/// Options shared by every subcommand that loads a model.
struct Globals {
    config: Option<PathBuf>,
    catalog: Option<PathBuf>,
    namespace: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let globals = Globals {
        config: cli.config,
        catalog: cli.catalog,
        namespace: cli.namespace,
    };

    let result = match cli.command {
        Command::Check(args) => run_check(&globals, args),
        Command::Export(args) => run_export(&globals, args),
        Command::Show(args) => run_show(&globals, args),
        Command::Validate(args) => run_validate(&globals, args),
        Command::Matchable(args) => run_matchable(&globals, args),
        Command::Graph(args) => run_graph(&globals, args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolves the model from positional inputs, falling back to `--config`.
///
/// Command-line `--catalog` and `--namespace` override the config file.
fn load_model(globals: &Globals, args: &ModelArgs) -> Result<Model, String> {
    let mut config = match &globals.config {
        Some(path) => LoaderConfig::load(path)
            .map_err(|err| format!("Failed to read config '{}': {err}", path.display()))?,
        None => LoaderConfig::default(),
    };
    if globals.catalog.is_some() {
        config.catalog = globals.catalog.clone();
    }
    if globals.namespace.is_some() {
        config.namespace = globals.namespace.clone();
    }

    let translator = config.translator().map_err(|e| e.to_string())?;
    let db = if args.inputs.is_empty() {
        if config.sources.is_empty() {
            return Err("No schema inputs given; pass definition paths or --config".to_string());
        }
        config.builder().build().map_err(|e| e.to_string())?
    } else {
        SchemaDatabase::from_paths(&args.inputs).map_err(|e| e.to_string())?
    };
    debug!(source = ?db.source(), definitions = db.len(), "definitions loaded");

    db.model(translator, config.namespace.as_deref())
        .map_err(|e| e.to_string())
}

fn find_schema<'m>(model: &'m Model, name: &str) -> Result<&'m Schema, String> {
    model
        .get(name)
        .ok_or_else(|| format!("Unknown schema '{name}'"))
}

fn run_check(globals: &Globals, args: CheckArgs) -> Result<(), String> {
    let model = load_model(globals, &args.model)?;
    let abstract_count = model.schemata().filter(|s| s.is_abstract()).count();
    let edge_count = model.schemata().filter(|s| s.is_edge()).count();
    println!(
        "Resolved {} schema(s): {abstract_count} abstract, {edge_count} edge.",
        model.len()
    );
    Ok(())
}

fn run_export(globals: &Globals, args: ExportArgs) -> Result<(), String> {
    let model = load_model(globals, &args.model)?;
    let bundle = ModelBundle::new(&model, chrono::Utc::now().to_rfc3339())
        .map_err(|e| e.to_string())?;

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| {
                format!(
                    "Failed to create output directory '{}': {err}",
                    parent.display()
                )
            })?;
        }
    }

    let written = match args.format {
        BundleFormat::Json => bundle.save(&args.output),
        BundleFormat::Yaml => bundle.save_yaml(&args.output),
    };
    written.map_err(|err| format!("Failed to write '{}': {err}", args.output.display()))?;

    info!(hash = %bundle.bundle_hash, "bundle written");
    println!(
        "Exported {} schema(s) into '{}'.",
        bundle.model.schemata.len(),
        args.output.display()
    );
    Ok(())
}

fn run_show(globals: &Globals, args: ShowArgs) -> Result<(), String> {
    let model = load_model(globals, &args.model)?;
    let schema = find_schema(&model, &args.schema)?;
    print!("{}", format_schema(schema, args.format)?);
    if matches!(args.format, OutputFormat::Json) {
        println!();
    }
    Ok(())
}

/// Outcome of validating one data file.
struct FileOutcome {
    path: PathBuf,
    entities: usize,
    failures: Vec<String>,
}

fn validate_file(model: &Model, schema_name: &str, path: &Path) -> Result<FileOutcome, String> {
    let schema = find_schema(model, schema_name)?;
    let raw = fs::read_to_string(path)
        .map_err(|err| format!("Failed to read '{}': {err}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|err| format!("Invalid JSON in '{}': {err}", path.display()))?;
    let entities = match value {
        serde_json::Value::Array(items) => items,
        other => vec![other],
    };

    let mut failures = Vec::new();
    for (index, entity) in entities.iter().enumerate() {
        if let Err(err) = schema.validate(entity) {
            let details: Vec<String> = err
                .errors
                .properties
                .iter()
                .map(|(prop, message)| format!("{prop}: {message}"))
                .collect();
            failures.push(format!("#{index}: {} ({})", err.message, details.join(", ")));
        }
    }
    Ok(FileOutcome {
        path: path.to_path_buf(),
        entities: entities.len(),
        failures,
    })
}

fn run_validate(globals: &Globals, args: ValidateArgs) -> Result<(), String> {
    let model = load_model(globals, &args.model)?;
    find_schema(&model, &args.schema)?;

    let outcomes: Vec<Result<FileOutcome, String>> = args
        .data
        .par_iter()
        .map(|path| validate_file(&model, &args.schema, path))
        .collect();

    let mut failed = 0usize;
    for outcome in &outcomes {
        match outcome {
            Ok(file) if file.failures.is_empty() => {
                println!("{}: ok ({} entities)", file.path.display(), file.entities);
            }
            Ok(file) => {
                failed += 1;
                println!(
                    "{}: {} of {} entities invalid",
                    file.path.display(),
                    file.failures.len(),
                    file.entities
                );
                for failure in &file.failures {
                    println!("  {failure}");
                }
            }
            Err(err) => {
                failed += 1;
                eprintln!("{err}");
            }
        }
    }

    if failed > 0 {
        return Err(format!(
            "{failed} of {} data file(s) failed validation",
            outcomes.len()
        ));
    }
    Ok(())
}

fn run_matchable(globals: &Globals, args: MatchableArgs) -> Result<(), String> {
    let model = load_model(globals, &args.model)?;
    let schema = find_schema(&model, &args.schema)?;
    for other in schema.matchable_schemata(&model) {
        println!("{}", other.name());
    }
    Ok(())
}

fn run_graph(globals: &Globals, args: GraphArgs) -> Result<(), String> {
    let model = load_model(globals, &args.model)?;
    let file = fs::File::open(&args.entities)
        .map_err(|err| format!("Failed to open '{}': {err}", args.entities.display()))?;

    let mut graph = Graph::new(&model);
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|err| format!("Failed to read entities: {err}"))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: EntityRecord = serde_json::from_str(&line)
            .map_err(|err| format!("Invalid entity on line {}: {err}", index + 1))?;
        graph.add(&record);
    }

    let raw = serde_json::to_string_pretty(&graph.to_dict())
        .map_err(|err| format!("JSON serialization failed: {err}"))?;
    println!("{raw}");
    Ok(())
}
