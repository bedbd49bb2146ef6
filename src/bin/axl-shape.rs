//! AXL Shape CLI
//!
//! Command-line interface for inspecting operation schemas and shaping
//! AXL payloads.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use axl_shape::{
    descend, lint, provider_for, render, to_json_schema, tree_from_json, tree_to_json, DataTree,
    DataValue, Engine, FileStatus, LayoutOptions, LintResult, SchemaProvider, Severity, ShapeError,
    ShapeOptions, Shaper, TagEntry, TagMap, TagSelection, Template, DEFAULT_UNSET_INT,
    DEFAULT_WRAPPER_KEY,
};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "AXL_SHAPE_LOG";

#[derive(Parser)]
#[command(name = "axl-shape")]
#[command(about = "Inspect AXL operation schemas and shape payloads")]
#[command(version)]
struct Cli {
    /// Schema source: directory of <operation>.json files or base URL
    #[arg(long, short, global = true, default_value = ".")]
    schema: String,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the schema tree of an operation
    Tree {
        /// Operation name (e.g., addPhone)
        operation: String,

        /// Print only this child of the root
        #[arg(long)]
        child: Option<String>,

        /// Only print elements required in context
        #[arg(long)]
        required_only: bool,

        /// Print the tree as JSON Schema instead
        #[arg(long)]
        json: bool,
    },

    /// Resolve return tags for a read operation
    Tags {
        /// Operation name (e.g., getPhone)
        operation: String,

        /// Tag names; none selects everything
        names: Vec<String>,

        /// Skip checking names against the schema
        #[arg(long)]
        no_check_tags: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Check request arguments against an operation
    Check {
        /// Operation name
        operation: String,

        /// JSON file with the arguments
        payload: PathBuf,

        /// Check against this child of the root (e.g., phone)
        #[arg(long)]
        child: Option<String>,

        /// Validate the whole payload, not just top-level keys
        #[arg(long)]
        deep: bool,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Extract a create payload from a read record
    Template {
        /// Target operation (e.g., addLine)
        operation: String,

        /// JSON file with the record
        record: PathBuf,

        /// Extract against this child of the root (e.g., line)
        #[arg(long)]
        child: Option<String>,

        /// Override a field before extraction (key=value, value parsed as JSON if possible)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        overrides: Vec<String>,

        /// Remove a field before extraction
        #[arg(long = "strip", value_name = "KEY")]
        strip: Vec<String>,

        /// Integer treated as unset (repeatable; default -1)
        #[arg(long = "unset-int", value_name = "N", allow_negative_numbers = true)]
        unset_ints: Vec<i64>,

        /// Keep empty strings instead of treating them as unset
        #[arg(long)]
        keep_empty_strings: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Shape a raw response
    Shape {
        /// JSON file with the raw response (record or list of records)
        response: PathBuf,

        /// Key path to the records, e.g. return/phone
        #[arg(long)]
        path: Option<String>,

        /// Requested tag names
        #[arg(long = "tag", value_name = "NAME")]
        tags: Vec<String>,

        /// Operation the tags belong to; enables tag checking
        #[arg(long)]
        op: Option<String>,

        /// Skip checking tags against the schema
        #[arg(long)]
        no_check_tags: bool,

        /// Key of the choice wrapper to collapse
        #[arg(long, default_value = DEFAULT_WRAPPER_KEY)]
        wrapper_key: String,

        /// Collapse wrappers that have sibling keys (e.g. uuid)
        #[arg(long)]
        collapse_siblings: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Lint schema definition files (syntax, duplicates, naming)
    Lint {
        /// File or directory to lint
        path: PathBuf,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Suppress progress output, only show errors
        #[arg(long, short)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Tree {
            operation,
            child,
            required_only,
            json,
        } => run_tree(&cli.schema, &operation, child.as_deref(), required_only, json),

        Commands::Tags {
            operation,
            names,
            no_check_tags,
            pretty,
        } => run_tags(&cli.schema, &operation, names, no_check_tags, pretty),

        Commands::Check {
            operation,
            payload,
            child,
            deep,
            json,
        } => run_check(&cli.schema, &operation, &payload, child.as_deref(), deep, json),

        Commands::Template {
            operation,
            record,
            child,
            overrides,
            strip,
            unset_ints,
            keep_empty_strings,
            pretty,
        } => run_template(TemplateArgs {
            schema: cli.schema,
            operation,
            record,
            child,
            overrides,
            strip,
            unset_ints,
            keep_empty_strings,
            pretty,
        }),

        Commands::Shape {
            response,
            path,
            tags,
            op,
            no_check_tags,
            wrapper_key,
            collapse_siblings,
            pretty,
        } => run_shape(ShapeArgs {
            schema: cli.schema,
            response,
            path,
            tags,
            op,
            no_check_tags,
            wrapper_key,
            collapse_siblings,
            pretty,
        }),

        Commands::Lint {
            path,
            format,
            strict,
            quiet,
        } => run_lint(&path, &format, strict, quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr so stdout stays parseable
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn engine(
    schema: &str,
    options: ShapeOptions,
) -> Result<Engine<Box<dyn SchemaProvider>>, u8> {
    let provider = provider_for(schema).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    Ok(Engine::new(provider, options))
}

fn fail(e: ShapeError) -> u8 {
    eprintln!("Error: {}", e);
    e.exit_code() as u8
}

fn read_json(path: &Path) -> Result<Value, u8> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        eprintln!("Error reading {}: {}", path.display(), e);
        3u8
    })?;
    serde_json::from_str(&content).map_err(|e| {
        eprintln!("Error parsing {}: {}", path.display(), e);
        2u8
    })
}

fn read_tree(path: &Path) -> Result<DataTree, u8> {
    tree_from_json(read_json(path)?).ok_or_else(|| {
        eprintln!("Error: {} must contain a JSON object", path.display());
        2u8
    })
}

fn print_json(value: &Value, pretty: bool) -> Result<(), u8> {
    let output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;
    println!("{}", output);
    Ok(())
}

fn run_tree(
    schema: &str,
    operation: &str,
    child: Option<&str>,
    required_only: bool,
    json: bool,
) -> Result<(), u8> {
    let engine = engine(schema, ShapeOptions::default())?;
    let tree = engine.tree(operation).map_err(fail)?;
    let node = tree.target(child).map_err(|e| fail(e.into()))?;

    if json {
        return print_json(&to_json_schema(node), true);
    }

    let options = LayoutOptions {
        required_only,
        show_required: !required_only,
        show_repeatable: true,
    };
    print!("{}", render(node, &options));
    Ok(())
}

fn run_tags(
    schema: &str,
    operation: &str,
    names: Vec<String>,
    no_check_tags: bool,
    pretty: bool,
) -> Result<(), u8> {
    let engine = engine(schema, ShapeOptions::new().check_tags(!no_check_tags))?;
    let tags = engine
        .resolve_tags(operation, &TagSelection::Names(names))
        .map_err(fail)?;
    let value = serde_json::to_value(&tags).map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;
    print_json(&value, pretty)
}

fn run_check(
    schema: &str,
    operation: &str,
    payload: &Path,
    child: Option<&str>,
    deep: bool,
    json_output: bool,
) -> Result<(), u8> {
    let engine = engine(schema, ShapeOptions::default())?;
    let supplied = read_tree(payload)?;

    let result = engine
        .check_arguments(operation, &supplied, child)
        .and_then(|()| {
            if deep {
                engine.validate_payload(operation, &supplied, child)
            } else {
                Ok(())
            }
        });

    match result {
        Ok(()) => {
            if json_output {
                println!(r#"{{"valid":true}}"#);
            } else {
                println!("Valid");
            }
            Ok(())
        }
        Err(ShapeError::Invalid { errors }) => {
            if json_output {
                let output = serde_json::json!({
                    "valid": false,
                    "errors": errors
                });
                println!("{}", output);
            } else {
                eprintln!("Validation failed:");
                for error in errors {
                    eprintln!("  {}", error);
                }
            }
            Err(1)
        }
        Err(ShapeError::Validation(fault)) => {
            if json_output {
                let output = serde_json::json!({
                    "valid": false,
                    "field": fault.field,
                    "path": fault.pointer(),
                });
                println!("{}", output);
            } else {
                eprintln!("Invalid argument: {}", fault);
            }
            Err(1)
        }
        Err(e) => {
            if json_output {
                let output = serde_json::json!({ "valid": false, "error": e.to_string() });
                println!("{}", output);
            } else {
                eprintln!("Error: {}", e);
            }
            Err(e.exit_code() as u8)
        }
    }
}

struct TemplateArgs {
    schema: String,
    operation: String,
    record: PathBuf,
    child: Option<String>,
    overrides: Vec<String>,
    strip: Vec<String>,
    unset_ints: Vec<i64>,
    keep_empty_strings: bool,
    pretty: bool,
}

fn run_template(args: TemplateArgs) -> Result<(), u8> {
    let unset_ints = if args.unset_ints.is_empty() {
        vec![DEFAULT_UNSET_INT]
    } else {
        args.unset_ints
    };
    let options = ShapeOptions::new()
        .unset_ints(unset_ints)
        .empty_string_is_empty(!args.keep_empty_strings);
    let engine = engine(&args.schema, options)?;

    let mut template = Template::new(read_tree(&args.record)?);
    for key in &args.strip {
        template = template.strip(key);
    }
    for assignment in &args.overrides {
        let (key, value) = parse_override(assignment)?;
        template = template.set(key, value);
    }

    let payload = engine
        .extract_template(&args.operation, template.record(), args.child.as_deref())
        .map_err(fail)?;
    debug!(fields = payload.len(), "template ready");
    print_json(&tree_to_json(&payload), args.pretty)
}

/// Split `key=value`; the value is JSON if it parses, a string otherwise.
fn parse_override(assignment: &str) -> Result<(String, DataValue), u8> {
    let Some((key, raw)) = assignment.split_once('=') else {
        eprintln!("Error: expected KEY=VALUE, got '{}'", assignment);
        return Err(2);
    };
    let value = serde_json::from_str::<Value>(raw)
        .map(DataValue::from_json)
        .unwrap_or_else(|_| DataValue::from(raw));
    Ok((key.to_string(), value))
}

struct ShapeArgs {
    schema: String,
    response: PathBuf,
    path: Option<String>,
    tags: Vec<String>,
    op: Option<String>,
    no_check_tags: bool,
    wrapper_key: String,
    collapse_siblings: bool,
    pretty: bool,
}

fn run_shape(args: ShapeArgs) -> Result<(), u8> {
    let raw = DataValue::from_json(read_json(&args.response)?);

    let keys: Vec<&str> = args
        .path
        .as_deref()
        .map(|p| p.split('/').filter(|k| !k.is_empty()).collect())
        .unwrap_or_default();
    let records = descend(raw, &keys).map_err(fail)?;

    let tags: TagMap = match &args.op {
        Some(op) => {
            let options = ShapeOptions::new().check_tags(!args.no_check_tags);
            engine(&args.schema, options)?
                .resolve_tags(op, &TagSelection::Names(args.tags))
                .map_err(fail)?
        }
        None => args
            .tags
            .into_iter()
            .map(|name| (name, TagEntry::Leaf))
            .collect(),
    };

    let shaper = Shaper::new(args.wrapper_key).collapse_with_siblings(args.collapse_siblings);
    let shaped = match records {
        DataValue::Composite(record) => DataValue::Composite(shaper.shape(&tags, record)),
        DataValue::Sequence(items) => DataValue::Sequence(
            items
                .into_iter()
                .map(|item| match item {
                    DataValue::Composite(record) => {
                        DataValue::Composite(shaper.shape(&tags, record))
                    }
                    other => other,
                })
                .collect(),
        ),
        other => other,
    };
    print_json(&shaped.to_json(), args.pretty)
}

fn run_lint(path: &Path, format: &str, strict: bool, quiet: bool) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(2);
    }

    let report = lint(path, strict);
    if format == "json" {
        let value = serde_json::to_value(&report).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        print_json(&value, true)?;
    } else {
        print_lint_report(&report, quiet);
    }

    if report.is_ok() {
        Ok(())
    } else {
        Err(1)
    }
}

const RED: &str = "31";
const GREEN: &str = "32";
const YELLOW: &str = "33";

fn paint(color: &str, text: &str) -> String {
    format!("\x1b[{}m{}\x1b[0m", color, text)
}

fn print_lint_report(report: &LintResult, quiet: bool) {
    if !quiet {
        println!("Linting {} ...\n", report.path.display());
    }

    for file in &report.results {
        let icon = match file.status {
            FileStatus::Ok if quiet => continue,
            FileStatus::Ok => paint(GREEN, "✓"),
            FileStatus::Warning => paint(YELLOW, "⚠"),
            FileStatus::Error => paint(RED, "✗"),
        };
        println!("  {} {}", icon, file.file.display());

        for diag in &file.diagnostics {
            let label = match diag.severity {
                Severity::Error => paint(RED, &format!("error[{}]", diag.code)),
                Severity::Warning if quiet => continue,
                Severity::Warning => paint(YELLOW, &format!("warning[{}]", diag.code)),
            };
            println!("    {} {}: {}", label, diag.path, diag.message);
        }
    }

    println!();
    if report.is_ok() {
        let summary = format!("✓ {} files checked, all passed", report.files_checked);
        println!("{}", paint(GREEN, &summary));
    } else {
        let summary = format!(
            "✗ {} files checked: {} passed, {} failed ({} errors, {} warnings)",
            report.files_checked, report.passed, report.failed, report.errors, report.warnings
        );
        println!("{}", paint(RED, &summary));
    }
}
