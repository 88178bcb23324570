//! CLI command implementations
//!
//! Every command writes exactly one JSON object to its output. Failures are
//! written as an error object by [`run`] and then returned, so the binary
//! exits non-zero.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::catalog;
use crate::config::Config;
use crate::observability::init_logging;
use crate::record::{DumpOptions, Selection};
use crate::schema::{RecordError, RecordShape, RecordValidator, ShapeLoader};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{read_document, write_error, write_response};

/// Parse arguments, load configuration and run the command against stdout
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let result = Config::load_or_default(cli.command.config_path().map(PathBuf::as_path))
        .map_err(CliError::config_error)
        .and_then(|config| {
            init_logging(&config.log_filter);
            run_command(cli.command, &config, &mut out)
        });

    if let Err(err) = &result {
        write_error(&mut out, err)?;
    }
    result
}

/// Run the appropriate command based on CLI args
pub fn run_command<W: Write>(cmd: Command, config: &Config, out: &mut W) -> CliResult<()> {
    match cmd {
        Command::Validate {
            shape,
            input,
            exclude,
            include,
            exclude_unset,
            exclude_none,
            computed,
            ..
        } => {
            let options = dump_options(
                include.as_deref(),
                exclude.as_deref(),
                exclude_unset,
                exclude_none,
                computed,
            )?;
            let document = read_document(input.as_deref())?;
            validate(config, &shape, &document, &options, out)
        }
        Command::Shapes { .. } => shapes(config, out),
        Command::Describe { shape, .. } => describe(config, &shape, out),
    }
}

/// Built-in catalog plus every shape file under the configured directory
pub fn build_registry(config: &Config) -> CliResult<ShapeLoader> {
    let mut registry = match &config.shape_dir {
        Some(dir) => ShapeLoader::new(dir),
        None => ShapeLoader::in_memory(),
    };
    catalog::register_builtin(&mut registry)?;
    let loaded = registry.load_all()?;
    info!(
        builtin = registry.shape_count() - loaded,
        from_files = loaded,
        "shape registry ready"
    );
    Ok(registry)
}

/// Build dump options from the raw flag values
pub fn dump_options(
    include: Option<&str>,
    exclude: Option<&str>,
    exclude_unset: bool,
    exclude_none: bool,
    computed: bool,
) -> CliResult<DumpOptions> {
    let mut options = DumpOptions::new();
    if let Some(raw) = include {
        options = options.include(parse_selection("include", raw)?);
    }
    if let Some(raw) = exclude {
        options = options.exclude(parse_selection("exclude", raw)?);
    }
    if exclude_unset {
        options = options.exclude_unset();
    }
    if exclude_none {
        options = options.exclude_none();
    }
    if computed {
        options = options.with_computed();
    }
    Ok(options)
}

fn parse_selection(flag: &str, raw: &str) -> CliResult<Selection> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| CliError::input_error(format!("--{} is not valid JSON: {}", flag, e)))?;
    Selection::from_json(&value)
        .map_err(|e| CliError::input_error(format!("--{}: {}", flag, e)))
}

/// Validate one document and write its dump
pub fn validate<W: Write>(
    config: &Config,
    shape: &str,
    document: &Value,
    options: &DumpOptions,
    out: &mut W,
) -> CliResult<()> {
    let registry = build_registry(config)?;
    let record = RecordValidator::new(&registry)
        .with_mode(config.validation_mode)
        .construct(shape, document)?;
    let dump = record.dump(options)?;
    debug!(shape, fields = dump.len(), "document accepted");
    write_response(out, Value::Object(dump))
}

/// List every registered shape with its field, rule and computed names
pub fn shapes<W: Write>(config: &Config, out: &mut W) -> CliResult<()> {
    let registry = build_registry(config)?;
    let listing: Vec<Value> = registry
        .all_shapes()
        .map(|shape| {
            json!({
                "name": shape.name,
                "description": shape.description,
                "fields": shape.field_names().collect::<Vec<_>>(),
                "rules": rule_names(shape),
                "computed": computed_names(shape),
            })
        })
        .collect();
    write_response(out, Value::Array(listing))
}

/// Write the declarative form of one shape
pub fn describe<W: Write>(config: &Config, shape: &str, out: &mut W) -> CliResult<()> {
    let registry = build_registry(config)?;
    let shape = registry
        .get(shape)
        .ok_or_else(|| RecordError::UnknownShape(shape.to_string()))?;

    let mut described = serde_json::to_value(shape.as_ref())?;
    if let Some(map) = described.as_object_mut() {
        map.insert("rules".into(), json!(rule_names(shape)));
        map.insert("computed".into(), json!(computed_names(shape)));
    }
    write_response(out, described)
}

fn rule_names(shape: &RecordShape) -> Vec<&str> {
    shape.rules().iter().map(|r| r.name()).collect()
}

fn computed_names(shape: &RecordShape) -> Vec<&str> {
    shape.computed_fields().iter().map(|c| c.name()).collect()
}

/// Validate a document stored in a file
pub fn validate_file<W: Write>(
    config: &Config,
    shape: &str,
    input: &Path,
    options: &DumpOptions,
    out: &mut W,
) -> CliResult<()> {
    let document = read_document(Some(input))?;
    validate(config, shape, &document, options, out)
}
