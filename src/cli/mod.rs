//! CLI module for recordshape
//!
//! Provides command-line interface for:
//! - validate: Construct a record from one document and print its dump
//! - shapes: List registered shapes
//! - describe: Print one shape declaration

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{
    build_registry, describe, dump_options, run, run_command, shapes, validate, validate_file,
};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{parse_document, read_document, write_error, write_response};
