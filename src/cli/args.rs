//! CLI argument definitions using clap
//!
//! Commands:
//! - recordshape validate --shape <name> [--input <path>] [--config <path>]
//! - recordshape shapes [--config <path>]
//! - recordshape describe --shape <name> [--config <path>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// recordshape - declarative validation and serialization of JSON records
#[derive(Parser, Debug)]
#[command(name = "recordshape")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Validate one JSON document and print its dump
    Validate {
        /// Registered shape name
        #[arg(long)]
        shape: String,

        /// Input document (stdin when omitted)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Fields to drop, e.g. '{"address": ["state"]}'
        #[arg(long)]
        exclude: Option<String>,

        /// Fields to keep, e.g. '["name", "age"]'
        #[arg(long)]
        include: Option<String>,

        /// Only dump fields supplied in the input
        #[arg(long)]
        exclude_unset: bool,

        /// Drop null values from the dump
        #[arg(long)]
        exclude_none: bool,

        /// Append computed fields to the dump
        #[arg(long)]
        computed: bool,
    },

    /// List registered shapes and their fields
    Shapes {
        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the declarative form of one shape
    Describe {
        /// Registered shape name
        #[arg(long)]
        shape: String,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Command {
    /// Configuration path shared by every command
    pub fn config_path(&self) -> Option<&PathBuf> {
        match self {
            Command::Validate { config, .. }
            | Command::Shapes { config }
            | Command::Describe { config, .. } => config.as_ref(),
        }
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
