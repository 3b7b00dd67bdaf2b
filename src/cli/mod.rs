//! Command-line interface for bicep-types.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **index**: Build `index.json` for a directory of chunks
//! - **list**: List every resource type and api version in a catalog
//! - **show**: Resolve one resource type and print its shape
//!
//! ## Usage
//!
//! ```text
//! # Build the index as a build step
//! bicep-types index generated/
//!
//! # List available types
//! bicep-types list --base-dir generated/
//!
//! # Inspect one type, JSON output for scripting
//! bicep-types show Microsoft.Storage/storageAccounts 2021-01-01 --format json
//! ```

use clap::{Parser, Subcommand};

pub mod index;
pub mod list;
pub mod show;

/// Environment variable consulted when `--base-dir` is not given
pub const BASE_DIR_ENV: &str = "BICEP_TYPES_DIR";

#[derive(Parser)]
#[command(name = "bicep-types")]
#[command(version)]
#[command(about = "Build and query catalogs of resource type definitions")]
#[command(
    long_about = "bicep-types builds the lookup index for a directory of serialized type chunks and resolves single resource types from it.\n\nChunks are laid out as <namespace>/<api-version>/types.json; the index is written to index.json at the catalog root."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build index.json for a catalog directory
    Index(index::IndexArgs),

    /// List the resource types available in a catalog
    List(list::ListArgs),

    /// Show a single resource type
    Show(show::ShowArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
