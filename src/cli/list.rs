use std::path::PathBuf;

use clap::Args;

use crate::catalog::loader::TypeLoader;
use crate::cli::{OutputFormat, BASE_DIR_ENV};

#[derive(Args)]
pub struct ListArgs {
    /// Catalog directory containing index.json
    #[arg(long, env = BASE_DIR_ENV)]
    pub base_dir: PathBuf,

    /// Only list keys containing this text (case-insensitive)
    #[arg(long)]
    pub filter: Option<String>,
}

pub fn run(args: ListArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let loader = TypeLoader::from_dir(&args.base_dir);
    let available = loader.list_available()?;

    if verbose {
        eprintln!("Loaded index with {} types", available.len());
    }

    let filter = args.filter.map(|f| f.to_lowercase());
    let keys: Vec<&String> = available
        .iter()
        .filter(|key| {
            filter
                .as_deref()
                .map_or(true, |f| key.to_lowercase().contains(f))
        })
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&keys)?),
        OutputFormat::Text => {
            for key in keys {
                println!("{key}");
            }
        }
    }

    Ok(())
}
