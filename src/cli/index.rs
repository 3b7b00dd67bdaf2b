use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::catalog::builder::{write_index, IndexReport};
use crate::cli::OutputFormat;

#[derive(Args)]
pub struct IndexArgs {
    /// Catalog directory containing <namespace>/<api-version>/types.json chunks
    #[arg(required = true)]
    pub base_dir: PathBuf,
}

#[derive(Serialize)]
struct IndexSummary<'a> {
    index_path: String,
    chunks: usize,
    entries: usize,
    duplicates: Vec<&'a str>,
}

pub fn run(args: IndexArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let report = write_index(&args.base_dir)?;
    let index_path = args
        .base_dir
        .join(crate::catalog::index::INDEX_FILE_NAME)
        .display()
        .to_string();

    if verbose {
        for chunk in &report.chunks {
            eprintln!(
                "{}: {} types, {} resources indexed",
                chunk.relative_path, chunk.types_found, chunk.resources_indexed
            );
        }
    }

    match format {
        OutputFormat::Json => print_json(&report, index_path)?,
        OutputFormat::Text => print_text(&report, &index_path),
    }

    Ok(())
}

fn print_text(report: &IndexReport, index_path: &str) {
    println!(
        "Indexed {} resource types from {} chunks into {}",
        report.index.len(),
        report.chunks.len(),
        index_path
    );
    for duplicate in &report.duplicates {
        println!(
            "WARNING: Found duplicate type {} in {} (kept {})",
            duplicate.key, duplicate.location.relative_path, duplicate.existing.relative_path
        );
    }
}

fn print_json(report: &IndexReport, index_path: String) -> anyhow::Result<()> {
    let summary = IndexSummary {
        index_path,
        chunks: report.chunks.len(),
        entries: report.index.len(),
        duplicates: report.duplicates.iter().map(|d| d.key.as_str()).collect(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
