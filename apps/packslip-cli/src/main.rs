//! Packing slip sorter
//!
//! Sorts packing slips and shipping labels into picking order and writes a
//! per-location pick summary. Also edits the product/location table.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use packslip_core::discover::find_matching_labels;
use packslip_core::{Config, LocationTable, OutputFiles, Pipeline, RunReport};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "packslip")]
#[command(version, about = "Sort packing slips and shipping labels by warehouse location")]
struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sort a batch of packing slips and their shipping labels
    Process {
        /// Packing slip PDF
        #[arg(long)]
        slips: PathBuf,

        /// Shipping label PDF (looked up next to the slips when omitted)
        #[arg(long)]
        labels: Option<PathBuf>,

        /// Output directory (defaults to the slips' directory)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Product/location table (CSV)
        #[arg(long)]
        table: PathBuf,

        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// View or edit the product/location table
    Table {
        /// Product/location table (CSV)
        #[arg(long)]
        table: PathBuf,

        #[command(subcommand)]
        action: TableAction,
    },
}

#[derive(Subcommand, Debug)]
enum TableAction {
    /// List entries, optionally filtered
    List {
        #[arg(long, default_value = "")]
        product: String,
        #[arg(long, default_value = "")]
        location: String,
    },
    /// Add a product or change its location
    Add { product: String, location: String },
    /// Rename a product and set its location
    Rename {
        old: String,
        new: String,
        location: String,
    },
    /// Remove a product
    Remove { product: String },
    /// Collapse duplicate product rows, keeping the last one
    Dedupe,
}

fn main() {
    let cli = Cli::parse();

    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    // Logs go to stderr so stdout stays clean for --json
    tracing_subscriber::registry()
        .with(log_filter(cli.verbose, env.as_deref()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// RUST_LOG wins when set and valid, otherwise `--verbose` picks the level.
fn log_filter(verbose: bool, env: Option<&str>) -> EnvFilter {
    if let Some(filter) = env
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
    {
        return filter;
    }
    EnvFilter::new(if verbose { "debug" } else { "info" })
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Process {
            slips,
            labels,
            out,
            table,
            config,
            json,
        } => process(&slips, labels, out, &table, config.as_deref(), json),
        Commands::Table { table, action } => {
            for line in run_table(&table, action)? {
                println!("{}", line);
            }
            Ok(())
        }
    }
}

fn process(
    slips: &Path,
    labels: Option<PathBuf>,
    out: Option<PathBuf>,
    table: &Path,
    config: Option<&Path>,
    json: bool,
) -> Result<()> {
    let config = match config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let table = LocationTable::load(table)
        .with_context(|| format!("Failed to load location table {}", table.display()))?;

    let labels = match labels {
        Some(path) => path,
        None => find_matching_labels(slips)?.with_context(|| {
            format!(
                "No shipping label PDF found next to {}; pass --labels",
                slips.display()
            )
        })?,
    };
    tracing::info!(labels = %labels.display(), "Using shipping labels");

    let out = out.unwrap_or_else(|| match slips.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    });

    let run = Pipeline::new(config, table)?.prepare_files(slips, &labels)?;
    let files = run.write_to(&out)?;

    if json {
        println!("{}", report_json(run.report(), &files)?);
    } else {
        for line in report_lines(run.report(), &files) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn report_json(report: &RunReport, files: &OutputFiles) -> Result<String> {
    let value = serde_json::json!({
        "report": report,
        "outputs": {
            "slips": files.slips.display().to_string(),
            "labels": files.labels.display().to_string(),
            "summary": files.summary.display().to_string(),
        },
    });
    Ok(serde_json::to_string_pretty(&value)?)
}

fn report_lines(report: &RunReport, files: &OutputFiles) -> Vec<String> {
    let mut lines = vec![format!(
        "Sorted {} units ({} matched) into {} locations",
        report.units,
        report.matched,
        report.per_location.len()
    )];
    for count in &report.per_location {
        let location = count.location.as_deref().unwrap_or("unmatched");
        lines.push(format!("  {:<10} {}", location, count.units));
    }
    if report.has_unmatched() {
        lines.push("Unmatched pages (add these to the location table):".to_string());
        for page in &report.unmatched {
            lines.push(format!(
                "  page {}: {}",
                page.page_index + 1,
                page.hint.as_deref().unwrap_or("(no item text)")
            ));
        }
    }
    if !report.blank_labels.is_empty() {
        let pages: Vec<String> = report
            .blank_labels
            .iter()
            .map(|p| (p + 1).to_string())
            .collect();
        lines.push(format!("Label pages that look blank: {}", pages.join(", ")));
    }
    lines.push(format!("Wrote {}", files.slips.display()));
    lines.push(format!("Wrote {}", files.labels.display()));
    lines.push(format!("Wrote {}", files.summary.display()));
    lines
}

/// Apply a table action, saving when it changes anything. Returns the lines
/// to print.
fn run_table(path: &Path, action: TableAction) -> Result<Vec<String>> {
    let mut table = if path.exists() {
        LocationTable::load(path)
            .with_context(|| format!("Failed to load location table {}", path.display()))?
    } else {
        LocationTable::new()
    };

    let message = match action {
        TableAction::List { product, location } => {
            return Ok(table
                .filter(&product, &location)
                .into_iter()
                .map(|entry| format!("{:<40} {}", entry.product_name, entry.location_code))
                .collect());
        }
        TableAction::Add { product, location } => {
            if table.upsert(&product, &location) {
                format!("Added {} -> {}", product, location)
            } else {
                format!("Updated {} -> {}", product, location)
            }
        }
        TableAction::Rename { old, new, location } => {
            if !table.rename(&old, &new, &location) {
                anyhow::bail!("Product not found: {}", old);
            }
            format!("Renamed {} to {} -> {}", old, new, location)
        }
        TableAction::Remove { product } => match table.remove(&product) {
            0 => anyhow::bail!("Product not found: {}", product),
            _ => format!("Removed {}", product),
        },
        TableAction::Dedupe => {
            let removed = table.remove_duplicates();
            format!("Removed {} duplicate rows", removed)
        }
    };

    table
        .save(path)
        .with_context(|| format!("Failed to save location table {}", path.display()))?;
    Ok(vec![message])
}
