use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Table};
use i94etl_core::pipeline::{self, RunReport, Verification};
use i94etl_core::{InMemoryWarehouse, PipelineConfig, PostgresWarehouse, TableName, Warehouse};
use polars::prelude::{AnyValue, DataFrame};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "I94 immigration warehouse loader", long_about = None)]
struct Cli {
    /// Path to a TOML config file; environment variables override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build all tables, append them to the warehouse and verify row counts
    Run(RunArgs),
    /// Check that every destination table holds at least one row
    Verify,
    /// Run a SQL statement against the warehouse and print the result
    Query {
        sql: String,
    },
    /// Build all tables without writing them and print a preview of each
    Inspect {
        /// Rows to show per table
        #[arg(long, default_value_t = 5)]
        rows: usize,
    },
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Load into a process-local warehouse instead of the configured one
    #[arg(long)]
    dry_run: bool,
    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct RunSummary<'a> {
    loaded: &'a [pipeline::LoadedTable],
    verifications: &'a [Verification],
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();
    let mut config =
        PipelineConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Command::Run(args) => {
            let report = if args.dry_run {
                if config.verification_query.take().is_some() {
                    warn!("Skipping verification query during a dry run");
                }
                let warehouse = InMemoryWarehouse::new();
                pipeline::run(&config, &warehouse).await?
            } else {
                let warehouse = connect(&config).await?;
                pipeline::run(&config, &warehouse).await?
            };
            print_report(&report, args.json)?;
            ensure_verified(&report.verifications)
        }
        Command::Verify => {
            let warehouse = connect(&config).await?;
            let verifications = pipeline::verify_tables(&warehouse, &TableName::ALL).await?;
            print_verifications(&verifications);
            ensure_verified(&verifications)
        }
        Command::Query { sql } => {
            let warehouse = connect(&config).await?;
            let result = warehouse.query(&sql).await?;
            println!("{}", render_frame(&result));
            Ok(())
        }
        Command::Inspect { rows } => {
            let batch = pipeline::build_tables(&config)?;
            for (name, frame) in batch.iter() {
                println!("{name} ({} rows, {} columns)", frame.height(), frame.width());
                println!("{}", render_frame(&frame.head(Some(rows))));
            }
            Ok(())
        }
    }
}

async fn connect(config: &PipelineConfig) -> Result<PostgresWarehouse> {
    PostgresWarehouse::connect(config)
        .await
        .context("failed to connect to the warehouse")
}

fn ensure_verified(verifications: &[Verification]) -> Result<()> {
    let failed: Vec<String> = verifications
        .iter()
        .filter(|verification| !verification.passed())
        .map(|verification| verification.table.to_string())
        .collect();
    if failed.is_empty() {
        info!("All destination tables verified");
        Ok(())
    } else {
        bail!("row count check failed for: {}", failed.join(", "))
    }
}

fn print_report(report: &RunReport, json: bool) -> Result<()> {
    if json {
        let summary = RunSummary {
            loaded: &report.loaded,
            verifications: &report.verifications,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Table", "Rows written"]);
    for loaded in &report.loaded {
        table.add_row(vec![loaded.table.to_string(), loaded.rows_written.to_string()]);
    }
    println!("{table}");
    print_verifications(&report.verifications);

    if let Some(result) = &report.query_result {
        println!("{}", render_frame(result));
    }
    Ok(())
}

fn print_verifications(verifications: &[Verification]) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Table", "Row count", "Status"]);
    for verification in verifications {
        let status = if verification.passed() { "passed" } else { "FAILED" };
        table.add_row(vec![
            verification.table.to_string(),
            verification.row_count.to_string(),
            status.to_string(),
        ]);
    }
    println!("{table}");
}

fn render_frame(frame: &DataFrame) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(
        frame
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect::<Vec<_>>(),
    );
    for idx in 0..frame.height() {
        let row: Vec<String> = frame
            .get_columns()
            .iter()
            .map(|column| column.get(idx).map(cell_text).unwrap_or_default())
            .collect();
        table.add_row(row);
    }
    table
}

fn cell_text(value: AnyValue<'_>) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::String(text) => text.to_string(),
        AnyValue::StringOwned(text) => text.to_string(),
        other => other.to_string(),
    }
}
