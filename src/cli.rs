use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use siplah_export::export::ExportKind;

#[derive(Parser, Debug)]
#[command(name = "siplah-export")]
#[command(about = "Run SIPLAH back-office exports from the command line", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $SIPLAH_EXPORT_CONFIG or config/siplah-export.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// API token (defaults to $SIPLAH_TOKEN)
    #[arg(long, global = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an export, wait for it to finish and save the file
    Export(ExportArgs),
    /// Check the status of a submitted export once
    Status(StatusArgs),
}

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// Which export to run
    #[arg(value_enum)]
    pub kind: ExportKind,

    /// Free-text search
    #[arg(long)]
    pub search: Option<String>,

    /// Order status code (repeatable)
    #[arg(long = "status", value_name = "CODE")]
    pub statuses: Vec<String>,

    /// Only payments that were (or were not) forwarded
    #[arg(long)]
    pub forwarded: Option<bool>,

    #[arg(long, value_name = "YYYY-MM-DD")]
    pub start_date: Option<NaiveDate>,

    #[arg(long, value_name = "YYYY-MM-DD")]
    pub end_date: Option<NaiveDate>,

    /// Billing month (bills only, with --year)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    pub month: Option<u32>,

    #[arg(long)]
    pub year: Option<i32>,

    /// Provider (mall) id (repeatable, providers only)
    #[arg(long = "provider", value_name = "MALL_ID")]
    pub providers: Vec<u64>,

    /// Output directory (overrides [output].dir)
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct StatusArgs {
    #[arg(value_enum)]
    pub kind: ExportKind,

    /// Job id returned when the export was started
    pub job_id: String,
}
