use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "clerk",
    about = "Clerk: exactly-once ledger of external-chain events",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Journal file holding the ledger (overrides the config file)
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show one event record
    Get(GetArgs),
    /// List event records in id-key order
    List(ListArgs),
    /// List event records admitted in a time window
    Range(RangeArgs),
    /// List every admitted sequence
    Sequences,
    /// Check whether a sequence has been admitted
    HasSequence(HasSequenceArgs),
    /// Derive the sequence id for a block log position
    SequenceId(SequenceIdArgs),
    /// Write the ledger contents as genesis JSON
    Export(ExportArgs),
    /// Load a genesis JSON file into the ledger
    Import(ImportArgs),
}

#[derive(Args)]
pub struct GetArgs {
    pub id: u64,
}

#[derive(Args)]
pub struct ListArgs {
    #[arg(long, default_value = "1")]
    pub page: u64,
    #[arg(long, default_value = "50")]
    pub limit: u64,
}

#[derive(Args)]
pub struct RangeArgs {
    /// Inclusive lower bound (RFC 3339)
    #[arg(long)]
    pub from: String,
    /// Exclusive upper bound (RFC 3339)
    #[arg(long)]
    pub to: String,
    /// 0 together with --limit 0 lists the whole window
    #[arg(long, default_value = "0")]
    pub page: u64,
    #[arg(long, default_value = "0")]
    pub limit: u64,
}

#[derive(Args)]
pub struct HasSequenceArgs {
    pub sequence: String,
}

#[derive(Args)]
pub struct SequenceIdArgs {
    #[arg(long)]
    pub block: u64,
    #[arg(long)]
    pub log_index: u64,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Output file; stdout when omitted
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Args)]
pub struct ImportArgs {
    pub file: PathBuf,
}
