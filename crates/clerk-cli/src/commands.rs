use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clerk_ledger::{
    export_genesis, init_genesis, EventLedger, EventReader, GenesisState, LedgerConfig,
};
use clerk_store::{JournalKvStore, KvStore, StagedKvStore};
use clerk_types::{EventRecord, RecordTime};
use colored::Colorize;
use tracing::debug;

use crate::cli::*;

type Ledger = EventLedger<JournalKvStore>;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let format = cli.format;
    let data = cli.data;
    let open = |config: LedgerConfig| -> anyhow::Result<Ledger> {
        let path = journal_path(data, &config)?;
        open_ledger(&path, config)
    };

    match cli.command {
        Command::SequenceId(args) => cmd_sequence_id(&config, &args, format),
        Command::Get(args) => cmd_get(&open(config)?, args, format),
        Command::List(args) => cmd_list(&open(config)?, args, format),
        Command::Range(args) => cmd_range(&open(config)?, args, format),
        Command::Sequences => cmd_sequences(&open(config)?, format),
        Command::HasSequence(args) => cmd_has_sequence(&open(config)?, args, format),
        Command::Export(args) => cmd_export(&open(config)?, args),
        Command::Import(args) => cmd_import(&open(config)?, args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<LedgerConfig> {
    match path {
        Some(path) => LedgerConfig::load(path).context("loading configuration"),
        None => Ok(LedgerConfig::default()),
    }
}

fn journal_path(flag: Option<PathBuf>, config: &LedgerConfig) -> anyhow::Result<PathBuf> {
    match flag.or_else(|| config.journal.path.clone()) {
        Some(path) => Ok(path),
        None => bail!("no ledger journal given; pass --data or set journal.path in the config"),
    }
}

fn open_ledger(path: &Path, config: LedgerConfig) -> anyhow::Result<Ledger> {
    let store = JournalKvStore::open(path, config.journal_config())
        .with_context(|| format!("opening journal {}", path.display()))?;
    let report = store.recovery_report();
    if report.skipped > 0 || report.truncated_bytes > 0 {
        eprintln!(
            "{} journal recovery skipped {} frame(s), truncated {} byte(s)",
            "warning:".yellow().bold(),
            report.skipped,
            report.truncated_bytes
        );
    }
    debug!(path = %path.display(), "ledger opened");
    Ok(EventLedger::with_config(store, config))
}

fn cmd_get(ledger: &Ledger, args: GetArgs, format: OutputFormat) -> anyhow::Result<()> {
    let record = ledger.get_record(args.id)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
        OutputFormat::Text => print_record(&record),
    }
    Ok(())
}

fn cmd_list(ledger: &Ledger, args: ListArgs, format: OutputFormat) -> anyhow::Result<()> {
    let records = ledger.list_records(args.page, args.limit)?;
    print_records(&records, format)
}

fn cmd_range(ledger: &Ledger, args: RangeArgs, format: OutputFormat) -> anyhow::Result<()> {
    let from = RecordTime::parse_rfc3339(&args.from)
        .context("parsing --from")?;
    let to = RecordTime::parse_rfc3339(&args.to)
        .context("parsing --to")?;
    let records = ledger.list_records_by_time(&from, &to, args.page, args.limit)?;
    print_records(&records, format)
}

fn cmd_sequences(ledger: &Ledger, format: OutputFormat) -> anyhow::Result<()> {
    let sequences = ledger.list_sequences()?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&sequences)?),
        OutputFormat::Text => {
            for sequence in &sequences {
                println!("{sequence}");
            }
            println!("{} sequence(s)", sequences.len().to_string().bold());
        }
    }
    Ok(())
}

fn cmd_has_sequence(
    ledger: &Ledger,
    args: HasSequenceArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let used = ledger.has_sequence(&args.sequence)?;
    match format {
        OutputFormat::Json => {
            let body = serde_json::json!({ "sequence": args.sequence, "admitted": used });
            println!("{body}");
        }
        OutputFormat::Text if used => {
            println!("{} {} admitted", "✓".green().bold(), args.sequence.yellow());
        }
        OutputFormat::Text => {
            println!(
                "{} {} not admitted",
                "✗".red().bold(),
                args.sequence.yellow()
            );
        }
    }
    Ok(())
}

fn cmd_sequence_id(
    config: &LedgerConfig,
    args: &SequenceIdArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let sequence = clerk_types::SequenceId::from_log_position(
        args.block,
        args.log_index,
        config.log_index_unit,
    );
    match format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "sequence": sequence })),
        OutputFormat::Text => println!("{sequence}"),
    }
    Ok(())
}

fn cmd_export(ledger: &Ledger, args: ExportArgs) -> anyhow::Result<()> {
    let json = export_json(ledger)?;
    match args.out {
        Some(path) => {
            fs::write(&path, json)
                .with_context(|| format!("writing {}", path.display()))?;
            eprintln!(
                "{} Exported genesis to {}",
                "✓".green().bold(),
                path.display().to_string().bold()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn cmd_import(ledger: &Ledger, args: ImportArgs) -> anyhow::Result<()> {
    let (records, sequences) = import_file(ledger, &args.file)?;
    println!(
        "{} Loaded {} record(s) and {} sequence(s)",
        "✓".green().bold(),
        records.to_string().bold(),
        sequences.to_string().bold()
    );
    Ok(())
}

fn export_json<S: KvStore>(ledger: &EventLedger<S>) -> anyhow::Result<String> {
    Ok(export_genesis(ledger)?.to_json_pretty()?)
}

/// Load a genesis file as one staged commit. Returns the number of records
/// and sequences loaded.
fn import_file<S: KvStore>(ledger: &EventLedger<S>, path: &Path) -> anyhow::Result<(usize, usize)> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let state = GenesisState::from_json(&text)?;

    let mut staged =
        EventLedger::with_config(StagedKvStore::new(ledger.store()), ledger.config().clone());
    init_genesis(&mut staged, &state)?;
    staged.into_store().commit()?;

    Ok((state.event_records.len(), state.record_sequences.len()))
}

fn print_records(records: &[EventRecord], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(records)?),
        OutputFormat::Text => {
            for record in records {
                print_record(record);
            }
            println!("{} record(s)", records.len().to_string().bold());
        }
    }
    Ok(())
}

fn print_record(record: &EventRecord) {
    println!(
        "{}  {}",
        format!("#{}", record.id).yellow().bold(),
        record.record_time.to_string().dimmed()
    );
    println!("  Contract: {}", record.contract.cyan());
    println!("  Tx: {} (log {})", record.tx_hash, record.log_index);
    if !record.chain_id.is_empty() {
        println!("  Chain: {}", record.chain_id);
    }
    println!("  Data: {} bytes", record.data.len());
}
