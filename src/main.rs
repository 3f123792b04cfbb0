use clap::Parser;
use miette::{IntoDiagnostic, Result};
use preverify::application::engine::AuthorizationEngine;
use preverify::config::EngineConfig;
use preverify::domain::authorization::{DecisionRecord, MerchantAnalytics};
use preverify::domain::ports::{SharedClock, TransactionStoreBox};
use preverify::domain::transaction::Amount;
use preverify::infrastructure::clock::SystemClock;
use preverify::infrastructure::in_memory::InMemoryTransactionStore;
use preverify::interfaces::csv::decision_writer::DecisionWriter;
use preverify::interfaces::csv::record_reader::{Command, RecordReader};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input CSV of preverify/authorize requests.
    ///
    /// Token expiry and the velocity window run on the wall clock at
    /// processing time. Time-of-day risk reads each row's own timestamp,
    /// or the processing time when the row has none.
    input: PathBuf,

    /// Engine configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for the new-device reputation roll
    #[arg(long)]
    seed: Option<u64>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Write merchant analytics and decision history as JSON to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct Report {
    merchants: Vec<MerchantAnalytics>,
    history: Vec<DecisionRecord>,
}

fn setup_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { "warn" })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn open_store(db_path: Option<&Path>) -> Result<TransactionStoreBox> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = preverify::infrastructure::rocksdb::RocksDBStore::open(path).into_diagnostic()?;
            Ok(Box::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            warn!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Box::new(InMemoryTransactionStore::new()))
        }
        None => Ok(Box::new(InMemoryTransactionStore::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path).into_diagnostic()?,
        None => EngineConfig::default(),
    };
    if cli.seed.is_some() {
        config.device_seed = cli.seed;
    }
    config.validate().into_diagnostic()?;

    let clock: SharedClock = Arc::new(SystemClock);
    let store = open_store(cli.db_path.as_deref())?;
    let engine = AuthorizationEngine::new(&config, store, clock.clone());

    // Tokens issued so far, as a caller would hold them.
    let mut tokens: HashMap<(String, Amount), String> = HashMap::new();

    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = RecordReader::new(file);
    let stdout = io::stdout();
    let mut writer = DecisionWriter::new(stdout.lock());

    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!("Error reading record: {}", e);
                continue;
            }
        };

        match record.command {
            Command::Preverify => {
                let response = engine.pre_verify_with_method(
                    &record.customer_id,
                    record.amount,
                    record.verification_method.as_deref(),
                );
                info!(customer_id = %record.customer_id, amount = %record.amount, "pre-verified");
                tokens.insert(
                    (record.customer_id, record.amount),
                    response.verification_token,
                );
            }
            Command::Authorize => {
                let key = (record.customer_id.clone(), record.amount);
                let tx = match record.into_transaction(clock.now()) {
                    Ok(tx) => tx,
                    Err(e) => {
                        warn!("Error processing record: {}", e);
                        continue;
                    }
                };
                match engine
                    .authorize_transaction(tx, tokens.get(&key).map(String::as_str))
                    .await
                {
                    Ok(outcome) => writer.write_outcome(&outcome).into_diagnostic()?,
                    Err(e) => warn!("Error processing record: {}", e),
                }
            }
        }
    }
    writer.flush().into_diagnostic()?;

    if let Some(path) = &cli.report {
        let history = engine.transaction_history(usize::MAX).await;
        let merchants: BTreeSet<&str> = history
            .iter()
            .map(|r| r.transaction.merchant_id.as_str())
            .collect();
        let start = history.iter().map(|r| r.transaction.timestamp).min();
        let end = history.iter().map(|r| r.transaction.timestamp).max();

        let mut analytics = Vec::new();
        if let (Some(start), Some(end)) = (start, end) {
            for merchant in merchants {
                if let Some(summary) = engine.merchant_analytics(merchant, start, end).await {
                    analytics.push(summary);
                }
            }
        }

        let report = Report {
            merchants: analytics,
            history,
        };
        let file = File::create(path).into_diagnostic()?;
        serde_json::to_writer_pretty(file, &report).into_diagnostic()?;
    }

    Ok(())
}
