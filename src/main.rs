use clap::Parser;
use miette::{IntoDiagnostic, Result};
use payout_lifecycle::application::lifecycle::PayoutLifecycle;
use payout_lifecycle::application::referrals::ReferralProgram;
use payout_lifecycle::config::SettingsArgs;
use payout_lifecycle::domain::ports::{PayoutStoreRef, ReferralStoreRef};
use payout_lifecycle::domain::query::PayoutQuery;
use payout_lifecycle::infrastructure::in_memory::{InMemoryPayoutStore, InMemoryReferralStore};
use payout_lifecycle::infrastructure::notifier::LogNotifier;
use payout_lifecycle::infrastructure::sandbox_gateway::{SandboxConfig, SandboxGateway};
use payout_lifecycle::interfaces::batch::{BatchRunner, Outcome};
use payout_lifecycle::interfaces::command::PayoutCommand;
use payout_lifecycle::interfaces::csv::command_reader::CommandReader;
use payout_lifecycle::interfaces::report::PayoutWriter;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Operator command batch (CSV)
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// OTP accepted by the sandbox payment gateway
    #[arg(long, default_value = "123456")]
    sandbox_otp: String,

    /// Let sandbox transfers go straight to processing without an OTP
    #[arg(long)]
    sandbox_skip_otp: bool,

    #[command(flatten)]
    settings: SettingsArgs,
}

fn stores(db_path: Option<PathBuf>) -> Result<(PayoutStoreRef, ReferralStoreRef)> {
    #[cfg(feature = "storage-rocksdb")]
    {
        if let Some(db_path) = db_path {
            let store = payout_lifecycle::infrastructure::rocksdb::RocksDBStore::open(db_path)
                .into_diagnostic()?;
            let payouts: PayoutStoreRef = Arc::new(store.clone());
            let referrals: ReferralStoreRef = Arc::new(store);
            return Ok((payouts, referrals));
        }
    }

    #[cfg(not(feature = "storage-rocksdb"))]
    {
        if db_path.is_some() {
            warn!(
                "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
        }
    }

    let payouts: PayoutStoreRef = Arc::new(InMemoryPayoutStore::new());
    let referrals: ReferralStoreRef = Arc::new(InMemoryReferralStore::new());
    Ok((payouts, referrals))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let settings = cli.settings.into_settings().into_diagnostic()?;
    let (payout_store, referral_store) = stores(cli.db_path)?;

    let gateway = SandboxGateway::new(SandboxConfig {
        require_otp: !cli.sandbox_skip_otp,
        otp_code: cli.sandbox_otp,
        ..SandboxConfig::default()
    });
    let lifecycle = PayoutLifecycle::new(
        payout_store,
        referral_store.clone(),
        Arc::new(gateway),
        Arc::new(LogNotifier::new()),
        settings.clone(),
    );
    let referrals = ReferralProgram::new(referral_store, settings);

    // Process commands
    let file = File::open(cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    let mut runner = BatchRunner::new(&lifecycle, &referrals);
    for (line, record) in reader.records().enumerate() {
        let command = match record.and_then(PayoutCommand::try_from) {
            Ok(command) => command,
            Err(e) => {
                warn!(row = line + 1, error = %e, "Error reading command");
                continue;
            }
        };
        match runner.execute(command).await {
            Ok(Outcome::Payout(payout)) => {
                info!(
                    row = line + 1,
                    payout_id = %payout.id,
                    status = %payout.status,
                    "command applied"
                );
            }
            Ok(Outcome::Credited { order, applied }) => {
                info!(row = line + 1, order = %order, applied, "referral credit processed");
            }
            Err(e) => {
                warn!(
                    row = line + 1,
                    retryable = e.is_retryable(),
                    error = %e,
                    "Error processing command"
                );
            }
        }
    }

    // Output final state
    let payouts = lifecycle
        .list_all(&PayoutQuery::default())
        .await
        .into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = PayoutWriter::new(stdout.lock());
    writer.write_payouts(payouts).into_diagnostic()?;

    Ok(())
}
