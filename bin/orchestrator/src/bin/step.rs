//! CLI tool to run individual orchestrator operations.
//!
//! - `list`: Show the owner's tracked withdrawals
//! - `track`: Start tracking an initiated withdrawal
//! - `check`: Probe one withdrawal and apply the resulting transition
//! - `execute`: Run an L1 step (prove, finalize or execute)
//! - `delete`: Stop tracking a withdrawal
//! - `sync`: Merge the local and remote stores

use alloy_primitives::{Address, TxHash};
use clap::{Parser, Subcommand};
use orchestrator::{config::Config, unix_now, wiring};
use tracing::info;
use withdrawal::{NewWithdrawal, RecordId, StepId, WithdrawalRecord};

#[derive(Parser)]
#[command(name = "step")]
#[command(about = "Run individual withdrawal operations")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Private key for signing transactions (hex string, with or without 0x prefix)
    #[arg(short = 'k', long, env = "PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List tracked withdrawals of the configured owner
    List,

    /// Start tracking an initiated withdrawal
    Track {
        /// Initiating L2 transaction hash
        tx_hash: TxHash,
        /// L2 chain ID
        #[arg(long)]
        chain_id: u64,
        /// Amount in ether units
        #[arg(long)]
        amount: String,
        /// Recipient on L1; defaults to the owner
        #[arg(long)]
        to: Option<Address>,
        /// Unix time of initiation; defaults to now
        #[arg(long)]
        initiated_at: Option<u64>,
    },

    /// Probe a withdrawal and apply the resulting transition
    Check { id: RecordId },

    /// Execute an L1 step: prove, finalize or execute
    Execute { id: RecordId, step: StepId },

    /// Stop tracking a withdrawal
    Delete { id: RecordId },

    /// Merge local and remote records
    Sync,
}

fn print_record(record: &WithdrawalRecord) {
    let error = record.last_error.as_deref().unwrap_or("-");
    println!(
        "{} {} chain={} step={} status={} amount={} error={}",
        record.id,
        record.rollup_family.as_str(),
        record.source_chain_id,
        record.current_step,
        record.status,
        record.amount,
        error,
    );
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_file(&cli.config)?;
    let orchestrator = wiring::build(&config, cli.private_key.as_deref()).await?;

    match cli.command {
        Command::List => {
            for record in orchestrator.list().await? {
                print_record(&record);
            }
        }
        Command::Track {
            tx_hash,
            chain_id,
            amount,
            to,
            initiated_at,
        } => {
            let l1_chain_id = orchestrator.network().l1_chain_id;
            let record = orchestrator
                .create_withdrawal(NewWithdrawal {
                    transaction_hash: tx_hash,
                    source_chain_id: chain_id,
                    destination_chain_id: l1_chain_id,
                    amount,
                    from: config.owner,
                    to: to.unwrap_or(config.owner),
                    initiated_at: initiated_at.unwrap_or_else(unix_now),
                })
                .await?;
            print_record(&record);
        }
        Command::Check { id } => {
            let outcome = orchestrator.check_status(id).await?;
            if let Some(probe) = &outcome.probe {
                info!(
                    source = %probe.source,
                    signal = probe.signal.as_str(),
                    detail = %probe.detail,
                    "Probe result"
                );
            }
            print_record(&outcome.record);
        }
        Command::Execute { id, step } => {
            info!(%id, step = step.as_str(), "Running step");
            let record = orchestrator.execute_step(id, step).await?;
            print_record(&record);
        }
        Command::Delete { id } => match orchestrator.delete(id).await? {
            Some(record) => info!(id = %record.id, "Deleted"),
            None => info!(%id, "No such withdrawal"),
        },
        Command::Sync => {
            for record in orchestrator.sync().await? {
                print_record(&record);
            }
        }
    }

    Ok(())
}
