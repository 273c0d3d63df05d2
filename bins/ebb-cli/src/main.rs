//! ebb-cli — inspect decay schedules and simulate the escrow stack.
//!
//! `schedule` prints the epoch-by-epoch voting power of a single lock;
//! `simulate` runs a deterministic multi-account scenario, including a
//! governance round, against the in-memory stack and reports the outcome.

use std::sync::Arc;

use anyhow::{bail, ensure, Result};
use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use ebb_core::asset::MemoryAssetLedger;
use ebb_core::clock::{EpochSource, ManualEpochSource};
use ebb_core::config::{GovernanceConfig, LedgerConfig};
use ebb_core::constants::{MAX_LOCK_EPOCHS, MIN_LOCK_EPOCHS};
use ebb_core::error::ExecError;
use ebb_core::traits::ProposalExecutor;
use ebb_core::types::AccountId;
use ebb_escrow::StakeLedger;
use ebb_governance::Governance;

/// ebb command-line interface.
#[derive(Parser)]
#[command(name = "ebb-cli")]
#[command(version, about = "Voting power ebbs as locks age.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the decay schedule of a single lock.
    Schedule(ScheduleArgs),
    /// Run a deterministic multi-account simulation.
    Simulate(SimulateArgs),
}

#[derive(Args)]
struct ScheduleArgs {
    /// Principal to lock, in base units.
    #[arg(short, long)]
    amount: u64,

    /// Lock duration in epochs.
    #[arg(short, long)]
    duration: u64,

    /// Epoch the lock starts at.
    #[arg(short, long, default_value = "1")]
    start_epoch: u64,

    /// Emit JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct SimulateArgs {
    /// Number of accounts locking.
    #[arg(short, long, default_value = "4")]
    accounts: u8,

    /// Number of epochs to run.
    #[arg(short, long, default_value = "26")]
    epochs: u64,

    /// RNG seed; the same seed replays the same scenario.
    #[arg(short, long, default_value = "7")]
    seed: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Schedule(args) => schedule(args),
        Commands::Simulate(args) => simulate(args),
    }
}

fn acct(seed: u8) -> AccountId {
    AccountId([seed; 32])
}

fn vault() -> AccountId {
    acct(0xEE)
}

/// Build the in-memory stack starting at `epoch`.
fn stack(epoch: u64) -> (Arc<MemoryAssetLedger>, Arc<ManualEpochSource>, Arc<StakeLedger>) {
    let asset = Arc::new(MemoryAssetLedger::new(vault()));
    let epochs = Arc::new(ManualEpochSource::new(epoch));
    let config = LedgerConfig { vault: vault(), ..LedgerConfig::default() };
    let ledger = Arc::new(StakeLedger::new(config, epochs.clone(), asset.clone()));
    (asset, epochs, ledger)
}

/// Print one lock's epoch-by-epoch decay schedule.
fn schedule(args: ScheduleArgs) -> Result<()> {
    if args.duration < MIN_LOCK_EPOCHS || args.duration > MAX_LOCK_EPOCHS {
        bail!(
            "duration {} out of bounds: allowed {}..={} epochs",
            args.duration,
            MIN_LOCK_EPOCHS,
            MAX_LOCK_EPOCHS
        );
    }

    let account = acct(1);
    let (asset, _epochs, ledger) = stack(args.start_epoch);
    asset.mint(&account, args.amount);
    asset.approve(&account, args.amount);
    ledger.lock(&account, args.amount, args.duration)?;

    let slope = args.amount / args.duration;
    let dust = args.amount % args.duration;
    let rows: Vec<(u64, u64)> = (args.start_epoch..=args.start_epoch + args.duration)
        .map(|epoch| Ok((epoch, ledger.voting_power_at(&account, epoch)?)))
        .collect::<Result<_>>()?;

    if args.json {
        let out = serde_json::json!({
            "amount": args.amount,
            "duration_epochs": args.duration,
            "start_epoch": args.start_epoch,
            "slope": slope,
            "dust": dust,
            "schedule": rows
                .iter()
                .map(|(epoch, power)| serde_json::json!({ "epoch": epoch, "power": power }))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Lock of {} over {} epochs (slope {}/epoch)", args.amount, args.duration, slope);
    println!("{:>8}  {:>20}", "epoch", "voting power");
    for (epoch, power) in &rows {
        println!("{epoch:>8}  {power:>20}");
    }
    if dust > 0 {
        println!("Residual dust: {dust} (never decays, never withdrawable)");
    }
    Ok(())
}

/// Executor used by the simulation's governance round.
struct NoopExecutor;

impl ProposalExecutor for NoopExecutor {
    fn execute(&self) -> Result<(), ExecError> {
        Ok(())
    }
}

/// Drive a random-but-reproducible sequence of locks and withdrawals, plus
/// one governance round, then verify the aggregate invariant.
fn simulate(args: SimulateArgs) -> Result<()> {
    ensure!(args.accounts > 0, "need at least one account");
    let mut rng = StdRng::seed_from_u64(args.seed);

    let (asset, epochs, ledger) = stack(1);
    let governance = Governance::new(GovernanceConfig::default(), ledger.clone());
    let accounts: Vec<AccountId> = (1..=args.accounts).map(acct).collect();

    let mut proposal = None;
    for epoch in 1..=args.epochs {
        epochs.set(epoch);

        for account in &accounts {
            if rng.gen_bool(0.4) {
                let amount = rng.gen_range(1_000..1_000_000);
                let duration = rng.gen_range(MIN_LOCK_EPOCHS..=MAX_LOCK_EPOCHS / 4);
                asset.mint(account, amount);
                asset.approve(account, amount);
                ledger.lock(account, amount, duration)?;
            } else if rng.gen_bool(0.25) {
                ledger.unlock(account)?;
            }
        }

        // Halfway through, the strongest account opens a proposal and the
        // rest vote once the window elapses.
        if epoch == args.epochs / 2 {
            let proposer = accounts
                .iter()
                .max_by_key(|a| ledger.current_voting_power(a).unwrap_or(0));
            if let Some(proposer) = proposer {
                match governance.create_proposal(proposer, Arc::new(NoopExecutor)) {
                    Ok(id) => {
                        info!(id, proposer = %proposer, epoch, "simulation proposal created");
                        proposal = Some(id);
                    }
                    Err(err) => info!(%err, "proposal declined"),
                }
            }
        }
        if let Some(id) = proposal {
            let opens_at = governance
                .proposal(id)
                .map(|p| p.opens_at(governance.config().vote_window_epochs));
            if opens_at == Some(epoch) {
                for account in &accounts {
                    governance.vote(account, id, rng.gen_bool(0.7))?;
                }
            }
        }
    }

    if let Some(id) = proposal {
        match governance.execute_proposal(id) {
            Ok(()) => info!(id, "simulation proposal executed"),
            Err(err) => info!(id, %err, "simulation proposal not executed"),
        }
    }

    let now = epochs.current_epoch();
    println!("Simulation finished at epoch {now} (seed {})", args.seed);
    println!(
        "{:>8}  {:>14}  {:>14}  {:>14}",
        "account", "deposited", "power", "balance"
    );
    for account in &accounts {
        println!(
            "{:>8}  {:>14}  {:>14}  {:>14}",
            &account.to_string()[..8],
            ledger.deposited(account),
            ledger.current_voting_power(account)?,
            asset.balance_of(account),
        );
    }

    let sum: u64 = accounts
        .iter()
        .map(|a| ledger.current_voting_power(a).unwrap_or(0))
        .sum();
    let total = ledger.current_total_voting_power()?;
    ensure!(sum == total, "aggregate {total} diverged from account sum {sum}");
    println!("Total voting power: {total} (aggregate matches account sum)");
    println!("Vault holds {} of {} deposited", asset.balance_of(&vault()), ledger.total_deposited());
    Ok(())
}
