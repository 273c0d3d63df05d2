//! Shared test helpers: a fully wired in-memory stack.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use ebb_core::asset::MemoryAssetLedger;
use ebb_core::clock::ManualEpochSource;
use ebb_core::config::{GovernanceConfig, LedgerConfig};
use ebb_core::error::ExecError;
use ebb_core::traits::ProposalExecutor;
use ebb_core::types::AccountId;
use ebb_escrow::StakeLedger;
use ebb_governance::Governance;

/// Account id from a seed byte.
pub fn acct(seed: u8) -> AccountId {
    AccountId([seed; 32])
}

/// The vault account locked principal is escrowed in.
pub fn vault() -> AccountId {
    acct(0xEE)
}

/// A full in-memory stack, wired the way production wires it: manual epochs
/// driving both the ledger and governance, governance reading power only
/// through the ledger's query surface.
pub struct Harness {
    pub asset: Arc<MemoryAssetLedger>,
    pub epochs: Arc<ManualEpochSource>,
    pub ledger: Arc<StakeLedger>,
    pub governance: Governance,
}

/// Build a harness starting at `epoch` with default configuration.
pub fn harness(epoch: u64) -> Harness {
    let asset = Arc::new(MemoryAssetLedger::new(vault()));
    let epochs = Arc::new(ManualEpochSource::new(epoch));
    let config = LedgerConfig { vault: vault(), ..LedgerConfig::default() };
    let ledger = Arc::new(StakeLedger::new(config, epochs.clone(), asset.clone()));
    let governance = Governance::new(GovernanceConfig::default(), ledger.clone());
    Harness { asset, epochs, ledger, governance }
}

/// Mint `amount` to `account` and approve the escrow to pull it.
pub fn fund(h: &Harness, account: &AccountId, amount: u64) {
    h.asset.mint(account, amount);
    h.asset.approve(account, amount);
}

/// Executor that counts invocations and optionally fails.
pub struct FlagExecutor {
    calls: AtomicUsize,
    fail: bool,
}

impl FlagExecutor {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self { calls: AtomicUsize::new(0), fail: false })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self { calls: AtomicUsize::new(0), fail: true })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ProposalExecutor for FlagExecutor {
    fn execute(&self) -> Result<(), ExecError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ExecError("payload rejected".into()));
        }
        Ok(())
    }
}
