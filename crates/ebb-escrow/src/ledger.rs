//! The stake ledger: every account's stake plus the aggregate, behind one lock.
//!
//! Each public operation runs under a single mutex start to finish, so calls
//! are linearized; decay-line replay is not associative across interleaved
//! mutations. External asset transfers are invoked only after the updated
//! stakes are fully computed, and the updates are written back only once the
//! transfer has succeeded, so a failed call commits nothing.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use ebb_core::clock::EpochSource;
use ebb_core::config::LedgerConfig;
use ebb_core::error::EscrowError;
use ebb_core::traits::{AssetLedger, VotingPowerSource};
use ebb_core::types::{AccountId, Epoch};

use crate::stake::Stake;

struct StakeBook {
    stakes: HashMap<AccountId, Stake>,
    /// Epoch-wise sum of all account stakes.
    total: Stake,
}

/// Owns one [`Stake`] per account plus the aggregate stake.
///
/// Every lock registers its ramp on both the account's stake and the
/// aggregate, so total voting power is answered by one replay rather than a
/// sweep over accounts. Governance consumes this type through
/// [`VotingPowerSource`] and never touches decay lines directly.
pub struct StakeLedger {
    config: LedgerConfig,
    epochs: Arc<dyn EpochSource>,
    asset: Arc<dyn AssetLedger>,
    book: Mutex<StakeBook>,
}

impl StakeLedger {
    /// Create a ledger over the given epoch source and asset ledger.
    pub fn new(
        config: LedgerConfig,
        epochs: Arc<dyn EpochSource>,
        asset: Arc<dyn AssetLedger>,
    ) -> Self {
        let now = epochs.current_epoch();
        Self {
            config,
            epochs,
            asset,
            book: Mutex::new(StakeBook { stakes: HashMap::new(), total: Stake::new(now) }),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// The epoch the ledger currently considers "now".
    pub fn current_epoch(&self) -> Epoch {
        self.epochs.current_epoch()
    }

    /// Lock `amount` for `duration_epochs`, pulling the principal from
    /// `account` into the vault.
    ///
    /// Fails with `InvalidDuration` outside the configured bounds and with
    /// `TransferFailed` when the asset ledger declines the pull; neither
    /// leaves any stake mutated.
    pub fn lock(
        &self,
        account: &AccountId,
        amount: u64,
        duration_epochs: u64,
    ) -> Result<(), EscrowError> {
        if duration_epochs < self.config.min_lock_epochs
            || duration_epochs > self.config.max_lock_epochs
        {
            return Err(EscrowError::InvalidDuration {
                epochs: duration_epochs,
                min: self.config.min_lock_epochs,
                max: self.config.max_lock_epochs,
            });
        }

        let now = self.epochs.current_epoch();
        let mut book = self.book.lock();

        // Stage both updated stakes before touching the external ledger.
        let mut stake = book
            .stakes
            .get(account)
            .cloned()
            .unwrap_or_else(|| Stake::new(now));
        stake.lock(now, amount, duration_epochs)?;
        let mut total = book.total.clone();
        total.lock(now, amount, duration_epochs)?;

        self.asset.transfer_from(account, &self.config.vault, amount)?;

        book.stakes.insert(*account, stake);
        book.total = total;
        info!(account = %account, amount, duration_epochs, epoch = now, "lock registered");
        Ok(())
    }

    /// Withdraw the principal decay has released since the last call.
    ///
    /// Returns the amount paid out. A call with nothing newly released is a
    /// successful zero-value withdrawal, never an error, including for
    /// accounts that have never locked.
    pub fn unlock(&self, account: &AccountId) -> Result<u64, EscrowError> {
        let now = self.epochs.current_epoch();
        let mut book = self.book.lock();

        let Some(existing) = book.stakes.get(account) else {
            debug!(account = %account, "unlock with no stake record");
            return Ok(0);
        };

        let mut stake = existing.clone();
        stake.advance_to(now)?;
        let withdrawable = stake.withdrawable()?;
        stake.debit_principal(withdrawable)?;
        let mut total = book.total.clone();
        total.advance_to(now)?;
        total.debit_principal(withdrawable)?;

        if withdrawable > 0 {
            self.asset.transfer(account, withdrawable)?;
        }

        book.stakes.insert(*account, stake);
        book.total = total;
        info!(account = %account, amount = withdrawable, epoch = now, "principal withdrawn");
        Ok(withdrawable)
    }

    /// An account's voting power at `epoch`. Accounts without a stake record
    /// have zero power at every epoch.
    pub fn voting_power_at(&self, account: &AccountId, epoch: Epoch) -> Result<u64, EscrowError> {
        let book = self.book.lock();
        match book.stakes.get(account) {
            Some(stake) => stake.voting_power_at(epoch),
            None => Ok(0),
        }
    }

    /// An account's voting power at the current epoch.
    pub fn current_voting_power(&self, account: &AccountId) -> Result<u64, EscrowError> {
        self.voting_power_at(account, self.epochs.current_epoch())
    }

    /// Total voting power across all accounts at `epoch`.
    pub fn total_voting_power_at(&self, epoch: Epoch) -> Result<u64, EscrowError> {
        self.book.lock().total.voting_power_at(epoch)
    }

    /// Total voting power at the current epoch.
    pub fn current_total_voting_power(&self) -> Result<u64, EscrowError> {
        self.total_voting_power_at(self.epochs.current_epoch())
    }

    /// Principal the escrow currently holds for `account`.
    pub fn deposited(&self, account: &AccountId) -> u64 {
        self.book
            .lock()
            .stakes
            .get(account)
            .map_or(0, |stake| stake.deposited())
    }

    /// Principal the escrow currently holds across all accounts.
    pub fn total_deposited(&self) -> u64 {
        self.book.lock().total.deposited()
    }
}

impl VotingPowerSource for StakeLedger {
    fn current_epoch(&self) -> Epoch {
        self.epochs.current_epoch()
    }

    fn voting_power_at(&self, account: &AccountId, epoch: Epoch) -> Result<u64, EscrowError> {
        StakeLedger::voting_power_at(self, account, epoch)
    }

    fn total_voting_power_at(&self, epoch: Epoch) -> Result<u64, EscrowError> {
        StakeLedger::total_voting_power_at(self, epoch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ebb_core::asset::MemoryAssetLedger;
    use ebb_core::clock::ManualEpochSource;

    fn acct(seed: u8) -> AccountId {
        AccountId([seed; 32])
    }

    fn vault() -> AccountId {
        acct(0xEE)
    }

    /// Ledger at `epoch` with `funded` minted and approved per account.
    fn setup(
        epoch: Epoch,
        funded: &[(AccountId, u64)],
    ) -> (StakeLedger, Arc<MemoryAssetLedger>, Arc<ManualEpochSource>) {
        let asset = Arc::new(MemoryAssetLedger::new(vault()));
        for (account, amount) in funded {
            asset.mint(account, *amount);
            asset.approve(account, *amount);
        }
        let epochs = Arc::new(ManualEpochSource::new(epoch));
        let config = LedgerConfig { vault: vault(), ..LedgerConfig::default() };
        let ledger = StakeLedger::new(config, epochs.clone(), asset.clone());
        (ledger, asset, epochs)
    }

    // --- lock ---

    #[test]
    fn lock_moves_principal_to_vault() {
        let alice = acct(1);
        let (ledger, asset, _) = setup(5, &[(alice, 1000)]);

        ledger.lock(&alice, 1000, 10).unwrap();
        assert_eq!(asset.balance_of(&alice), 0);
        assert_eq!(asset.balance_of(&vault()), 1000);
        assert_eq!(ledger.deposited(&alice), 1000);
        assert_eq!(ledger.current_voting_power(&alice).unwrap(), 1000);
        assert_eq!(ledger.current_total_voting_power().unwrap(), 1000);
    }

    #[test]
    fn lock_rejects_out_of_bounds_duration() {
        let alice = acct(1);
        let (ledger, _, _) = setup(5, &[(alice, 1000)]);

        for epochs in [0, 1, 3, 209, 1000] {
            let err = ledger.lock(&alice, 1000, epochs).unwrap_err();
            assert!(matches!(err, EscrowError::InvalidDuration { .. }), "{epochs}");
        }
        assert_eq!(ledger.deposited(&alice), 0);
    }

    #[test]
    fn failed_transfer_commits_nothing() {
        let alice = acct(1);
        // Minted but never approved: the pull must fail.
        let asset = Arc::new(MemoryAssetLedger::new(vault()));
        asset.mint(&alice, 1000);
        let epochs = Arc::new(ManualEpochSource::new(5));
        let config = LedgerConfig { vault: vault(), ..LedgerConfig::default() };
        let ledger = StakeLedger::new(config, epochs, asset.clone());

        let err = ledger.lock(&alice, 1000, 10).unwrap_err();
        assert!(matches!(err, EscrowError::TransferFailed(_)));
        assert_eq!(ledger.deposited(&alice), 0);
        assert_eq!(ledger.current_total_voting_power().unwrap(), 0);
        assert_eq!(asset.balance_of(&alice), 1000);
    }

    // --- unlock ---

    #[test]
    fn unlock_pays_out_released_principal() {
        let alice = acct(1);
        let (ledger, asset, epochs) = setup(5, &[(alice, 1000)]);
        ledger.lock(&alice, 1000, 10).unwrap();

        epochs.set(10);
        assert_eq!(ledger.unlock(&alice).unwrap(), 500);
        assert_eq!(asset.balance_of(&alice), 500);
        assert_eq!(ledger.deposited(&alice), 500);

        epochs.set(15);
        assert_eq!(ledger.unlock(&alice).unwrap(), 500);
        assert_eq!(asset.balance_of(&alice), 1000);
        assert_eq!(ledger.deposited(&alice), 0);
        assert_eq!(asset.balance_of(&vault()), 0);
    }

    #[test]
    fn unlock_is_idempotent_within_an_epoch() {
        let alice = acct(1);
        let (ledger, asset, epochs) = setup(5, &[(alice, 1000)]);
        ledger.lock(&alice, 1000, 10).unwrap();

        epochs.set(8);
        let first = ledger.unlock(&alice).unwrap();
        assert_eq!(first, 300);
        assert_eq!(ledger.unlock(&alice).unwrap(), 0);
        assert_eq!(asset.balance_of(&alice), 300);
    }

    #[test]
    fn unlock_unknown_account_is_zero() {
        let (ledger, _, _) = setup(5, &[]);
        assert_eq!(ledger.unlock(&acct(9)).unwrap(), 0);
    }

    // --- aggregate invariant ---

    #[test]
    fn total_tracks_account_sum() {
        let (alice, bob) = (acct(1), acct(2));
        let (ledger, _, epochs) = setup(3, &[(alice, 2_000), (bob, 900)]);

        ledger.lock(&alice, 1200, 12).unwrap();
        epochs.set(5);
        ledger.lock(&bob, 900, 4).unwrap();
        epochs.set(7);
        ledger.lock(&alice, 800, 8).unwrap();
        ledger.unlock(&bob).unwrap();

        for epoch in 1..=25 {
            let sum = ledger.voting_power_at(&alice, epoch).unwrap()
                + ledger.voting_power_at(&bob, epoch).unwrap();
            assert_eq!(
                ledger.total_voting_power_at(epoch).unwrap(),
                sum,
                "aggregate diverged at epoch {epoch}"
            );
        }
        assert_eq!(
            ledger.total_deposited(),
            ledger.deposited(&alice) + ledger.deposited(&bob)
        );
    }

    // --- snapshot queries ---

    #[test]
    fn past_queries_survive_later_commits() {
        let alice = acct(1);
        let (ledger, _, epochs) = setup(5, &[(alice, 1000)]);
        ledger.lock(&alice, 1000, 10).unwrap();

        let before = ledger.voting_power_at(&alice, 7).unwrap();
        // Move the anchor well past 7, then re-query backward.
        epochs.set(20);
        ledger.unlock(&alice).unwrap();
        assert_eq!(ledger.voting_power_at(&alice, 7).unwrap(), before);
        assert_eq!(before, 800);
    }
}
