//! Trait interfaces for the ebb protocol.
//!
//! These traits define the contracts between crates:
//! - [`AssetLedger`] — the external fungible-asset ledger (opaque to the core)
//! - [`ProposalExecutor`] — delegated proposal payload (ebb-governance invokes)
//! - [`VotingPowerSource`] — point-in-time power queries (ebb-escrow implements)

use crate::error::{AssetError, EscrowError, ExecError};
use crate::types::{AccountId, Epoch};

/// The external fungible-asset ledger the escrow locks value in.
///
/// Implementations must conserve total supply and fail (never silently
/// no-op) when a balance or allowance is insufficient. The escrow invokes
/// these calls only after all of its own state updates are fully computed,
/// and an implementation must not call back into the escrow.
pub trait AssetLedger: Send + Sync {
    /// Transfer `amount` from the caller's own holdings to `to`.
    fn transfer(&self, to: &AccountId, amount: u64) -> Result<(), AssetError>;

    /// Transfer `amount` from `from` to `to` against a prior approval.
    fn transfer_from(&self, from: &AccountId, to: &AccountId, amount: u64)
        -> Result<(), AssetError>;
}

/// Delegated logic attached to a proposal.
///
/// Governance never interprets the payload; it only observes success or
/// failure of the single opaque invocation.
pub trait ProposalExecutor: Send + Sync {
    fn execute(&self) -> Result<(), ExecError>;
}

/// Read-only point-in-time voting power queries.
///
/// Implemented by the stake ledger and consumed by governance, which never
/// touches decay lines directly. All methods are side-effect-free and safe
/// to call at any time.
pub trait VotingPowerSource: Send + Sync {
    /// The epoch the implementation currently considers "now".
    fn current_epoch(&self) -> Epoch;

    /// An account's voting power (line bias) at the given epoch.
    fn voting_power_at(&self, account: &AccountId, epoch: Epoch) -> Result<u64, EscrowError>;

    /// An account's voting power at the current epoch.
    ///
    /// Default implementation delegates to [`voting_power_at`](Self::voting_power_at).
    fn current_voting_power(&self, account: &AccountId) -> Result<u64, EscrowError> {
        self.voting_power_at(account, self.current_epoch())
    }

    /// Total voting power across all accounts at the given epoch.
    fn total_voting_power_at(&self, epoch: Epoch) -> Result<u64, EscrowError>;

    /// Total voting power at the current epoch.
    fn current_total_voting_power(&self) -> Result<u64, EscrowError> {
        self.total_voting_power_at(self.current_epoch())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // ------------------------------------------------------------------
    // Mock: VotingPowerSource with a fixed power table
    // ------------------------------------------------------------------

    struct MockPowerSource {
        epoch: Epoch,
        powers: HashMap<AccountId, u64>,
    }

    impl MockPowerSource {
        fn new(epoch: Epoch) -> Self {
            Self { epoch, powers: HashMap::new() }
        }
    }

    impl VotingPowerSource for MockPowerSource {
        fn current_epoch(&self) -> Epoch {
            self.epoch
        }

        fn voting_power_at(&self, account: &AccountId, _epoch: Epoch) -> Result<u64, EscrowError> {
            Ok(*self.powers.get(account).unwrap_or(&0))
        }

        fn total_voting_power_at(&self, _epoch: Epoch) -> Result<u64, EscrowError> {
            Ok(self.powers.values().sum())
        }
    }

    // ------------------------------------------------------------------
    // Mock: ProposalExecutor counting invocations
    // ------------------------------------------------------------------

    struct CountingExecutor {
        calls: AtomicUsize,
        fail: bool,
    }

    impl ProposalExecutor for CountingExecutor {
        fn execute(&self) -> Result<(), ExecError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ExecError("rejected".into()));
            }
            Ok(())
        }
    }

    #[test]
    fn default_current_power_uses_current_epoch() {
        let mut src = MockPowerSource::new(7);
        let acct = AccountId([1; 32]);
        src.powers.insert(acct, 500);
        assert_eq!(src.current_voting_power(&acct).unwrap(), 500);
        assert_eq!(src.current_total_voting_power().unwrap(), 500);
    }

    #[test]
    fn unknown_account_has_zero_power() {
        let src = MockPowerSource::new(1);
        assert_eq!(src.current_voting_power(&AccountId([9; 32])).unwrap(), 0);
    }

    #[test]
    fn executor_reports_failure() {
        let ok = CountingExecutor { calls: AtomicUsize::new(0), fail: false };
        assert!(ok.execute().is_ok());
        assert_eq!(ok.calls.load(Ordering::SeqCst), 1);

        let bad = CountingExecutor { calls: AtomicUsize::new(0), fail: true };
        assert_eq!(bad.execute().unwrap_err(), ExecError("rejected".into()));
    }

    #[test]
    fn power_source_is_object_safe() {
        let src = MockPowerSource::new(3);
        let dyn_src: &dyn VotingPowerSource = &src;
        assert_eq!(dyn_src.current_epoch(), 3);
    }

    #[test]
    fn executor_is_object_safe() {
        let e = CountingExecutor { calls: AtomicUsize::new(0), fail: false };
        let dyn_e: &dyn ProposalExecutor = &e;
        assert!(dyn_e.execute().is_ok());
    }
}
