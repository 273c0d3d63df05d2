//! Configuration for the stake ledger and governance module.
//!
//! Plain structs with defaults drawn from [`crate::constants`]; both can be
//! customized programmatically at construction time.

use crate::clock::EpochClock;
use crate::constants::{
    DEFAULT_PROPOSE_POWER_DIVISOR, DEFAULT_VOTE_WINDOW_EPOCHS, EPOCH_WIDTH_SECS, MAX_LOCK_EPOCHS,
    MIN_LOCK_EPOCHS,
};
use crate::types::AccountId;

/// Configuration for a [`StakeLedger`](../../ebb_escrow/ledger/struct.StakeLedger.html) instance.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Unix time at which epoch 1 begins.
    pub epoch_origin_secs: u64,
    /// Width of one epoch in seconds.
    pub epoch_width_secs: u64,
    /// Shortest accepted lock duration in epochs.
    pub min_lock_epochs: u64,
    /// Longest accepted lock duration in epochs.
    pub max_lock_epochs: u64,
    /// Account in the external asset ledger that holds locked principal.
    pub vault: AccountId,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            epoch_origin_secs: 0,
            epoch_width_secs: EPOCH_WIDTH_SECS,
            min_lock_epochs: MIN_LOCK_EPOCHS,
            max_lock_epochs: MAX_LOCK_EPOCHS,
            vault: AccountId::ZERO,
        }
    }
}

impl LedgerConfig {
    /// The epoch clock induced by this configuration.
    pub fn clock(&self) -> EpochClock {
        EpochClock::new(self.epoch_origin_secs, self.epoch_width_secs)
    }
}

/// Configuration for a governance module instance.
#[derive(Debug, Clone)]
pub struct GovernanceConfig {
    /// Epochs after creation before a proposal opens for voting and execution.
    pub vote_window_epochs: u64,
    /// A proposer must hold at least `1/propose_power_divisor` of total power.
    pub propose_power_divisor: u64,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            vote_window_epochs: DEFAULT_VOTE_WINDOW_EPOCHS,
            propose_power_divisor: DEFAULT_PROPOSE_POWER_DIVISOR,
        }
    }
}
