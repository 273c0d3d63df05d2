//! Protocol constants. All asset amounts are in base units of the escrowed token.

/// Width of one epoch in seconds (one week).
pub const EPOCH_WIDTH_SECS: u64 = 7 * 24 * 60 * 60;

/// Epoch numbering starts at 1 at the configured origin time.
pub const FIRST_EPOCH: u64 = 1;

pub const EPOCHS_PER_YEAR: u64 = 52;

/// Shortest accepted lock duration, in epochs.
pub const MIN_LOCK_EPOCHS: u64 = 4;

/// Longest accepted lock duration: four years of weekly epochs.
pub const MAX_LOCK_EPOCHS: u64 = 4 * EPOCHS_PER_YEAR;

/// Epochs after proposal creation before voting (and execution) opens.
pub const DEFAULT_VOTE_WINDOW_EPOCHS: u64 = 1;

/// A proposer must hold at least `1/DEFAULT_PROPOSE_POWER_DIVISOR` of the
/// total voting power to create a proposal.
pub const DEFAULT_PROPOSE_POWER_DIVISOR: u64 = 100;
