//! # ebb-escrow — vote-escrow decay accounting.
//!
//! The accounting core of the ebb protocol:
//! - [`DecayLine`] — a piecewise-linear bias/slope line with sparse per-epoch
//!   deltas, replayable forward and backward in O(elapsed epochs).
//! - [`Stake`] — one account's line plus locked-principal tracking.
//! - [`StakeLedger`] — all stakes plus the aggregate, linearized behind one
//!   lock, with external asset transfers at the commit boundary.
//!
//! All arithmetic is integer-only and checked; bias underflow is a hard
//! error, never a wrap.

pub mod ledger;
pub mod line;
pub mod stake;

pub use ledger::StakeLedger;
pub use line::DecayLine;
pub use stake::Stake;
