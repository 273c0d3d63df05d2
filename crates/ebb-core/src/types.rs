//! Core protocol types: accounts, epochs, and the decay line.
//!
//! All asset amounts use u64 base units; slopes use i128 so that signed
//! accumulations of u64 magnitudes cannot overflow.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 1-indexed weekly time bucket. Epoch 0 never occurs on a clock; it is
/// only reachable as a query target (power there is always zero).
pub type Epoch = u64;

/// An opaque 32-byte account handle.
///
/// The escrow layer never interprets these bytes; they identify accounts in
/// the external asset ledger and in governance.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    /// The all-zero account id.
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl From<[u8; 32]> for AccountId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for AccountId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A point on a piecewise-linear decay schedule.
///
/// `bias` is the total undecayed locked value at the anchoring epoch; `slope`
/// is the net amount `bias` decreases by per elapsed epoch. A positive slope
/// means decay; the replay engine keeps `bias` within `0..=u64::MAX` and
/// rejects any step that would leave that range.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Line {
    /// Remaining undecayed locked value.
    pub bias: u64,
    /// Net per-epoch decrease of `bias` from all active locks.
    pub slope: i128,
}

impl Line {
    /// The zero line: no locked value, no decay.
    pub const ZERO: Self = Self { bias: 0, slope: 0 };
}
