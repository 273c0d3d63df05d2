//! Proposal records and tally accounting.

use serde::{Deserialize, Serialize};

use ebb_core::error::{EscrowError, GovernanceError};
use ebb_core::types::Epoch;

/// Monotonically increasing proposal identifier, starting at 1.
pub type ProposalId = u64;

/// Direction of a cast vote. An account with no recorded ballot on a
/// proposal has not voted on it.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteStatus {
    No,
    Yes,
}

impl VoteStatus {
    pub fn from_support(support: bool) -> Self {
        if support { Self::Yes } else { Self::No }
    }
}

/// A recorded vote: direction plus the snapshot weight it was cast with.
///
/// The weight is stored so a later re-vote retracts exactly what was
/// applied, even if the voter's measured power has changed since.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ballot {
    pub status: VoteStatus,
    pub weight: u64,
}

/// A governance proposal and its running tally.
///
/// There is no stored state machine; a proposal's standing is derived from
/// `yes > no`, the elapsed voting window, and the one-way `executed` flag.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Proposal {
    pub id: ProposalId,
    pub yes: u64,
    pub no: u64,
    pub creation_epoch: Epoch,
    pub executed: bool,
}

impl Proposal {
    pub fn new(id: ProposalId, creation_epoch: Epoch) -> Self {
        Self { id, yes: 0, no: 0, creation_epoch, executed: false }
    }

    /// Epoch at which voting and execution open.
    pub fn opens_at(&self, vote_window_epochs: u64) -> Epoch {
        self.creation_epoch + vote_window_epochs
    }

    /// Strict majority of cast weight.
    pub fn passes(&self) -> bool {
        self.yes > self.no
    }

    /// Fold a ballot into the tally.
    pub fn apply(&mut self, ballot: &Ballot) -> Result<(), GovernanceError> {
        let side = match ballot.status {
            VoteStatus::Yes => &mut self.yes,
            VoteStatus::No => &mut self.no,
        };
        *side = side
            .checked_add(ballot.weight)
            .ok_or(GovernanceError::Escrow(EscrowError::ArithmeticOverflow))?;
        Ok(())
    }

    /// Remove a previously applied ballot from the tally.
    ///
    /// A recorded ballot's weight is always contained in the side it was
    /// applied to, so the subtraction cannot go below zero.
    pub fn retract(&mut self, ballot: &Ballot) {
        let side = match ballot.status {
            VoteStatus::Yes => &mut self.yes,
            VoteStatus::No => &mut self.no,
        };
        *side = side.saturating_sub(ballot.weight);
    }
}
