//! # ebb-governance — majority-vote governance.
//!
//! A thin consumer of the escrow's point-in-time power queries: proposal
//! creation is power-gated, votes weigh a pre-creation snapshot of the
//! voter's power, and approved proposals invoke an opaque delegated
//! executor.

pub mod module;
pub mod proposal;

pub use module::Governance;
pub use proposal::{Ballot, Proposal, ProposalId, VoteStatus};
