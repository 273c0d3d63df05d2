//! Error types for the ebb protocol.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("insufficient balance: have {have}, need {need}")] InsufficientBalance { have: u64, need: u64 },
    #[error("insufficient allowance: have {have}, need {need}")] InsufficientAllowance { have: u64, need: u64 },
    #[error("balance overflow")] BalanceOverflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EscrowError {
    #[error("invalid lock duration: {epochs} epochs, allowed {min}..={max}")] InvalidDuration { epochs: u64, min: u64, max: u64 },
    #[error("asset transfer failed: {0}")] TransferFailed(#[from] AssetError),
    #[error("bias underflow replaying epoch {0}")] ArithmeticUnderflow(u64),
    #[error("arithmetic overflow")] ArithmeticOverflow,
}

/// Failure reported by a delegated proposal executor. The payload is opaque
/// to governance; only the message is carried through.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ExecError(pub String);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GovernanceError {
    #[error("proposal not found: {0}")] ProposalNotFound(u64),
    #[error("insufficient voting power: have {have}, need {need}")] InsufficientPower { have: u64, need: u64 },
    #[error("voting not open until epoch {opens_at}")] VotingNotOpen { opens_at: u64 },
    #[error("proposal {id} not approved: {yes} yes / {no} no")] NotApproved { id: u64, yes: u64, no: u64 },
    #[error("proposal already executed: {0}")] AlreadyExecuted(u64),
    #[error("delegated execution failed: {0}")] ExecutionFailed(#[from] ExecError),
    #[error(transparent)] Escrow(#[from] EscrowError),
}

#[derive(Error, Debug)]
pub enum EbbError {
    #[error(transparent)] Asset(#[from] AssetError),
    #[error(transparent)] Escrow(#[from] EscrowError),
    #[error(transparent)] Governance(#[from] GovernanceError),
}
