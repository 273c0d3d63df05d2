//! The governance module: proposal lifecycle and weighted voting.
//!
//! Consumes voting power exclusively through [`VotingPowerSource`]; the
//! stake ledger's decay lines are never touched from here. All proposal and
//! ballot state lives behind one mutex, so operations are linearized the
//! same way ledger operations are.
//!
//! Ballots are keyed by `(proposal, voter)`, so a voter's recorded stance on
//! one proposal never disturbs re-vote accounting on another.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use ebb_core::config::GovernanceConfig;
use ebb_core::error::GovernanceError;
use ebb_core::traits::{ProposalExecutor, VotingPowerSource};
use ebb_core::types::AccountId;

use crate::proposal::{Ballot, Proposal, ProposalId, VoteStatus};

struct ProposalEntry {
    proposal: Proposal,
    executor: Arc<dyn ProposalExecutor>,
}

#[derive(Default)]
struct ProposalBook {
    next_id: ProposalId,
    proposals: HashMap<ProposalId, ProposalEntry>,
    ballots: HashMap<(ProposalId, AccountId), Ballot>,
}

/// Majority-vote governance over a [`VotingPowerSource`].
///
/// Proposal creation is gated on the proposer holding at least
/// `1/propose_power_divisor` of total voting power. Votes weigh the voter's
/// power snapshotted one epoch before the proposal was created, so power
/// acquired at proposal time cannot swing the tally. Voting and execution
/// open only once the configured window has elapsed after creation.
pub struct Governance {
    config: GovernanceConfig,
    power: Arc<dyn VotingPowerSource>,
    book: Mutex<ProposalBook>,
}

impl Governance {
    pub fn new(config: GovernanceConfig, power: Arc<dyn VotingPowerSource>) -> Self {
        debug_assert!(config.propose_power_divisor > 0);
        Self {
            config,
            power,
            book: Mutex::new(ProposalBook { next_id: 1, ..ProposalBook::default() }),
        }
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    /// Create a proposal carrying the given executor.
    ///
    /// The proposer's current power is auto-cast as a yes ballot; like any
    /// other ballot it can be changed once voting opens, adjusting the tally
    /// by the recorded weight.
    pub fn create_proposal(
        &self,
        proposer: &AccountId,
        executor: Arc<dyn ProposalExecutor>,
    ) -> Result<ProposalId, GovernanceError> {
        let have = self.power.current_voting_power(proposer)?;
        let total = self.power.current_total_voting_power()?;
        let share = have as u128 * self.config.propose_power_divisor as u128;
        if share < total as u128 {
            return Err(GovernanceError::InsufficientPower {
                have,
                need: total.div_ceil(self.config.propose_power_divisor),
            });
        }

        let now = self.power.current_epoch();
        let mut book = self.book.lock();
        let id = book.next_id;
        book.next_id += 1;

        let mut proposal = Proposal::new(id, now);
        let ballot = Ballot { status: VoteStatus::Yes, weight: have };
        proposal.apply(&ballot)?;
        book.ballots.insert((id, *proposer), ballot);
        book.proposals.insert(id, ProposalEntry { proposal, executor });
        info!(id, proposer = %proposer, weight = have, epoch = now, "proposal created");
        Ok(id)
    }

    /// Cast or change a vote on a proposal.
    ///
    /// Weight is the voter's power at `creation_epoch - 1`. A repeat vote
    /// replaces the voter's prior ballot: the tally drops the recorded prior
    /// weight and direction before the new ones are applied.
    pub fn vote(
        &self,
        voter: &AccountId,
        id: ProposalId,
        support: bool,
    ) -> Result<(), GovernanceError> {
        let now = self.power.current_epoch();
        let mut guard = self.book.lock();
        let book = &mut *guard;
        let entry = book
            .proposals
            .get_mut(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;

        let opens_at = entry.proposal.opens_at(self.config.vote_window_epochs);
        if now < opens_at {
            return Err(GovernanceError::VotingNotOpen { opens_at });
        }

        let snapshot = entry.proposal.creation_epoch.saturating_sub(1);
        let weight = self.power.voting_power_at(voter, snapshot)?;
        let ballot = Ballot { status: VoteStatus::from_support(support), weight };

        // Stage the adjusted tally; nothing lands if the apply fails.
        let mut tally = entry.proposal.clone();
        if let Some(prior) = book.ballots.get(&(id, *voter)) {
            tally.retract(prior);
        }
        tally.apply(&ballot)?;
        entry.proposal = tally;
        book.ballots.insert((id, *voter), ballot);
        debug!(id, voter = %voter, support, weight, "vote recorded");
        Ok(())
    }

    /// Execute an approved proposal's delegated payload.
    ///
    /// Requires the voting window to have elapsed, a strict yes majority,
    /// and no prior execution. Executor failure surfaces as
    /// `ExecutionFailed` and leaves the proposal executable again.
    pub fn execute_proposal(&self, id: ProposalId) -> Result<(), GovernanceError> {
        let now = self.power.current_epoch();
        let mut book = self.book.lock();
        let entry = book
            .proposals
            .get_mut(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;

        if entry.proposal.executed {
            return Err(GovernanceError::AlreadyExecuted(id));
        }
        let opens_at = entry.proposal.opens_at(self.config.vote_window_epochs);
        if now < opens_at {
            return Err(GovernanceError::VotingNotOpen { opens_at });
        }
        if !entry.proposal.passes() {
            return Err(GovernanceError::NotApproved {
                id,
                yes: entry.proposal.yes,
                no: entry.proposal.no,
            });
        }

        entry.executor.execute()?;
        entry.proposal.executed = true;
        info!(id, yes = entry.proposal.yes, no = entry.proposal.no, "proposal executed");
        Ok(())
    }

    /// A snapshot of the proposal record, if it exists.
    pub fn proposal(&self, id: ProposalId) -> Option<Proposal> {
        self.book.lock().proposals.get(&id).map(|entry| entry.proposal.clone())
    }

    /// A voter's recorded ballot on a proposal, if any.
    pub fn ballot(&self, id: ProposalId, voter: &AccountId) -> Option<Ballot> {
        self.book.lock().ballots.get(&(id, *voter)).copied()
    }

    pub fn proposal_count(&self) -> usize {
        self.book.lock().proposals.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    use ebb_core::error::{EscrowError, ExecError};
    use ebb_core::types::Epoch;

    // ------------------------------------------------------------------
    // Mock: power source with a fixed per-account table and settable epoch
    // ------------------------------------------------------------------

    struct TablePowerSource {
        epoch: AtomicU64,
        powers: HashMap<AccountId, u64>,
    }

    impl TablePowerSource {
        fn new(epoch: Epoch, powers: &[(AccountId, u64)]) -> Arc<Self> {
            Arc::new(Self {
                epoch: AtomicU64::new(epoch),
                powers: powers.iter().copied().collect(),
            })
        }

        fn set_epoch(&self, epoch: Epoch) {
            self.epoch.store(epoch, Ordering::SeqCst);
        }
    }

    impl VotingPowerSource for TablePowerSource {
        fn current_epoch(&self) -> Epoch {
            self.epoch.load(Ordering::SeqCst)
        }

        fn voting_power_at(&self, account: &AccountId, _epoch: Epoch) -> Result<u64, EscrowError> {
            Ok(*self.powers.get(account).unwrap_or(&0))
        }

        fn total_voting_power_at(&self, _epoch: Epoch) -> Result<u64, EscrowError> {
            Ok(self.powers.values().sum())
        }
    }

    // ------------------------------------------------------------------
    // Mock: executor counting invocations
    // ------------------------------------------------------------------

    struct CountingExecutor {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingExecutor {
        fn ok() -> Arc<Self> {
            Arc::new(Self { calls: AtomicUsize::new(0), fail: false })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self { calls: AtomicUsize::new(0), fail: true })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ProposalExecutor for CountingExecutor {
        fn execute(&self) -> Result<(), ExecError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ExecError("executor declined".into()));
            }
            Ok(())
        }
    }

    fn acct(seed: u8) -> AccountId {
        AccountId([seed; 32])
    }

    fn governance(power: Arc<TablePowerSource>) -> Governance {
        Governance::new(GovernanceConfig::default(), power)
    }

    // --- create_proposal ---

    #[test]
    fn creation_gated_on_power_share() {
        // Total 10_000, divisor 100: 99 fails, 100 succeeds.
        let weak = acct(1);
        let strong = acct(2);
        let whale = acct(3);
        let power =
            TablePowerSource::new(5, &[(weak, 99), (strong, 100), (whale, 9_801)]);
        let gov = governance(power);

        let err = gov.create_proposal(&weak, CountingExecutor::ok()).unwrap_err();
        assert_eq!(err, GovernanceError::InsufficientPower { have: 99, need: 100 });

        let id = gov.create_proposal(&strong, CountingExecutor::ok()).unwrap();
        assert_eq!(id, 1);
    }

    #[test]
    fn creation_auto_casts_proposer_yes() {
        let proposer = acct(1);
        let power = TablePowerSource::new(5, &[(proposer, 500)]);
        let gov = governance(power);

        let id = gov.create_proposal(&proposer, CountingExecutor::ok()).unwrap();
        let proposal = gov.proposal(id).unwrap();
        assert_eq!((proposal.yes, proposal.no), (500, 0));
        assert_eq!(proposal.creation_epoch, 5);
        assert!(!proposal.executed);
        assert_eq!(
            gov.ballot(id, &proposer),
            Some(Ballot { status: VoteStatus::Yes, weight: 500 })
        );
    }

    #[test]
    fn ids_increase_monotonically() {
        let proposer = acct(1);
        let power = TablePowerSource::new(5, &[(proposer, 100)]);
        let gov = governance(power);

        let a = gov.create_proposal(&proposer, CountingExecutor::ok()).unwrap();
        let b = gov.create_proposal(&proposer, CountingExecutor::ok()).unwrap();
        let c = gov.create_proposal(&proposer, CountingExecutor::ok()).unwrap();
        assert_eq!((a, b, c), (1, 2, 3));
        assert_eq!(gov.proposal_count(), 3);
    }

    // --- vote ---

    #[test]
    fn voting_waits_for_the_window() {
        let proposer = acct(1);
        let voter = acct(2);
        let power = TablePowerSource::new(5, &[(proposer, 100), (voter, 50)]);
        let gov = governance(power.clone());
        let id = gov.create_proposal(&proposer, CountingExecutor::ok()).unwrap();

        let err = gov.vote(&voter, id, true).unwrap_err();
        assert_eq!(err, GovernanceError::VotingNotOpen { opens_at: 6 });

        power.set_epoch(6);
        gov.vote(&voter, id, true).unwrap();
        assert_eq!(gov.proposal(id).unwrap().yes, 150);
    }

    #[test]
    fn vote_flip_moves_the_recorded_weight() {
        let proposer = acct(1);
        let voter = acct(2);
        let power = TablePowerSource::new(5, &[(proposer, 100), (voter, 70)]);
        let gov = governance(power.clone());
        let id = gov.create_proposal(&proposer, CountingExecutor::ok()).unwrap();
        power.set_epoch(6);

        gov.vote(&voter, id, true).unwrap();
        assert_eq!((gov.proposal(id).unwrap().yes, gov.proposal(id).unwrap().no), (170, 0));

        gov.vote(&voter, id, false).unwrap();
        let p = gov.proposal(id).unwrap();
        assert_eq!((p.yes, p.no), (100, 70));

        // Re-voting the same direction is a no-op on the tally.
        gov.vote(&voter, id, false).unwrap();
        let p = gov.proposal(id).unwrap();
        assert_eq!((p.yes, p.no), (100, 70));
    }

    #[test]
    fn ballots_are_independent_across_proposals() {
        let proposer = acct(1);
        let voter = acct(2);
        let power = TablePowerSource::new(5, &[(proposer, 100), (voter, 70)]);
        let gov = governance(power.clone());
        let first = gov.create_proposal(&proposer, CountingExecutor::ok()).unwrap();
        let second = gov.create_proposal(&proposer, CountingExecutor::ok()).unwrap();
        power.set_epoch(6);

        gov.vote(&voter, first, true).unwrap();
        gov.vote(&voter, second, false).unwrap();
        // Flipping on the first proposal must not disturb the second.
        gov.vote(&voter, first, false).unwrap();

        let p1 = gov.proposal(first).unwrap();
        let p2 = gov.proposal(second).unwrap();
        assert_eq!((p1.yes, p1.no), (100, 70));
        assert_eq!((p2.yes, p2.no), (100, 70));
    }

    #[test]
    fn vote_on_unknown_proposal_fails() {
        let power = TablePowerSource::new(5, &[]);
        let gov = governance(power);
        let err = gov.vote(&acct(2), 42, true).unwrap_err();
        assert_eq!(err, GovernanceError::ProposalNotFound(42));
    }

    // --- execute_proposal ---

    #[test]
    fn execution_lifecycle() {
        let proposer = acct(1);
        let power = TablePowerSource::new(5, &[(proposer, 100)]);
        let gov = governance(power.clone());
        let executor = CountingExecutor::ok();
        let id = gov.create_proposal(&proposer, executor.clone()).unwrap();

        // Window not yet elapsed.
        let err = gov.execute_proposal(id).unwrap_err();
        assert_eq!(err, GovernanceError::VotingNotOpen { opens_at: 6 });
        assert_eq!(executor.calls(), 0);

        power.set_epoch(6);
        gov.execute_proposal(id).unwrap();
        assert_eq!(executor.calls(), 1);
        assert!(gov.proposal(id).unwrap().executed);

        // Execution is one-way.
        let err = gov.execute_proposal(id).unwrap_err();
        assert_eq!(err, GovernanceError::AlreadyExecuted(id));
        assert_eq!(executor.calls(), 1);
    }

    #[test]
    fn execution_requires_strict_majority() {
        let proposer = acct(1);
        let voter = acct(2);
        // Equal weights: the flip to `no` forces a tie.
        let power = TablePowerSource::new(5, &[(proposer, 100), (voter, 100)]);
        let gov = governance(power.clone());
        let id = gov.create_proposal(&proposer, CountingExecutor::ok()).unwrap();
        power.set_epoch(6);
        gov.vote(&voter, id, false).unwrap();

        let err = gov.execute_proposal(id).unwrap_err();
        assert_eq!(err, GovernanceError::NotApproved { id, yes: 100, no: 100 });
    }

    #[test]
    fn executor_failure_leaves_proposal_executable() {
        let proposer = acct(1);
        let power = TablePowerSource::new(5, &[(proposer, 100)]);
        let gov = governance(power.clone());
        let executor = CountingExecutor::failing();
        let id = gov.create_proposal(&proposer, executor.clone()).unwrap();
        power.set_epoch(6);

        let err = gov.execute_proposal(id).unwrap_err();
        assert!(matches!(err, GovernanceError::ExecutionFailed(_)));
        assert_eq!(executor.calls(), 1);
        assert!(!gov.proposal(id).unwrap().executed);

        // A retry reaches the executor again.
        let _ = gov.execute_proposal(id).unwrap_err();
        assert_eq!(executor.calls(), 2);
    }

    #[test]
    fn execute_unknown_proposal_fails() {
        let power = TablePowerSource::new(5, &[]);
        let gov = governance(power);
        let err = gov.execute_proposal(7).unwrap_err();
        assert_eq!(err, GovernanceError::ProposalNotFound(7));
    }
}
