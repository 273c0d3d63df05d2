//! The piecewise-linear decay line and its replay engine.
//!
//! A [`DecayLine`] anchors a [`Line`] at `last_update_epoch` and keeps sparse
//! per-epoch deltas (slope changes and deposit landings) so the line can be
//! replayed to any other epoch, forward or backward, in time proportional to
//! the number of elapsed epochs rather than the number of locks. Epochs with
//! no registered delta read as zero, so a line replayed past its last delta
//! settles into a steady state instead of running off the registered range.

use std::collections::HashMap;

use ebb_core::error::EscrowError;
use ebb_core::types::{Epoch, Line};

/// A decay schedule anchored at a single epoch.
///
/// The forward step entering epoch `i` applies deposits whose ramps begin at
/// `i` before that epoch's decay, then folds in slope changes taking effect
/// at `i`; those decay the bias only from the next step on. The backward
/// step is the exact algebraic inverse, undone in reverse order, which is
/// what makes a rewound query agree with a forward one over the same deltas.
///
/// `bias` is conserved economic value: any step that would push it below
/// zero or past `u64::MAX` fails without touching the anchored state.
#[derive(Debug, Clone, Default)]
pub struct DecayLine {
    line: Line,
    last_update_epoch: Epoch,
    /// Net slope change taking effect entering each epoch.
    slope_changes: HashMap<Epoch, i128>,
    /// Principal whose decay ramp begins at each epoch.
    deposits: HashMap<Epoch, u64>,
}

impl DecayLine {
    /// An empty line anchored at `anchor`.
    pub fn new(anchor: Epoch) -> Self {
        Self {
            line: Line::ZERO,
            last_update_epoch: anchor,
            slope_changes: HashMap::new(),
            deposits: HashMap::new(),
        }
    }

    /// The anchored line.
    pub fn line(&self) -> Line {
        self.line
    }

    /// The epoch the line is anchored at.
    pub fn last_update_epoch(&self) -> Epoch {
        self.last_update_epoch
    }

    fn deposit_at(&self, epoch: Epoch) -> u64 {
        *self.deposits.get(&epoch).unwrap_or(&0)
    }

    fn slope_change_at(&self, epoch: Epoch) -> i128 {
        *self.slope_changes.get(&epoch).unwrap_or(&0)
    }

    /// One replay step entering `epoch`.
    fn step_forward(&self, line: Line, epoch: Epoch) -> Result<Line, EscrowError> {
        let landed = line
            .bias
            .checked_add(self.deposit_at(epoch))
            .ok_or(EscrowError::ArithmeticOverflow)?;
        let decayed = landed as i128 - line.slope;
        if decayed < 0 {
            return Err(EscrowError::ArithmeticUnderflow(epoch));
        }
        let bias = u64::try_from(decayed).map_err(|_| EscrowError::ArithmeticOverflow)?;
        let slope = line
            .slope
            .checked_add(self.slope_change_at(epoch))
            .ok_or(EscrowError::ArithmeticOverflow)?;
        Ok(Line { bias, slope })
    }

    /// One replay step leaving `epoch`: the exact inverse of
    /// [`step_forward`](Self::step_forward).
    fn step_backward(&self, line: Line, epoch: Epoch) -> Result<Line, EscrowError> {
        let slope = line
            .slope
            .checked_sub(self.slope_change_at(epoch))
            .ok_or(EscrowError::ArithmeticOverflow)?;
        let grown = line.bias as i128 + slope;
        if grown < 0 {
            return Err(EscrowError::ArithmeticUnderflow(epoch));
        }
        let grown = u64::try_from(grown).map_err(|_| EscrowError::ArithmeticOverflow)?;
        let bias = grown
            .checked_sub(self.deposit_at(epoch))
            .ok_or(EscrowError::ArithmeticUnderflow(epoch))?;
        Ok(Line { bias, slope })
    }

    /// The line at `epoch`, replayed from the anchor without mutating state.
    pub fn line_at(&self, epoch: Epoch) -> Result<Line, EscrowError> {
        let mut line = self.line;
        if epoch >= self.last_update_epoch {
            for i in self.last_update_epoch + 1..=epoch {
                line = self.step_forward(line, i)?;
            }
        } else {
            for i in (epoch + 1..=self.last_update_epoch).rev() {
                line = self.step_backward(line, i)?;
            }
        }
        Ok(line)
    }

    /// Move the anchor forward to `epoch`, committing the replayed line.
    ///
    /// Epochs at or before the current anchor are a no-op; the anchor never
    /// moves backward. Replay runs on a copy, so a failing step leaves the
    /// anchored state intact.
    pub fn advance_to(&mut self, epoch: Epoch) -> Result<(), EscrowError> {
        if epoch <= self.last_update_epoch {
            return Ok(());
        }
        let mut line = self.line;
        for i in self.last_update_epoch + 1..=epoch {
            line = self.step_forward(line, i)?;
        }
        self.line = line;
        self.last_update_epoch = epoch;
        Ok(())
    }

    /// Register a lock's ramp: `amount` lands at `start` and decays by
    /// `slope` per epoch until the ramp retires entering `end`.
    ///
    /// The anchor must already sit at `start` (callers advance first). The
    /// entering-`start` effect is folded into the anchored line directly, so
    /// a query at `start` already sees the full deposit; the recorded
    /// deposit delta is what lets a backward replay undo it.
    pub fn register_ramp(
        &mut self,
        start: Epoch,
        end: Epoch,
        amount: u64,
        slope: i128,
    ) -> Result<(), EscrowError> {
        debug_assert_eq!(start, self.last_update_epoch);
        debug_assert!(end > start);

        let bias = self
            .line
            .bias
            .checked_add(amount)
            .ok_or(EscrowError::ArithmeticOverflow)?;
        let line_slope = self
            .line
            .slope
            .checked_add(slope)
            .ok_or(EscrowError::ArithmeticOverflow)?;
        let start_deposit = self
            .deposit_at(start)
            .checked_add(amount)
            .ok_or(EscrowError::ArithmeticOverflow)?;
        let start_change = self
            .slope_change_at(start)
            .checked_add(slope)
            .ok_or(EscrowError::ArithmeticOverflow)?;
        let end_change = self
            .slope_change_at(end)
            .checked_sub(slope)
            .ok_or(EscrowError::ArithmeticOverflow)?;

        self.line = Line { bias, slope: line_slope };
        self.deposits.insert(start, start_deposit);
        self.slope_changes.insert(start, start_change);
        self.slope_changes.insert(end, end_change);
        Ok(())
    }
}
