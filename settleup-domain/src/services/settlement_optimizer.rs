use crate::{
    error::DataIntegrityError,
    model::{MemberId, Money, PersonBalance, SettlementPlan, Transfer},
};
use std::{cmp::Ordering, collections::BinaryHeap};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OptimizerOptions {
    /// Balances within this distance of zero count as settled.
    pub settled_tolerance: Money,
    /// Largest accepted gap between total debt and total credit.
    pub integrity_tolerance: Money,
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        Self {
            settled_tolerance: Money::CENT,
            integrity_tolerance: Money::CENT,
        }
    }
}

impl OptimizerOptions {
    /// Widens the integrity check by the largest rounding residue the input may carry.
    pub fn with_rounding_residue(self, residue: Money) -> Self {
        Self {
            integrity_tolerance: self.integrity_tolerance + residue.abs(),
            ..self
        }
    }
}

/// A debtor or creditor still waiting to be matched.
#[derive(Debug, PartialEq, Eq)]
struct OpenPosition {
    remaining: Money,
    order: usize,
    member: MemberId,
}

impl Ord for OpenPosition {
    // Max-heap on remaining amount; on ties the member listed first wins.
    fn cmp(&self, other: &Self) -> Ordering {
        self.remaining
            .cmp(&other.remaining)
            .then_with(|| other.order.cmp(&self.order))
    }
}

impl PartialOrd for OpenPosition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Greedy debt simplification: the largest remaining debtor always pays the
/// largest remaining creditor.
#[derive(Default)]
pub struct SettlementOptimizer {
    options: OptimizerOptions,
}

impl SettlementOptimizer {
    pub fn new(options: OptimizerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> OptimizerOptions {
        self.options
    }

    /// Produces at most `members - 1` transfers that zero every open balance.
    ///
    /// # Errors
    /// [`DataIntegrityError::ImbalancedTotals`] when total debt and total credit
    /// differ by more than the integrity tolerance.
    pub fn optimize(&self, balances: &[PersonBalance]) -> Result<SettlementPlan, DataIntegrityError> {
        let tolerance = self.options.settled_tolerance;
        let mut creditors = BinaryHeap::new();
        let mut debtors = BinaryHeap::new();
        let mut total_credit = Money::ZERO;
        let mut total_debt = Money::ZERO;
        // Settled members still count towards the integrity check.
        let mut gross_credit = Money::ZERO;
        let mut gross_debt = Money::ZERO;

        for (order, person) in balances.iter().enumerate() {
            if person.balance.is_positive() {
                gross_credit += person.balance;
            } else {
                gross_debt -= person.balance;
            }

            if person.balance > tolerance {
                total_credit += person.balance;
                creditors.push(OpenPosition {
                    remaining: person.balance.round_to_cents(),
                    order,
                    member: person.id,
                });
            } else if person.balance < -tolerance {
                total_debt += person.balance.abs();
                debtors.push(OpenPosition {
                    remaining: person.balance.abs().round_to_cents(),
                    order,
                    member: person.id,
                });
            }
        }

        if !gross_debt.approx_eq(gross_credit, self.options.integrity_tolerance) {
            return Err(DataIntegrityError::ImbalancedTotals {
                total_debt: gross_debt,
                total_credit: gross_credit,
            });
        }

        let is_balanced = creditors.is_empty() && debtors.is_empty();
        let mut transfers = Vec::with_capacity(creditors.len() + debtors.len());

        while let (Some(mut debtor), Some(mut creditor)) = (debtors.pop(), creditors.pop()) {
            let amount = debtor.remaining.min(creditor.remaining).round_to_cents();
            if amount.is_positive() {
                transfers.push(Transfer {
                    from: debtor.member,
                    to: creditor.member,
                    amount,
                });
            }

            debtor.remaining -= amount;
            creditor.remaining -= amount;
            if debtor.remaining.round_to_cents().is_positive() {
                debtors.push(debtor);
            }
            if creditor.remaining.round_to_cents().is_positive() {
                creditors.push(creditor);
            }
        }

        Ok(SettlementPlan {
            transfers,
            total_debt,
            total_credit,
            is_balanced,
        })
    }
}

/// Free-function form of [`SettlementOptimizer::optimize`] with default tolerances.
pub fn compute_optimal_settlements(
    balances: &[PersonBalance],
) -> Result<SettlementPlan, DataIntegrityError> {
    SettlementOptimizer::default().optimize(balances)
}
