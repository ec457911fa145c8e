use crate::{
    error::{DataIntegrityError, RecordKind},
    model::{Expense, Member, MemberBalance, MemberId, Money, PersonBalance, Settlement},
};
use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSheet {
    /// One entry per member, in roster (join) order.
    pub balances: Vec<MemberBalance>,
    /// Σ total paid − Σ total owed: rounding residue left by computed splits.
    pub rounding_residue: Money,
}

impl BalanceSheet {
    pub fn get(&self, member: MemberId) -> Option<&MemberBalance> {
        self.balances
            .iter()
            .find(|balance| balance.member_id == member)
    }

    pub fn net_balances(&self) -> Vec<PersonBalance> {
        self.balances.iter().map(PersonBalance::from).collect()
    }

    pub fn net_total(&self) -> Money {
        self.balances.iter().map(|balance| balance.net_balance).sum()
    }
}

/// Folds a group's expense history and confirmed settlements into per-member balances.
pub struct BalanceAggregator;

impl BalanceAggregator {
    pub fn aggregate(
        &self,
        members: &[Member],
        expenses: &[Expense],
        settlements: &[Settlement],
    ) -> Result<BalanceSheet, DataIntegrityError> {
        let mut balances: Vec<MemberBalance> = members
            .iter()
            .map(|member| MemberBalance::zeroed(member.id))
            .collect();
        let index: FxHashMap<MemberId, usize> = members
            .iter()
            .enumerate()
            .map(|(idx, member)| (member.id, idx))
            .collect();

        let slot = |member: MemberId, source_kind: RecordKind| {
            index
                .get(&member)
                .copied()
                .ok_or(DataIntegrityError::UnknownMember {
                    member,
                    source_kind,
                })
        };

        for expense in expenses {
            let payer = slot(expense.paid_by, RecordKind::Expense)?;
            balances[payer].total_paid += expense.amount;
            for split in &expense.splits {
                let debtor = slot(split.member_id, RecordKind::Expense)?;
                balances[debtor].total_owed += split.owed_amount;
            }
        }

        // Pending and cancelled settlements are informational only.
        for settlement in settlements.iter().filter(|settlement| settlement.is_confirmed()) {
            let from = slot(settlement.from, RecordKind::Settlement)?;
            let to = slot(settlement.to, RecordKind::Settlement)?;
            balances[from].settlement_adjustment += settlement.amount;
            balances[to].settlement_adjustment -= settlement.amount;
        }

        let mut rounding_residue = Money::ZERO;
        for balance in &mut balances {
            rounding_residue += balance.raw_balance();
            balance.net_balance = balance.raw_balance() + balance.settlement_adjustment;
        }

        Ok(BalanceSheet {
            balances,
            rounding_residue,
        })
    }
}

/// Free-function form of [`BalanceAggregator::aggregate`].
pub fn compute_balances(
    members: &[Member],
    expenses: &[Expense],
    settlements: &[Settlement],
) -> Result<BalanceSheet, DataIntegrityError> {
    BalanceAggregator.aggregate(members, expenses, settlements)
}
