use crate::model::{Expense, ExpenseCategory, Member, MemberBalance, MemberId, Money, round_half_up};
use fxhash::FxHashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayerTotal {
    pub member_id: MemberId,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopSpender {
    pub member_id: MemberId,
    pub name: String,
    pub total: Money,
    /// Share of all group spending, in percent with two decimals.
    pub share_percent: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: ExpenseCategory,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub member_count: usize,
    pub expense_count: usize,
    pub total_expenses: Money,
    pub average_expense: Money,
    /// Sum of what every owing member still owes.
    pub total_outstanding: Money,
    pub payer_totals: Vec<PayerTotal>,
    pub top_spender: Option<TopSpender>,
    /// Sorted by total, largest first.
    pub category_totals: Vec<CategoryTotal>,
    pub top_category: Option<CategoryTotal>,
}

/// Accumulates totals keyed by `K`, remembering first-seen order.
struct OrderedTotals<K> {
    index: FxHashMap<K, usize>,
    totals: Vec<(K, Money)>,
}

impl<K: Copy + Eq + std::hash::Hash> OrderedTotals<K> {
    fn new() -> Self {
        Self {
            index: FxHashMap::default(),
            totals: Vec::new(),
        }
    }

    fn add(&mut self, key: K, amount: Money) {
        match self.index.get(&key) {
            Some(&slot) => self.totals[slot].1 += amount,
            None => {
                self.index.insert(key, self.totals.len());
                self.totals.push((key, amount));
            }
        }
    }

    /// First entry holding the largest total.
    fn max(&self) -> Option<(K, Money)> {
        self.totals
            .iter()
            .copied()
            .fold(None, |best, entry| match best {
                Some((_, total)) if total >= entry.1 => best,
                _ => Some(entry),
            })
    }
}

pub fn summarize_group(
    members: &[Member],
    expenses: &[Expense],
    balances: &[MemberBalance],
) -> GroupSummary {
    let mut payers = OrderedTotals::new();
    let mut categories = OrderedTotals::new();
    for expense in expenses {
        payers.add(expense.paid_by, expense.amount);
        categories.add(expense.category, expense.amount);
    }

    let total_expenses: Money = expenses.iter().map(|expense| expense.amount).sum();
    let average_expense = if expenses.is_empty() {
        Money::ZERO
    } else {
        Money::from_decimal(total_expenses.as_decimal() / Decimal::from(expenses.len()))
            .round_to_cents()
    };

    let total_outstanding: Money = balances
        .iter()
        .filter(|balance| balance.net_balance.is_negative())
        .map(|balance| balance.net_balance.abs())
        .sum();

    let top_spender = payers.max().map(|(member_id, total)| {
        let name = members
            .iter()
            .find(|member| member.id == member_id)
            .map(|member| member.name.clone())
            .unwrap_or_else(|| member_id.to_string());
        let share_percent = if total_expenses.is_zero() {
            Decimal::ZERO
        } else {
            round_half_up(total.as_decimal() / total_expenses.as_decimal() * Decimal::ONE_HUNDRED)
        };
        TopSpender {
            member_id,
            name,
            total,
            share_percent,
        }
    });

    let top_category = categories
        .max()
        .map(|(category, total)| CategoryTotal { category, total });
    let mut category_totals: Vec<CategoryTotal> = categories
        .totals
        .into_iter()
        .map(|(category, total)| CategoryTotal { category, total })
        .collect();
    // Stable sort keeps first-seen order between equal totals.
    category_totals.sort_by(|a, b| b.total.cmp(&a.total));

    GroupSummary {
        member_count: members.len(),
        expense_count: expenses.len(),
        total_expenses,
        average_expense,
        total_outstanding,
        payer_totals: payers
            .totals
            .into_iter()
            .map(|(member_id, total)| PayerTotal { member_id, total })
            .collect(),
        top_spender,
        category_totals,
        top_category,
    }
}
