use crate::model::{Member, MemberBalance, MemberId, Money};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceStatus {
    Owed,
    Owes,
    Settled,
}

impl BalanceStatus {
    pub fn of(net_balance: Money) -> Self {
        match net_balance.signum() {
            1 => BalanceStatus::Owed,
            -1 => BalanceStatus::Owes,
            _ => BalanceStatus::Settled,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceFilter {
    #[default]
    All,
    Owes,
    Owed,
}

impl BalanceFilter {
    pub fn accepts(self, status: BalanceStatus) -> bool {
        match self {
            BalanceFilter::All => true,
            BalanceFilter::Owes => status == BalanceStatus::Owes,
            BalanceFilter::Owed => status == BalanceStatus::Owed,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceSort {
    #[default]
    Name,
    Balance,
    TotalPaid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceRow {
    pub member_id: MemberId,
    pub name: String,
    pub status: BalanceStatus,
    pub total_paid: Money,
    pub total_owed: Money,
    pub net_balance: Money,
}

/// Display rows for members with a computed balance, filtered then sorted.
///
/// Sorting is stable, so rows that compare equal keep roster order.
pub fn balance_rows(
    members: &[Member],
    balances: &[MemberBalance],
    filter: BalanceFilter,
    sort: BalanceSort,
) -> Vec<BalanceRow> {
    let mut rows: Vec<BalanceRow> = members
        .iter()
        .filter_map(|member| {
            let balance = balances.iter().find(|balance| balance.member_id == member.id)?;
            Some(BalanceRow {
                member_id: member.id,
                name: member.name.clone(),
                status: BalanceStatus::of(balance.net_balance),
                total_paid: balance.total_paid,
                total_owed: balance.total_owed,
                net_balance: balance.net_balance,
            })
        })
        .filter(|row| filter.accepts(row.status))
        .collect();

    match sort {
        BalanceSort::Name => rows.sort_by_cached_key(|row| row.name.to_lowercase()),
        BalanceSort::Balance => rows.sort_by(|a, b| b.net_balance.abs().cmp(&a.net_balance.abs())),
        BalanceSort::TotalPaid => rows.sort_by(|a, b| b.total_paid.cmp(&a.total_paid)),
    }

    rows
}
