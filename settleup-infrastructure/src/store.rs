use dashmap::DashMap;
use indexmap::IndexMap;
use settleup_application::{GroupStore, StoreError};
use settleup_domain::{
    Expense, ExpenseId, GroupId, Member, NewExpense, NewSettlement, Settlement, SettlementId,
    SettlementStatus,
};
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

/// Records of one group. Maps keep insertion order so fetches are stable.
#[derive(Clone, Debug, Default)]
struct GroupLedger {
    members: Vec<Member>,
    expenses: IndexMap<ExpenseId, Expense>,
    settlements: IndexMap<SettlementId, Settlement>,
}

/// In-memory [`GroupStore`] shared across threads.
///
/// Identifiers are allocated from store-wide counters, so ids never repeat
/// across groups. Cloning yields a handle to the same data.
#[derive(Clone)]
pub struct InMemoryGroupStore {
    groups: Arc<DashMap<GroupId, GroupLedger>>,
    next_expense_id: Arc<AtomicU64>,
    next_settlement_id: Arc<AtomicU64>,
}

impl InMemoryGroupStore {
    pub fn new() -> Self {
        Self {
            groups: Arc::new(DashMap::new()),
            next_expense_id: Arc::new(AtomicU64::new(1)),
            next_settlement_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Creates or resets a group with the given roster, in join order.
    pub fn create_group(&self, group: GroupId, members: Vec<Member>) {
        self.groups.insert(
            group,
            GroupLedger {
                members,
                ..GroupLedger::default()
            },
        );
    }

    /// Appends a member to an existing group's roster.
    pub fn add_member(&self, group: GroupId, member: Member) -> Result<(), StoreError> {
        let mut ledger = self
            .groups
            .get_mut(&group)
            .ok_or(StoreError::GroupNotFound(group))?;
        if !ledger.members.iter().any(|existing| existing.id == member.id) {
            ledger.members.push(member);
        }
        Ok(())
    }

    pub fn contains_group(&self, group: GroupId) -> bool {
        self.groups.contains_key(&group)
    }

    fn with_group<F, R>(&self, group: GroupId, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&GroupLedger) -> R,
    {
        self.groups
            .get(&group)
            .map(|ledger| f(ledger.value()))
            .ok_or(StoreError::GroupNotFound(group))
    }

    fn with_group_mut<F, R>(&self, group: GroupId, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut GroupLedger) -> Result<R, StoreError>,
    {
        let mut ledger = self
            .groups
            .get_mut(&group)
            .ok_or(StoreError::GroupNotFound(group))?;
        f(ledger.value_mut())
    }
}

impl Default for InMemoryGroupStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupStore for InMemoryGroupStore {
    fn fetch_group_members(&self, group: GroupId) -> Result<Vec<Member>, StoreError> {
        self.with_group(group, |ledger| ledger.members.clone())
    }

    fn fetch_group_expenses(&self, group: GroupId) -> Result<Vec<Expense>, StoreError> {
        self.with_group(group, |ledger| ledger.expenses.values().cloned().collect())
    }

    fn fetch_group_settlements(&self, group: GroupId) -> Result<Vec<Settlement>, StoreError> {
        self.with_group(group, |ledger| ledger.settlements.values().cloned().collect())
    }

    fn persist_expense(
        &self,
        group: GroupId,
        expense: NewExpense,
    ) -> Result<ExpenseId, StoreError> {
        self.with_group_mut(group, |ledger| {
            let id = ExpenseId(self.next_expense_id.fetch_add(1, Ordering::Relaxed));
            ledger.expenses.insert(id, Expense::from_new(id, expense));
            tracing::debug!(%group, expense = %id, "Stored expense");
            Ok(id)
        })
    }

    fn replace_expense(
        &self,
        group: GroupId,
        id: ExpenseId,
        expense: NewExpense,
    ) -> Result<(), StoreError> {
        self.with_group_mut(group, |ledger| {
            let slot = ledger
                .expenses
                .get_mut(&id)
                .ok_or(StoreError::ExpenseNotFound(id))?;
            *slot = Expense::from_new(id, expense);
            Ok(())
        })
    }

    fn delete_expense(&self, group: GroupId, id: ExpenseId) -> Result<(), StoreError> {
        self.with_group_mut(group, |ledger| {
            ledger
                .expenses
                .shift_remove(&id)
                .map(|_| ())
                .ok_or(StoreError::ExpenseNotFound(id))
        })
    }

    fn persist_settlement(
        &self,
        group: GroupId,
        settlement: NewSettlement,
    ) -> Result<SettlementId, StoreError> {
        self.with_group_mut(group, |ledger| {
            let id = SettlementId(self.next_settlement_id.fetch_add(1, Ordering::Relaxed));
            ledger
                .settlements
                .insert(id, Settlement::from_new(id, settlement));
            tracing::debug!(%group, settlement = %id, "Stored settlement");
            Ok(id)
        })
    }

    fn update_settlement_status(
        &self,
        group: GroupId,
        id: SettlementId,
        status: SettlementStatus,
    ) -> Result<(), StoreError> {
        self.with_group_mut(group, |ledger| {
            let settlement = ledger
                .settlements
                .get_mut(&id)
                .ok_or(StoreError::SettlementNotFound(id))?;
            settlement.status = status;
            Ok(())
        })
    }
}
