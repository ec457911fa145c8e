use crate::error::StoreError;
use chrono::{DateTime, Utc};
use settleup_domain::{
    Expense, ExpenseId, GroupId, Member, NewExpense, NewSettlement, Settlement, SettlementId,
    SettlementStatus,
};

/// Request/response access to a group's persisted records.
///
/// Every fetch returns a fresh snapshot; read-after-write consistency is the
/// adapter's responsibility.
pub trait GroupStore: Send + Sync {
    /// Members in join order.
    fn fetch_group_members(&self, group: GroupId) -> Result<Vec<Member>, StoreError>;

    /// Expenses with their splits nested.
    fn fetch_group_expenses(&self, group: GroupId) -> Result<Vec<Expense>, StoreError>;

    fn fetch_group_settlements(&self, group: GroupId) -> Result<Vec<Settlement>, StoreError>;

    fn persist_expense(
        &self,
        group: GroupId,
        expense: NewExpense,
    ) -> Result<ExpenseId, StoreError>;

    /// Full replace: the previous split set is discarded.
    fn replace_expense(
        &self,
        group: GroupId,
        id: ExpenseId,
        expense: NewExpense,
    ) -> Result<(), StoreError>;

    fn delete_expense(&self, group: GroupId, id: ExpenseId) -> Result<(), StoreError>;

    fn persist_settlement(
        &self,
        group: GroupId,
        settlement: NewSettlement,
    ) -> Result<SettlementId, StoreError>;

    fn update_settlement_status(
        &self,
        group: GroupId,
        id: SettlementId,
        status: SettlementStatus,
    ) -> Result<(), StoreError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
