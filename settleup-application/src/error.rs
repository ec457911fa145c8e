use settleup_domain::{
    DataIntegrityError, ExpenseId, GroupId, MemberId, SettlementId, StateTransitionError,
    ValidationError,
};
use thiserror::Error;

/// Failures reported by a [`GroupStore`](crate::ports::GroupStore) adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Group {0} was not found")]
    GroupNotFound(GroupId),
    #[error("Expense {0} was not found")]
    ExpenseNotFound(ExpenseId),
    #[error("Settlement {0} was not found")]
    SettlementNotFound(SettlementId),
    #[error("Store is unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    DataIntegrity(#[from] DataIntegrityError),
    #[error(transparent)]
    StateTransition(#[from] StateTransitionError),
    #[error(transparent)]
    Store(StoreError),
    #[error("Member {actor} does not belong to group {group}")]
    NotAGroupMember { group: GroupId, actor: MemberId },
    #[error("Expense {0} was not found")]
    ExpenseNotFound(ExpenseId),
    #[error("Settlement {0} was not found")]
    SettlementNotFound(SettlementId),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ExpenseNotFound(id) => LedgerError::ExpenseNotFound(id),
            StoreError::SettlementNotFound(id) => LedgerError::SettlementNotFound(id),
            other => LedgerError::Store(other),
        }
    }
}

impl LedgerError {
    /// Failures that point at broken data or infrastructure rather than a bad request.
    pub fn is_internal(&self) -> bool {
        matches!(self, LedgerError::DataIntegrity(_) | LedgerError::Store(_))
    }
}
