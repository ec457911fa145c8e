use crate::model::{MemberId, Money, SettlementId, SettlementStatus};
use rust_decimal::Decimal;
use thiserror::Error;

/// Input rejected before any computation ran.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Amount must be greater than zero (found {0})")]
    NonPositiveAmount(Money),
    #[error("At least one participant is required")]
    NoParticipants,
    #[error("Member {0} is listed more than once")]
    DuplicateParticipant(MemberId),
    #[error("Percentages must add up to 100 (found {total})")]
    PercentageTotalMismatch { total: Decimal },
    #[error("Percentage for member {member} must not be negative (found {percentage})")]
    NegativePercentage { member: MemberId, percentage: Decimal },
    #[error("Share count for member {member} must be a positive integer (found {shares})")]
    InvalidShareCount { member: MemberId, shares: Decimal },
    #[error("Total share count must be greater than zero")]
    ZeroTotalShares,
    #[error("Split amounts must add up to {expected} (found {actual})")]
    SplitTotalMismatch { expected: Money, actual: Money },
    #[error("Split amount for member {member} must not be negative (found {amount})")]
    NegativeSplitAmount { member: MemberId, amount: Money },
    #[error("Expense description is required")]
    EmptyDescription,
    #[error("Member {0} does not belong to this group")]
    UnknownMember(MemberId),
    #[error("Member {0} cannot settle with themselves")]
    SelfSettlement(MemberId),
}

/// Snapshot data that contradicts the ledger's aggregate invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataIntegrityError {
    #[error("Total debt {total_debt} does not match total credit {total_credit}")]
    ImbalancedTotals {
        total_debt: Money,
        total_credit: Money,
    },
    #[error("Member {member} referenced by {source_kind} is not on the group roster")]
    UnknownMember {
        member: MemberId,
        source_kind: RecordKind,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Expense,
    Settlement,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Expense => f.write_str("an expense"),
            RecordKind::Settlement => f.write_str("a settlement"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementAction {
    Confirm,
    Cancel,
}

impl std::fmt::Display for SettlementAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettlementAction::Confirm => f.write_str("confirm"),
            SettlementAction::Cancel => f.write_str("cancel"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateTransitionError {
    #[error("Cannot {action} settlement {id}: it is already {status}")]
    NotPending {
        id: SettlementId,
        status: SettlementStatus,
        action: SettlementAction,
    },
    #[error("Member {actor} is not allowed to {action} settlement {id}")]
    Unauthorized {
        id: SettlementId,
        actor: MemberId,
        action: SettlementAction,
    },
}
