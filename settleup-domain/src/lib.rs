#![warn(clippy::uninlined_format_args)]

pub mod error;
pub mod model;
pub mod services;

pub use error::{
    DataIntegrityError, RecordKind, SettlementAction, StateTransitionError, ValidationError,
};
pub use model::{
    CENT, CURRENCY_SCALE, Expense, ExpenseCategory, ExpenseId, GroupId, HALF_CENT, Member,
    MemberBalance, MemberId, Money, NewExpense, NewSettlement, PaymentMethod, PersonBalance,
    Settlement, SettlementId, SettlementPlan, SettlementStatus, Split, SplitMethod, SplitShare,
    Transfer, round_half_up,
};
pub use services::{
    BalanceAggregator, BalanceFilter, BalanceRow, BalanceSheet, BalanceSort, BalanceStatus,
    GroupSummary, OptimizerOptions, Participant, SettlementLifecycle, SettlementOptimizer,
    SplitBreakdown, SplitCalculator, balance_rows, compute_balances, compute_optimal_settlements,
    compute_splits, summarize_group,
};
