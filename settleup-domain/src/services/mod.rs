pub mod balance_aggregator;
pub mod balance_view;
pub mod group_summary;
pub mod settlement_lifecycle;
pub mod settlement_optimizer;
pub mod split_calculator;

pub use balance_aggregator::{BalanceAggregator, BalanceSheet, compute_balances};
pub use balance_view::{BalanceFilter, BalanceRow, BalanceSort, BalanceStatus, balance_rows};
pub use group_summary::{CategoryTotal, GroupSummary, PayerTotal, TopSpender, summarize_group};
pub use settlement_lifecycle::{SettlementLifecycle, proposal_note};
pub use settlement_optimizer::{OptimizerOptions, SettlementOptimizer, compute_optimal_settlements};
pub use split_calculator::{
    Participant, SplitBreakdown, SplitCalculator, compute_splits, residue_tolerance,
};
