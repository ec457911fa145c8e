use clap::{Parser, Subcommand, ValueEnum};
use settleup_domain::{BalanceFilter, BalanceSort, SettlementStatus};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "settleup")]
#[command(about = "Replay a group ledger snapshot and settle its balances")]
pub struct Cli {
    /// JSON ledger snapshot to replay.
    pub snapshot: PathBuf,

    /// Member acting on the group; defaults to the first member of the roster.
    #[arg(long, env = "SETTLEUP_ACTOR")]
    pub actor: Option<u64>,

    #[arg(long, env = "SETTLEUP_FORMAT", value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// tracing filter directive, e.g. `info` or `settleup_application=debug`.
    #[arg(long, env = "SETTLEUP_LOG", default_value = "info")]
    pub log: String,

    #[command(subcommand)]
    pub report: Option<Report>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Report {
    /// Per-member balances.
    Balances {
        #[arg(long, value_enum, default_value_t = FilterArg::All)]
        filter: FilterArg,
        #[arg(long, value_enum, default_value_t = SortArg::Name)]
        sort: SortArg,
    },
    /// Minimal set of transfers settling every balance.
    Plan,
    /// Group statistics.
    Summary,
    /// Settlement history, newest first.
    Settlements {
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
    },
    /// Expense history with each member's share, newest first.
    Expenses,
    /// Dispatch one raw JSON request, e.g. '{"method":"getGroupSummary"}'.
    Rpc { request: String },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterArg {
    All,
    Owes,
    Owed,
}

impl From<FilterArg> for BalanceFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::All => BalanceFilter::All,
            FilterArg::Owes => BalanceFilter::Owes,
            FilterArg::Owed => BalanceFilter::Owed,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortArg {
    Name,
    Balance,
    TotalPaid,
}

impl From<SortArg> for BalanceSort {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Name => BalanceSort::Name,
            SortArg::Balance => BalanceSort::Balance,
            SortArg::TotalPaid => BalanceSort::TotalPaid,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusArg {
    Pending,
    Confirmed,
    Cancelled,
}

impl From<StatusArg> for SettlementStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Pending => SettlementStatus::Pending,
            StatusArg::Confirmed => SettlementStatus::Confirmed,
            StatusArg::Cancelled => SettlementStatus::Cancelled,
        }
    }
}

impl Cli {
    /// Without a subcommand every table-friendly report is printed.
    pub fn reports(&self) -> Vec<Report> {
        match &self.report {
            Some(report) => vec![report.clone()],
            None => vec![
                Report::Balances {
                    filter: FilterArg::All,
                    sort: SortArg::Name,
                },
                Report::Plan,
                Report::Summary,
            ],
        }
    }
}
