#![warn(clippy::uninlined_format_args)]

pub mod error;
pub mod ledger_service;
pub mod model;
pub mod ports;

pub use error::{LedgerError, StoreError};
pub use ledger_service::LedgerService;
pub use model::{ExpenseDraft, SessionContext, SettlementRequest};
pub use ports::{Clock, GroupStore};
