#![warn(clippy::uninlined_format_args)]

pub mod clock;
pub mod rpc;
pub mod snapshot;
pub mod store;

pub use clock::{FixedClock, SystemClock};
pub use rpc::{RpcDispatcher, RpcError, RpcErrorCode, RpcRequest, RpcResponse};
pub use snapshot::{LedgerSnapshot, SettlementRecord, SnapshotError};
pub use store::InMemoryGroupStore;
