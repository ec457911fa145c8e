use serde::{Deserialize, Serialize};
use serde_json::Value;
use settleup_application::{
    ExpenseDraft, LedgerError, LedgerService, SessionContext, SettlementRequest, StoreError,
};
use settleup_domain::{
    BalanceFilter, BalanceRow, BalanceSheet, BalanceSort, Expense, ExpenseId, GroupSummary,
    PaymentMethod, Settlement, SettlementId, SettlementPlan, SettlementStatus, Transfer,
};
use std::fmt;
use thiserror::Error;

/// A call from the presentation tier, as `{"method": "...", "params": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "camelCase")]
pub enum RpcRequest {
    GetMemberBalances,
    GetOptimalSettlements,
    CreateSettlement(SettlementRequest),
    AcceptProposal {
        transfer: Transfer,
        #[serde(default)]
        payment_method: PaymentMethod,
    },
    ConfirmSettlement {
        settlement_id: SettlementId,
    },
    CancelSettlement {
        settlement_id: SettlementId,
    },
    GetGroupSettlements {
        #[serde(default)]
        status: Option<SettlementStatus>,
    },
    GetGroupExpenses,
    GetExpenseForView {
        expense_id: ExpenseId,
    },
    AddExpense(ExpenseDraft),
    UpdateExpense {
        expense_id: ExpenseId,
        expense: ExpenseDraft,
    },
    RemoveExpense {
        expense_id: ExpenseId,
    },
    GetGroupSummary,
    GetBalanceRows {
        #[serde(default)]
        filter: BalanceFilter,
        #[serde(default)]
        sort: BalanceSort,
    },
}

impl RpcRequest {
    pub fn method(&self) -> &'static str {
        match self {
            RpcRequest::GetMemberBalances => "getMemberBalances",
            RpcRequest::GetOptimalSettlements => "getOptimalSettlements",
            RpcRequest::CreateSettlement(_) => "createSettlement",
            RpcRequest::AcceptProposal { .. } => "acceptProposal",
            RpcRequest::ConfirmSettlement { .. } => "confirmSettlement",
            RpcRequest::CancelSettlement { .. } => "cancelSettlement",
            RpcRequest::GetGroupSettlements { .. } => "getGroupSettlements",
            RpcRequest::GetGroupExpenses => "getGroupExpenses",
            RpcRequest::GetExpenseForView { .. } => "getExpenseForView",
            RpcRequest::AddExpense(_) => "addExpense",
            RpcRequest::UpdateExpense { .. } => "updateExpense",
            RpcRequest::RemoveExpense { .. } => "removeExpense",
            RpcRequest::GetGroupSummary => "getGroupSummary",
            RpcRequest::GetBalanceRows { .. } => "getBalanceRows",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RpcResponse {
    Balances(BalanceSheet),
    Plan(SettlementPlan),
    Settlement(Settlement),
    Settlements(Vec<Settlement>),
    Expense(Expense),
    Expenses(Vec<Expense>),
    ExpenseRecorded { expense_id: ExpenseId },
    Summary(GroupSummary),
    Rows(Vec<BalanceRow>),
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RpcErrorCode {
    Validation,
    DataIntegrity,
    StateTransition,
    NotFound,
    Forbidden,
    Store,
    BadRequest,
    Internal,
}

impl RpcErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            RpcErrorCode::Validation => "validation",
            RpcErrorCode::DataIntegrity => "data_integrity",
            RpcErrorCode::StateTransition => "state_transition",
            RpcErrorCode::NotFound => "not_found",
            RpcErrorCode::Forbidden => "forbidden",
            RpcErrorCode::Store => "store",
            RpcErrorCode::BadRequest => "bad_request",
            RpcErrorCode::Internal => "internal",
        }
    }
}

impl fmt::Display for RpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code}: {message}")]
pub struct RpcError {
    pub code: RpcErrorCode,
    pub message: String,
}

impl RpcError {
    pub fn new(code: RpcErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<LedgerError> for RpcError {
    fn from(err: LedgerError) -> Self {
        let code = match &err {
            LedgerError::Validation(_) => RpcErrorCode::Validation,
            LedgerError::DataIntegrity(_) => RpcErrorCode::DataIntegrity,
            LedgerError::StateTransition(_) => RpcErrorCode::StateTransition,
            LedgerError::NotAGroupMember { .. } => RpcErrorCode::Forbidden,
            LedgerError::ExpenseNotFound(_)
            | LedgerError::SettlementNotFound(_)
            | LedgerError::Store(StoreError::GroupNotFound(_)) => RpcErrorCode::NotFound,
            LedgerError::Store(_) => RpcErrorCode::Store,
        };
        RpcError::new(code, err.to_string())
    }
}

/// Routes typed requests to [`LedgerService`] use cases.
#[derive(Clone, Copy)]
pub struct RpcDispatcher<'a> {
    ledger: LedgerService<'a>,
}

impl<'a> RpcDispatcher<'a> {
    pub fn new(ledger: LedgerService<'a>) -> Self {
        Self { ledger }
    }

    pub fn dispatch(
        &self,
        ctx: SessionContext,
        request: RpcRequest,
    ) -> Result<RpcResponse, RpcError> {
        tracing::debug!(method = request.method(), group = %ctx.group, actor = %ctx.actor, "Dispatching request");
        let ledger = &self.ledger;
        let response = match request {
            RpcRequest::GetMemberBalances => RpcResponse::Balances(ledger.member_balances(ctx)?),
            RpcRequest::GetOptimalSettlements => {
                RpcResponse::Plan(ledger.optimal_settlements(ctx)?)
            }
            RpcRequest::CreateSettlement(settlement) => {
                RpcResponse::Settlement(ledger.create_settlement(ctx, settlement)?)
            }
            RpcRequest::AcceptProposal {
                transfer,
                payment_method,
            } => RpcResponse::Settlement(ledger.accept_proposal(ctx, transfer, payment_method)?),
            RpcRequest::ConfirmSettlement { settlement_id } => {
                RpcResponse::Balances(ledger.confirm_settlement(ctx, settlement_id)?)
            }
            RpcRequest::CancelSettlement { settlement_id } => {
                RpcResponse::Settlement(ledger.cancel_settlement(ctx, settlement_id)?)
            }
            RpcRequest::GetGroupSettlements { status } => {
                RpcResponse::Settlements(ledger.group_settlements(ctx, status)?)
            }
            RpcRequest::GetGroupExpenses => RpcResponse::Expenses(ledger.group_expenses(ctx)?),
            RpcRequest::GetExpenseForView { expense_id } => {
                RpcResponse::Expense(ledger.expense(ctx, expense_id)?)
            }
            RpcRequest::AddExpense(draft) => RpcResponse::ExpenseRecorded {
                expense_id: ledger.record_expense(ctx, draft)?,
            },
            RpcRequest::UpdateExpense {
                expense_id,
                expense,
            } => {
                ledger.edit_expense(ctx, expense_id, expense)?;
                RpcResponse::Done
            }
            RpcRequest::RemoveExpense { expense_id } => {
                ledger.remove_expense(ctx, expense_id)?;
                RpcResponse::Done
            }
            RpcRequest::GetGroupSummary => RpcResponse::Summary(ledger.group_summary(ctx)?),
            RpcRequest::GetBalanceRows { filter, sort } => {
                RpcResponse::Rows(ledger.balance_rows(ctx, filter, sort)?)
            }
        };
        Ok(response)
    }

    /// JSON-in, JSON-out form of [`RpcDispatcher::dispatch`].
    pub fn dispatch_json(&self, ctx: SessionContext, request: Value) -> Result<Value, RpcError> {
        let request: RpcRequest = serde_json::from_value(request).map_err(|err| {
            tracing::warn!(error = %err, "Malformed request");
            RpcError::new(RpcErrorCode::BadRequest, err.to_string())
        })?;
        let response = self.dispatch(ctx, request)?;
        serde_json::to_value(response)
            .map_err(|err| RpcError::new(RpcErrorCode::Internal, err.to_string()))
    }
}
