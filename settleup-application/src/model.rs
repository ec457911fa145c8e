use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use settleup_domain::{
    ExpenseCategory, GroupId, MemberId, Money, Participant, PaymentMethod, SplitMethod,
};

/// Who is acting, and on which group. Passed into every ledger operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub group: GroupId,
    pub actor: MemberId,
}

impl SessionContext {
    pub fn new(group: GroupId, actor: MemberId) -> Self {
        Self { group, actor }
    }
}

/// User input for creating or replacing an expense; splits are computed from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseDraft {
    pub description: String,
    pub amount: Money,
    pub date: NaiveDate,
    #[serde(default)]
    pub category: ExpenseCategory,
    pub paid_by: MemberId,
    pub split_method: SplitMethod,
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRequest {
    pub from: MemberId,
    pub to: MemberId,
    pub amount: Money,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub reference_number: Option<String>,
}
