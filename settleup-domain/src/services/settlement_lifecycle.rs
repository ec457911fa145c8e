use crate::{
    error::{SettlementAction, StateTransitionError, ValidationError},
    model::{MemberId, NewSettlement, PaymentMethod, Settlement, SettlementStatus, Transfer},
};
use chrono::{DateTime, Utc};

/// Pending → Confirmed and Pending → Cancelled; both targets are terminal.
pub struct SettlementLifecycle;

impl SettlementLifecycle {
    /// Checks a settlement before it is persisted as Pending.
    pub fn validate(&self, settlement: &NewSettlement) -> Result<(), ValidationError> {
        if !settlement.amount.is_positive() {
            return Err(ValidationError::NonPositiveAmount(settlement.amount));
        }
        if settlement.from == settlement.to {
            return Err(ValidationError::SelfSettlement(settlement.from));
        }
        Ok(())
    }

    /// Turns an optimizer transfer into a settlement ready to persist.
    pub fn accept_transfer(
        &self,
        transfer: &Transfer,
        from_name: &str,
        to_name: &str,
        payment_method: PaymentMethod,
        created_at: DateTime<Utc>,
    ) -> Result<NewSettlement, ValidationError> {
        let settlement = NewSettlement {
            from: transfer.from,
            to: transfer.to,
            amount: transfer.amount,
            payment_method,
            notes: Some(proposal_note(from_name, to_name)),
            reference_number: None,
            created_at,
        };
        self.validate(&settlement)?;
        Ok(settlement)
    }

    /// Only the receiving member may confirm.
    pub fn confirm(
        &self,
        settlement: &Settlement,
        actor: MemberId,
    ) -> Result<SettlementStatus, StateTransitionError> {
        self.transition(settlement, actor, SettlementAction::Confirm)
    }

    /// Only the paying member may cancel.
    pub fn cancel(
        &self,
        settlement: &Settlement,
        actor: MemberId,
    ) -> Result<SettlementStatus, StateTransitionError> {
        self.transition(settlement, actor, SettlementAction::Cancel)
    }

    pub fn transition(
        &self,
        settlement: &Settlement,
        actor: MemberId,
        action: SettlementAction,
    ) -> Result<SettlementStatus, StateTransitionError> {
        if settlement.status != SettlementStatus::Pending {
            return Err(StateTransitionError::NotPending {
                id: settlement.id,
                status: settlement.status,
                action,
            });
        }

        let (allowed, next) = match action {
            SettlementAction::Confirm => (settlement.to, SettlementStatus::Confirmed),
            SettlementAction::Cancel => (settlement.from, SettlementStatus::Cancelled),
        };
        if actor != allowed {
            return Err(StateTransitionError::Unauthorized {
                id: settlement.id,
                actor,
                action,
            });
        }

        Ok(next)
    }

    pub fn can_confirm(&self, settlement: &Settlement, actor: MemberId) -> bool {
        self.confirm(settlement, actor).is_ok()
    }

    pub fn can_cancel(&self, settlement: &Settlement, actor: MemberId) -> bool {
        self.cancel(settlement, actor).is_ok()
    }
}

pub fn proposal_note(from_name: &str, to_name: &str) -> String {
    format!("Optimal settlement - {from_name} to {to_name}")
}
