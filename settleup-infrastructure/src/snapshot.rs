use crate::{clock::FixedClock, store::InMemoryGroupStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use settleup_application::{
    Clock, ExpenseDraft, LedgerError, LedgerService, SessionContext, SettlementRequest,
};
use settleup_domain::{GroupId, Member, SettlementStatus};
use std::{fs, path::Path};
use thiserror::Error;

/// A settlement as recorded in a snapshot file, with its final status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
    #[serde(flatten)]
    pub request: SettlementRequest,
    #[serde(default = "pending")]
    pub status: SettlementStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn pending() -> SettlementStatus {
    SettlementStatus::Pending
}

/// One group's history in JSON form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub group: GroupId,
    pub members: Vec<Member>,
    #[serde(default)]
    pub expenses: Vec<ExpenseDraft>,
    #[serde(default)]
    pub settlements: Vec<SettlementRecord>,
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Snapshot has no members")]
    EmptyRoster,
    #[error("Expense #{index} was rejected: {source}")]
    Expense { index: usize, source: LedgerError },
    #[error("Settlement #{index} was rejected: {source}")]
    Settlement { index: usize, source: LedgerError },
}

impl LedgerSnapshot {
    pub fn from_json(raw: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Replays the snapshot into `store` through the ledger use cases.
    ///
    /// Expenses are recorded by their payer. Settlements are created by their
    /// payer, then confirmed by the payee or cancelled by the payer according
    /// to the recorded status.
    pub fn replay(&self, store: &InMemoryGroupStore, clock: &dyn Clock) -> Result<(), SnapshotError> {
        if self.members.is_empty() {
            return Err(SnapshotError::EmptyRoster);
        }
        store.create_group(self.group, self.members.clone());

        let ledger = LedgerService::new(store, clock);
        for (index, draft) in self.expenses.iter().enumerate() {
            let ctx = SessionContext::new(self.group, draft.paid_by);
            ledger
                .record_expense(ctx, draft.clone())
                .map_err(|source| SnapshotError::Expense { index, source })?;
        }

        for (index, record) in self.settlements.iter().enumerate() {
            self.replay_settlement(store, clock, record)
                .map_err(|source| SnapshotError::Settlement { index, source })?;
        }

        tracing::info!(
            group = %self.group,
            members = self.members.len(),
            expenses = self.expenses.len(),
            settlements = self.settlements.len(),
            "Replayed ledger snapshot"
        );
        Ok(())
    }

    fn replay_settlement(
        &self,
        store: &InMemoryGroupStore,
        clock: &dyn Clock,
        record: &SettlementRecord,
    ) -> Result<(), LedgerError> {
        let recorded_clock = record.created_at.map(FixedClock);
        let clock = match &recorded_clock {
            Some(fixed) => fixed as &dyn Clock,
            None => clock,
        };
        let ledger = LedgerService::new(store, clock);
        let payer = SessionContext::new(self.group, record.request.from);
        let settlement = ledger.create_settlement(payer, record.request.clone())?;

        match record.status {
            SettlementStatus::Pending => {}
            SettlementStatus::Confirmed => {
                let payee = SessionContext::new(self.group, record.request.to);
                ledger.confirm_settlement(payee, settlement.id)?;
            }
            SettlementStatus::Cancelled => {
                ledger.cancel_settlement(payer, settlement.id)?;
            }
        }
        Ok(())
    }
}
