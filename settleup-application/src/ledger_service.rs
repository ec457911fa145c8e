use crate::{
    error::LedgerError,
    model::{ExpenseDraft, SessionContext, SettlementRequest},
    ports::{Clock, GroupStore},
};
use settleup_domain::{
    BalanceAggregator, BalanceFilter, BalanceRow, BalanceSheet, BalanceSort, Expense, ExpenseId,
    GroupSummary, Member, MemberId, Money, NewExpense, NewSettlement, OptimizerOptions,
    PaymentMethod, Settlement, SettlementId, SettlementLifecycle, SettlementOptimizer,
    SettlementPlan, SettlementStatus, SplitCalculator, Transfer, ValidationError, balance_rows,
    services::residue_tolerance, summarize_group,
};

/// Everything the ledger knows about one group at a point in time.
struct GroupSnapshot {
    members: Vec<Member>,
    expenses: Vec<Expense>,
    settlements: Vec<Settlement>,
}

/// Use cases of the group ledger.
///
/// Every call re-reads the group from the store, so results always reflect
/// the latest persisted state.
#[derive(Clone, Copy)]
pub struct LedgerService<'a> {
    store: &'a dyn GroupStore,
    clock: &'a dyn Clock,
    options: OptimizerOptions,
}

impl<'a> LedgerService<'a> {
    pub fn new(store: &'a dyn GroupStore, clock: &'a dyn Clock) -> Self {
        Self {
            store,
            clock,
            options: OptimizerOptions::default(),
        }
    }

    pub fn with_optimizer_options(self, options: OptimizerOptions) -> Self {
        Self { options, ..self }
    }

    pub fn record_expense(
        &self,
        ctx: SessionContext,
        draft: ExpenseDraft,
    ) -> Result<ExpenseId, LedgerError> {
        let result = self.members(ctx).and_then(|members| {
            let expense = build_expense(&members, draft)?;
            let amount = expense.amount;
            let id = self.store.persist_expense(ctx.group, expense)?;
            tracing::info!(group = %ctx.group, actor = %ctx.actor, expense = %id, %amount, "Recorded expense");
            Ok(id)
        });
        result.inspect_err(|err| log_failure("record_expense", ctx, err))
    }

    pub fn edit_expense(
        &self,
        ctx: SessionContext,
        id: ExpenseId,
        draft: ExpenseDraft,
    ) -> Result<(), LedgerError> {
        let result = self.members(ctx).and_then(|members| {
            let expense = build_expense(&members, draft)?;
            self.store.replace_expense(ctx.group, id, expense)?;
            tracing::info!(group = %ctx.group, actor = %ctx.actor, expense = %id, "Replaced expense");
            Ok(())
        });
        result.inspect_err(|err| log_failure("edit_expense", ctx, err))
    }

    pub fn remove_expense(&self, ctx: SessionContext, id: ExpenseId) -> Result<(), LedgerError> {
        let result = self.members(ctx).and_then(|_| {
            self.store.delete_expense(ctx.group, id)?;
            tracing::info!(group = %ctx.group, actor = %ctx.actor, expense = %id, "Removed expense");
            Ok(())
        });
        result.inspect_err(|err| log_failure("remove_expense", ctx, err))
    }

    pub fn member_balances(&self, ctx: SessionContext) -> Result<BalanceSheet, LedgerError> {
        self.snapshot(ctx)
            .and_then(|snapshot| balance_sheet(&snapshot))
            .inspect_err(|err| log_failure("member_balances", ctx, err))
    }

    pub fn optimal_settlements(&self, ctx: SessionContext) -> Result<SettlementPlan, LedgerError> {
        let result = self.snapshot(ctx).and_then(|snapshot| {
            let sheet = balance_sheet(&snapshot)?;
            let plan = self.plan(&snapshot, &sheet)?;
            tracing::debug!(
                group = %ctx.group,
                transfers = plan.transfers.len(),
                total_debt = %plan.total_debt,
                "Computed settlement plan"
            );
            Ok(plan)
        });
        result.inspect_err(|err| log_failure("optimal_settlements", ctx, err))
    }

    pub fn create_settlement(
        &self,
        ctx: SessionContext,
        request: SettlementRequest,
    ) -> Result<Settlement, LedgerError> {
        let result = self.members(ctx).and_then(|members| {
            ensure_member(&members, request.from)?;
            ensure_member(&members, request.to)?;
            let settlement = NewSettlement {
                from: request.from,
                to: request.to,
                amount: request.amount,
                payment_method: request.payment_method,
                notes: request.notes,
                reference_number: request.reference_number,
                created_at: self.clock.now(),
            };
            SettlementLifecycle.validate(&settlement)?;
            self.persist_settlement(ctx, settlement)
        });
        result.inspect_err(|err| log_failure("create_settlement", ctx, err))
    }

    /// Records an optimizer transfer as a Pending settlement.
    pub fn accept_proposal(
        &self,
        ctx: SessionContext,
        transfer: Transfer,
        payment_method: PaymentMethod,
    ) -> Result<Settlement, LedgerError> {
        let result = self.members(ctx).and_then(|members| {
            let from = ensure_member(&members, transfer.from)?;
            let to = ensure_member(&members, transfer.to)?;
            let settlement = SettlementLifecycle.accept_transfer(
                &transfer,
                &from.name,
                &to.name,
                payment_method,
                self.clock.now(),
            )?;
            self.persist_settlement(ctx, settlement)
        });
        result.inspect_err(|err| log_failure("accept_proposal", ctx, err))
    }

    /// Confirms a Pending settlement and returns the balances recomputed afterwards.
    pub fn confirm_settlement(
        &self,
        ctx: SessionContext,
        id: SettlementId,
    ) -> Result<BalanceSheet, LedgerError> {
        let result = self.members(ctx).and_then(|_| {
            let settlement = self.find_settlement(ctx, id)?;
            let status = SettlementLifecycle.confirm(&settlement, ctx.actor)?;
            self.store.update_settlement_status(ctx.group, id, status)?;
            tracing::info!(
                group = %ctx.group,
                actor = %ctx.actor,
                settlement = %id,
                amount = %settlement.amount,
                "Confirmed settlement"
            );
            let snapshot = self.snapshot(ctx)?;
            balance_sheet(&snapshot)
        });
        result.inspect_err(|err| log_failure("confirm_settlement", ctx, err))
    }

    pub fn cancel_settlement(
        &self,
        ctx: SessionContext,
        id: SettlementId,
    ) -> Result<Settlement, LedgerError> {
        let result = self.members(ctx).and_then(|_| {
            let mut settlement = self.find_settlement(ctx, id)?;
            let status = SettlementLifecycle.cancel(&settlement, ctx.actor)?;
            self.store.update_settlement_status(ctx.group, id, status)?;
            tracing::info!(group = %ctx.group, actor = %ctx.actor, settlement = %id, "Cancelled settlement");
            settlement.status = status;
            Ok(settlement)
        });
        result.inspect_err(|err| log_failure("cancel_settlement", ctx, err))
    }

    /// Settlements of the group, newest first, optionally limited to one status.
    pub fn group_settlements(
        &self,
        ctx: SessionContext,
        status: Option<SettlementStatus>,
    ) -> Result<Vec<Settlement>, LedgerError> {
        let result = self.members(ctx).and_then(|_| {
            let mut settlements = self.store.fetch_group_settlements(ctx.group)?;
            if let Some(status) = status {
                settlements.retain(|settlement| settlement.status == status);
            }
            settlements.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            Ok(settlements)
        });
        result.inspect_err(|err| log_failure("group_settlements", ctx, err))
    }

    /// Expenses of the group with their splits, newest date first.
    pub fn group_expenses(&self, ctx: SessionContext) -> Result<Vec<Expense>, LedgerError> {
        let result = self.members(ctx).and_then(|_| {
            let mut expenses = self.store.fetch_group_expenses(ctx.group)?;
            expenses.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
            Ok(expenses)
        });
        result.inspect_err(|err| log_failure("group_expenses", ctx, err))
    }

    pub fn expense(&self, ctx: SessionContext, id: ExpenseId) -> Result<Expense, LedgerError> {
        let result = self.members(ctx).and_then(|_| {
            self.store
                .fetch_group_expenses(ctx.group)?
                .into_iter()
                .find(|expense| expense.id == id)
                .ok_or(LedgerError::ExpenseNotFound(id))
        });
        result.inspect_err(|err| log_failure("expense", ctx, err))
    }

    pub fn group_summary(&self, ctx: SessionContext) -> Result<GroupSummary, LedgerError> {
        let result = self.snapshot(ctx).and_then(|snapshot| {
            let sheet = balance_sheet(&snapshot)?;
            Ok(summarize_group(
                &snapshot.members,
                &snapshot.expenses,
                &sheet.balances,
            ))
        });
        result.inspect_err(|err| log_failure("group_summary", ctx, err))
    }

    pub fn balance_rows(
        &self,
        ctx: SessionContext,
        filter: BalanceFilter,
        sort: BalanceSort,
    ) -> Result<Vec<BalanceRow>, LedgerError> {
        let result = self.snapshot(ctx).and_then(|snapshot| {
            let sheet = balance_sheet(&snapshot)?;
            Ok(balance_rows(&snapshot.members, &sheet.balances, filter, sort))
        });
        result.inspect_err(|err| log_failure("balance_rows", ctx, err))
    }

    fn members(&self, ctx: SessionContext) -> Result<Vec<Member>, LedgerError> {
        let members = self.store.fetch_group_members(ctx.group)?;
        if !members.iter().any(|member| member.id == ctx.actor) {
            return Err(LedgerError::NotAGroupMember {
                group: ctx.group,
                actor: ctx.actor,
            });
        }
        Ok(members)
    }

    fn snapshot(&self, ctx: SessionContext) -> Result<GroupSnapshot, LedgerError> {
        let members = self.members(ctx)?;
        let expenses = self.store.fetch_group_expenses(ctx.group)?;
        let settlements = self.store.fetch_group_settlements(ctx.group)?;
        Ok(GroupSnapshot {
            members,
            expenses,
            settlements,
        })
    }

    fn plan(
        &self,
        snapshot: &GroupSnapshot,
        sheet: &BalanceSheet,
    ) -> Result<SettlementPlan, LedgerError> {
        let options = self
            .options
            .with_rounding_residue(residue_allowance(&snapshot.expenses));
        let plan = SettlementOptimizer::new(options).optimize(&sheet.net_balances())?;
        Ok(plan)
    }

    fn find_settlement(
        &self,
        ctx: SessionContext,
        id: SettlementId,
    ) -> Result<Settlement, LedgerError> {
        self.store
            .fetch_group_settlements(ctx.group)?
            .into_iter()
            .find(|settlement| settlement.id == id)
            .ok_or(LedgerError::SettlementNotFound(id))
    }

    fn persist_settlement(
        &self,
        ctx: SessionContext,
        settlement: NewSettlement,
    ) -> Result<Settlement, LedgerError> {
        let id = self
            .store
            .persist_settlement(ctx.group, settlement.clone())?;
        tracing::info!(
            group = %ctx.group,
            actor = %ctx.actor,
            settlement = %id,
            from = %settlement.from,
            to = %settlement.to,
            amount = %settlement.amount,
            "Created pending settlement"
        );
        Ok(Settlement::from_new(id, settlement))
    }
}

fn balance_sheet(snapshot: &GroupSnapshot) -> Result<BalanceSheet, LedgerError> {
    let sheet = BalanceAggregator.aggregate(
        &snapshot.members,
        &snapshot.expenses,
        &snapshot.settlements,
    )?;
    Ok(sheet)
}

/// Largest rounding residue the stored expenses may legitimately leave behind.
fn residue_allowance(expenses: &[Expense]) -> Money {
    expenses
        .iter()
        .map(|expense| residue_tolerance(expense.split_method, expense.splits.len()))
        .sum()
}

fn ensure_member(members: &[Member], id: MemberId) -> Result<&Member, ValidationError> {
    members
        .iter()
        .find(|member| member.id == id)
        .ok_or(ValidationError::UnknownMember(id))
}

fn build_expense(members: &[Member], draft: ExpenseDraft) -> Result<NewExpense, ValidationError> {
    let description = draft.description.trim();
    if description.is_empty() {
        return Err(ValidationError::EmptyDescription);
    }
    ensure_member(members, draft.paid_by)?;
    for participant in &draft.participants {
        ensure_member(members, participant.member_id)?;
    }

    let breakdown = SplitCalculator.compute(draft.amount, draft.split_method, &draft.participants)?;
    let tolerance = residue_tolerance(draft.split_method, draft.participants.len());
    let owed = breakdown.total_owed();
    if !owed.approx_eq(draft.amount, tolerance) {
        return Err(ValidationError::SplitTotalMismatch {
            expected: draft.amount,
            actual: owed,
        });
    }

    Ok(NewExpense {
        description: description.to_string(),
        amount: draft.amount,
        date: draft.date,
        category: draft.category,
        paid_by: draft.paid_by,
        split_method: draft.split_method,
        notes: draft.notes,
        location: draft.location,
        shares: breakdown.shares,
    })
}

fn log_failure(operation: &'static str, ctx: SessionContext, err: &LedgerError) {
    if err.is_internal() {
        tracing::error!(operation, group = %ctx.group, actor = %ctx.actor, error = %err, "Ledger operation failed");
    } else {
        tracing::warn!(operation, group = %ctx.group, actor = %ctx.actor, error = %err, "Rejected ledger request");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
    use rstest::{fixture, rstest};
    use rust_decimal::Decimal;
    use settleup_domain::{
        BalanceStatus, DataIntegrityError, GroupId, Participant, SettlementAction, Split,
        SplitMethod, StateTransitionError,
    };
    use std::sync::{
        Mutex,
        atomic::{AtomicI64, AtomicU64, Ordering},
    };

    const GROUP: GroupId = GroupId(1);
    const ALICE: MemberId = MemberId(1);
    const BOB: MemberId = MemberId(2);
    const CAROL: MemberId = MemberId(3);

    struct StubStore {
        members: Vec<Member>,
        expenses: Mutex<Vec<Expense>>,
        settlements: Mutex<Vec<Settlement>>,
        next_id: AtomicU64,
    }

    impl StubStore {
        fn new() -> Self {
            Self {
                members: vec![
                    Member::new(ALICE, "Alice"),
                    Member::new(BOB, "Bob"),
                    Member::new(CAROL, "Carol"),
                ],
                expenses: Mutex::new(Vec::new()),
                settlements: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }
        }

        fn check(&self, group: GroupId) -> Result<(), StoreError> {
            if group == GROUP {
                Ok(())
            } else {
                Err(StoreError::GroupNotFound(group))
            }
        }

        fn expenses(&self) -> Vec<Expense> {
            self.expenses.lock().expect("lock").clone()
        }

        fn status_of(&self, id: SettlementId) -> Option<SettlementStatus> {
            self.settlements
                .lock()
                .expect("lock")
                .iter()
                .find(|settlement| settlement.id == id)
                .map(|settlement| settlement.status)
        }
    }

    impl GroupStore for StubStore {
        fn fetch_group_members(&self, group: GroupId) -> Result<Vec<Member>, StoreError> {
            self.check(group)?;
            Ok(self.members.clone())
        }

        fn fetch_group_expenses(&self, group: GroupId) -> Result<Vec<Expense>, StoreError> {
            self.check(group)?;
            Ok(self.expenses())
        }

        fn fetch_group_settlements(&self, group: GroupId) -> Result<Vec<Settlement>, StoreError> {
            self.check(group)?;
            Ok(self.settlements.lock().expect("lock").clone())
        }

        fn persist_expense(
            &self,
            group: GroupId,
            expense: NewExpense,
        ) -> Result<ExpenseId, StoreError> {
            self.check(group)?;
            let id = ExpenseId(self.next_id.fetch_add(1, Ordering::Relaxed));
            self.expenses
                .lock()
                .expect("lock")
                .push(Expense::from_new(id, expense));
            Ok(id)
        }

        fn replace_expense(
            &self,
            group: GroupId,
            id: ExpenseId,
            expense: NewExpense,
        ) -> Result<(), StoreError> {
            self.check(group)?;
            let mut expenses = self.expenses.lock().expect("lock");
            let slot = expenses
                .iter_mut()
                .find(|existing| existing.id == id)
                .ok_or(StoreError::ExpenseNotFound(id))?;
            *slot = Expense::from_new(id, expense);
            Ok(())
        }

        fn delete_expense(&self, group: GroupId, id: ExpenseId) -> Result<(), StoreError> {
            self.check(group)?;
            let mut expenses = self.expenses.lock().expect("lock");
            let before = expenses.len();
            expenses.retain(|expense| expense.id != id);
            if expenses.len() == before {
                return Err(StoreError::ExpenseNotFound(id));
            }
            Ok(())
        }

        fn persist_settlement(
            &self,
            group: GroupId,
            settlement: NewSettlement,
        ) -> Result<SettlementId, StoreError> {
            self.check(group)?;
            let id = SettlementId(self.next_id.fetch_add(1, Ordering::Relaxed));
            self.settlements
                .lock()
                .expect("lock")
                .push(Settlement::from_new(id, settlement));
            Ok(id)
        }

        fn update_settlement_status(
            &self,
            group: GroupId,
            id: SettlementId,
            status: SettlementStatus,
        ) -> Result<(), StoreError> {
            self.check(group)?;
            let mut settlements = self.settlements.lock().expect("lock");
            let slot = settlements
                .iter_mut()
                .find(|settlement| settlement.id == id)
                .ok_or(StoreError::SettlementNotFound(id))?;
            slot.status = status;
            Ok(())
        }
    }

    /// Advances one minute on every reading.
    struct TickingClock {
        minutes: AtomicI64,
    }

    impl Clock for TickingClock {
        fn now(&self) -> DateTime<Utc> {
            let start = Utc
                .with_ymd_and_hms(2024, 4, 1, 12, 0, 0)
                .single()
                .expect("time");
            start + Duration::minutes(self.minutes.fetch_add(1, Ordering::Relaxed))
        }
    }

    #[fixture]
    fn store() -> StubStore {
        StubStore::new()
    }

    #[fixture]
    fn clock() -> TickingClock {
        TickingClock {
            minutes: AtomicI64::new(0),
        }
    }

    fn as_member(actor: MemberId) -> SessionContext {
        SessionContext::new(GROUP, actor)
    }

    fn equal_draft(amount: i64, paid_by: MemberId, participants: &[MemberId]) -> ExpenseDraft {
        ExpenseDraft {
            description: "Dinner".to_string(),
            amount: Money::from_i64(amount),
            date: NaiveDate::from_ymd_opt(2024, 4, 1).expect("date"),
            category: Default::default(),
            paid_by,
            split_method: SplitMethod::Equal,
            participants: participants.iter().copied().map(Participant::equal).collect(),
            notes: None,
            location: None,
        }
    }

    fn net_of(sheet: &BalanceSheet, member: MemberId) -> Money {
        sheet
            .get(member)
            .map(|balance| balance.net_balance)
            .unwrap_or_default()
    }

    #[rstest]
    fn record_expense_persists_computed_splits(store: StubStore, clock: TickingClock) {
        let ledger = LedgerService::new(&store, &clock);

        let id = ledger
            .record_expense(as_member(ALICE), equal_draft(90, ALICE, &[ALICE, BOB, CAROL]))
            .expect("expense recorded");

        let expenses = store.expenses();
        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0].id, id);
        assert!(
            expenses[0]
                .splits
                .iter()
                .all(|split| split.owed_amount == Money::from_i64(30) && split.expense_id == id)
        );
    }

    #[rstest]
    #[case::blank_description(
        ExpenseDraft { description: "   ".to_string(), ..equal_draft(10, ALICE, &[ALICE]) },
        LedgerError::Validation(ValidationError::EmptyDescription)
    )]
    #[case::unknown_payer(
        equal_draft(10, MemberId(9), &[ALICE]),
        LedgerError::Validation(ValidationError::UnknownMember(MemberId(9)))
    )]
    #[case::unknown_participant(
        equal_draft(10, ALICE, &[ALICE, MemberId(8)]),
        LedgerError::Validation(ValidationError::UnknownMember(MemberId(8)))
    )]
    #[case::no_participants(
        equal_draft(10, ALICE, &[]),
        LedgerError::Validation(ValidationError::NoParticipants)
    )]
    #[case::unbalanced_unequal(
        ExpenseDraft {
            split_method: SplitMethod::Unequal,
            participants: vec![
                Participant::new(ALICE, Decimal::from(4)),
                Participant::new(BOB, Decimal::from(4)),
            ],
            ..equal_draft(10, ALICE, &[])
        },
        LedgerError::Validation(ValidationError::SplitTotalMismatch {
            expected: Money::from_i64(10),
            actual: Money::from_i64(8),
        })
    )]
    fn invalid_drafts_are_rejected_before_persisting(
        store: StubStore,
        clock: TickingClock,
        #[case] draft: ExpenseDraft,
        #[case] expected: LedgerError,
    ) {
        let ledger = LedgerService::new(&store, &clock);

        let result = ledger.record_expense(as_member(ALICE), draft);

        assert_eq!(result, Err(expected));
        assert!(store.expenses().is_empty());
    }

    #[rstest]
    fn outsiders_cannot_act_on_the_group(store: StubStore, clock: TickingClock) {
        let ledger = LedgerService::new(&store, &clock);
        let outsider = MemberId(42);

        let result = ledger.member_balances(as_member(outsider));

        assert_eq!(
            result,
            Err(LedgerError::NotAGroupMember {
                group: GROUP,
                actor: outsider,
            })
        );
    }

    #[rstest]
    fn unknown_group_is_a_store_error(store: StubStore, clock: TickingClock) {
        let ledger = LedgerService::new(&store, &clock);

        let result = ledger.group_summary(SessionContext::new(GroupId(7), ALICE));

        assert_eq!(
            result,
            Err(LedgerError::Store(StoreError::GroupNotFound(GroupId(7))))
        );
    }

    #[rstest]
    fn edit_replaces_previous_splits(store: StubStore, clock: TickingClock) {
        let ledger = LedgerService::new(&store, &clock);
        let ctx = as_member(ALICE);
        let id = ledger
            .record_expense(ctx, equal_draft(60, ALICE, &[ALICE, BOB, CAROL]))
            .expect("expense recorded");

        ledger
            .edit_expense(ctx, id, equal_draft(80, BOB, &[ALICE, BOB]))
            .expect("expense replaced");

        let expenses = store.expenses();
        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0].paid_by, BOB);
        assert_eq!(
            expenses[0].participants().collect::<Vec<_>>(),
            vec![ALICE, BOB]
        );
        let sheet = ledger.member_balances(ctx).expect("balances");
        assert_eq!(net_of(&sheet, ALICE), Money::from_i64(-40));
        assert_eq!(net_of(&sheet, CAROL), Money::ZERO);
    }

    #[rstest]
    fn missing_expenses_are_reported(store: StubStore, clock: TickingClock) {
        let ledger = LedgerService::new(&store, &clock);
        let ctx = as_member(ALICE);

        assert_eq!(
            ledger.edit_expense(ctx, ExpenseId(99), equal_draft(10, ALICE, &[ALICE])),
            Err(LedgerError::ExpenseNotFound(ExpenseId(99)))
        );
        assert_eq!(
            ledger.remove_expense(ctx, ExpenseId(99)),
            Err(LedgerError::ExpenseNotFound(ExpenseId(99)))
        );
    }

    #[rstest]
    fn expenses_are_listed_newest_first_with_their_splits(store: StubStore, clock: TickingClock) {
        let ledger = LedgerService::new(&store, &clock);
        let ctx = as_member(BOB);
        let dinner = ledger
            .record_expense(ctx, equal_draft(60, ALICE, &[ALICE, BOB, CAROL]))
            .expect("expense recorded");
        let taxi = ledger
            .record_expense(
                ctx,
                ExpenseDraft {
                    description: "Taxi".to_string(),
                    date: NaiveDate::from_ymd_opt(2024, 4, 3).expect("date"),
                    ..equal_draft(20, BOB, &[ALICE, BOB])
                },
            )
            .expect("expense recorded");

        let listed: Vec<ExpenseId> = ledger
            .group_expenses(ctx)
            .expect("expenses")
            .iter()
            .map(|expense| expense.id)
            .collect();
        assert_eq!(listed, vec![taxi, dinner]);

        let viewed = ledger.expense(ctx, dinner).expect("expense found");
        assert_eq!(viewed.description, "Dinner");
        assert_eq!(
            viewed
                .splits
                .iter()
                .map(|split| (split.member_id, split.owed_amount))
                .collect::<Vec<_>>(),
            vec![
                (ALICE, Money::from_i64(20)),
                (BOB, Money::from_i64(20)),
                (CAROL, Money::from_i64(20)),
            ]
        );
        assert_eq!(
            ledger.expense(ctx, ExpenseId(404)),
            Err(LedgerError::ExpenseNotFound(ExpenseId(404)))
        );
    }

    #[rstest]
    fn splits_that_miss_the_expense_total_fail_the_plan(store: StubStore, clock: TickingClock) {
        let id = ExpenseId(500);
        store.expenses.lock().expect("lock").push(Expense {
            id,
            description: "Hotel".to_string(),
            amount: Money::from_i64(100),
            date: NaiveDate::from_ymd_opt(2024, 4, 2).expect("date"),
            category: Default::default(),
            paid_by: ALICE,
            split_method: SplitMethod::Unequal,
            notes: None,
            location: None,
            splits: vec![Split {
                expense_id: id,
                member_id: BOB,
                owed_amount: Money::from_i64(40),
                percentage: None,
                share_count: None,
            }],
        });
        let ledger = LedgerService::new(&store, &clock);

        let result = ledger.optimal_settlements(as_member(ALICE));

        assert_eq!(
            result,
            Err(LedgerError::DataIntegrity(
                DataIntegrityError::ImbalancedTotals {
                    total_debt: Money::from_i64(40),
                    total_credit: Money::from_i64(100),
                }
            ))
        );
    }

    #[rstest]
    fn equal_split_residue_still_produces_a_plan(store: StubStore, clock: TickingClock) {
        let ledger = LedgerService::new(&store, &clock);
        let ctx = as_member(ALICE);
        ledger
            .record_expense(ctx, equal_draft(100, ALICE, &[ALICE, BOB, CAROL]))
            .expect("expense recorded");

        let plan = ledger.optimal_settlements(ctx).expect("plan computed");

        assert_eq!(plan.transfers.len(), 2);
        assert!(
            plan.transfers
                .iter()
                .all(|transfer| transfer.to == ALICE && transfer.amount == Money::new(3333, 2))
        );
    }

    #[rstest]
    fn removing_an_expense_clears_its_balances(store: StubStore, clock: TickingClock) {
        let ledger = LedgerService::new(&store, &clock);
        let ctx = as_member(BOB);
        let id = ledger
            .record_expense(ctx, equal_draft(100, ALICE, &[ALICE, BOB]))
            .expect("expense recorded");

        ledger.remove_expense(ctx, id).expect("expense removed");

        let sheet = ledger.member_balances(ctx).expect("balances");
        assert!(sheet.balances.iter().all(|balance| balance.net_balance.is_zero()));
    }

    #[rstest]
    fn accepted_proposal_settles_once_confirmed(store: StubStore, clock: TickingClock) {
        let ledger = LedgerService::new(&store, &clock);
        ledger
            .record_expense(as_member(ALICE), equal_draft(100, ALICE, &[ALICE, BOB]))
            .expect("expense recorded");

        let plan = ledger
            .optimal_settlements(as_member(BOB))
            .expect("plan computed");
        assert_eq!(
            plan.transfers,
            vec![Transfer {
                from: BOB,
                to: ALICE,
                amount: Money::from_i64(50),
            }]
        );

        let settlement = ledger
            .accept_proposal(as_member(BOB), plan.transfers[0], PaymentMethod::Upi)
            .expect("proposal accepted");
        assert_eq!(settlement.status, SettlementStatus::Pending);
        assert_eq!(
            settlement.notes.as_deref(),
            Some("Optimal settlement - Bob to Alice")
        );

        let pending = ledger.member_balances(as_member(ALICE)).expect("balances");
        assert_eq!(net_of(&pending, BOB), Money::from_i64(-50));

        let settled = ledger
            .confirm_settlement(as_member(ALICE), settlement.id)
            .expect("settlement confirmed");
        assert_eq!(net_of(&settled, ALICE), Money::ZERO);
        assert_eq!(net_of(&settled, BOB), Money::ZERO);
        assert_eq!(store.status_of(settlement.id), Some(SettlementStatus::Confirmed));

        let replan = ledger
            .optimal_settlements(as_member(ALICE))
            .expect("plan computed");
        assert!(replan.transfers.is_empty());
        assert!(replan.is_balanced);
    }

    #[rstest]
    fn only_the_payee_may_confirm(store: StubStore, clock: TickingClock) {
        let ledger = LedgerService::new(&store, &clock);
        let request = SettlementRequest {
            from: BOB,
            to: ALICE,
            amount: Money::from_i64(20),
            payment_method: PaymentMethod::Cash,
            notes: None,
            reference_number: Some("REF-1".to_string()),
        };
        let settlement = ledger
            .create_settlement(as_member(BOB), request)
            .expect("settlement created");

        let result = ledger.confirm_settlement(as_member(BOB), settlement.id);

        assert_eq!(
            result,
            Err(LedgerError::StateTransition(
                StateTransitionError::Unauthorized {
                    id: settlement.id,
                    actor: BOB,
                    action: SettlementAction::Confirm,
                }
            ))
        );
        assert_eq!(store.status_of(settlement.id), Some(SettlementStatus::Pending));
    }

    #[rstest]
    fn cancelled_settlements_cannot_be_confirmed(store: StubStore, clock: TickingClock) {
        let ledger = LedgerService::new(&store, &clock);
        let transfer = Transfer {
            from: CAROL,
            to: BOB,
            amount: Money::new(1250, 2),
        };
        let settlement = ledger
            .accept_proposal(as_member(CAROL), transfer, PaymentMethod::Cash)
            .expect("proposal accepted");

        let cancelled = ledger
            .cancel_settlement(as_member(CAROL), settlement.id)
            .expect("settlement cancelled");
        assert_eq!(cancelled.status, SettlementStatus::Cancelled);

        let result = ledger.confirm_settlement(as_member(BOB), settlement.id);
        assert_eq!(
            result,
            Err(LedgerError::StateTransition(
                StateTransitionError::NotPending {
                    id: settlement.id,
                    status: SettlementStatus::Cancelled,
                    action: SettlementAction::Confirm,
                }
            ))
        );
    }

    #[rstest]
    #[case::self_settlement(BOB, BOB, 10, ValidationError::SelfSettlement(BOB))]
    #[case::zero_amount(BOB, ALICE, 0, ValidationError::NonPositiveAmount(Money::ZERO))]
    #[case::unknown_payee(BOB, MemberId(5), 10, ValidationError::UnknownMember(MemberId(5)))]
    fn invalid_settlements_are_not_persisted(
        store: StubStore,
        clock: TickingClock,
        #[case] from: MemberId,
        #[case] to: MemberId,
        #[case] amount: i64,
        #[case] expected: ValidationError,
    ) {
        let ledger = LedgerService::new(&store, &clock);
        let request = SettlementRequest {
            from,
            to,
            amount: Money::from_i64(amount),
            payment_method: PaymentMethod::default(),
            notes: None,
            reference_number: None,
        };

        let result = ledger.create_settlement(as_member(BOB), request);

        assert_eq!(result, Err(LedgerError::Validation(expected)));
        assert!(
            ledger
                .group_settlements(as_member(BOB), None)
                .expect("settlements")
                .is_empty()
        );
    }

    #[rstest]
    fn unknown_settlement_is_not_found(store: StubStore, clock: TickingClock) {
        let ledger = LedgerService::new(&store, &clock);

        assert_eq!(
            ledger.cancel_settlement(as_member(ALICE), SettlementId(77)),
            Err(LedgerError::SettlementNotFound(SettlementId(77)))
        );
    }

    #[rstest]
    fn settlements_are_listed_newest_first(store: StubStore, clock: TickingClock) {
        let ledger = LedgerService::new(&store, &clock);
        let mut created = Vec::new();
        for amount in [5, 10, 15] {
            let request = SettlementRequest {
                from: CAROL,
                to: ALICE,
                amount: Money::from_i64(amount),
                payment_method: PaymentMethod::Venmo,
                notes: None,
                reference_number: None,
            };
            created.push(
                ledger
                    .create_settlement(as_member(CAROL), request)
                    .expect("settlement created")
                    .id,
            );
        }

        let listed: Vec<SettlementId> = ledger
            .group_settlements(as_member(ALICE), None)
            .expect("settlements")
            .into_iter()
            .map(|settlement| settlement.id)
            .collect();

        created.reverse();
        assert_eq!(listed, created);
    }

    #[rstest]
    #[case::pending(SettlementStatus::Pending, 1)]
    #[case::cancelled(SettlementStatus::Cancelled, 0)]
    #[case::confirmed(SettlementStatus::Confirmed, 2)]
    fn settlements_can_be_filtered_by_status(
        store: StubStore,
        clock: TickingClock,
        #[case] status: SettlementStatus,
        #[case] expected_index: usize,
    ) {
        let ledger = LedgerService::new(&store, &clock);
        let ids: Vec<SettlementId> = [5, 10, 15]
            .into_iter()
            .map(|amount| {
                let request = SettlementRequest {
                    from: BOB,
                    to: ALICE,
                    amount: Money::from_i64(amount),
                    payment_method: PaymentMethod::Cash,
                    notes: None,
                    reference_number: None,
                };
                ledger
                    .create_settlement(as_member(BOB), request)
                    .expect("settlement created")
                    .id
            })
            .collect();
        ledger
            .cancel_settlement(as_member(BOB), ids[0])
            .expect("settlement cancelled");
        ledger
            .confirm_settlement(as_member(ALICE), ids[2])
            .expect("settlement confirmed");

        let filtered = ledger
            .group_settlements(as_member(CAROL), Some(status))
            .expect("settlements");

        assert_eq!(
            filtered
                .iter()
                .map(|settlement| settlement.id)
                .collect::<Vec<_>>(),
            vec![ids[expected_index]]
        );
        assert_eq!(
            ledger
                .group_settlements(as_member(CAROL), None)
                .expect("settlements")
                .len(),
            3
        );
    }

    #[rstest]
    fn summary_and_rows_follow_the_ledger(store: StubStore, clock: TickingClock) {
        let ledger = LedgerService::new(&store, &clock);
        let ctx = as_member(CAROL);
        ledger
            .record_expense(ctx, equal_draft(90, CAROL, &[ALICE, BOB, CAROL]))
            .expect("expense recorded");

        let summary = ledger.group_summary(ctx).expect("summary");
        assert_eq!(summary.member_count, 3);
        assert_eq!(summary.total_expenses, Money::from_i64(90));
        assert_eq!(summary.total_outstanding, Money::from_i64(60));
        assert_eq!(summary.top_spender.map(|top| top.name), Some("Carol".to_string()));

        let rows = ledger
            .balance_rows(ctx, BalanceFilter::Owes, BalanceSort::Name)
            .expect("rows");
        assert_eq!(
            rows.iter().map(|row| row.member_id).collect::<Vec<_>>(),
            vec![ALICE, BOB]
        );
        assert!(rows.iter().all(|row| row.status == BalanceStatus::Owes));
    }
}
