use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

macro_rules! id_newtype {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(
                Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
            )]
            #[serde(transparent)]
            pub struct $name(pub u64);

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )*
    };
}

id_newtype!(MemberId, GroupId, ExpenseId, SettlementId);

/// Number of decimal places every computed amount is rounded to.
pub const CURRENCY_SCALE: u32 = 2;

/// One currency cent (0.01).
pub const CENT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Half a cent (0.005), the largest error a single two-place rounding can introduce.
pub const HALF_CENT: Decimal = Decimal::from_parts(5, 0, 0, false, 3);

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Self = Self(Decimal::ZERO);
    pub const CENT: Self = Self(CENT);

    pub fn zero() -> Self {
        Self::ZERO
    }

    /// Builds an amount from a mantissa and a scale, e.g. `Money::new(1234, 2)` is 12.34.
    pub fn new(mantissa: i64, scale: u32) -> Self {
        Self(Decimal::new(mantissa, scale))
    }

    pub fn from_i64(value: i64) -> Self {
        Self(Decimal::from(value))
    }

    pub fn from_decimal(value: Decimal) -> Self {
        Self(value)
    }

    pub fn as_decimal(self) -> Decimal {
        self.0
    }

    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn signum(self) -> i64 {
        if self.is_positive() {
            1
        } else if self.is_negative() {
            -1
        } else {
            0
        }
    }

    /// Rounds half away from zero to the currency scale.
    pub fn round_to_cents(self) -> Self {
        Self(round_half_up(self.0))
    }

    /// True when `self` and `other` differ by no more than `tolerance`.
    pub fn approx_eq(self, other: Self, tolerance: Self) -> bool {
        (self - other).abs() <= tolerance
    }
}

/// Two-place rounding shared by amounts and percentages.
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Self)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Mul<Decimal> for Money {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
}

impl Member {
    pub fn new(id: MemberId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SplitMethod {
    Equal,
    Unequal,
    Percentage,
    Shares,
}

impl fmt::Display for SplitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SplitMethod::Equal => "Equal",
            SplitMethod::Unequal => "Unequal",
            SplitMethod::Percentage => "Percentage",
            SplitMethod::Shares => "Shares",
        };
        f.write_str(label)
    }
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum ExpenseCategory {
    Food,
    Transport,
    Accommodation,
    Entertainment,
    Utilities,
    Shopping,
    #[default]
    Other,
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExpenseCategory::Food => "Food",
            ExpenseCategory::Transport => "Transport",
            ExpenseCategory::Accommodation => "Accommodation",
            ExpenseCategory::Entertainment => "Entertainment",
            ExpenseCategory::Utilities => "Utilities",
            ExpenseCategory::Shopping => "Shopping",
            ExpenseCategory::Other => "Other",
        };
        f.write_str(label)
    }
}

/// Per-member share of one expense, as produced by the split calculator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitShare {
    pub member_id: MemberId,
    pub owed_amount: Money,
    pub owed_percentage: Option<Decimal>,
    pub share_count: Option<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub expense_id: ExpenseId,
    pub member_id: MemberId,
    pub owed_amount: Money,
    pub percentage: Option<Decimal>,
    pub share_count: Option<u32>,
}

/// Expense content before the store has assigned an identifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExpense {
    pub description: String,
    pub amount: Money,
    pub date: NaiveDate,
    pub category: ExpenseCategory,
    pub paid_by: MemberId,
    pub split_method: SplitMethod,
    pub notes: Option<String>,
    pub location: Option<String>,
    pub shares: Vec<SplitShare>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub description: String,
    pub amount: Money,
    pub date: NaiveDate,
    pub category: ExpenseCategory,
    pub paid_by: MemberId,
    pub split_method: SplitMethod,
    pub notes: Option<String>,
    pub location: Option<String>,
    pub splits: Vec<Split>,
}

impl Expense {
    /// Materializes a stored expense; every split is re-keyed to `id`.
    pub fn from_new(id: ExpenseId, new: NewExpense) -> Self {
        let splits = new
            .shares
            .into_iter()
            .map(|share| Split {
                expense_id: id,
                member_id: share.member_id,
                owed_amount: share.owed_amount,
                percentage: share.owed_percentage,
                share_count: share.share_count,
            })
            .collect();

        Self {
            id,
            description: new.description,
            amount: new.amount,
            date: new.date,
            category: new.category,
            paid_by: new.paid_by,
            split_method: new.split_method,
            notes: new.notes,
            location: new.location,
            splits,
        }
    }

    pub fn split_total(&self) -> Money {
        self.splits.iter().map(|split| split.owed_amount).sum()
    }

    pub fn participants(&self) -> impl Iterator<Item = MemberId> + '_ {
        self.splits.iter().map(|split| split.member_id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettlementStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl SettlementStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, SettlementStatus::Pending)
    }
}

impl fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SettlementStatus::Pending => "Pending",
            SettlementStatus::Confirmed => "Confirmed",
            SettlementStatus::Cancelled => "Cancelled",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[default]
    Cash,
    BankTransfer,
    Upi,
    PayPal,
    Venmo,
    Other,
}

/// Settlement content before the store has assigned an identifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSettlement {
    pub from: MemberId,
    pub to: MemberId,
    pub amount: Money,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub reference_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: SettlementId,
    pub from: MemberId,
    pub to: MemberId,
    pub amount: Money,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub reference_number: Option<String>,
    pub status: SettlementStatus,
    pub created_at: DateTime<Utc>,
}

impl Settlement {
    /// Every persisted settlement starts out Pending.
    pub fn from_new(id: SettlementId, new: NewSettlement) -> Self {
        Self {
            id,
            from: new.from,
            to: new.to,
            amount: new.amount,
            payment_method: new.payment_method,
            notes: new.notes,
            reference_number: new.reference_number,
            status: SettlementStatus::Pending,
            created_at: new.created_at,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == SettlementStatus::Confirmed
    }
}

/// Net position of one member (positive: is owed money, negative: owes money).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonBalance {
    pub id: MemberId,
    pub balance: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberBalance {
    pub member_id: MemberId,
    pub total_paid: Money,
    pub total_owed: Money,
    pub settlement_adjustment: Money,
    pub net_balance: Money,
}

impl MemberBalance {
    pub fn zeroed(member_id: MemberId) -> Self {
        Self {
            member_id,
            total_paid: Money::ZERO,
            total_owed: Money::ZERO,
            settlement_adjustment: Money::ZERO,
            net_balance: Money::ZERO,
        }
    }

    /// Balance before any confirmed settlement is applied.
    pub fn raw_balance(&self) -> Money {
        self.total_paid - self.total_owed
    }
}

impl From<&MemberBalance> for PersonBalance {
    fn from(balance: &MemberBalance) -> Self {
        Self {
            id: balance.member_id,
            balance: balance.net_balance,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: MemberId,
    pub to: MemberId,
    pub amount: Money,
}

/// Transfers that settle a group, with the totals they were computed from.
///
/// `total_debt` and `total_credit` cover only the parties that were matched.
/// Balances within the settled tolerance are left out of both, so the two
/// totals can differ by leftover cents even though the input summed to zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementPlan {
    pub transfers: Vec<Transfer>,
    pub total_debt: Money,
    pub total_credit: Money,
    /// True when every member was already settled before matching.
    pub is_balanced: bool,
}
