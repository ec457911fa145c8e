use crate::{
    error::ValidationError,
    model::{CENT, HALF_CENT, MemberId, Money, SplitMethod, SplitShare, round_half_up},
};
use fxhash::FxHashSet;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};

/// One participant of an expense with the value entered for the chosen split method.
///
/// `raw_input` is ignored for `Equal`, read as an amount for `Unequal`, a
/// percentage for `Percentage` and a share count for `Shares`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub member_id: MemberId,
    #[serde(default)]
    pub raw_input: Decimal,
}

impl Participant {
    pub fn new(member_id: MemberId, raw_input: Decimal) -> Self {
        Self {
            member_id,
            raw_input,
        }
    }

    /// Participant of an `Equal` split, which carries no input.
    pub fn equal(member_id: MemberId) -> Self {
        Self::new(member_id, Decimal::ZERO)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitBreakdown {
    pub shares: Vec<SplitShare>,
    /// `amount - Σ owed_amount`; rounding residue is reported here and never absorbed.
    pub remaining_amount: Money,
}

impl SplitBreakdown {
    pub fn total_owed(&self) -> Money {
        self.shares.iter().map(|share| share.owed_amount).sum()
    }
}

/// Largest gap allowed between an expense total and the sum of its stored splits.
///
/// Computed methods round every share independently, so the residue grows with
/// the participant count; explicit amounts must reconcile to the cent.
pub fn residue_tolerance(method: SplitMethod, participant_count: usize) -> Money {
    match method {
        SplitMethod::Unequal => Money::CENT,
        SplitMethod::Equal | SplitMethod::Percentage | SplitMethod::Shares => {
            let bound = HALF_CENT * Decimal::from(participant_count);
            Money::from_decimal(bound.max(CENT))
        }
    }
}

/// Per-member split computation for a single expense.
pub struct SplitCalculator;

impl SplitCalculator {
    /// Computes every participant's owed amount for `amount` under `method`.
    ///
    /// Shares come back in participant order. Fails before computing anything
    /// when the amount is not positive, the participant list is empty or contains
    /// a member twice, or the method-specific inputs do not reconcile.
    pub fn compute(
        &self,
        amount: Money,
        method: SplitMethod,
        participants: &[Participant],
    ) -> Result<SplitBreakdown, ValidationError> {
        if !amount.is_positive() {
            return Err(ValidationError::NonPositiveAmount(amount));
        }
        if participants.is_empty() {
            return Err(ValidationError::NoParticipants);
        }

        let mut seen = FxHashSet::default();
        for participant in participants {
            if !seen.insert(participant.member_id) {
                return Err(ValidationError::DuplicateParticipant(participant.member_id));
            }
        }

        let shares = match method {
            SplitMethod::Equal => Self::equal(amount, participants),
            SplitMethod::Unequal => Self::unequal(amount, participants)?,
            SplitMethod::Percentage => Self::percentage(amount, participants)?,
            SplitMethod::Shares => Self::shares(amount, participants)?,
        };

        let owed: Money = shares.iter().map(|share| share.owed_amount).sum();
        Ok(SplitBreakdown {
            shares,
            remaining_amount: amount - owed,
        })
    }

    fn equal(amount: Money, participants: &[Participant]) -> Vec<SplitShare> {
        let count = Decimal::from(participants.len());
        let owed_amount = Money::from_decimal(round_half_up(amount.as_decimal() / count));
        let owed_percentage = round_half_up(Decimal::ONE_HUNDRED / count);

        participants
            .iter()
            .map(|participant| SplitShare {
                member_id: participant.member_id,
                owed_amount,
                owed_percentage: Some(owed_percentage),
                share_count: None,
            })
            .collect()
    }

    fn unequal(
        amount: Money,
        participants: &[Participant],
    ) -> Result<Vec<SplitShare>, ValidationError> {
        let mut shares = Vec::with_capacity(participants.len());
        for participant in participants {
            let owed_amount = Money::from_decimal(participant.raw_input);
            if owed_amount.is_negative() {
                return Err(ValidationError::NegativeSplitAmount {
                    member: participant.member_id,
                    amount: owed_amount,
                });
            }
            shares.push(SplitShare {
                member_id: participant.member_id,
                owed_amount,
                owed_percentage: None,
                share_count: None,
            });
        }

        let actual: Money = shares.iter().map(|share| share.owed_amount).sum();
        if !actual.approx_eq(amount, Money::CENT) {
            return Err(ValidationError::SplitTotalMismatch {
                expected: amount,
                actual,
            });
        }

        Ok(shares)
    }

    fn percentage(
        amount: Money,
        participants: &[Participant],
    ) -> Result<Vec<SplitShare>, ValidationError> {
        if let Some(negative) = participants
            .iter()
            .find(|participant| participant.raw_input < Decimal::ZERO)
        {
            return Err(ValidationError::NegativePercentage {
                member: negative.member_id,
                percentage: negative.raw_input,
            });
        }

        let total: Decimal = participants.iter().map(|participant| participant.raw_input).sum();
        if (total - Decimal::ONE_HUNDRED).abs() > CENT {
            return Err(ValidationError::PercentageTotalMismatch { total });
        }

        Ok(participants
            .iter()
            .map(|participant| {
                let owed = amount.as_decimal() * participant.raw_input / Decimal::ONE_HUNDRED;
                SplitShare {
                    member_id: participant.member_id,
                    owed_amount: Money::from_decimal(round_half_up(owed)),
                    owed_percentage: Some(participant.raw_input),
                    share_count: None,
                }
            })
            .collect())
    }

    fn shares(
        amount: Money,
        participants: &[Participant],
    ) -> Result<Vec<SplitShare>, ValidationError> {
        let mut counts = Vec::with_capacity(participants.len());
        for participant in participants {
            let raw = participant.raw_input;
            let count = if raw.fract().is_zero() && raw >= Decimal::ONE {
                raw.to_u32()
            } else {
                None
            };
            let Some(count) = count else {
                return Err(ValidationError::InvalidShareCount {
                    member: participant.member_id,
                    shares: raw,
                });
            };
            counts.push((participant.member_id, count));
        }

        let total_shares: u64 = counts.iter().map(|&(_, count)| u64::from(count)).sum();
        if total_shares == 0 {
            return Err(ValidationError::ZeroTotalShares);
        }
        let total = Decimal::from(total_shares);

        Ok(counts
            .into_iter()
            .map(|(member_id, count)| {
                let weight = Decimal::from(count);
                SplitShare {
                    member_id,
                    owed_amount: Money::from_decimal(round_half_up(
                        amount.as_decimal() * weight / total,
                    )),
                    owed_percentage: Some(round_half_up(weight / total * Decimal::ONE_HUNDRED)),
                    share_count: Some(count),
                }
            })
            .collect())
    }
}

/// Free-function form of [`SplitCalculator::compute`].
pub fn compute_splits(
    amount: Money,
    method: SplitMethod,
    participants: &[Participant],
) -> Result<SplitBreakdown, ValidationError> {
    SplitCalculator.compute(amount, method, participants)
}
