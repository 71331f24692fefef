use time::OffsetDateTime;

use crate::{
    Error,
    models::{SavingsGoalId, UserId},
};

/// The target amount given to new savings goals.
pub const DEFAULT_TARGET_AMOUNT: f64 = 100_000.0;
/// The number of months given to new savings goals.
pub const DEFAULT_TARGET_MONTHS: u32 = 3;

/// An amount a user wants to save within a number of months.
#[derive(Debug, Clone, PartialEq)]
pub struct SavingsGoal {
    pub id: SavingsGoalId,
    pub user_id: UserId,
    pub target_amount: f64,
    /// At least one.
    pub target_months: u32,
    /// Stored and redisplayed as entered, never derived from expenses.
    pub current_savings: f64,
    pub created_at: OffsetDateTime,
}

impl SavingsGoal {
    /// The amount that needs to be saved each month to reach the target.
    pub fn monthly_needed(&self) -> f64 {
        self.target_amount / f64::from(self.target_months.max(1))
    }
}

/// The fields needed to create a [SavingsGoal].
#[derive(Debug, Clone, PartialEq)]
pub struct NewSavingsGoal {
    pub user_id: UserId,
    pub target_amount: f64,
    pub target_months: u32,
    pub current_savings: f64,
}

impl NewSavingsGoal {
    /// A goal with the default target for `user_id`.
    pub fn with_defaults(user_id: UserId) -> Self {
        Self {
            user_id,
            target_amount: DEFAULT_TARGET_AMOUNT,
            target_months: DEFAULT_TARGET_MONTHS,
            current_savings: 0.0,
        }
    }
}

pub fn validate_target_amount(amount: f64) -> Result<f64, Error> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(amount)
    } else {
        Err(Error::InvalidAmount(amount.to_string()))
    }
}

pub fn validate_target_months(months: i64) -> Result<u32, Error> {
    u32::try_from(months)
        .ok()
        .filter(|months| *months >= 1)
        .ok_or(Error::InvalidTargetMonths(months))
}
