use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::{
    Error,
    datetime::truncate_to_microseconds,
    models::{ExpenseId, UserId},
};

/// The categories suggested in the expense forms.
///
/// Categories are free-form, these are only the defaults offered to users.
pub const CATEGORIES: [&str; 8] = [
    "Food",
    "Transportation",
    "Entertainment",
    "Shopping",
    "Bills",
    "Healthcare",
    "Education",
    "Other",
];

/// Whether an expense was a necessity or discretionary spending.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseType {
    #[default]
    Wanted,
    Unwanted,
}

impl ExpenseType {
    /// All expense types in display order.
    pub const ALL: [ExpenseType; 2] = [ExpenseType::Wanted, ExpenseType::Unwanted];

    /// The lowercase name used in storage, forms and query strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseType::Wanted => "wanted",
            ExpenseType::Unwanted => "unwanted",
        }
    }

    /// The capitalised name shown to users.
    pub fn label(&self) -> &'static str {
        match self {
            ExpenseType::Wanted => "Wanted",
            ExpenseType::Unwanted => "Unwanted",
        }
    }
}

impl Display for ExpenseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpenseType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wanted" => Ok(ExpenseType::Wanted),
            "unwanted" => Ok(ExpenseType::Unwanted),
            _ => Err(Error::InvalidExpenseType(s.to_owned())),
        }
    }
}

/// A single spending record.
#[derive(Debug, Clone, PartialEq)]
pub struct Expense {
    pub id: ExpenseId,
    /// The user that owns this expense.
    pub user_id: UserId,
    /// Always positive.
    pub amount: f64,
    pub category: String,
    pub description: Option<String>,
    pub expense_type: ExpenseType,
    /// When the money was spent, as entered by the user.
    pub date: PrimitiveDateTime,
    /// When the record was created (UTC).
    pub created_at: OffsetDateTime,
}

/// The fields needed to create an [Expense].
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub user_id: UserId,
    pub amount: f64,
    pub category: String,
    pub description: Option<String>,
    pub expense_type: ExpenseType,
    pub date: PrimitiveDateTime,
}

impl NewExpense {
    /// Validate the expense fields.
    ///
    /// Blank descriptions are stored as `None`.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidAmount] if `amount` is not a positive number or
    /// [Error::EmptyField] if `category` is blank.
    pub fn new(
        user_id: UserId,
        amount: f64,
        category: &str,
        description: Option<&str>,
        expense_type: ExpenseType,
        date: PrimitiveDateTime,
    ) -> Result<Self, Error> {
        Ok(Self {
            user_id,
            amount: validate_amount(amount)?,
            category: validate_category(category)?,
            description: normalize_description(description),
            expense_type,
            date: truncate_to_microseconds(date),
        })
    }
}

pub fn validate_amount(amount: f64) -> Result<f64, Error> {
    if amount.is_finite() && amount > 0.0 {
        Ok(amount)
    } else {
        Err(Error::InvalidAmount(amount.to_string()))
    }
}

/// Parse an amount typed into a form or CSV cell.
pub fn parse_amount(raw: &str) -> Result<f64, Error> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| Error::InvalidAmount(raw.to_owned()))
        .and_then(validate_amount)
}

pub fn validate_category(raw: &str) -> Result<String, Error> {
    let category = raw.trim();

    if category.is_empty() {
        Err(Error::EmptyField("Category"))
    } else {
        Ok(category.to_owned())
    }
}

pub fn normalize_description(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|description| !description.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use crate::{
        Error,
        models::{ExpenseType, UserId},
    };

    use super::{NewExpense, parse_amount};

    #[test]
    fn expense_type_parses_any_case() {
        assert_eq!("Unwanted".parse::<ExpenseType>(), Ok(ExpenseType::Unwanted));
        assert_eq!(" wanted ".parse::<ExpenseType>(), Ok(ExpenseType::Wanted));
        assert_eq!(
            "needed".parse::<ExpenseType>(),
            Err(Error::InvalidExpenseType("needed".to_owned()))
        );
    }

    #[test]
    fn expense_type_defaults_to_wanted() {
        assert_eq!(ExpenseType::default(), ExpenseType::Wanted);
    }

    #[test]
    fn parse_amount_rejects_non_positive_and_non_numeric() {
        assert_eq!(parse_amount("12.50"), Ok(12.5));
        assert!(matches!(parse_amount("0"), Err(Error::InvalidAmount(_))));
        assert!(matches!(parse_amount("-3"), Err(Error::InvalidAmount(_))));
        assert!(matches!(parse_amount("abc"), Err(Error::InvalidAmount(_))));
        assert!(matches!(parse_amount("NaN"), Err(Error::InvalidAmount(_))));
    }

    #[test]
    fn blank_description_is_none() {
        let expense = NewExpense::new(
            UserId::new(),
            10.0,
            "Food",
            Some("   "),
            ExpenseType::Wanted,
            datetime!(2025-03-05 12:00),
        )
        .unwrap();

        assert_eq!(expense.description, None);
    }

    #[test]
    fn blank_category_is_rejected() {
        let result = NewExpense::new(
            UserId::new(),
            10.0,
            " ",
            None,
            ExpenseType::Wanted,
            datetime!(2025-03-05 12:00),
        );

        assert_eq!(result, Err(Error::EmptyField("Category")));
    }
}
