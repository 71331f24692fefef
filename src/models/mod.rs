//! This module defines the domain data types.

mod expense;
mod id;
mod password;
mod savings_goal;
mod user;

pub use expense::{
    CATEGORIES, Expense, ExpenseType, NewExpense, normalize_description, parse_amount,
    validate_amount, validate_category,
};
pub use id::{ExpenseId, SavingsGoalId, UserId};
pub use password::{PasswordHash, ValidatedPassword};
pub use savings_goal::{
    DEFAULT_TARGET_AMOUNT, DEFAULT_TARGET_MONTHS, NewSavingsGoal, SavingsGoal,
    validate_target_amount, validate_target_months,
};
pub use user::{NewUser, PublicUser, User, validate_email, validate_income, validate_username};
