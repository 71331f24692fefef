//! Expense aggregation for the dashboard, charts and savings advice.
//!
//! Every function here is pure: the caller loads the expenses visible to the
//! current user and passes them in.

use std::collections::BTreeMap;

use serde::Serialize;
use time::Month;

use crate::{
    html::format_rupees,
    models::{Expense, ExpenseType, SavingsGoal},
};

/// The label used by breakdown charts when there is nothing to show.
pub const NO_EXPENSES_LABEL: &str = "No expenses yet";

/// The share of income above which spending is flagged as high.
const HIGH_SPENDING_RATIO: f64 = 0.8;

/// How much of the unwanted spending the advice suggests cutting.
const UNWANTED_REDUCTION: f64 = 0.5;

/// The number of expenses shown on the dashboard.
pub const RECENT_EXPENSE_COUNT: usize = 5;

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// A single chart series: one value per label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub data: Vec<f64>,
}

impl ChartData {
    fn empty() -> Self {
        Self {
            labels: vec![NO_EXPENSES_LABEL.to_owned()],
            data: vec![0.0],
        }
    }

    fn from_totals(totals: BTreeMap<String, f64>) -> Self {
        if totals.is_empty() {
            return Self::empty();
        }

        let (labels, data) = totals.into_iter().unzip();

        Self { labels, data }
    }
}

fn is_in_month(expense: &Expense, month: Month, year: i32) -> bool {
    expense.date.month() == month && expense.date.year() == year
}

/// The sum of the expenses dated in `month` of `year`.
pub fn monthly_total(expenses: &[Expense], month: Month, year: i32) -> f64 {
    expenses
        .iter()
        .filter(|expense| is_in_month(expense, month, year))
        .map(|expense| expense.amount)
        .sum()
}

/// The sum of all `expenses`.
pub fn total(expenses: &[Expense]) -> f64 {
    expenses.iter().map(|expense| expense.amount).sum()
}

/// The total spent per category, labels in alphabetical order.
pub fn by_category(expenses: &[Expense]) -> ChartData {
    let mut totals = BTreeMap::new();

    for expense in expenses {
        *totals.entry(expense.category.clone()).or_insert(0.0) += expense.amount;
    }

    ChartData::from_totals(totals)
}

/// The total spent in each month of `year`, January first.
pub fn by_month(expenses: &[Expense], year: i32) -> ChartData {
    let mut data = vec![0.0; 12];

    for expense in expenses.iter().filter(|expense| expense.date.year() == year) {
        data[usize::from(u8::from(expense.date.month())) - 1] += expense.amount;
    }

    ChartData {
        labels: MONTH_LABELS.iter().map(|label| (*label).to_owned()).collect(),
        data,
    }
}

/// The total spent on wanted and unwanted items. Types without any expenses
/// are left out.
pub fn by_expense_type(expenses: &[Expense]) -> ChartData {
    if expenses.is_empty() {
        return ChartData::empty();
    }

    let (labels, data) = ExpenseType::ALL
        .iter()
        .filter_map(|expense_type| {
            let mut matching = expenses
                .iter()
                .filter(|expense| expense.expense_type == *expense_type)
                .peekable();

            matching.peek()?;

            Some((
                expense_type.label().to_owned(),
                matching.map(|expense| expense.amount).sum::<f64>(),
            ))
        })
        .unzip();

    ChartData { labels, data }
}

/// Advice on how to reach the savings goal, given this month's spending.
///
/// `expenses` should be the user's own expenses. The advice is, in order: how
/// much to cut from unwanted spending, whether the goal is on track, and a
/// warning when spending exceeds 80% of income.
pub fn savings_suggestions(
    expenses: &[Expense],
    monthly_income: f64,
    goal: Option<&SavingsGoal>,
    month: Month,
    year: i32,
) -> Vec<String> {
    let monthly_expenses = monthly_total(expenses, month, year);
    let unwanted_expenses: f64 = expenses
        .iter()
        .filter(|expense| {
            expense.expense_type == ExpenseType::Unwanted && is_in_month(expense, month, year)
        })
        .map(|expense| expense.amount)
        .sum();

    let mut suggestions = Vec::new();

    if unwanted_expenses > 0.0 {
        suggestions.push(format!(
            "You spent {} on unwanted items this month. Try to reduce this by 50% to save {}.",
            format_rupees(unwanted_expenses),
            format_rupees(unwanted_expenses * UNWANTED_REDUCTION)
        ));
    }

    if let Some(goal) = goal {
        let monthly_needed = goal.monthly_needed();
        let current_savings = monthly_income - monthly_expenses;

        if current_savings < monthly_needed {
            suggestions.push(format!(
                "To reach your savings goal of {} in {} months, you need to save {} monthly. \
                You're short by {}.",
                format_rupees(goal.target_amount),
                goal.target_months,
                format_rupees(monthly_needed),
                format_rupees(monthly_needed - current_savings)
            ));
        } else {
            suggestions
                .push("Great! You're on track to meet your savings goal. Keep it up!".to_owned());
        }
    }

    if monthly_expenses > monthly_income * HIGH_SPENDING_RATIO {
        suggestions.push(
            "Your expenses are quite high (>80% of income). \
            Consider reviewing your spending habits."
                .to_owned(),
        );
    }

    suggestions
}

/// The most recent `count` expenses, newest first.
pub fn recent_expenses(expenses: &[Expense], count: usize) -> Vec<Expense> {
    let mut recent = expenses.to_vec();
    recent.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
    recent.truncate(count);

    recent
}

/// The figures shown on the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    pub monthly_expenses: f64,
    pub total_expenses: f64,
    pub monthly_income: f64,
    /// Income minus this month's expenses, negative when overspent.
    pub monthly_savings: f64,
    /// Savings as a percentage of income, zero when there is no income.
    pub savings_percentage: f64,
    pub recent_expenses: Vec<Expense>,
}

impl DashboardSummary {
    /// Summarise `expenses` for `month` of `year`.
    pub fn build(expenses: &[Expense], monthly_income: f64, month: Month, year: i32) -> Self {
        let monthly_expenses = monthly_total(expenses, month, year);
        let monthly_savings = monthly_income - monthly_expenses;
        let savings_percentage = if monthly_income > 0.0 {
            monthly_savings / monthly_income * 100.0
        } else {
            0.0
        };

        Self {
            monthly_expenses,
            total_expenses: total(expenses),
            monthly_income,
            monthly_savings,
            savings_percentage,
            recent_expenses: recent_expenses(expenses, RECENT_EXPENSE_COUNT),
        }
    }
}
