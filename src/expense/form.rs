//! The form shared by the add and edit expense pages.

use maud::{Markup, html};
use serde::Deserialize;
use time::Date;

use crate::{
    Error,
    datetime::{format_date_for_input, parse_date},
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, loading_spinner,
    },
    models::{
        CATEGORIES, Expense, ExpenseType, normalize_description, parse_amount, validate_category,
    },
};

/// The raw data entered in the expense form.
///
/// Must be read with `axum_extra`'s `Form`, which turns empty strings into
/// `None` for the optional fields.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpenseForm {
    pub amount: String,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub expense_type: Option<String>,
    /// "YYYY-MM-DD". Blank means now.
    #[serde(default)]
    pub date: Option<String>,
}

/// The checked values of an [ExpenseForm].
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseFields {
    pub amount: f64,
    pub category: String,
    pub description: Option<String>,
    pub expense_type: ExpenseType,
    pub date: Option<Date>,
}

impl ExpenseForm {
    /// Check the form values.
    ///
    /// A missing expense type means "wanted".
    ///
    /// # Errors
    ///
    /// Returns the validation error for the first bad field.
    pub fn parse(&self) -> Result<ExpenseFields, Error> {
        let amount = parse_amount(&self.amount)?;
        let category = validate_category(&self.category)?;
        let expense_type = match self.expense_type.as_deref() {
            Some(raw) => raw.parse()?,
            None => ExpenseType::default(),
        };
        let date = self.date.as_deref().map(parse_date).transpose()?;

        Ok(ExpenseFields {
            amount,
            category,
            description: normalize_description(self.description.as_deref()),
            expense_type,
            date,
        })
    }
}

/// What the form inputs are filled in with.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseFormValues {
    pub amount: String,
    pub category: String,
    pub description: String,
    pub expense_type: ExpenseType,
    pub date: String,
}

impl ExpenseFormValues {
    /// An empty form dated `today`.
    pub fn blank(today: Date) -> Self {
        Self {
            amount: String::new(),
            category: String::new(),
            description: String::new(),
            expense_type: ExpenseType::default(),
            date: format_date_for_input(today),
        }
    }

    pub fn from_expense(expense: &Expense) -> Self {
        Self {
            amount: format!("{:.2}", expense.amount),
            category: expense.category.clone(),
            description: expense.description.clone().unwrap_or_default(),
            expense_type: expense.expense_type,
            date: format_date_for_input(expense.date.date()),
        }
    }

    /// Keep what the user typed so they can fix it.
    pub fn from_form(form: &ExpenseForm) -> Self {
        Self {
            amount: form.amount.clone(),
            category: form.category.clone(),
            description: form.description.clone().unwrap_or_default(),
            expense_type: form
                .expense_type
                .as_deref()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or_default(),
            date: form.date.clone().unwrap_or_default(),
        }
    }
}

/// Render the expense form that posts to `endpoint`.
pub fn expense_form(
    endpoint: &str,
    submit_label: &str,
    values: &ExpenseFormValues,
    error_message: Option<&str>,
) -> Markup {
    html! {
        form
            hx-post=(endpoint)
            hx-swap="outerHTML"
            hx-target-error="#alert-container"
            hx-indicator="#indicator"
            class="w-full space-y-4 md:space-y-6"
        {
            div
            {
                label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }

                // w-full needed to ensure input takes the full width when prefilled with a value
                div class="input-wrapper w-full"
                {
                    input
                        name="amount"
                        id="amount"
                        type="number"
                        step="0.01"
                        min="0.01"
                        placeholder="0.00"
                        required
                        autofocus
                        value=(values.amount)
                        class=(FORM_TEXT_INPUT_STYLE);
                }
            }

            div
            {
                label for="category" class=(FORM_LABEL_STYLE) { "Category" }

                input
                    name="category"
                    id="category"
                    type="text"
                    list="category-options"
                    placeholder="Food"
                    required
                    value=(values.category)
                    class=(FORM_TEXT_INPUT_STYLE);

                datalist id="category-options"
                {
                    @for category in CATEGORIES {
                        option value=(category) {}
                    }
                }
            }

            div
            {
                label for="description" class=(FORM_LABEL_STYLE) { "Description" }

                input
                    name="description"
                    id="description"
                    type="text"
                    placeholder="Description"
                    value=(values.description)
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            fieldset class="space-y-2"
            {
                legend class=(FORM_LABEL_STYLE) { "Type" }

                div class="flex gap-6"
                {
                    @for expense_type in ExpenseType::ALL {
                        @let id = format!("expense-type-{}", expense_type.as_str());

                        div class="flex items-center gap-2"
                        {
                            input
                                name="expense_type"
                                id=(id)
                                type="radio"
                                value=(expense_type.as_str())
                                checked[values.expense_type == expense_type];

                            label for=(id) class="text-sm" { (expense_type.label()) }
                        }
                    }
                }
            }

            div
            {
                label for="date" class=(FORM_LABEL_STYLE) { "Date" }

                input
                    name="date"
                    id="date"
                    type="date"
                    value=(values.date)
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            @if let Some(error_message) = error_message {
                p class="text-red-500 text-base" { (error_message) }
            }

            button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
            {
                span id="indicator" class="inline htmx-indicator"
                {
                    (loading_spinner())
                }
                (submit_label)
            }
        }
    }
}
