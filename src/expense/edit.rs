//! Defines the page and endpoint for editing an expense.

use axum::{
    Extension,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{Form, PrivateCookieJar};
use axum_htmx::HxRedirect;
use maud::{Markup, html};

use crate::{
    Error,
    auth::{CurrentUser, load_authorized_expense},
    endpoints::{self, format_endpoint},
    expense::{
        ExpenseState,
        form::{ExpenseForm, ExpenseFormValues, expense_form},
    },
    flash::{Flash, flash_view, set_flash, take_flash},
    html::{FORM_CONTAINER_STYLE, base, rupee_input_styles},
    models::{Expense, ExpenseId},
    navigation::NavBar,
};

const FORBIDDEN_MESSAGE: &str = "You can only edit your own expenses";

fn edit_expense_view(
    user: &CurrentUser,
    flash: Option<Flash>,
    expense_id: ExpenseId,
    values: &ExpenseFormValues,
) -> Markup {
    let nav_bar = NavBar::new(endpoints::EDIT_EXPENSE_VIEW, user.is_admin()).into_html();
    let endpoint = format_endpoint(endpoints::EDIT_EXPENSE_VIEW, expense_id);

    let content = html! {
        (nav_bar)
        (flash_view(flash))

        div class=(FORM_CONTAINER_STYLE)
        {
            h2 class="text-xl font-bold mb-4" { "Edit Expense" }

            (expense_form(&endpoint, "Update Expense", values, None))
        }
    };

    base("Edit Expense", &[rupee_input_styles()], &content)
}

/// Renders the page for editing an expense.
///
/// Users who do not own the expense, and are not admins, are sent back to
/// the expenses view with an error message.
pub async fn get_edit_expense_page(
    State(state): State<ExpenseState>,
    jar: PrivateCookieJar,
    Extension(user): Extension<CurrentUser>,
    Path(expense_id): Path<ExpenseId>,
) -> Response {
    match load_authorized_expense(state.store.as_ref(), &user, expense_id).await {
        Ok(expense) => {
            let (jar, flash) = take_flash(jar);
            let values = ExpenseFormValues::from_expense(&expense);

            (jar, edit_expense_view(&user, flash, expense_id, &values)).into_response()
        }
        Err(Error::Forbidden) => (
            set_flash(jar, Flash::error(FORBIDDEN_MESSAGE)),
            Redirect::to(endpoints::EXPENSES_VIEW),
        )
            .into_response(),
        Err(error) => error.into_response(),
    }
}

/// A route handler for updating an expense, redirects to the expenses view on success.
///
/// The time of day is kept when the date is not changed.
pub async fn edit_expense_endpoint(
    State(state): State<ExpenseState>,
    jar: PrivateCookieJar,
    Extension(user): Extension<CurrentUser>,
    Path(expense_id): Path<ExpenseId>,
    Form(form): Form<ExpenseForm>,
) -> Response {
    let expense = match load_authorized_expense(state.store.as_ref(), &user, expense_id).await {
        Ok(expense) => expense,
        Err(Error::Forbidden) => {
            return (
                set_flash(jar, Flash::error(FORBIDDEN_MESSAGE)),
                HxRedirect(endpoints::EXPENSES_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response();
        }
        Err(error) => return error.into_alert_response(),
    };

    let fields = match form.parse() {
        Ok(fields) => fields,
        Err(error) => {
            return expense_form(
                &format_endpoint(endpoints::EDIT_EXPENSE_VIEW, expense_id),
                "Update Expense",
                &ExpenseFormValues::from_form(&form),
                Some(&error.to_string()),
            )
            .into_response();
        }
    };

    let date = match fields.date {
        Some(date) if date == expense.date.date() => expense.date,
        Some(date) => date.midnight(),
        None => expense.date,
    };

    let updated = Expense {
        amount: fields.amount,
        category: fields.category,
        description: fields.description,
        expense_type: fields.expense_type,
        date,
        ..expense
    };

    match state.store.update_expense(&updated).await {
        Ok(()) => (
            set_flash(jar, Flash::success("Expense updated successfully!")),
            HxRedirect(endpoints::EXPENSES_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("could not update expense {expense_id}: {error}");
            error.into_alert_response()
        }
    }
}
