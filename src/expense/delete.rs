//! Defines the route for deleting an expense.

use axum::{
    Extension,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::PrivateCookieJar;

use crate::{
    Error,
    auth::{CurrentUser, load_authorized_expense},
    endpoints,
    expense::ExpenseState,
    flash::{Flash, set_flash},
    models::ExpenseId,
};

/// Deletes an expense and redirects to the expenses view.
///
/// Only the owner of the expense or an admin may delete it.
pub async fn delete_expense_endpoint(
    State(state): State<ExpenseState>,
    jar: PrivateCookieJar,
    Extension(user): Extension<CurrentUser>,
    Path(expense_id): Path<ExpenseId>,
) -> Response {
    let store = state.store.as_ref();

    let flash = match load_authorized_expense(store, &user, expense_id).await {
        Ok(_) => match store.delete_expense(expense_id).await {
            Ok(_) => {
                tracing::debug!("User {} deleted expense {expense_id}", user.id());
                Flash::success("Expense deleted successfully!")
            }
            Err(error) => return error.into_response(),
        },
        Err(Error::Forbidden) => Flash::error("You can only delete your own expenses"),
        Err(error) => return error.into_response(),
    };

    (
        set_flash(jar, flash),
        Redirect::to(endpoints::EXPENSES_VIEW),
    )
        .into_response()
}
