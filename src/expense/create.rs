//! Defines the page and endpoint for adding an expense.

use axum::{
    Extension,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of crashing like axum::Form.
use axum_extra::extract::{Form, PrivateCookieJar};
use axum_htmx::HxRedirect;
use maud::{Markup, html};

use crate::{
    Error,
    auth::CurrentUser,
    endpoints,
    expense::{
        ExpenseState,
        form::{ExpenseForm, ExpenseFormValues, expense_form},
    },
    flash::{Flash, flash_view, set_flash, take_flash},
    html::{FORM_CONTAINER_STYLE, base, rupee_input_styles},
    models::NewExpense,
    navigation::NavBar,
    timezone::local_now,
};

fn add_expense_view(user: &CurrentUser, flash: Option<Flash>, values: &ExpenseFormValues) -> Markup {
    let nav_bar = NavBar::new(endpoints::ADD_EXPENSE_VIEW, user.is_admin()).into_html();

    let content = html! {
        (nav_bar)
        (flash_view(flash))

        div class=(FORM_CONTAINER_STYLE)
        {
            h2 class="text-xl font-bold mb-4" { "Add Expense" }

            (expense_form(endpoints::ADD_EXPENSE_VIEW, "Add Expense", values, None))
        }
    };

    base("Add Expense", &[rupee_input_styles()], &content)
}

/// Renders the page for adding an expense, dated today in the local timezone.
pub async fn get_add_expense_page(
    State(state): State<ExpenseState>,
    jar: PrivateCookieJar,
    Extension(user): Extension<CurrentUser>,
) -> Result<Response, Error> {
    let today = local_now(&state.local_timezone)?.date();
    let (jar, flash) = take_flash(jar);

    Ok((
        jar,
        add_expense_view(&user, flash, &ExpenseFormValues::blank(today)),
    )
        .into_response())
}

/// A route handler for adding an expense owned by the current user,
/// redirects to the expenses view on success.
///
/// A blank date means now. A date without a time is read as midnight.
pub async fn create_expense_endpoint(
    State(state): State<ExpenseState>,
    jar: PrivateCookieJar,
    Extension(user): Extension<CurrentUser>,
    Form(form): Form<ExpenseForm>,
) -> Response {
    let render_error = |error: Error| {
        expense_form(
            endpoints::ADD_EXPENSE_VIEW,
            "Add Expense",
            &ExpenseFormValues::from_form(&form),
            Some(&error.to_string()),
        )
        .into_response()
    };

    let fields = match form.parse() {
        Ok(fields) => fields,
        Err(error) => return render_error(error),
    };

    let date = match fields.date {
        Some(date) => date.midnight(),
        None => match local_now(&state.local_timezone) {
            Ok(now) => now,
            Err(error) => return error.into_alert_response(),
        },
    };

    let new_expense = match NewExpense::new(
        user.id(),
        fields.amount,
        &fields.category,
        fields.description.as_deref(),
        fields.expense_type,
        date,
    ) {
        Ok(new_expense) => new_expense,
        Err(error) => return render_error(error),
    };

    match state.store.create_expense(new_expense).await {
        Ok(expense) => {
            tracing::debug!("User {} added expense {}", user.id(), expense.id);
            (
                set_flash(jar, Flash::success("Expense added successfully!")),
                HxRedirect(endpoints::EXPENSES_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error) => {
            tracing::error!("could not create expense: {error}");
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{Extension, Router, http::StatusCode, routing::get};
    use axum_test::TestServer;
    use scraper::Html;
    use time::macros::datetime;

    use crate::{
        AppState,
        auth::CurrentUser,
        endpoints,
        flash::COOKIE_FLASH,
        models::{ExpenseType, User},
        store::ExpenseFilter,
        test_utils::{
            assert_form_input, assert_hx_endpoint, assert_valid_html, create_test_user,
            get_test_state, must_get_form,
        },
    };

    use super::{create_expense_endpoint, get_add_expense_page};

    async fn get_server() -> (TestServer, AppState, User) {
        let state = get_test_state();
        let user = create_test_user(state.store.as_ref(), "asha", false).await;
        let app = Router::new()
            .route(
                endpoints::ADD_EXPENSE_VIEW,
                get(get_add_expense_page).post(create_expense_endpoint),
            )
            .layer(Extension(CurrentUser(user.clone())))
            .with_state(state.clone());

        (
            TestServer::new(app),
            state,
            user,
        )
    }

    #[tokio::test]
    async fn page_displays_form() {
        let (server, _, _) = get_server().await;

        let response = server.get(endpoints::ADD_EXPENSE_VIEW).await;

        response.assert_status_ok();
        let document = Html::parse_document(&response.text());
        assert_valid_html(&document);
        let form = must_get_form(&document);
        assert_hx_endpoint(&form, endpoints::ADD_EXPENSE_VIEW, "hx-post");
        assert_form_input(&form, "amount", "number");
        assert_form_input(&form, "category", "text");
    }

    #[tokio::test]
    async fn can_create_expense() {
        let (server, state, user) = get_server().await;

        let response = server
            .post(endpoints::ADD_EXPENSE_VIEW)
            .form(&[
                ("amount", "250.50"),
                ("category", "Food"),
                ("description", "Groceries"),
                ("expense_type", "unwanted"),
                ("date", "2025-03-05"),
            ])
            .await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("hx-redirect"), endpoints::EXPENSES_VIEW);
        assert!(response.maybe_cookie(COOKIE_FLASH).is_some());

        let expenses = state
            .store
            .get_expenses(&ExpenseFilter::owned_by(Some(user.id)))
            .await
            .unwrap();
        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0].amount, 250.5);
        assert_eq!(expenses[0].description.as_deref(), Some("Groceries"));
        assert_eq!(expenses[0].expense_type, ExpenseType::Unwanted);
        assert_eq!(expenses[0].date, datetime!(2025-03-05 00:00));
    }

    #[tokio::test]
    async fn blank_description_and_date_are_accepted() {
        let (server, state, user) = get_server().await;

        server
            .post(endpoints::ADD_EXPENSE_VIEW)
            .form(&[
                ("amount", "10"),
                ("category", "Bills"),
                ("description", ""),
                ("expense_type", "wanted"),
                ("date", ""),
            ])
            .await
            .assert_status(StatusCode::SEE_OTHER);

        let expenses = state
            .store
            .get_expenses(&ExpenseFilter::owned_by(Some(user.id)))
            .await
            .unwrap();
        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0].description, None);
    }

    #[tokio::test]
    async fn invalid_amount_shows_error() {
        let (server, state, _) = get_server().await;

        let response = server
            .post(endpoints::ADD_EXPENSE_VIEW)
            .form(&[("amount", "0"), ("category", "Food")])
            .await;

        response.assert_status_ok();
        assert!(response.text().contains("Amount must be a positive number"));
        assert_eq!(
            state.store.count_expenses(&ExpenseFilter::default()).await,
            Ok(0)
        );
    }
}
