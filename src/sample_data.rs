//! Fills an empty account with made-up expenses so that the dashboard and
//! reports have something to show.

use axum::{
    Extension,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::PrivateCookieJar;
use rand::{Rng, seq::SliceRandom};
use time::{Duration, PrimitiveDateTime};

use crate::{
    Error,
    auth::CurrentUser,
    endpoints,
    expense::ExpenseState,
    flash::{Flash, set_flash},
    models::{ExpenseType, NewExpense, UserId},
    store::ExpenseFilter,
    timezone::local_now,
};

const SAMPLE_SIZE: usize = 30;
const MAX_DAYS_BACK: i64 = 90;

const SAMPLE_DESCRIPTIONS: [(&str, [&str; 5]); 6] = [
    ("Food", ["Lunch", "Dinner", "Groceries", "Coffee", "Snacks"]),
    (
        "Transportation",
        ["Bus fare", "Auto", "Fuel", "Parking", "Taxi"],
    ),
    (
        "Entertainment",
        ["Movie", "Concert", "Games", "Books", "Streaming"],
    ),
    (
        "Shopping",
        ["Clothes", "Electronics", "Groceries", "Gifts", "Household"],
    ),
    ("Bills", ["Electricity", "Water", "Internet", "Phone", "Rent"]),
    (
        "Healthcare",
        ["Medicine", "Doctor visit", "Checkup", "Dental", "Pharmacy"],
    ),
];

/// Make [SAMPLE_SIZE] random expenses for `user_id` dated within the
/// [MAX_DAYS_BACK] days before `now`.
///
/// Amounts are between 50 and 500 and roughly 30% of the expenses are
/// unwanted.
fn generate_sample_expenses(
    rng: &mut impl Rng,
    user_id: UserId,
    now: PrimitiveDateTime,
) -> Result<Vec<NewExpense>, Error> {
    (0..SAMPLE_SIZE)
        .map(|_| {
            let days_back = rng.gen_range(0..=MAX_DAYS_BACK);
            let (category, descriptions) = SAMPLE_DESCRIPTIONS
                .choose(rng)
                .copied()
                .unwrap_or(SAMPLE_DESCRIPTIONS[0]);
            let description = descriptions.choose(rng).copied();
            let amount = (rng.gen_range(50.0..500.0_f64) * 100.0).round() / 100.0;
            let expense_type = if rng.gen_bool(0.3) {
                ExpenseType::Unwanted
            } else {
                ExpenseType::Wanted
            };

            NewExpense::new(
                user_id,
                amount,
                category,
                description,
                expense_type,
                now - Duration::days(days_back),
            )
        })
        .collect()
}

/// Add sample expenses for the current user, unless they already have some.
///
/// Always redirects to the dashboard with a message saying what happened.
pub async fn add_sample_data(
    State(state): State<ExpenseState>,
    jar: PrivateCookieJar,
    Extension(user): Extension<CurrentUser>,
) -> Result<Response, Error> {
    let store = state.store.as_ref();
    let own_expenses = ExpenseFilter::owned_by(Some(user.id()));

    if store.count_expenses(&own_expenses).await? > 0 {
        return Ok((
            set_flash(
                jar,
                Flash::error("Sample data already exists or you have expenses."),
            ),
            Redirect::to(endpoints::DASHBOARD_VIEW),
        )
            .into_response());
    }

    let now = local_now(&state.local_timezone)?;
    let expenses = generate_sample_expenses(&mut rand::thread_rng(), user.id(), now)?;

    for expense in expenses {
        store.create_expense(expense).await?;
    }

    tracing::info!("Added {SAMPLE_SIZE} sample expenses for user {}", user.id());

    Ok((
        set_flash(
            jar,
            Flash::success("Sample data added successfully! You can now see charts and analytics."),
        ),
        Redirect::to(endpoints::DASHBOARD_VIEW),
    )
        .into_response())
}
