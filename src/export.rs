//! Downloads of the expenses the current user can see, as CSV or as a JSON
//! snapshot that also includes users and savings goals.
//!
//! Regular users get their own records. Admins get everybody's.

use std::{collections::HashMap, sync::Arc};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    auth::{AccessScope, CurrentUser},
    datetime::{format_timestamp, format_utc_timestamp},
    models::{Expense, ExpenseId, ExpenseType, PublicUser, SavingsGoal, SavingsGoalId, User, UserId},
    store::{ExpenseFilter, Store},
};

/// The header row of exported CSV files.
pub const EXPORT_CSV_HEADER: [&str; 8] = [
    "username",
    "email",
    "amount",
    "category",
    "description",
    "expense_type",
    "date",
    "created_at",
];

/// The state needed for exporting records.
#[derive(Debug, Clone)]
pub struct ExportState {
    pub store: Arc<dyn Store>,
}

impl FromRef<AppState> for ExportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CsvExpenseRow<'a> {
    username: &'a str,
    email: &'a str,
    amount: f64,
    category: &'a str,
    description: &'a str,
    expense_type: ExpenseType,
    date: String,
    created_at: String,
}

#[derive(Debug, Serialize)]
struct ExpenseRecord {
    id: ExpenseId,
    user_id: UserId,
    amount: f64,
    category: String,
    description: Option<String>,
    expense_type: ExpenseType,
    date: String,
    created_at: String,
}

impl From<Expense> for ExpenseRecord {
    fn from(expense: Expense) -> Self {
        Self {
            id: expense.id,
            user_id: expense.user_id,
            amount: expense.amount,
            category: expense.category,
            description: expense.description,
            expense_type: expense.expense_type,
            date: format_timestamp(expense.date),
            created_at: format_utc_timestamp(expense.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
struct SavingsGoalRecord {
    id: SavingsGoalId,
    user_id: UserId,
    target_amount: f64,
    target_months: u32,
    current_savings: f64,
    created_at: String,
}

impl From<SavingsGoal> for SavingsGoalRecord {
    fn from(goal: SavingsGoal) -> Self {
        Self {
            id: goal.id,
            user_id: goal.user_id,
            target_amount: goal.target_amount,
            target_months: goal.target_months,
            current_savings: goal.current_savings,
            created_at: format_utc_timestamp(goal.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
struct Snapshot {
    exported_at: String,
    users: Vec<PublicUser>,
    expenses: Vec<ExpenseRecord>,
    savings_goals: Vec<SavingsGoalRecord>,
}

/// The users whose records `current_user` may export.
async fn visible_users(store: &dyn Store, current_user: &CurrentUser) -> Result<Vec<User>, Error> {
    match current_user.scope() {
        AccessScope::All => store.get_users().await,
        AccessScope::Owner(_) => Ok(vec![current_user.0.clone()]),
    }
}

fn attachment(content_type: &'static str, file_name: &str) -> [(axum::http::HeaderName, String); 2] {
    [
        (CONTENT_TYPE, content_type.to_owned()),
        (
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        ),
    ]
}

fn write_expenses_csv(expenses: &[Expense], users: &HashMap<UserId, &User>) -> Result<Vec<u8>, Error> {
    let to_error = |error: csv::Error| Error::JSONSerializationError(error.to_string());

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(EXPORT_CSV_HEADER).map_err(to_error)?;

    for expense in expenses {
        let (username, email) = users
            .get(&expense.user_id)
            .map(|user| (user.username.as_str(), user.email.as_str()))
            .unwrap_or_default();

        writer
            .serialize(CsvExpenseRow {
                username,
                email,
                amount: expense.amount,
                category: &expense.category,
                description: expense.description.as_deref().unwrap_or_default(),
                expense_type: expense.expense_type,
                date: format_timestamp(expense.date),
                created_at: format_utc_timestamp(expense.created_at),
            })
            .map_err(to_error)?;
    }

    writer
        .into_inner()
        .map_err(|error| Error::JSONSerializationError(error.to_string()))
}

/// Download the visible expenses as a CSV file, most recent first.
pub async fn export_csv(
    State(state): State<ExportState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Response, Error> {
    let store = state.store.as_ref();
    let users = visible_users(store, &current_user).await?;
    let expenses = store
        .get_expenses(&ExpenseFilter::owned_by(current_user.scope().owner_filter()))
        .await?;

    let users_by_id = users.iter().map(|user| (user.id, user)).collect();
    let body = write_expenses_csv(&expenses, &users_by_id)?;

    tracing::debug!(
        "User {} exported {} expenses as CSV",
        current_user.id(),
        expenses.len()
    );

    Ok((attachment("text/csv; charset=utf-8", "expenses.csv"), body).into_response())
}

/// Download the visible users, expenses and savings goals as one JSON document.
///
/// Password hashes are never included.
pub async fn export_json(
    State(state): State<ExportState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Response, Error> {
    let store = state.store.as_ref();
    let owner = current_user.scope().owner_filter();

    let users = visible_users(store, &current_user).await?;
    let expenses = store.get_expenses(&ExpenseFilter::owned_by(owner)).await?;
    let savings_goals = store.get_savings_goals(owner).await?;

    let snapshot = Snapshot {
        exported_at: format_utc_timestamp(OffsetDateTime::now_utc()),
        users: users.iter().map(PublicUser::from).collect(),
        expenses: expenses.into_iter().map(ExpenseRecord::from).collect(),
        savings_goals: savings_goals
            .into_iter()
            .map(SavingsGoalRecord::from)
            .collect(),
    };

    Ok((
        attachment("application/json", "expense_tracker_export.json"),
        Json(snapshot),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use axum::{
        Extension, Router,
        http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        routing::get,
    };
    use axum_test::TestServer;
    use serde_json::Value;
    use time::macros::datetime;

    use crate::{
        AppState,
        auth::CurrentUser,
        endpoints,
        models::{ExpenseType, NewExpense, NewSavingsGoal, User},
        test_utils::{create_test_user, get_test_state},
    };

    use super::{export_csv, export_json};

    fn get_server(state: &AppState, user: &User) -> TestServer {
        let app = Router::new()
            .route(endpoints::EXPORT_CSV, get(export_csv))
            .route(endpoints::EXPORT_JSON, get(export_json))
            .layer(Extension(CurrentUser(user.clone())))
            .with_state(state.clone());

        TestServer::new(app)
    }

    async fn add_expense(state: &AppState, user: &User, amount: f64, description: Option<&str>) {
        state
            .store
            .create_expense(
                NewExpense::new(
                    user.id,
                    amount,
                    "Food",
                    description,
                    ExpenseType::Unwanted,
                    datetime!(2025-03-05 14:30),
                )
                .unwrap(),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn csv_contains_only_own_expenses() {
        let state = get_test_state();
        let asha = create_test_user(state.store.as_ref(), "asha", false).await;
        let ravi = create_test_user(state.store.as_ref(), "ravi", false).await;
        add_expense(&state, &asha, 12.5, Some("Lunch, with friends")).await;
        add_expense(&state, &ravi, 99.0, None).await;

        let response = get_server(&state, &asha).get(endpoints::EXPORT_CSV).await;

        response.assert_status_ok();
        assert_eq!(response.header(CONTENT_TYPE), "text/csv; charset=utf-8");
        assert!(
            response
                .header(CONTENT_DISPOSITION)
                .to_str()
                .unwrap()
                .starts_with("attachment")
        );

        let text = response.text();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("username,email,amount,category,description,expense_type,date,created_at")
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with(
            "asha,asha@example.com,12.5,Food,\"Lunch, with friends\",unwanted,2025-03-05T14:30:00.000000,"
        ));
        assert_eq!(lines.next(), None);
    }

    #[tokio::test]
    async fn csv_has_header_when_empty() {
        let state = get_test_state();
        let asha = create_test_user(state.store.as_ref(), "asha", false).await;

        let response = get_server(&state, &asha).get(endpoints::EXPORT_CSV).await;

        assert_eq!(
            response.text().trim_end(),
            "username,email,amount,category,description,expense_type,date,created_at"
        );
    }

    #[tokio::test]
    async fn admin_json_snapshot_includes_everybody_without_passwords() {
        let state = get_test_state();
        let admin = create_test_user(state.store.as_ref(), "admin", true).await;
        let asha = create_test_user(state.store.as_ref(), "asha", false).await;
        add_expense(&state, &asha, 20.0, None).await;
        state
            .store
            .create_savings_goal(NewSavingsGoal::with_defaults(asha.id))
            .await
            .unwrap();

        let response = get_server(&state, &admin).get(endpoints::EXPORT_JSON).await;

        response.assert_status_ok();
        let snapshot: Value = response.json();
        assert!(snapshot["exported_at"].is_string());
        assert_eq!(snapshot["users"].as_array().unwrap().len(), 2);
        assert_eq!(snapshot["expenses"].as_array().unwrap().len(), 1);
        assert_eq!(snapshot["expenses"][0]["expense_type"], "unwanted");
        assert_eq!(snapshot["savings_goals"].as_array().unwrap().len(), 1);
        assert!(!response.text().contains("password"));
    }

    #[tokio::test]
    async fn user_json_snapshot_is_scoped_to_self() {
        let state = get_test_state();
        let asha = create_test_user(state.store.as_ref(), "asha", false).await;
        let ravi = create_test_user(state.store.as_ref(), "ravi", false).await;
        add_expense(&state, &ravi, 20.0, None).await;

        let snapshot: Value = get_server(&state, &asha)
            .get(endpoints::EXPORT_JSON)
            .await
            .json();

        let users = snapshot["users"].as_array().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0]["username"], "asha");
        assert_eq!(snapshot["expenses"], Value::Array(vec![]));
    }
}
