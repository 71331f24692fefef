//! Importing expenses from a CSV file.
//!
//! The file needs a header row naming the columns
//! `username,email,amount,category,description,expense_type,date`. Extra
//! columns, such as `created_at` in exported files, are ignored.
//!
//! Each row is imported on its own. A row that cannot be imported is
//! reported with its line number and skipped.

use std::{collections::HashMap, sync::Arc};

use axum::{
    Extension,
    extract::{FromRef, Multipart, State, multipart::Field},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use serde::Deserialize;

use crate::{
    AppState, Error,
    alert::Alert,
    auth::CurrentUser,
    datetime::parse_timestamp,
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, base},
    models::{
        ExpenseType, NewExpense, NewUser, PasswordHash, UserId, ValidatedPassword, parse_amount,
    },
    navigation::NavBar,
    store::Store,
    user::create_account,
};

/// The password given to users created by an import. They should change it
/// after logging in.
pub const DEFAULT_IMPORT_PASSWORD: &str = "changeme123";

/// The columns a CSV file must have.
const REQUIRED_COLUMNS: [&str; 3] = ["amount", "category", "date"];

/// How many row errors to show in the import summary.
const MAX_REPORTED_ERRORS: usize = 5;

/// The state needed for importing expenses.
#[derive(Debug, Clone)]
pub struct ImportState {
    pub store: Arc<dyn Store>,
}

impl FromRef<AppState> for ImportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
        }
    }
}

fn import_form() -> Markup {
    html! {
        form
            hx-post=(endpoints::IMPORT_VIEW)
            hx-encoding="multipart/form-data"
            hx-target="#alert-container"
            hx-target-error="#alert-container"
            enctype="multipart/form-data"
            class="w-full space-y-4"
        {
            div
            {
                label for="file" class=(FORM_LABEL_STYLE) { "CSV file" }
                input type="file" name="file" id="file" accept=".csv,text/csv" required;
            }

            p class="text-sm text-gray-500 dark:text-gray-400"
            {
                "Columns: username, email, amount, category, description, expense_type, date"
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Import" }
        }
    }
}

/// Display the CSV upload form.
pub async fn get_import_page(Extension(user): Extension<CurrentUser>) -> Response {
    let nav_bar = NavBar::new(endpoints::IMPORT_VIEW, user.is_admin()).into_html();

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "Import Expenses" }
            (import_form())
        }
    };

    base("Import", &[], &content).into_response()
}

/// A CSV row as written in the file.
#[derive(Debug, Deserialize)]
struct CsvExpenseRow {
    #[serde(default)]
    username: String,
    #[serde(default)]
    email: String,
    amount: String,
    category: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    expense_type: String,
    date: String,
}

/// What happened to the rows of an import.
#[derive(Debug, Default, PartialEq)]
struct ImportSummary {
    imported: usize,
    /// The line number and reason for each row that was skipped.
    errors: Vec<(usize, String)>,
}

impl ImportSummary {
    fn into_alert(self) -> Alert {
        let message = format!(
            "Imported {} expenses, {} rows failed",
            self.imported,
            self.errors.len()
        );
        let details = self
            .errors
            .iter()
            .take(MAX_REPORTED_ERRORS)
            .map(|(line, reason)| format!("Line {line}: {reason}"))
            .collect::<Vec<_>>()
            .join("\n");

        if self.errors.is_empty() {
            Alert::SuccessSimple { message }
        } else if self.imported > 0 {
            Alert::Success { message, details }
        } else {
            Alert::Error { message, details }
        }
    }
}

/// Finds or creates the owners of imported rows.
struct OwnerResolver<'a> {
    store: &'a dyn Store,
    importer: &'a CurrentUser,
    known_users: HashMap<String, UserId>,
    default_password_hash: Option<PasswordHash>,
}

impl<'a> OwnerResolver<'a> {
    fn new(store: &'a dyn Store, importer: &'a CurrentUser) -> Self {
        Self {
            store,
            importer,
            known_users: HashMap::new(),
            default_password_hash: None,
        }
    }

    /// The owner of `row`.
    ///
    /// Regular users own every row they import. For admins the row's username
    /// decides, creating the user if they do not exist yet.
    async fn resolve(&mut self, row: &CsvExpenseRow) -> Result<UserId, Error> {
        let username = row.username.trim();

        if !self.importer.is_admin() || username.is_empty() {
            return Ok(self.importer.id());
        }

        if let Some(user_id) = self.known_users.get(username) {
            return Ok(*user_id);
        }

        let user_id = match self.store.get_user_by_username(username).await? {
            Some(user) => user.id,
            None => {
                let new_user = NewUser::new(
                    username,
                    &row.email,
                    self.default_password_hash()?,
                    0.0,
                )?;
                create_account(self.store, new_user).await?.id
            }
        };

        self.known_users.insert(username.to_owned(), user_id);
        Ok(user_id)
    }

    /// The hash of [DEFAULT_IMPORT_PASSWORD], computed at most once per import.
    fn default_password_hash(&mut self) -> Result<PasswordHash, Error> {
        if let Some(hash) = &self.default_password_hash {
            return Ok(hash.clone());
        }

        let hash = PasswordHash::new(
            ValidatedPassword::new_unchecked(DEFAULT_IMPORT_PASSWORD),
            PasswordHash::DEFAULT_COST,
        )?;
        self.default_password_hash = Some(hash.clone());

        Ok(hash)
    }
}

fn parse_row(row: &CsvExpenseRow, owner: UserId) -> Result<NewExpense, Error> {
    let amount = parse_amount(&row.amount)?;
    let expense_type = match row.expense_type.trim() {
        "" => ExpenseType::default(),
        raw => raw.parse()?,
    };

    if row.date.trim().is_empty() {
        return Err(Error::EmptyField("Date"));
    }
    let date = parse_timestamp(&row.date)?;

    NewExpense::new(
        owner,
        amount,
        &row.category,
        Some(&row.description),
        expense_type,
        date,
    )
}

fn check_columns(reader: &mut csv::Reader<&[u8]>) -> Result<(), Error> {
    let headers = reader
        .headers()
        .map_err(|error| Error::InvalidCSV(error.to_string()))?;

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .into_iter()
        .filter(|column| !headers.iter().any(|header| header == *column))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::InvalidCSV(format!(
            "missing columns: {}",
            missing.join(", ")
        )))
    }
}

/// Import every row of `csv_data` for `importer`.
///
/// # Errors
///
/// Returns [Error::InvalidCSV] if the header row is missing required
/// columns. Problems with individual rows are recorded in the summary.
async fn import_csv(
    store: &dyn Store,
    importer: &CurrentUser,
    csv_data: &str,
) -> Result<ImportSummary, Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(csv_data.as_bytes());
    check_columns(&mut reader)?;

    let rows: Vec<(usize, Result<CsvExpenseRow, csv::Error>)> = reader
        .deserialize()
        .enumerate()
        // Line 1 is the header.
        .map(|(index, row)| (index + 2, row))
        .collect();

    let mut owners = OwnerResolver::new(store, importer);
    let mut summary = ImportSummary::default();

    for (line, row) in rows {
        let row = match row {
            Ok(row) => row,
            Err(error) => {
                summary.errors.push((line, error.to_string()));
                continue;
            }
        };

        let result = match owners.resolve(&row).await {
            Ok(owner) => match parse_row(&row, owner) {
                Ok(expense) => store.create_expense(expense).await.map(|_| ()),
                Err(error) => Err(error),
            },
            Err(error) => Err(error),
        };

        match result {
            Ok(()) => summary.imported += 1,
            Err(error) => {
                tracing::debug!("Skipping CSV line {line}: {error}");
                summary.errors.push((line, error.to_string()));
            }
        }
    }

    tracing::info!(
        "User {} imported {} expenses, {} rows failed",
        importer.id(),
        summary.imported,
        summary.errors.len()
    );

    Ok(summary)
}

/// Import the CSV file uploaded in the `file` field and report how it went.
pub async fn import_expenses(
    State(state): State<ImportState>,
    Extension(user): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> Response {
    let csv_data = loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => {
                match read_csv_field(field).await {
                    Ok(data) => break data,
                    Err(error) => return error.into_alert_response(),
                }
            }
            Ok(Some(_)) => continue,
            Ok(None) => {
                return Error::MultipartError("no file was uploaded".to_owned())
                    .into_alert_response();
            }
            Err(error) => {
                tracing::error!("Could not read multipart form: {error}");
                return Error::MultipartError(error.body_text()).into_alert_response();
            }
        }
    };

    match import_csv(state.store.as_ref(), &user, &csv_data).await {
        Ok(summary) => (StatusCode::OK, summary.into_alert().into_html()).into_response(),
        Err(error) => error.into_alert_response(),
    }
}

async fn read_csv_field(field: Field<'_>) -> Result<String, Error> {
    let is_csv_file = field.content_type() == Some("text/csv")
        || field
            .file_name()
            .is_some_and(|name| name.to_ascii_lowercase().ends_with(".csv"));

    if !is_csv_file {
        return Err(Error::NotCSV);
    }

    field.text().await.map_err(|error| {
        tracing::error!("Could not read data from multipart form field: {error}");
        Error::MultipartError("Could not read data from multipart form field.".to_owned())
    })
}
