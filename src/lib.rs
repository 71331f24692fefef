//! Expense Tracker is a web app for recording personal and family expenses,
//! tracking savings goals and reviewing where the money went.
//!
//! This library provides a web server that directly serves HTML pages, plus a
//! small JSON API used by the charts on the reports page.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod admin;
mod aggregation;
mod alert;
mod app_state;
mod auth;
mod dashboard;
mod datetime;
mod endpoints;
mod expense;
mod export;
mod flash;
mod html;
mod import;
mod internal_server_error;
mod logging;
pub mod models;
mod navigation;
mod not_found;
mod pagination;
mod reports;
mod routing;
mod sample_data;
mod settings;
pub mod store;
mod timezone;
mod user;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use models::{PasswordHash, ValidatedPassword};
pub use pagination::PaginationConfig;
pub use routing::build_router;
pub use store::{RemoteConfig, RemoteStore, SqliteStore, Store, StoreConfig};

use crate::{
    alert::Alert, internal_server_error::InternalServerError,
    not_found::get_404_not_found_response,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received ctrl+c signal, shutting down.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, shutting down.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
///
/// The messages of the validation variants are shown to users as-is in form
/// error messages.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The username and password did not match a registered user.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// The auth token is missing from the cookie jar in the request, or it
    /// has expired.
    #[error("no valid auth cookie in the cookie jar")]
    CookieMissing,

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// A required form field or CSV cell was blank.
    #[error("{0} cannot be empty")]
    EmptyField(&'static str),

    /// An email address that cannot be right.
    #[error("\"{0}\" is not a valid email address")]
    InvalidEmail(String),

    /// An expense amount that is not a positive number.
    #[error("Amount must be a positive number, got \"{0}\"")]
    InvalidAmount(String),

    /// A monthly income that is negative or not a number.
    #[error("Monthly income must be zero or a positive number")]
    InvalidIncome,

    /// A savings goal duration of less than one month.
    #[error("Target months must be at least 1, got {0}")]
    InvalidTargetMonths(i64),

    /// A date or timestamp that could not be parsed.
    #[error("\"{0}\" is not a valid date, use the format YYYY-MM-DD")]
    InvalidDate(String),

    /// An expense type other than "wanted" or "unwanted".
    #[error("\"{0}\" is not a valid expense type, use \"wanted\" or \"unwanted\"")]
    InvalidExpenseType(String),

    /// The chart requested from the chart data API does not exist.
    #[error("Invalid chart type")]
    InvalidChartType(String),

    /// Another user already has the username.
    #[error("Username already exists")]
    DuplicateUsername,

    /// Another user already has the email address.
    #[error("Email already exists")]
    DuplicateEmail,

    /// A record referred to a user that does not exist.
    #[error("the user does not exist")]
    UnknownUser,

    /// The current user may not access a record owned by another user.
    #[error("you do not have permission to access this resource")]
    Forbidden,

    /// The current user tried to use an admin-only feature.
    #[error("Access denied. Admin only.")]
    NotAdmin,

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows or when
    /// updating a record that does not exist.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An admin tried to delete their own account.
    #[error("You cannot delete your own account")]
    CannotDeleteSelf,

    /// The multipart form could not be parsed.
    #[error("Could not parse multipart form: {0}")]
    MultipartError(String),

    /// The multipart form did not contain a CSV file.
    #[error("File is not a CSV")]
    NotCSV,

    /// The CSV had issues that prevented it from being parsed at all.
    #[error("Could not parse the CSV file: {0}")]
    InvalidCSV(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// The remote store could not be reached, timed out or had a server
    /// error. The request may succeed if tried again.
    #[error("the remote store is unavailable: {0}")]
    StoreUnavailable(String),

    /// The remote store rejected the request or sent a response that could
    /// not be understood. Retrying will not help.
    #[error("the remote store sent an unexpected response: {0}")]
    StoreResponse(String),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// An error occurred while serializing a struct as JSON or CSV.
    #[error("could not serialize: {0}")]
    JSONSerializationError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("user.username") =>
            {
                Error::DuplicateUsername
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("user.email") =>
            {
                Error::DuplicateEmail
            }
            // Code 787 occurs when a FOREIGN KEY constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, _) if sql_error.extended_code == 787 => {
                Error::UnknownUser
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        if value.is_connect() || value.is_timeout() || value.is_request() {
            Error::StoreUnavailable(value.to_string())
        } else {
            Error::StoreResponse(value.to_string())
        }
    }
}

impl Error {
    /// Whether the operation that caused this error may succeed if retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::StoreUnavailable(_) | Error::DatabaseLockError)
    }

    /// Whether this error was caused by bad user input and should be shown
    /// next to the form that caused it.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidCredentials
                | Error::TooWeak(_)
                | Error::EmptyField(_)
                | Error::InvalidEmail(_)
                | Error::InvalidAmount(_)
                | Error::InvalidIncome
                | Error::InvalidTargetMonths(_)
                | Error::InvalidDate(_)
                | Error::InvalidExpenseType(_)
                | Error::DuplicateUsername
                | Error::DuplicateEmail
                | Error::CannotDeleteSelf
        )
    }

    /// Convert the error into an HTTP response with an HTML alert.
    pub fn into_alert_response(self) -> Response {
        let (status_code, alert) = match self {
            Error::NotCSV | Error::InvalidCSV(_) | Error::MultipartError(_) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Could not import expenses".to_owned(),
                    details: self.to_string(),
                },
            ),
            Error::NotFound => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Record not found".to_owned(),
                    details: "The record could not be found. \
                    Try refreshing the page to see if it has already been deleted."
                        .to_owned(),
                },
            ),
            Error::Forbidden | Error::NotAdmin => (
                StatusCode::FORBIDDEN,
                Alert::ErrorSimple {
                    message: self.to_string(),
                },
            ),
            error if error.is_validation_error() => (
                StatusCode::BAD_REQUEST,
                Alert::ErrorSimple {
                    message: error.to_string(),
                },
            ),
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Alert::Error {
                        message: "Something went wrong".to_owned(),
                        details:
                            "An unexpected error occurred, check the server logs for more details."
                                .to_owned(),
                    },
                )
            }
        };

        (status_code, alert.into_html()).into_response()
    }

    /// Convert the error into a JSON response for the API routes.
    fn into_json_response(self) -> Response {
        let (status, message) = match &self {
            Error::NotFound => (StatusCode::NOT_FOUND, "Not found".to_owned()),
            Error::Forbidden | Error::NotAdmin => {
                (StatusCode::FORBIDDEN, "Unauthorized".to_owned())
            }
            error if error.is_validation_error() => (StatusCode::BAD_REQUEST, error.to_string()),
            Error::InvalidChartType(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => get_404_not_found_response(),
            Error::Forbidden | Error::NotAdmin => {
                tracing::warn!("Access denied: {}", self);
                (
                    StatusCode::FORBIDDEN,
                    InternalServerError {
                        description: "Access Denied",
                        fix: "You do not have permission to view this page.",
                    }
                    .into_html(),
                )
                    .into_response()
            }
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            Error::StoreUnavailable(reason) => {
                tracing::error!("The record store is unavailable: {reason}");
                InternalServerError {
                    description: "Storage Unavailable",
                    fix: "The record store could not be reached. Try again in a few moments.",
                }
                .into_response()
            }
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

#[cfg(test)]
mod error_tests {
    use axum::http::StatusCode;
    use rusqlite::Connection;

    use crate::Error;

    fn unique_violation(column: &str) -> rusqlite::Error {
        let connection = Connection::open_in_memory().unwrap();
        connection
            .execute_batch(&format!(
                "CREATE TABLE user (username TEXT UNIQUE, email TEXT UNIQUE);
                INSERT INTO user ({column}) VALUES ('a');"
            ))
            .unwrap();

        connection
            .execute(&format!("INSERT INTO user ({column}) VALUES ('a')"), ())
            .unwrap_err()
    }

    #[test]
    fn maps_unique_username_violation() {
        assert_eq!(
            Error::from(unique_violation("username")),
            Error::DuplicateUsername
        );
    }

    #[test]
    fn maps_unique_email_violation() {
        assert_eq!(Error::from(unique_violation("email")), Error::DuplicateEmail);
    }

    #[test]
    fn maps_no_rows_to_not_found() {
        assert_eq!(
            Error::from(rusqlite::Error::QueryReturnedNoRows),
            Error::NotFound
        );
    }

    #[test]
    fn only_transient_errors_are_retryable() {
        assert!(Error::StoreUnavailable("timed out".to_owned()).is_retryable());
        assert!(Error::DatabaseLockError.is_retryable());
        assert!(!Error::StoreResponse("bad JSON".to_owned()).is_retryable());
        assert!(!Error::NotFound.is_retryable());
    }

    #[test]
    fn json_response_for_forbidden_is_403() {
        let response = Error::Forbidden.into_json_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn json_response_for_bad_chart_type_is_400() {
        let response = Error::InvalidChartType("pie".to_owned()).into_json_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
