//! The endpoint URIs.
//!
//! For endpoints that take a parameter, e.g., '/edit_expense/{expense_id}', use [format_endpoint].

use std::fmt::Display;

/// The root route which redirects to the dashboard.
pub const ROOT: &str = "/";
/// The page for logging in and the target of the log-in form.
pub const LOG_IN_VIEW: &str = "/log_in";
/// The page for creating an account and the target of the registration form.
pub const REGISTER_VIEW: &str = "/register";
/// The route for logging out the current user.
pub const LOG_OUT: &str = "/log_out";
/// The landing page for logged in users.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The page and form target for adding an expense.
pub const ADD_EXPENSE_VIEW: &str = "/add_expense";
/// The paginated, filterable list of expenses.
pub const EXPENSES_VIEW: &str = "/expenses";
/// The page and form target for editing an expense.
pub const EDIT_EXPENSE_VIEW: &str = "/edit_expense/{expense_id}";
/// The route that deletes an expense and redirects back to the list.
pub const DELETE_EXPENSE: &str = "/delete_expense/{expense_id}";
/// The page with the spending charts.
pub const REPORTS_VIEW: &str = "/reports";
/// The JSON chart series for the reports page.
pub const CHART_DATA_API: &str = "/api/chart_data";
/// The JSON list of savings suggestions for the current user.
pub const SAVINGS_SUGGESTIONS_API: &str = "/api/savings_suggestions";
/// The JSON total of a user's expenses.
pub const USER_EXPENSES_API: &str = "/api/user_expenses/{user_id}";
/// The page for editing income and the savings goal.
pub const SETTINGS_VIEW: &str = "/settings";
/// The form target for updating the monthly income.
pub const UPDATE_PROFILE: &str = "/update_profile";
/// The form target for updating the savings goal.
pub const UPDATE_SAVINGS_GOAL: &str = "/update_savings_goal";
/// The form target for deleting the current user's expenses and goals.
pub const CLEAR_DATA: &str = "/clear_data";
/// The route that fills an empty account with demo expenses.
pub const ADD_SAMPLE_DATA: &str = "/add_sample_data";
/// The CSV download of expenses.
pub const EXPORT_CSV: &str = "/export/csv";
/// The JSON snapshot download.
pub const EXPORT_JSON: &str = "/export/json";
/// The page and upload target for importing expenses from CSV.
pub const IMPORT_VIEW: &str = "/import";
/// The admin overview of all users.
pub const ADMIN_VIEW: &str = "/admin";
/// The page and form target for an admin adding a user.
pub const ADMIN_ADD_USER: &str = "/admin/add_user";
/// The page and form target for an admin editing a user.
pub const ADMIN_EDIT_USER: &str = "/admin/edit_user/{user_id}";
/// The form target for an admin deleting a user.
pub const ADMIN_DELETE_USER: &str = "/admin/delete_user/{user_id}";
/// The form target for an admin setting a user's password.
pub const ADMIN_RESET_PASSWORD: &str = "/admin/reset_password/{user_id}";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// The route for static files.
pub const STATIC: &str = "/static";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/admin/edit_user/{user_id}', '{user_id}' is the parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: impl Display) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|end| param_start + end + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
