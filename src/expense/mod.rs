//! Adding, listing, editing and deleting expenses.

mod create;
mod delete;
mod edit;
mod form;
mod list;

use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use crate::{AppState, pagination::PaginationConfig, store::Store};

pub use create::{create_expense_endpoint, get_add_expense_page};
pub use delete::delete_expense_endpoint;
pub use edit::{edit_expense_endpoint, get_edit_expense_page};
pub use list::get_expenses_page;

/// The state needed by the expense pages and endpoints.
#[derive(Debug, Clone)]
pub struct ExpenseState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,
    pub pagination_config: PaginationConfig,
    pub store: Arc<dyn Store>,
}

impl FromRef<AppState> for ExpenseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            local_timezone: state.local_timezone.clone(),
            pagination_config: state.pagination_config.clone(),
            store: state.store.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<ExpenseState> for Key {
    fn from_ref(state: &ExpenseState) -> Self {
        state.cookie_key.clone()
    }
}
