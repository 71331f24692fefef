//! The record store: one async interface over users, expenses and savings
//! goals, with a local SQLite backend and a remote document-store backend.
//!
//! The backend is chosen once at startup from [StoreConfig] and shared
//! through the app state as an `Arc<dyn Store>`.

mod remote;
mod sqlite;

use std::{fmt::Debug, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use time::Date;

use crate::{
    Error,
    models::{
        Expense, ExpenseId, ExpenseType, NewExpense, NewSavingsGoal, NewUser, SavingsGoal, User,
        UserId,
    },
};

pub use remote::{RemoteConfig, RemoteStore};
pub use sqlite::SqliteStore;

/// Persistent storage for the application's records.
///
/// Lookups by id return `Ok(None)` for missing records. Updating a missing
/// record returns [Error::NotFound]; deleting one reports that nothing was
/// deleted.
#[async_trait]
pub trait Store: Debug + Send + Sync {
    /// Create a user with a new id and the current time as its creation time.
    async fn create_user(&self, user: NewUser) -> Result<User, Error>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>, Error>;

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, Error>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, Error>;

    /// All users, oldest first.
    async fn get_users(&self) -> Result<Vec<User>, Error>;

    async fn update_user(&self, user: &User) -> Result<(), Error>;

    /// Delete a user along with their expenses and savings goals.
    ///
    /// Returns whether the user existed.
    async fn delete_user(&self, id: UserId) -> Result<bool, Error>;

    async fn count_users(&self) -> Result<usize, Error>;

    async fn create_expense(&self, expense: NewExpense) -> Result<Expense, Error>;

    async fn get_expense(&self, id: ExpenseId) -> Result<Option<Expense>, Error>;

    /// The expenses matching `filter`, in the order it asks for.
    async fn get_expenses(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>, Error>;

    async fn update_expense(&self, expense: &Expense) -> Result<(), Error>;

    /// Returns whether the expense existed.
    async fn delete_expense(&self, id: ExpenseId) -> Result<bool, Error>;

    /// Delete every expense matching `filter`, returning how many were deleted.
    async fn delete_expenses(&self, filter: &ExpenseFilter) -> Result<usize, Error>;

    async fn count_expenses(&self, filter: &ExpenseFilter) -> Result<usize, Error>;

    async fn create_savings_goal(&self, goal: NewSavingsGoal) -> Result<SavingsGoal, Error>;

    /// The user's oldest savings goal.
    async fn get_savings_goal(&self, user_id: UserId) -> Result<Option<SavingsGoal>, Error>;

    /// All savings goals, or only those of `user_id`, oldest first.
    async fn get_savings_goals(&self, user_id: Option<UserId>)
    -> Result<Vec<SavingsGoal>, Error>;

    async fn update_savings_goal(&self, goal: &SavingsGoal) -> Result<(), Error>;

    /// Delete all of a user's savings goals, returning how many were deleted.
    async fn delete_savings_goals(&self, user_id: UserId) -> Result<usize, Error>;
}

/// How to order the expenses returned by [Store::get_expenses].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Most recent expense date first, ties broken by most recently created.
    #[default]
    DateDescending,
    /// Whatever order the backend finds cheapest, for aggregation.
    Unordered,
}

/// Equality and date-range conditions for selecting expenses.
///
/// Fields that are `None` do not restrict the result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseFilter {
    /// Only expenses owned by this user.
    pub owner: Option<UserId>,
    pub category: Option<String>,
    pub expense_type: Option<ExpenseType>,
    /// Only expenses on or after this calendar day.
    pub start_date: Option<Date>,
    /// Only expenses on or before this calendar day.
    pub end_date: Option<Date>,
    pub sort: SortOrder,
}

impl ExpenseFilter {
    /// Every expense of `owner`, or every expense of every user if `owner` is `None`.
    pub fn owned_by(owner: Option<UserId>) -> Self {
        Self {
            owner,
            ..Default::default()
        }
    }

    pub fn unordered(mut self) -> Self {
        self.sort = SortOrder::Unordered;
        self
    }

    /// Whether `expense` satisfies every condition of the filter.
    pub fn matches(&self, expense: &Expense) -> bool {
        let day = expense.date.date();

        self.owner.is_none_or(|owner| expense.user_id == owner)
            && self
                .category
                .as_deref()
                .is_none_or(|category| expense.category == category)
            && self
                .expense_type
                .is_none_or(|expense_type| expense.expense_type == expense_type)
            && self.start_date.is_none_or(|start| day >= start)
            && self.end_date.is_none_or(|end| day <= end)
    }
}

/// Sort `expenses` in place the way `order` asks for.
pub(crate) fn sort_expenses(expenses: &mut [Expense], order: SortOrder) {
    if order == SortOrder::DateDescending {
        expenses.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
    }
}

/// Which backend to connect to at startup.
#[derive(Debug, Clone)]
pub enum StoreConfig {
    /// A SQLite database file, created if it does not exist.
    Sqlite { path: PathBuf },
    /// A remote REST document store.
    Remote(RemoteConfig),
}

/// Connect to the backend described by `config`.
///
/// # Errors
///
/// Returns an error if the SQLite database cannot be opened or initialised,
/// or if the HTTP client for the remote store cannot be built.
pub fn connect(config: StoreConfig) -> Result<Arc<dyn Store>, Error> {
    match config {
        StoreConfig::Sqlite { path } => {
            tracing::info!("Using SQLite store at {}", path.display());
            let connection = rusqlite::Connection::open(&path)?;
            Ok(Arc::new(SqliteStore::new(connection)?))
        }
        StoreConfig::Remote(remote_config) => {
            tracing::info!("Using remote store at {}", remote_config.base_url);
            Ok(Arc::new(RemoteStore::new(remote_config)?))
        }
    }
}
