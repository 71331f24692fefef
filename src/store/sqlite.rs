//! The SQLite backend for the record store.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, Row, ToSql, params_from_iter, types::Type};
use time::OffsetDateTime;

use crate::{
    Error,
    datetime::{
        format_date_for_input, format_timestamp, format_utc_timestamp, parse_timestamp, utc_now,
    },
    models::{
        Expense, ExpenseId, NewExpense, NewSavingsGoal, NewUser, PasswordHash, SavingsGoal,
        SavingsGoalId, User, UserId,
    },
    store::{ExpenseFilter, SortOrder, Store},
};

/// Stores records in a SQLite database.
///
/// The connection is shared behind a mutex that is never held across an
/// await point.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Create the tables if they do not exist and wrap `connection`.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn new(connection: Connection) -> Result<Self, Error> {
        initialize(&connection)?;

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// A store backed by a fresh in-memory database.
    pub fn open_in_memory() -> Result<Self, Error> {
        Self::new(Connection::open_in_memory()?)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)
    }
}

/// Create the tables and indexes used by [SqliteStore].
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS user (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL,
            is_admin INTEGER NOT NULL DEFAULT 0,
            monthly_income REAL NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS expense (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES user(id) ON DELETE CASCADE,
            amount REAL NOT NULL CHECK (amount > 0),
            category TEXT NOT NULL,
            description TEXT,
            expense_type TEXT NOT NULL DEFAULT 'wanted'
                CHECK (expense_type IN ('wanted', 'unwanted')),
            date TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_expense_user_date ON expense(user_id, date);

        CREATE TABLE IF NOT EXISTS savings_goal (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES user(id) ON DELETE CASCADE,
            target_amount REAL NOT NULL DEFAULT 100000,
            target_months INTEGER NOT NULL DEFAULT 3 CHECK (target_months >= 1),
            current_savings REAL NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );",
    )
}

/// Convert a stored timestamp, reporting failures as a column conversion error.
fn get_timestamp(row: &Row, index: usize) -> Result<time::PrimitiveDateTime, rusqlite::Error> {
    let raw: String = row.get(index)?;

    parse_timestamp(&raw)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error)))
}

fn get_utc_timestamp(row: &Row, index: usize) -> Result<OffsetDateTime, rusqlite::Error> {
    get_timestamp(row, index).map(time::PrimitiveDateTime::assume_utc)
}

const USER_COLUMNS: &str = "id, username, email, password, is_admin, monthly_income, created_at";

fn map_row_to_user(row: &Row) -> Result<User, rusqlite::Error> {
    let password: String = row.get(3)?;

    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: PasswordHash::new_unchecked(&password),
        is_admin: row.get(4)?,
        monthly_income: row.get(5)?,
        created_at: get_utc_timestamp(row, 6)?,
    })
}

const EXPENSE_COLUMNS: &str =
    "id, user_id, amount, category, description, expense_type, date, created_at";

fn map_row_to_expense(row: &Row) -> Result<Expense, rusqlite::Error> {
    let expense_type: String = row.get(5)?;
    let expense_type = expense_type
        .parse()
        .map_err(|error: Error| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(error)))?;

    Ok(Expense {
        id: row.get(0)?,
        user_id: row.get(1)?,
        amount: row.get(2)?,
        category: row.get(3)?,
        description: row.get(4)?,
        expense_type,
        date: get_timestamp(row, 6)?,
        created_at: get_utc_timestamp(row, 7)?,
    })
}

const SAVINGS_GOAL_COLUMNS: &str =
    "id, user_id, target_amount, target_months, current_savings, created_at";

fn map_row_to_savings_goal(row: &Row) -> Result<SavingsGoal, rusqlite::Error> {
    Ok(SavingsGoal {
        id: row.get(0)?,
        user_id: row.get(1)?,
        target_amount: row.get(2)?,
        target_months: row.get(3)?,
        current_savings: row.get(4)?,
        created_at: get_utc_timestamp(row, 5)?,
    })
}

/// Build the WHERE clause and parameters for `filter`.
fn where_clause(filter: &ExpenseFilter) -> (String, Vec<Box<dyn ToSql>>) {
    let mut conditions: Vec<&str> = Vec::new();
    let mut params: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(owner) = filter.owner {
        conditions.push("user_id = ?");
        params.push(Box::new(owner));
    }

    if let Some(category) = &filter.category {
        conditions.push("category = ?");
        params.push(Box::new(category.clone()));
    }

    if let Some(expense_type) = filter.expense_type {
        conditions.push("expense_type = ?");
        params.push(Box::new(expense_type.as_str()));
    }

    if let Some(start_date) = filter.start_date {
        conditions.push("substr(date, 1, 10) >= ?");
        params.push(Box::new(format_date_for_input(start_date)));
    }

    if let Some(end_date) = filter.end_date {
        conditions.push("substr(date, 1, 10) <= ?");
        params.push(Box::new(format_date_for_input(end_date)));
    }

    if conditions.is_empty() {
        (String::new(), params)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), params)
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_user(&self, user: NewUser) -> Result<User, Error> {
        let user = User {
            id: UserId::new(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            is_admin: user.is_admin,
            monthly_income: user.monthly_income,
            created_at: utc_now(),
        };

        self.lock()?.execute(
            "INSERT INTO user (id, username, email, password, is_admin, monthly_income, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            (
                user.id,
                &user.username,
                &user.email,
                user.password_hash.as_str(),
                user.is_admin,
                user.monthly_income,
                format_utc_timestamp(user.created_at),
            ),
        )?;

        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, Error> {
        let user = self
            .lock()?
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM user WHERE id = ?1"),
                [id],
                map_row_to_user,
            )
            .optional()?;

        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        let user = self
            .lock()?
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM user WHERE username = ?1"),
                [username],
                map_row_to_user,
            )
            .optional()?;

        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        let user = self
            .lock()?
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM user WHERE email = ?1"),
                [email],
                map_row_to_user,
            )
            .optional()?;

        Ok(user)
    }

    async fn get_users(&self) -> Result<Vec<User>, Error> {
        let connection = self.lock()?;
        let mut statement = connection.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM user ORDER BY created_at ASC, rowid ASC"
        ))?;

        statement
            .query_map([], map_row_to_user)?
            .map(|user| user.map_err(Error::from))
            .collect()
    }

    async fn update_user(&self, user: &User) -> Result<(), Error> {
        let rows_affected = self.lock()?.execute(
            "UPDATE user
            SET username = ?1, email = ?2, password = ?3, is_admin = ?4, monthly_income = ?5
            WHERE id = ?6",
            (
                &user.username,
                &user.email,
                user.password_hash.as_str(),
                user.is_admin,
                user.monthly_income,
                user.id,
            ),
        )?;

        if rows_affected == 0 {
            return Err(Error::NotFound);
        }

        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, Error> {
        let mut connection = self.lock()?;
        let transaction = connection.transaction()?;

        transaction.execute("DELETE FROM expense WHERE user_id = ?1", [id])?;
        transaction.execute("DELETE FROM savings_goal WHERE user_id = ?1", [id])?;
        let rows_affected = transaction.execute("DELETE FROM user WHERE id = ?1", [id])?;

        transaction.commit()?;

        Ok(rows_affected != 0)
    }

    async fn count_users(&self) -> Result<usize, Error> {
        let count: i64 = self
            .lock()?
            .query_row("SELECT COUNT(*) FROM user", [], |row| row.get(0))?;

        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn create_expense(&self, expense: NewExpense) -> Result<Expense, Error> {
        let expense = Expense {
            id: ExpenseId::new(),
            user_id: expense.user_id,
            amount: expense.amount,
            category: expense.category,
            description: expense.description,
            expense_type: expense.expense_type,
            date: expense.date,
            created_at: utc_now(),
        };

        self.lock()?.execute(
            "INSERT INTO expense
            (id, user_id, amount, category, description, expense_type, date, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            (
                expense.id,
                expense.user_id,
                expense.amount,
                &expense.category,
                &expense.description,
                expense.expense_type.as_str(),
                format_timestamp(expense.date),
                format_utc_timestamp(expense.created_at),
            ),
        )?;

        Ok(expense)
    }

    async fn get_expense(&self, id: ExpenseId) -> Result<Option<Expense>, Error> {
        let expense = self
            .lock()?
            .query_row(
                &format!("SELECT {EXPENSE_COLUMNS} FROM expense WHERE id = ?1"),
                [id],
                map_row_to_expense,
            )
            .optional()?;

        Ok(expense)
    }

    async fn get_expenses(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>, Error> {
        let (where_clause, params) = where_clause(filter);
        let order_clause = match filter.sort {
            SortOrder::DateDescending => " ORDER BY date DESC, created_at DESC, rowid DESC",
            SortOrder::Unordered => "",
        };

        let connection = self.lock()?;
        let mut statement = connection.prepare(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expense{where_clause}{order_clause}"
        ))?;

        statement
            .query_map(params_from_iter(params.iter()), map_row_to_expense)?
            .map(|expense| expense.map_err(Error::from))
            .collect()
    }

    async fn update_expense(&self, expense: &Expense) -> Result<(), Error> {
        let rows_affected = self.lock()?.execute(
            "UPDATE expense
            SET user_id = ?1, amount = ?2, category = ?3, description = ?4,
                expense_type = ?5, date = ?6
            WHERE id = ?7",
            (
                expense.user_id,
                expense.amount,
                &expense.category,
                &expense.description,
                expense.expense_type.as_str(),
                format_timestamp(expense.date),
                expense.id,
            ),
        )?;

        if rows_affected == 0 {
            return Err(Error::NotFound);
        }

        Ok(())
    }

    async fn delete_expense(&self, id: ExpenseId) -> Result<bool, Error> {
        let rows_affected = self
            .lock()?
            .execute("DELETE FROM expense WHERE id = ?1", [id])?;

        Ok(rows_affected != 0)
    }

    async fn delete_expenses(&self, filter: &ExpenseFilter) -> Result<usize, Error> {
        let (where_clause, params) = where_clause(filter);

        let rows_affected = self.lock()?.execute(
            &format!("DELETE FROM expense{where_clause}"),
            params_from_iter(params.iter()),
        )?;

        Ok(rows_affected)
    }

    async fn count_expenses(&self, filter: &ExpenseFilter) -> Result<usize, Error> {
        let (where_clause, params) = where_clause(filter);

        let count: i64 = self.lock()?.query_row(
            &format!("SELECT COUNT(*) FROM expense{where_clause}"),
            params_from_iter(params.iter()),
            |row| row.get(0),
        )?;

        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn create_savings_goal(&self, goal: NewSavingsGoal) -> Result<SavingsGoal, Error> {
        let goal = SavingsGoal {
            id: SavingsGoalId::new(),
            user_id: goal.user_id,
            target_amount: goal.target_amount,
            target_months: goal.target_months,
            current_savings: goal.current_savings,
            created_at: utc_now(),
        };

        self.lock()?.execute(
            "INSERT INTO savings_goal
            (id, user_id, target_amount, target_months, current_savings, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (
                goal.id,
                goal.user_id,
                goal.target_amount,
                goal.target_months,
                goal.current_savings,
                format_utc_timestamp(goal.created_at),
            ),
        )?;

        Ok(goal)
    }

    async fn get_savings_goal(&self, user_id: UserId) -> Result<Option<SavingsGoal>, Error> {
        let goal = self
            .lock()?
            .query_row(
                &format!(
                    "SELECT {SAVINGS_GOAL_COLUMNS} FROM savings_goal WHERE user_id = ?1
                    ORDER BY created_at ASC, rowid ASC LIMIT 1"
                ),
                [user_id],
                map_row_to_savings_goal,
            )
            .optional()?;

        Ok(goal)
    }

    async fn get_savings_goals(
        &self,
        user_id: Option<UserId>,
    ) -> Result<Vec<SavingsGoal>, Error> {
        let connection = self.lock()?;
        let mut statement = connection.prepare(&format!(
            "SELECT {SAVINGS_GOAL_COLUMNS} FROM savings_goal
            WHERE ?1 IS NULL OR user_id = ?1
            ORDER BY created_at ASC, rowid ASC"
        ))?;

        statement
            .query_map([user_id], map_row_to_savings_goal)?
            .map(|goal| goal.map_err(Error::from))
            .collect()
    }

    async fn update_savings_goal(&self, goal: &SavingsGoal) -> Result<(), Error> {
        let rows_affected = self.lock()?.execute(
            "UPDATE savings_goal
            SET target_amount = ?1, target_months = ?2, current_savings = ?3
            WHERE id = ?4",
            (
                goal.target_amount,
                goal.target_months,
                goal.current_savings,
                goal.id,
            ),
        )?;

        if rows_affected == 0 {
            return Err(Error::NotFound);
        }

        Ok(())
    }

    async fn delete_savings_goals(&self, user_id: UserId) -> Result<usize, Error> {
        let rows_affected = self
            .lock()?
            .execute("DELETE FROM savings_goal WHERE user_id = ?1", [user_id])?;

        Ok(rows_affected)
    }
}
