//! The remote document-store backend.
//!
//! Each collection is a JSON object keyed by record id and is reached over a
//! REST interface: `{base_url}/{collection}/{id}.json` for single records and
//! `{base_url}/{collection}.json` for the whole collection. The service has no
//! query language, so listing, filtering and counting fetch the whole
//! collection and work in memory.
//!
//! Uniqueness of usernames and emails cannot be enforced here. Callers check
//! with [Store::get_user_by_username] and [Store::get_user_by_email] first,
//! which leaves a window where two concurrent registrations can both succeed.

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    Error,
    datetime::{
        format_timestamp, format_utc_timestamp, parse_timestamp, parse_utc_timestamp, utc_now,
    },
    models::{
        Expense, ExpenseId, ExpenseType, NewExpense, NewSavingsGoal, NewUser, PasswordHash,
        SavingsGoal, SavingsGoalId, User, UserId,
    },
    store::{ExpenseFilter, Store, sort_expenses},
};

const USERS: &str = "users";
const EXPENSES: &str = "expenses";
const SAVINGS_GOALS: &str = "savings_goals";

/// The default time limit for a single request to the remote store.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the remote store lives and how to talk to it.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// The root URL of the document store, e.g. `https://example.firebaseio.com`.
    pub base_url: String,
    /// Sent as the `auth` query parameter when set.
    pub auth_token: Option<String>,
    /// Applies to each request, including connecting.
    pub timeout: Duration,
}

impl RemoteConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            auth_token: None,
            timeout: DEFAULT_REMOTE_TIMEOUT,
        }
    }
}

/// Stores records in a remote REST document store.
#[derive(Debug, Clone)]
pub struct RemoteStore {
    client: Client,
    config: RemoteConfig,
}

impl RemoteStore {
    /// Build the shared HTTP client for `config`.
    ///
    /// # Errors
    ///
    /// Returns [Error::StoreUnavailable] if the HTTP client cannot be built.
    pub fn new(config: RemoteConfig) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .build()
            .map_err(|error| Error::StoreUnavailable(error.to_string()))?;

        Ok(Self { client, config })
    }

    fn record_url(&self, collection: &str, id: impl std::fmt::Display) -> String {
        format!("{}/{collection}/{id}.json", self.config.base_url)
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{collection}.json", self.config.base_url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, Error> {
        let request = match &self.config.auth_token {
            Some(token) => request.query(&[("auth", token)]),
            None => request,
        };

        let response = request.send().await.inspect_err(|error| {
            tracing::error!("Request to remote store failed: {error}");
        })?;
        let status = response.status();

        if status.is_server_error() {
            tracing::error!("Remote store returned {status}");
            return Err(Error::StoreUnavailable(format!(
                "remote store returned {status}"
            )));
        }

        if !status.is_success() {
            tracing::error!("Remote store rejected request with {status}");
            return Err(Error::StoreResponse(format!(
                "remote store returned {status}"
            )));
        }

        Ok(response)
    }

    async fn get_record<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: impl std::fmt::Display,
    ) -> Result<Option<T>, Error> {
        let response = self
            .send(self.client.get(self.record_url(collection, id)))
            .await?;

        Ok(response.json::<Option<T>>().await?)
    }

    /// Fetch every record of a collection. A missing collection is empty.
    async fn get_collection<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>, Error> {
        let response = self
            .send(self.client.get(self.collection_url(collection)))
            .await?;

        let records = response
            .json::<Option<HashMap<String, T>>>()
            .await?
            .unwrap_or_default();

        Ok(records.into_values().collect())
    }

    async fn put_record<T: Serialize + Sync>(
        &self,
        collection: &str,
        id: impl std::fmt::Display,
        record: &T,
    ) -> Result<(), Error> {
        self.send(self.client.put(self.record_url(collection, id)).json(record))
            .await?;

        Ok(())
    }

    async fn delete_record(&self, collection: &str, id: impl std::fmt::Display) -> Result<(), Error> {
        self.send(self.client.delete(self.record_url(collection, id)))
            .await?;

        Ok(())
    }

    async fn users(&self) -> Result<Vec<User>, Error> {
        self.get_collection::<UserRecord>(USERS)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    async fn expenses(&self) -> Result<Vec<Expense>, Error> {
        self.get_collection::<ExpenseRecord>(EXPENSES)
            .await?
            .into_iter()
            .map(Expense::try_from)
            .collect()
    }

    async fn savings_goals(&self) -> Result<Vec<SavingsGoal>, Error> {
        self.get_collection::<SavingsGoalRecord>(SAVINGS_GOALS)
            .await?
            .into_iter()
            .map(SavingsGoal::try_from)
            .collect()
    }

    /// The remote store has no foreign keys, so owners are checked before writing.
    async fn ensure_user_exists(&self, user_id: UserId) -> Result<(), Error> {
        match self.get_record::<UserRecord>(USERS, user_id).await? {
            Some(_) => Ok(()),
            None => Err(Error::UnknownUser),
        }
    }
}

fn bad_record(error: Error) -> Error {
    Error::StoreResponse(format!("malformed record: {error}"))
}

#[derive(Debug, Serialize, Deserialize)]
struct UserRecord {
    id: UserId,
    username: String,
    email: String,
    password_hash: String,
    #[serde(default)]
    is_admin: bool,
    #[serde(default)]
    monthly_income: f64,
    created_at: String,
}

impl From<&User> for UserRecord {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.as_str().to_owned(),
            is_admin: user.is_admin,
            monthly_income: user.monthly_income,
            created_at: format_utc_timestamp(user.created_at),
        }
    }
}

impl TryFrom<UserRecord> for User {
    type Error = Error;

    fn try_from(record: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record.id,
            username: record.username,
            email: record.email,
            password_hash: PasswordHash::new_unchecked(&record.password_hash),
            is_admin: record.is_admin,
            monthly_income: record.monthly_income,
            created_at: parse_utc_timestamp(&record.created_at).map_err(bad_record)?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ExpenseRecord {
    id: ExpenseId,
    user_id: UserId,
    amount: f64,
    category: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    expense_type: ExpenseType,
    date: String,
    created_at: String,
}

impl From<&Expense> for ExpenseRecord {
    fn from(expense: &Expense) -> Self {
        Self {
            id: expense.id,
            user_id: expense.user_id,
            amount: expense.amount,
            category: expense.category.clone(),
            description: expense.description.clone(),
            expense_type: expense.expense_type,
            date: format_timestamp(expense.date),
            created_at: format_utc_timestamp(expense.created_at),
        }
    }
}

impl TryFrom<ExpenseRecord> for Expense {
    type Error = Error;

    fn try_from(record: ExpenseRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record.id,
            user_id: record.user_id,
            amount: record.amount,
            category: record.category,
            description: record.description,
            expense_type: record.expense_type,
            date: parse_timestamp(&record.date).map_err(bad_record)?,
            created_at: parse_utc_timestamp(&record.created_at).map_err(bad_record)?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SavingsGoalRecord {
    id: SavingsGoalId,
    user_id: UserId,
    target_amount: f64,
    target_months: u32,
    #[serde(default)]
    current_savings: f64,
    created_at: String,
}

impl From<&SavingsGoal> for SavingsGoalRecord {
    fn from(goal: &SavingsGoal) -> Self {
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

impl TryFrom<SavingsGoalRecord> for SavingsGoal {
    type Error = Error;

    fn try_from(record: SavingsGoalRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record.id,
            user_id: record.user_id,
            target_amount: record.target_amount,
            target_months: record.target_months,
            current_savings: record.current_savings,
            created_at: parse_utc_timestamp(&record.created_at).map_err(bad_record)?,
        })
    }
}

#[async_trait]
impl Store for RemoteStore {
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

        self.put_record(USERS, user.id, &UserRecord::from(&user))
            .await?;

        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, Error> {
        self.get_record::<UserRecord>(USERS, id)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        Ok(self
            .users()
            .await?
            .into_iter()
            .find(|user| user.username == username))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        Ok(self
            .users()
            .await?
            .into_iter()
            .find(|user| user.email == email))
    }

    async fn get_users(&self) -> Result<Vec<User>, Error> {
        let mut users = self.users().await?;
        users.sort_by_key(|user| user.created_at);

        Ok(users)
    }

    async fn update_user(&self, user: &User) -> Result<(), Error> {
        if self.get_record::<UserRecord>(USERS, user.id).await?.is_none() {
            return Err(Error::NotFound);
        }

        self.put_record(USERS, user.id, &UserRecord::from(user))
            .await
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, Error> {
        if self.get_record::<UserRecord>(USERS, id).await?.is_none() {
            return Ok(false);
        }

        self.delete_expenses(&ExpenseFilter::owned_by(Some(id)).unordered())
            .await?;
        self.delete_savings_goals(id).await?;
        self.delete_record(USERS, id).await?;

        Ok(true)
    }

    async fn count_users(&self) -> Result<usize, Error> {
        Ok(self.get_collection::<UserRecord>(USERS).await?.len())
    }

    async fn create_expense(&self, expense: NewExpense) -> Result<Expense, Error> {
        self.ensure_user_exists(expense.user_id).await?;

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

        self.put_record(EXPENSES, expense.id, &ExpenseRecord::from(&expense))
            .await?;

        Ok(expense)
    }

    async fn get_expense(&self, id: ExpenseId) -> Result<Option<Expense>, Error> {
        self.get_record::<ExpenseRecord>(EXPENSES, id)
            .await?
            .map(Expense::try_from)
            .transpose()
    }

    async fn get_expenses(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>, Error> {
        let mut expenses: Vec<Expense> = self
            .expenses()
            .await?
            .into_iter()
            .filter(|expense| filter.matches(expense))
            .collect();

        sort_expenses(&mut expenses, filter.sort);

        Ok(expenses)
    }

    async fn update_expense(&self, expense: &Expense) -> Result<(), Error> {
        if self
            .get_record::<ExpenseRecord>(EXPENSES, expense.id)
            .await?
            .is_none()
        {
            return Err(Error::NotFound);
        }

        self.put_record(EXPENSES, expense.id, &ExpenseRecord::from(expense))
            .await
    }

    async fn delete_expense(&self, id: ExpenseId) -> Result<bool, Error> {
        if self
            .get_record::<ExpenseRecord>(EXPENSES, id)
            .await?
            .is_none()
        {
            return Ok(false);
        }

        self.delete_record(EXPENSES, id).await?;

        Ok(true)
    }

    async fn delete_expenses(&self, filter: &ExpenseFilter) -> Result<usize, Error> {
        let expenses = self.get_expenses(&filter.clone().unordered()).await?;

        for expense in &expenses {
            self.delete_record(EXPENSES, expense.id).await?;
        }

        Ok(expenses.len())
    }

    async fn count_expenses(&self, filter: &ExpenseFilter) -> Result<usize, Error> {
        Ok(self
            .expenses()
            .await?
            .iter()
            .filter(|expense| filter.matches(expense))
            .count())
    }

    async fn create_savings_goal(&self, goal: NewSavingsGoal) -> Result<SavingsGoal, Error> {
        self.ensure_user_exists(goal.user_id).await?;

        let goal = SavingsGoal {
            id: SavingsGoalId::new(),
            user_id: goal.user_id,
            target_amount: goal.target_amount,
            target_months: goal.target_months,
            current_savings: goal.current_savings,
            created_at: utc_now(),
        };

        self.put_record(SAVINGS_GOALS, goal.id, &SavingsGoalRecord::from(&goal))
            .await?;

        Ok(goal)
    }

    async fn get_savings_goal(&self, user_id: UserId) -> Result<Option<SavingsGoal>, Error> {
        Ok(self.get_savings_goals(Some(user_id)).await?.into_iter().next())
    }

    async fn get_savings_goals(
        &self,
        user_id: Option<UserId>,
    ) -> Result<Vec<SavingsGoal>, Error> {
        let mut goals: Vec<SavingsGoal> = self
            .savings_goals()
            .await?
            .into_iter()
            .filter(|goal| user_id.is_none_or(|user_id| goal.user_id == user_id))
            .collect();
        goals.sort_by_key(|goal| goal.created_at);

        Ok(goals)
    }

    async fn update_savings_goal(&self, goal: &SavingsGoal) -> Result<(), Error> {
        if self
            .get_record::<SavingsGoalRecord>(SAVINGS_GOALS, goal.id)
            .await?
            .is_none()
        {
            return Err(Error::NotFound);
        }

        self.put_record(SAVINGS_GOALS, goal.id, &SavingsGoalRecord::from(goal))
            .await
    }

    async fn delete_savings_goals(&self, user_id: UserId) -> Result<usize, Error> {
        let goals = self.get_savings_goals(Some(user_id)).await?;

        for goal in &goals {
            self.delete_record(SAVINGS_GOALS, goal.id).await?;
        }

        Ok(goals.len())
    }
}
