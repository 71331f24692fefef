//! Creating accounts and looking after the records that come with them.
//!
//! Registration, the admin "add user" page and CSV import all create users
//! through [create_account] so that every user starts with a savings goal.

use crate::{
    Error,
    models::{NewSavingsGoal, NewUser, SavingsGoal, User, UserId, validate_income},
    store::Store,
};

/// Check that no other user has `username` or `email`.
///
/// `existing_user` is the user being edited, whose own username and email
/// do not count as taken.
///
/// # Errors
///
/// Returns [Error::DuplicateUsername] or [Error::DuplicateEmail] if another
/// user holds the name or address.
pub async fn check_unique(
    store: &dyn Store,
    username: &str,
    email: &str,
    existing_user: Option<UserId>,
) -> Result<(), Error> {
    let is_other_user = |user: &User| Some(user.id) != existing_user;

    if store
        .get_user_by_username(username)
        .await?
        .is_some_and(|user| is_other_user(&user))
    {
        return Err(Error::DuplicateUsername);
    }

    if store
        .get_user_by_email(email)
        .await?
        .is_some_and(|user| is_other_user(&user))
    {
        return Err(Error::DuplicateEmail);
    }

    Ok(())
}

/// Create a user along with a savings goal that has the default target.
///
/// The savings goal is best-effort: if it cannot be saved the account still
/// exists, and [get_or_create_savings_goal] adds the goal on a later visit.
///
/// # Errors
///
/// Returns a duplicate error if the username or email is taken, or any
/// error from the store while saving the user.
pub async fn create_account(store: &dyn Store, new_user: NewUser) -> Result<User, Error> {
    check_unique(store, &new_user.username, &new_user.email, None).await?;

    let user = store.create_user(new_user).await?;
    if let Err(error) = store
        .create_savings_goal(NewSavingsGoal::with_defaults(user.id))
        .await
    {
        tracing::error!(
            "Could not create the default savings goal for user {}: {error}",
            user.id
        );
    }

    tracing::info!(
        "Created user {} ({}), admin: {}",
        user.username,
        user.id,
        user.is_admin
    );

    Ok(user)
}

/// Create an account for a person registering themselves.
///
/// The first user to ever register becomes an admin. Everybody after that
/// starts as a regular user.
pub async fn register_account(store: &dyn Store, new_user: NewUser) -> Result<User, Error> {
    let is_first_user = store.count_users().await? == 0;

    create_account(store, new_user.admin(is_first_user)).await
}

/// The user's savings goal, created with the default target if they do not have one.
pub async fn get_or_create_savings_goal(
    store: &dyn Store,
    user_id: UserId,
) -> Result<SavingsGoal, Error> {
    match store.get_savings_goal(user_id).await? {
        Some(goal) => Ok(goal),
        None => {
            tracing::debug!("Creating default savings goal for user {user_id}");
            store
                .create_savings_goal(NewSavingsGoal::with_defaults(user_id))
                .await
        }
    }
}

/// Parse a monthly income typed into a form. A blank field means no income.
///
/// # Errors
///
/// Returns [Error::InvalidIncome] for text that is not a number, or a
/// negative number.
pub fn parse_income(raw: &str) -> Result<f64, Error> {
    let raw = raw.trim();

    if raw.is_empty() {
        return Ok(0.0);
    }

    raw.parse::<f64>()
        .map_err(|_| Error::InvalidIncome)
        .and_then(validate_income)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, path_regex},
    };

    use crate::{
        Error,
        models::{DEFAULT_TARGET_AMOUNT, NewUser, PasswordHash},
        store::{RemoteConfig, RemoteStore, SqliteStore, Store},
        test_utils::create_test_user,
    };

    use super::{
        check_unique, create_account, get_or_create_savings_goal, parse_income,
        register_account,
    };

    fn new_user(username: &str) -> NewUser {
        NewUser::new(
            username,
            &format!("{username}@example.com"),
            PasswordHash::new_unchecked("hash"),
            50_000.0,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn first_registered_user_is_admin() {
        let store = SqliteStore::open_in_memory().unwrap();

        let first = register_account(&store, new_user("first")).await.unwrap();
        let second = register_account(&store, new_user("second")).await.unwrap();

        assert!(first.is_admin);
        assert!(!second.is_admin);
    }

    #[tokio::test]
    async fn new_account_has_default_savings_goal() {
        let store = SqliteStore::open_in_memory().unwrap();

        let user = create_account(&store, new_user("asha")).await.unwrap();

        let goal = store.get_savings_goal(user.id).await.unwrap().unwrap();
        assert_eq!(goal.target_amount, DEFAULT_TARGET_AMOUNT);
        assert_eq!(goal.target_months, 3);
        assert_eq!(goal.current_savings, 0.0);
    }

    #[tokio::test]
    async fn account_is_kept_when_savings_goal_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path_regex(r"^/users/[0-9a-f-]+\.json$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/users/[0-9a-f-]+\.json$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "00000000-0000-4000-8000-000000000001",
                "username": "asha",
                "email": "asha@example.com",
                "password_hash": "hash",
                "created_at": "2025-01-01T09:00:00",
            })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path_regex(r"^/savings_goals/.+\.json$"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;
        let store = RemoteStore::new(RemoteConfig::new(&server.uri())).unwrap();

        let user = create_account(&store, new_user("asha")).await.unwrap();

        assert_eq!(user.username, "asha");
    }

    #[tokio::test]
    async fn duplicate_username_and_email_are_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        create_account(&store, new_user("asha")).await.unwrap();

        assert_eq!(
            create_account(&store, new_user("asha")).await,
            Err(Error::DuplicateUsername)
        );

        let same_email = NewUser::new(
            "ravi",
            "asha@example.com",
            PasswordHash::new_unchecked("hash"),
            0.0,
        )
        .unwrap();
        assert_eq!(
            create_account(&store, same_email).await,
            Err(Error::DuplicateEmail)
        );
        assert_eq!(store.count_users().await, Ok(1));
    }

    #[tokio::test]
    async fn user_keeps_own_username_when_edited() {
        let store = SqliteStore::open_in_memory().unwrap();
        let asha = create_test_user(&store, "asha", false).await;
        create_test_user(&store, "ravi", false).await;

        assert_eq!(
            check_unique(&store, "asha", "asha@example.com", Some(asha.id)).await,
            Ok(())
        );
        assert_eq!(
            check_unique(&store, "ravi", "asha@example.com", Some(asha.id)).await,
            Err(Error::DuplicateUsername)
        );
    }

    #[tokio::test]
    async fn get_or_create_savings_goal_creates_once() {
        let store = SqliteStore::open_in_memory().unwrap();
        let user = create_test_user(&store, "asha", false).await;

        let first = get_or_create_savings_goal(&store, user.id).await.unwrap();
        let second = get_or_create_savings_goal(&store, user.id).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.get_savings_goals(Some(user.id)).await.unwrap().len(), 1);
    }

    #[test]
    fn blank_income_is_zero() {
        assert_eq!(parse_income(""), Ok(0.0));
        assert_eq!(parse_income(" 50000 "), Ok(50_000.0));
        assert_eq!(parse_income("-1"), Err(Error::InvalidIncome));
        assert_eq!(parse_income("lots"), Err(Error::InvalidIncome));
    }
}
