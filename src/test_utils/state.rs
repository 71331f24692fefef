use std::sync::Arc;

use axum::{http::header::SET_COOKIE, response::IntoResponse};
use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, Key},
};

use crate::{
    AppState, PaginationConfig,
    auth::{DEFAULT_COOKIE_DURATION, set_auth_cookie},
    models::{NewUser, PasswordHash, User, UserId, ValidatedPassword},
    store::{SqliteStore, Store},
};

/// The password of users made by [create_test_user].
pub(crate) const TEST_PASSWORD: &str = "test";

/// A password that passes the strength check.
pub(crate) const STRONG_PASSWORD: &str = "fZ8&kQ2!wR9#pL4x";

/// App state backed by an empty in-memory SQLite store.
pub(crate) fn get_test_state() -> AppState {
    let store = SqliteStore::open_in_memory().expect("Could not open in-memory store");

    AppState::new(
        Arc::new(store),
        "foobar",
        "Etc/UTC",
        PaginationConfig::default(),
    )
}

/// Insert a user directly into `store`, without a savings goal.
///
/// The email is "{username}@example.com" and the password is [TEST_PASSWORD].
pub(crate) async fn create_test_user(store: &dyn Store, username: &str, is_admin: bool) -> User {
    // Minimum bcrypt cost so the tests stay fast.
    let password_hash = PasswordHash::new(ValidatedPassword::new_unchecked(TEST_PASSWORD), 4)
        .expect("Could not hash password");

    store
        .create_user(
            NewUser::new(
                username,
                &format!("{username}@example.com"),
                password_hash,
                0.0,
            )
            .expect("Could not create test user")
            .admin(is_admin),
        )
        .await
        .expect("Could not insert test user")
}

/// An encrypted auth cookie that logs in `user_id`.
pub(crate) fn auth_cookie_for(key: &Key, user_id: UserId) -> Cookie<'static> {
    let jar = set_auth_cookie(PrivateCookieJar::new(key.clone()), user_id, DEFAULT_COOKIE_DURATION)
        .expect("Could not set auth cookie");
    let response = jar.into_response();
    let header = response
        .headers()
        .get(SET_COOKIE)
        .expect("No auth cookie set")
        .to_str()
        .expect("Could not convert cookie header to str")
        .to_owned();

    Cookie::parse(header).expect("Could not parse auth cookie")
}
