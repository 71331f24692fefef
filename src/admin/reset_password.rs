//! Lets an admin set a new password for a user who has lost theirs.

use axum::{
    Extension, Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use serde::Deserialize;

use crate::{
    Error,
    admin::{AdminState, PASSWORD_INPUT_MIN_LENGTH},
    auth::CurrentUser,
    endpoints::{self, format_endpoint},
    flash::{Flash, set_flash},
    html::{BUTTON_SECONDARY_STYLE, password_input},
    models::{PasswordHash, UserId, ValidatedPassword},
};

#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    pub new_password: String,
}

pub(super) fn reset_password_form(user_id: UserId, error_message: Option<&str>) -> Markup {
    html! {
        form
            id="reset-password-form"
            hx-post=(format_endpoint(endpoints::ADMIN_RESET_PASSWORD, user_id))
            hx-swap="outerHTML"
            class="space-y-4"
        {
            (password_input("new_password", "New Password", PASSWORD_INPUT_MIN_LENGTH, error_message))

            button type="submit" class=(BUTTON_SECONDARY_STYLE) { "Reset Password" }
        }
    }
}

async fn reset_password(
    state: &AdminState,
    user_id: UserId,
    new_password: &str,
) -> Result<(), Error> {
    let mut user = state.store.get_user(user_id).await?.ok_or(Error::NotFound)?;

    let password =
        ValidatedPassword::new_with_user_inputs(new_password, &[&user.username, &user.email])?;
    user.password_hash = PasswordHash::new(password, PasswordHash::DEFAULT_COST)?;

    state.store.update_user(&user).await
}

/// Replace a user's password with the one typed by the admin.
pub async fn reset_password_endpoint(
    State(state): State<AdminState>,
    jar: PrivateCookieJar,
    Extension(current_user): Extension<CurrentUser>,
    Path(user_id): Path<UserId>,
    Form(form): Form<ResetPasswordForm>,
) -> Response {
    match reset_password(&state, user_id, &form.new_password).await {
        Ok(()) => {
            tracing::info!(
                "Admin {} reset the password of user {user_id}",
                current_user.id()
            );
            (
                set_flash(jar, Flash::success("Password reset successfully!")),
                HxRedirect(endpoints::ADMIN_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error @ Error::TooWeak(_)) => {
            reset_password_form(user_id, Some(&error.to_string())).into_response()
        }
        Err(error) => error.into_alert_response(),
    }
}

#[cfg(test)]
mod tests {
    use axum::{Extension, Router, routing::post};
    use axum_test::TestServer;

    use crate::{
        AppState,
        auth::CurrentUser,
        endpoints::{self, format_endpoint},
        models::{User, UserId},
        test_utils::{STRONG_PASSWORD, TEST_PASSWORD, create_test_user, get_test_state},
    };

    use super::reset_password_endpoint;

    fn get_server(state: &AppState, admin: &User) -> TestServer {
        let app = Router::new()
            .route(endpoints::ADMIN_RESET_PASSWORD, post(reset_password_endpoint))
            .layer(Extension(CurrentUser(admin.clone())))
            .with_state(state.clone());

        TestServer::new(app)
    }

    #[tokio::test]
    async fn sets_new_password() {
        let state = get_test_state();
        let admin = create_test_user(state.store.as_ref(), "admin", true).await;
        let user = create_test_user(state.store.as_ref(), "asha", false).await;

        let response = get_server(&state, &admin)
            .post(&format_endpoint(endpoints::ADMIN_RESET_PASSWORD, user.id))
            .form(&[("new_password", STRONG_PASSWORD)])
            .await;

        response.assert_status_see_other();
        assert_eq!(response.header("hx-redirect"), endpoints::ADMIN_VIEW);
        let got = state.store.get_user(user.id).await.unwrap().unwrap();
        assert!(got.password_hash.verify(STRONG_PASSWORD).unwrap());
        assert!(!got.password_hash.verify(TEST_PASSWORD).unwrap());
    }

    #[tokio::test]
    async fn weak_password_is_rejected() {
        let state = get_test_state();
        let admin = create_test_user(state.store.as_ref(), "admin", true).await;
        let user = create_test_user(state.store.as_ref(), "asha", false).await;

        let response = get_server(&state, &admin)
            .post(&format_endpoint(endpoints::ADMIN_RESET_PASSWORD, user.id))
            .form(&[("new_password", "password")])
            .await;

        response.assert_status_ok();
        assert!(response.text().contains("password is too weak"));
        let got = state.store.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(got.password_hash, user.password_hash);
    }

    #[tokio::test]
    async fn missing_user_is_not_found() {
        let state = get_test_state();
        let admin = create_test_user(state.store.as_ref(), "admin", true).await;

        get_server(&state, &admin)
            .post(&format_endpoint(endpoints::ADMIN_RESET_PASSWORD, UserId::new()))
            .form(&[("new_password", STRONG_PASSWORD)])
            .await
            .assert_status_not_found();
    }
}
