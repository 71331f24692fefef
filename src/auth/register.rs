//! The registration page for creating a new user account.

use std::sync::Arc;

use axum::{
    Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    endpoints,
    flash::{Flash, set_flash},
    html::{
        BUTTON_PRIMARY_STYLE, LINK_STYLE, base, income_input, loading_spinner, log_in_register,
        password_input, rupee_input_styles, text_input,
    },
    models::{NewUser, PasswordHash, ValidatedPassword, validate_email, validate_username},
    routing::get_internal_server_error_redirect,
    store::Store,
    user::{check_unique, parse_income, register_account},
};

/// The minimum number of characters the password should have to be considered valid on the client side (server-side validation is done on top of this validation).
const PASSWORD_INPUT_MIN_LENGTH: u8 = 8;

/// The state needed to register a user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    pub store: Arc<dyn Store>,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            store: state.store.clone(),
        }
    }
}

impl FromRef<RegistrationState> for Key {
    fn from_ref(state: &RegistrationState) -> Self {
        state.cookie_key.clone()
    }
}

/// The error messages to show next to each field of the registration form.
#[derive(Debug, Default)]
struct RegisterFormErrors {
    username: Option<String>,
    email: Option<String>,
    monthly_income: Option<String>,
    password: Option<String>,
    confirm_password: Option<String>,
}

fn confirm_password_input(error_message: Option<&str>) -> Markup {
    password_input(
        "confirm_password",
        "Confirm Password",
        PASSWORD_INPUT_MIN_LENGTH,
        error_message,
    )
}

fn registration_form(form: &RegisterForm, errors: &RegisterFormErrors) -> Markup {
    html! {
        form
            hx-post=(endpoints::REGISTER_VIEW)
            hx-swap="outerHTML"
            hx-indicator="#indicator"
            hx-disabled-elt="#submit-button"
            class="space-y-4 md:space-y-6"
        {
            (text_input("username", "Username", "text", &form.username, errors.username.as_deref()))
            (text_input("email", "Email", "email", &form.email, errors.email.as_deref()))
            (income_input(&form.monthly_income, errors.monthly_income.as_deref()))
            (password_input("password", "Password", PASSWORD_INPUT_MIN_LENGTH, errors.password.as_deref()))
            (confirm_password_input(errors.confirm_password.as_deref()))

            button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Create account"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Already have an account? "
                a href=(endpoints::LOG_IN_VIEW) tabindex="0" class=(LINK_STYLE)
                {
                    "Log in here"
                }
            }
        }
    }
}

/// Display the registration page.
pub async fn get_register_page() -> Response {
    let form = registration_form(&RegisterForm::default(), &RegisterFormErrors::default());
    let content = log_in_register("Create an account", &form);

    base("Register", &[rupee_input_styles()], &content).into_response()
}

/// The raw data entered by the user in the registration form.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    /// Blank means no income.
    #[serde(default)]
    pub monthly_income: String,
    pub password: String,
    pub confirm_password: String,
}

/// Put `error` next to the form field it is about.
fn field_errors(error: Error) -> RegisterFormErrors {
    let message = Some(error.to_string());

    match error {
        Error::EmptyField("Username") | Error::DuplicateUsername => RegisterFormErrors {
            username: message,
            ..Default::default()
        },
        Error::EmptyField(_) | Error::InvalidEmail(_) | Error::DuplicateEmail => {
            RegisterFormErrors {
                email: message,
                ..Default::default()
            }
        }
        Error::InvalidIncome => RegisterFormErrors {
            monthly_income: message,
            ..Default::default()
        },
        _ => RegisterFormErrors {
            password: message,
            ..Default::default()
        },
    }
}

fn validate_fields(form: &RegisterForm) -> Result<(String, String, f64, ValidatedPassword), Error> {
    let username = validate_username(&form.username)?;
    let email = validate_email(&form.email)?;
    let monthly_income = parse_income(&form.monthly_income)?;
    let password = ValidatedPassword::new_with_user_inputs(&form.password, &[&username, &email])?;

    Ok((username, email, monthly_income, password))
}

/// Create a user from the registration form.
///
/// On success the client is sent to the log-in page with the message
/// "Registration successful". Otherwise the form is returned with the
/// problem shown next to the offending field.
pub async fn register_user(
    State(state): State<RegistrationState>,
    jar: PrivateCookieJar,
    Form(form): Form<RegisterForm>,
) -> Response {
    let (username, email, monthly_income, validated_password) = match validate_fields(&form) {
        Ok(fields) => fields,
        Err(error) => return registration_form(&form, &field_errors(error)).into_response(),
    };

    if form.password != form.confirm_password {
        return registration_form(
            &form,
            &RegisterFormErrors {
                confirm_password: Some("Passwords do not match".to_owned()),
                ..Default::default()
            },
        )
        .into_response();
    }

    match check_unique(state.store.as_ref(), &username, &email, None).await {
        Ok(()) => {}
        Err(error @ (Error::DuplicateUsername | Error::DuplicateEmail)) => {
            return registration_form(&form, &field_errors(error)).into_response();
        }
        Err(error) => {
            tracing::error!("Could not check for existing users: {error}");
            return get_internal_server_error_redirect();
        }
    }

    let password_hash = match PasswordHash::new(validated_password, PasswordHash::DEFAULT_COST) {
        Ok(hash) => hash,
        Err(error) => {
            tracing::error!("an error occurred while hashing a password: {error}");
            return get_internal_server_error_redirect();
        }
    };

    let new_user = NewUser {
        username,
        email,
        password_hash,
        is_admin: false,
        monthly_income,
    };

    match register_account(state.store.as_ref(), new_user).await {
        Ok(_) => (
            StatusCode::SEE_OTHER,
            HxRedirect(endpoints::LOG_IN_VIEW.to_owned()),
            set_flash(jar, Flash::success("Registration successful")),
        )
            .into_response(),
        Err(error @ (Error::DuplicateUsername | Error::DuplicateEmail)) => {
            registration_form(&form, &field_errors(error)).into_response()
        }
        Err(error) => {
            tracing::error!("An unhandled error occurred while inserting a new user: {error}");
            get_internal_server_error_redirect()
        }
    }
}

#[cfg(test)]
mod register_page_tests {
    use axum::http::StatusCode;

    use crate::{
        endpoints,
        test_utils::{
            assert_form_input, assert_form_submit_button, assert_hx_endpoint, assert_valid_html,
            must_get_form, parse_html_document,
        },
    };

    use super::get_register_page;

    #[tokio::test]
    async fn register_page_displays_form() {
        let response = get_register_page().await;

        assert_eq!(response.status(), StatusCode::OK);
        let document = parse_html_document(response).await;
        assert_valid_html(&document);

        let form = must_get_form(&document);
        assert_hx_endpoint(&form, endpoints::REGISTER_VIEW, "hx-post");
        assert_form_input(&form, "username", "text");
        assert_form_input(&form, "email", "email");
        assert_form_input(&form, "password", "password");
        assert_form_input(&form, "confirm_password", "password");
        assert_form_submit_button(&form);
    }
}

#[cfg(test)]
mod register_user_tests {
    use axum::{Router, http::StatusCode, routing::post};
    use axum_test::{TestResponse, TestServer};
    use scraper::{Html, Selector};

    use crate::{
        AppState, endpoints,
        flash::COOKIE_FLASH,
        store::Store,
        test_utils::{STRONG_PASSWORD, get_test_state},
    };

    use super::register_user;

    fn get_server(state: AppState) -> TestServer {
        let app = Router::new()
            .route(endpoints::REGISTER_VIEW, post(register_user))
            .with_state(state);

        TestServer::new(app)
    }

    async fn register(
        server: &TestServer,
        username: &str,
        password: &str,
        confirm_password: &str,
    ) -> TestResponse {
        let email = format!("{username}@example.com");
        let form = [
            ("username", username),
            ("email", email.as_str()),
            ("monthly_income", "50000"),
            ("password", password),
            ("confirm_password", confirm_password),
        ];

        server.post(endpoints::REGISTER_VIEW).form(&form).await
    }

    #[track_caller]
    fn assert_error_message(response: &TestResponse, want: &str) {
        let fragment = Html::parse_fragment(&response.text());
        let messages = fragment
            .select(&Selector::parse("p.text-red-500.text-base").unwrap())
            .map(|p| p.text().collect::<String>())
            .collect::<Vec<_>>();

        assert!(
            messages.iter().any(|message| message.contains(want)),
            "want error message containing {want:?}, got {messages:?}"
        );
    }

    #[tokio::test]
    async fn first_user_is_admin_and_second_is_not() {
        let state = get_test_state();
        let server = get_server(state.clone());

        let response = register(&server, "first", STRONG_PASSWORD, STRONG_PASSWORD).await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("hx-redirect"), endpoints::LOG_IN_VIEW);
        assert!(response.maybe_cookie(COOKIE_FLASH).is_some());

        register(&server, "second", STRONG_PASSWORD, STRONG_PASSWORD)
            .await
            .assert_status(StatusCode::SEE_OTHER);

        let first = state.store.get_user_by_username("first").await.unwrap().unwrap();
        let second = state.store.get_user_by_username("second").await.unwrap().unwrap();
        assert!(first.is_admin);
        assert!(!second.is_admin);
        assert_eq!(first.monthly_income, 50_000.0);
        assert!(state.store.get_savings_goal(second.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn mismatched_passwords_are_rejected() {
        let state = get_test_state();
        let server = get_server(state.clone());

        let response = register(&server, "asha", STRONG_PASSWORD, "something else").await;

        response.assert_status_ok();
        assert_error_message(&response, "Passwords do not match");
        assert_eq!(state.store.count_users().await, Ok(0));
    }

    #[tokio::test]
    async fn weak_password_is_rejected() {
        let server = get_server(get_test_state());

        let response = register(&server, "asha", "password", "password").await;

        response.assert_status_ok();
        assert_error_message(&response, "password is too weak");
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let state = get_test_state();
        let server = get_server(state.clone());
        register(&server, "asha", STRONG_PASSWORD, STRONG_PASSWORD)
            .await
            .assert_status(StatusCode::SEE_OTHER);

        let response = register(&server, "asha", STRONG_PASSWORD, STRONG_PASSWORD).await;

        response.assert_status_ok();
        assert_error_message(&response, "Username already exists");
        assert_eq!(state.store.count_users().await, Ok(1));
    }

    #[tokio::test]
    async fn negative_income_is_rejected() {
        let server = get_server(get_test_state());
        let form = [
            ("username", "asha"),
            ("email", "asha@example.com"),
            ("monthly_income", "-5"),
            ("password", STRONG_PASSWORD),
            ("confirm_password", STRONG_PASSWORD),
        ];

        let response = server.post(endpoints::REGISTER_VIEW).form(&form).await;

        response.assert_status_ok();
        assert_error_message(&response, "Monthly income must be zero or a positive number");
    }
}
