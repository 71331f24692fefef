//! The admin page for creating an account on someone else's behalf.

use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use serde::Deserialize;

use crate::{
    Error,
    admin::{AdminState, PASSWORD_INPUT_MIN_LENGTH, admin_checkbox, admin_form_page},
    endpoints,
    flash::{Flash, set_flash},
    html::{BUTTON_PRIMARY_STYLE, income_input, password_input, text_input},
    models::{NewUser, PasswordHash, ValidatedPassword},
    user::{create_account, parse_income},
};

/// The raw data entered in the add user form.
#[derive(Debug, Default, Deserialize)]
pub struct AddUserForm {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub monthly_income: String,
    pub password: String,
    /// Present only when the checkbox is ticked.
    pub is_admin: Option<String>,
}

fn add_user_form(form: &AddUserForm, error_message: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::ADMIN_ADD_USER)
            hx-swap="outerHTML"
            class="space-y-4 md:space-y-6"
        {
            (text_input("username", "Username", "text", &form.username, None))
            (text_input("email", "Email", "email", &form.email, None))
            (income_input(&form.monthly_income, None))
            (password_input("password", "Password", PASSWORD_INPUT_MIN_LENGTH, None))
            (admin_checkbox(form.is_admin.is_some()))

            @if let Some(error_message) = error_message {
                p class="text-red-500 text-base" { (error_message) }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Add User" }
        }
    }
}

/// Display the form for adding a user.
pub async fn get_add_user_page() -> Response {
    admin_form_page("Add User", &add_user_form(&AddUserForm::default(), None)).into_response()
}

async fn add_user(state: &AdminState, form: &AddUserForm) -> Result<(), Error> {
    let monthly_income = parse_income(&form.monthly_income)?;
    let mut new_user = NewUser::new(
        &form.username,
        &form.email,
        PasswordHash::new_unchecked(""),
        monthly_income,
    )?;
    let password = ValidatedPassword::new_with_user_inputs(
        &form.password,
        &[&new_user.username, &new_user.email],
    )?;
    new_user.password_hash = PasswordHash::new(password, PasswordHash::DEFAULT_COST)?;

    let user = create_account(state.store.as_ref(), new_user.admin(form.is_admin.is_some())).await?;
    tracing::info!("Admin added user {} ({})", user.username, user.id);

    Ok(())
}

/// Create a user from the add user form.
///
/// Validation problems are shown on the returned form. On success the client
/// is sent back to the admin page.
pub async fn add_user_endpoint(
    State(state): State<AdminState>,
    jar: PrivateCookieJar,
    Form(form): Form<AddUserForm>,
) -> Response {
    match add_user(&state, &form).await {
        Ok(()) => (
            set_flash(jar, Flash::success("User added successfully!")),
            HxRedirect(endpoints::ADMIN_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) if error.is_validation_error() => {
            add_user_form(&form, Some(&error.to_string())).into_response()
        }
        Err(error) => error.into_alert_response(),
    }
}
