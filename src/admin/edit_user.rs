//! The admin page for changing a user's details.

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
    admin::{AdminState, admin_checkbox, admin_form_page, reset_password::reset_password_form},
    auth::CurrentUser,
    endpoints::{self, format_endpoint},
    flash::{Flash, set_flash},
    html::{BUTTON_PRIMARY_STYLE, income_input, text_input},
    models::{User, UserId, validate_email, validate_username},
    user::{check_unique, parse_income},
};

/// The raw data entered in the edit user form.
#[derive(Debug, Deserialize)]
pub struct EditUserForm {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub monthly_income: String,
    /// Present only when the checkbox is ticked.
    pub is_admin: Option<String>,
}

impl From<&User> for EditUserForm {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
            monthly_income: user.monthly_income.to_string(),
            is_admin: user.is_admin.then(|| "on".to_owned()),
        }
    }
}

fn edit_user_form(user_id: UserId, form: &EditUserForm, error_message: Option<&str>) -> Markup {
    html! {
        form
            id="edit-user-form"
            hx-post=(format_endpoint(endpoints::ADMIN_EDIT_USER, user_id))
            hx-swap="outerHTML"
            class="space-y-4 md:space-y-6"
        {
            (text_input("username", "Username", "text", &form.username, None))
            (text_input("email", "Email", "email", &form.email, None))
            (income_input(&form.monthly_income, None))
            (admin_checkbox(form.is_admin.is_some()))

            @if let Some(error_message) = error_message {
                p class="text-red-500 text-base" { (error_message) }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Update User" }
        }
    }
}

async fn load_user(state: &AdminState, user_id: UserId) -> Result<User, Error> {
    state.store.get_user(user_id).await?.ok_or(Error::NotFound)
}

/// Display the edit form for a user, along with the password reset form.
pub async fn get_edit_user_page(
    State(state): State<AdminState>,
    Path(user_id): Path<UserId>,
) -> Result<Response, Error> {
    let user = load_user(&state, user_id).await?;

    let forms = html! {
        (edit_user_form(user.id, &EditUserForm::from(&user), None))
        h2 class="text-lg font-semibold" { "Reset Password" }
        (reset_password_form(user.id, None))
    };

    Ok(admin_form_page(&format!("Edit {}", user.username), &forms).into_response())
}

async fn apply_edit(
    state: &AdminState,
    current_user: &CurrentUser,
    mut user: User,
    form: &EditUserForm,
) -> Result<User, Error> {
    let username = validate_username(&form.username)?;
    let email = validate_email(&form.email)?;
    let monthly_income = parse_income(&form.monthly_income)?;
    check_unique(state.store.as_ref(), &username, &email, Some(user.id)).await?;

    // An admin cannot take away their own admin rights.
    let is_admin = form.is_admin.is_some() || user.id == current_user.id();

    user.username = username;
    user.email = email;
    user.monthly_income = monthly_income;
    user.is_admin = is_admin;
    state.store.update_user(&user).await?;

    Ok(user)
}

/// Save the changes from the edit user form.
pub async fn edit_user_endpoint(
    State(state): State<AdminState>,
    jar: PrivateCookieJar,
    Extension(current_user): Extension<CurrentUser>,
    Path(user_id): Path<UserId>,
    Form(form): Form<EditUserForm>,
) -> Response {
    let user = match load_user(&state, user_id).await {
        Ok(user) => user,
        Err(error) => return error.into_alert_response(),
    };

    match apply_edit(&state, &current_user, user, &form).await {
        Ok(user) => {
            tracing::info!("Admin {} updated user {}", current_user.id(), user.id);
            (
                set_flash(jar, Flash::success("User updated successfully!")),
                HxRedirect(endpoints::ADMIN_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error) if error.is_validation_error() => {
            edit_user_form(user_id, &form, Some(&error.to_string())).into_response()
        }
        Err(error) => error.into_alert_response(),
    }
}
