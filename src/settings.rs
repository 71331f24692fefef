//! The settings page: monthly income, the savings goal and clearing data.

use std::sync::Arc;

use axum::{
    Extension,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{Form, PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use serde::Deserialize;

use crate::{
    AppState, Error,
    auth::CurrentUser,
    endpoints,
    flash::{Flash, flash_view, set_flash, take_flash},
    html::{
        BUTTON_DELETE_STYLE, BUTTON_PRIMARY_STYLE, CARD_STYLE, FORM_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE, PAGE_CONTAINER_STYLE, base, loading_spinner, rupee_input_styles,
    },
    models::{SavingsGoal, validate_target_amount, validate_target_months},
    navigation::NavBar,
    store::{ExpenseFilter, Store},
    user::{get_or_create_savings_goal, parse_income},
};

/// The state needed by the settings page and its forms.
#[derive(Debug, Clone)]
pub struct SettingsState {
    pub cookie_key: Key,
    pub store: Arc<dyn Store>,
}

impl FromRef<AppState> for SettingsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            store: state.store.clone(),
        }
    }
}

impl FromRef<SettingsState> for Key {
    fn from_ref(state: &SettingsState) -> Self {
        state.cookie_key.clone()
    }
}

fn amount_input(name: &str, label: &str, value: &str, min: &str) -> Markup {
    html! {
        div
        {
            label for=(name) class=(FORM_LABEL_STYLE) { (label) }

            div class="input-wrapper w-full"
            {
                input
                    name=(name)
                    id=(name)
                    type="number"
                    step="0.01"
                    min=(min)
                    value=(value)
                    class=(FORM_TEXT_INPUT_STYLE);
            }
        }
    }
}

fn submit_button(text: &str) -> Markup {
    html! {
        button type="submit" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
        {
            span class="inline htmx-indicator" { (loading_spinner()) }
            (text)
        }
    }
}

fn profile_form(monthly_income: &str, error_message: Option<&str>) -> Markup {
    html! {
        form
            id="profile-form"
            hx-post=(endpoints::UPDATE_PROFILE)
            hx-swap="outerHTML"
            hx-target-error="#alert-container"
            class="space-y-4"
        {
            (amount_input("monthly_income", "Monthly Income", monthly_income, "0"))

            @if let Some(error_message) = error_message {
                p class="text-red-500 text-base" { (error_message) }
            }

            (submit_button("Update Profile"))
        }
    }
}

/// What the savings goal inputs are filled in with.
#[derive(Debug, Clone, PartialEq)]
struct GoalFormValues {
    target_amount: String,
    target_months: String,
    current_savings: String,
}

impl From<&SavingsGoal> for GoalFormValues {
    fn from(goal: &SavingsGoal) -> Self {
        Self {
            target_amount: format!("{:.2}", goal.target_amount),
            target_months: goal.target_months.to_string(),
            current_savings: format!("{:.2}", goal.current_savings),
        }
    }
}

fn savings_goal_form(values: &GoalFormValues, error_message: Option<&str>) -> Markup {
    html! {
        form
            id="savings-goal-form"
            hx-post=(endpoints::UPDATE_SAVINGS_GOAL)
            hx-swap="outerHTML"
            hx-target-error="#alert-container"
            class="space-y-4"
        {
            (amount_input("target_amount", "Target Amount", &values.target_amount, "0"))

            div
            {
                label for="target_months" class=(FORM_LABEL_STYLE) { "Target Months" }
                input
                    name="target_months"
                    id="target_months"
                    type="number"
                    step="1"
                    min="1"
                    required
                    value=(values.target_months)
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            (amount_input("current_savings", "Current Savings", &values.current_savings, "0"))

            @if let Some(error_message) = error_message {
                p class="text-red-500 text-base" { (error_message) }
            }

            (submit_button("Update Savings Goal"))
        }
    }
}

fn settings_view(
    user: &CurrentUser,
    flash: Option<Flash>,
    goal: &SavingsGoal,
) -> Markup {
    let nav_bar = NavBar::new(endpoints::SETTINGS_VIEW, user.is_admin()).into_html();

    let content = html! {
        (nav_bar)
        (flash_view(flash))

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-md space-y-8"
            {
                h1 class="text-2xl font-bold" { "Settings" }

                section class=(CARD_STYLE)
                {
                    h2 class="text-xl font-semibold mb-4" { "Profile" }
                    p class="mb-4 text-sm text-gray-500 dark:text-gray-400"
                    {
                        (user.0.username) " (" (user.0.email) ")"
                    }
                    (profile_form(&format!("{:.2}", user.0.monthly_income), None))
                }

                section class=(CARD_STYLE)
                {
                    h2 class="text-xl font-semibold mb-4" { "Savings Goal" }
                    (savings_goal_form(&GoalFormValues::from(goal), None))
                }

                section class=(CARD_STYLE)
                {
                    h2 class="text-xl font-semibold mb-2" { "Clear Data" }
                    p class="mb-4 text-sm text-gray-500 dark:text-gray-400"
                    {
                        "Delete all of your expenses and savings goals. This cannot be undone."
                    }
                    form
                        hx-post=(endpoints::CLEAR_DATA)
                        hx-confirm="Delete all of your expenses and savings goals?"
                        hx-target-error="#alert-container"
                    {
                        button type="submit" class=(BUTTON_DELETE_STYLE) { "Clear my data" }
                    }
                }
            }
        }
    };

    base("Settings", &[rupee_input_styles()], &content)
}

/// Display the settings page. Creates the savings goal if the user has none.
pub async fn get_settings_page(
    State(state): State<SettingsState>,
    jar: PrivateCookieJar,
    Extension(user): Extension<CurrentUser>,
) -> Result<Response, Error> {
    let goal = get_or_create_savings_goal(state.store.as_ref(), user.id()).await?;
    let (jar, flash) = take_flash(jar);

    Ok((jar, settings_view(&user, flash, &goal)).into_response())
}

#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub monthly_income: Option<String>,
}

/// Set the current user's monthly income.
pub async fn update_profile(
    State(state): State<SettingsState>,
    jar: PrivateCookieJar,
    Extension(user): Extension<CurrentUser>,
    Form(form): Form<ProfileForm>,
) -> Response {
    let raw_income = form.monthly_income.unwrap_or_default();

    let monthly_income = match parse_income(&raw_income) {
        Ok(income) => income,
        Err(error) => return profile_form(&raw_income, Some(&error.to_string())).into_response(),
    };

    let mut updated = user.0;
    updated.monthly_income = monthly_income;

    match state.store.update_user(&updated).await {
        Ok(()) => (
            set_flash(jar, Flash::success("Profile updated successfully!")),
            HxRedirect(endpoints::SETTINGS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("could not update profile of user {}: {error}", updated.id);
            error.into_alert_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SavingsGoalForm {
    pub target_amount: String,
    pub target_months: String,
    /// Left as it was when missing.
    #[serde(default)]
    pub current_savings: Option<String>,
}

impl SavingsGoalForm {
    fn values(&self) -> GoalFormValues {
        GoalFormValues {
            target_amount: self.target_amount.clone(),
            target_months: self.target_months.clone(),
            current_savings: self.current_savings.clone().unwrap_or_default(),
        }
    }

    /// Apply the form to `goal`.
    fn apply(&self, goal: &mut SavingsGoal) -> Result<(), Error> {
        let target_amount = parse_non_negative(&self.target_amount)?;
        let target_months = self
            .target_months
            .trim()
            .parse::<i64>()
            .map_err(|_| Error::InvalidTargetMonths(0))
            .and_then(validate_target_months)?;
        let current_savings = match self.current_savings.as_deref() {
            Some(raw) => parse_non_negative(raw)?,
            None => goal.current_savings,
        };

        goal.target_amount = target_amount;
        goal.target_months = target_months;
        goal.current_savings = current_savings;

        Ok(())
    }
}

fn parse_non_negative(raw: &str) -> Result<f64, Error> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| Error::InvalidAmount(raw.to_owned()))
        .and_then(validate_target_amount)
}

/// Set the target of the current user's savings goal, creating the goal
/// if it does not exist.
pub async fn update_savings_goal(
    State(state): State<SettingsState>,
    jar: PrivateCookieJar,
    Extension(user): Extension<CurrentUser>,
    Form(form): Form<SavingsGoalForm>,
) -> Response {
    let store = state.store.as_ref();

    let mut goal = match get_or_create_savings_goal(store, user.id()).await {
        Ok(goal) => goal,
        Err(error) => return error.into_alert_response(),
    };

    if let Err(error) = form.apply(&mut goal) {
        return savings_goal_form(&form.values(), Some(&error.to_string())).into_response();
    }

    match store.update_savings_goal(&goal).await {
        Ok(()) => (
            set_flash(jar, Flash::success("Savings goal updated successfully!")),
            HxRedirect(endpoints::SETTINGS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("could not update savings goal of user {}: {error}", user.id());
            error.into_alert_response()
        }
    }
}

/// Delete all of the current user's expenses and savings goals.
pub async fn clear_data(
    State(state): State<SettingsState>,
    jar: PrivateCookieJar,
    Extension(user): Extension<CurrentUser>,
) -> Response {
    let store = state.store.as_ref();

    let result = async {
        let expenses = store
            .delete_expenses(&ExpenseFilter::owned_by(Some(user.id())))
            .await?;
        let goals = store.delete_savings_goals(user.id()).await?;
        Ok::<_, Error>((expenses, goals))
    }
    .await;

    match result {
        Ok((expenses, goals)) => {
            tracing::info!(
                "User {} cleared {expenses} expenses and {goals} savings goals",
                user.id()
            );
            (
                set_flash(jar, Flash::success("All of your data has been cleared.")),
                HxRedirect(endpoints::SETTINGS_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error) => {
            tracing::error!("could not clear data of user {}: {error}", user.id());
            error.into_alert_response()
        }
    }
}
