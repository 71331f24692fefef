//! The landing page for logged-in users: this month's figures, the savings
//! goal and the latest expenses.
//!
//! Admins see the figures for every user's expenses and the number of users.

use std::{collections::HashMap, sync::Arc};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use maud::{Markup, html};

use crate::{
    AppState, Error,
    aggregation::DashboardSummary,
    auth::CurrentUser,
    datetime::format_date_display,
    endpoints,
    flash::{Flash, flash_view, take_flash},
    html::{
        CARD_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE,
        TABLE_ROW_STYLE, UNWANTED_BADGE_STYLE, WANTED_BADGE_STYLE, base, format_currency,
    },
    models::{ExpenseType, SavingsGoal, UserId},
    navigation::NavBar,
    store::{ExpenseFilter, Store},
    timezone::local_now,
    user::get_or_create_savings_goal,
};

/// The state needed for displaying the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub cookie_key: Key,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,
    pub store: Arc<dyn Store>,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            local_timezone: state.local_timezone.clone(),
            store: state.store.clone(),
        }
    }
}

impl FromRef<DashboardState> for Key {
    fn from_ref(state: &DashboardState) -> Self {
        state.cookie_key.clone()
    }
}

/// Display a page with an overview of the user's spending.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    jar: PrivateCookieJar,
    Extension(user): Extension<CurrentUser>,
) -> Result<Response, Error> {
    let store = state.store.as_ref();
    let now = local_now(&state.local_timezone)?;

    let expenses = store
        .get_expenses(&ExpenseFilter::owned_by(user.scope().owner_filter()).unordered())
        .await?;
    let goal = get_or_create_savings_goal(store, user.id()).await?;
    let summary = DashboardSummary::build(&expenses, user.0.monthly_income, now.month(), now.year());

    let (total_users, usernames) = if user.is_admin() {
        let users = store.get_users().await?;
        let total_users = users.len();
        let usernames = users
            .into_iter()
            .map(|user| (user.id, user.username))
            .collect();

        (Some(total_users), usernames)
    } else {
        (None, HashMap::new())
    };

    let (jar, flash) = take_flash(jar);
    let view = DashboardView {
        user: &user,
        flash,
        summary: &summary,
        goal: &goal,
        total_users,
        usernames: &usernames,
        has_expenses: !expenses.is_empty(),
    };

    Ok((jar, view.into_html()).into_response())
}

struct DashboardView<'a> {
    user: &'a CurrentUser,
    flash: Option<Flash>,
    summary: &'a DashboardSummary,
    goal: &'a SavingsGoal,
    total_users: Option<usize>,
    usernames: &'a HashMap<UserId, String>,
    has_expenses: bool,
}

impl DashboardView<'_> {
    fn into_html(self) -> Markup {
        let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW, self.user.is_admin()).into_html();
        let summary = self.summary;
        let recent_expenses_table = self.recent_expenses_table();
        let savings_style = if summary.monthly_savings < 0.0 {
            "text-2xl font-bold text-red-600 dark:text-red-400"
        } else {
            "text-2xl font-bold text-green-600 dark:text-green-400"
        };

        let content = html! {
            (nav_bar)
            (flash_view(self.flash))

            div class=(PAGE_CONTAINER_STYLE)
            {
                div class="w-full max-w-screen-xl space-y-8"
                {
                    h1 class="text-2xl font-bold" { "Welcome, " (self.user.0.username) }

                    section class="grid grid-cols-1 sm:grid-cols-2 lg:grid-cols-4 gap-4"
                    {
                        (stat_card("This Month", &format_currency(summary.monthly_expenses), None))
                        (stat_card("All Time", &format_currency(summary.total_expenses), None))
                        (stat_card("Monthly Income", &format_currency(summary.monthly_income), None))

                        div class=(CARD_STYLE) data-stat="Monthly Savings"
                        {
                            p class="text-sm text-gray-500 dark:text-gray-400" { "Monthly Savings" }
                            p class=(savings_style) { (format_currency(summary.monthly_savings)) }
                            p class="text-sm text-gray-500 dark:text-gray-400"
                            {
                                (format!("{:.1}", summary.savings_percentage)) "% of income"
                            }
                        }

                        @if let Some(total_users) = self.total_users {
                            (stat_card("Users", &total_users.to_string(), Some(endpoints::ADMIN_VIEW)))
                        }
                    }

                    (savings_goal_view(self.goal))

                    section
                    {
                        div class="flex justify-between items-baseline mb-4"
                        {
                            h2 class="text-xl font-semibold" { "Recent Expenses" }
                            a href=(endpoints::EXPENSES_VIEW) class=(LINK_STYLE) { "View all" }
                        }

                        @if summary.recent_expenses.is_empty() {
                            p class="text-gray-500 dark:text-gray-400"
                            {
                                "You have not recorded any expenses yet. "
                                a href=(endpoints::ADD_EXPENSE_VIEW) class=(LINK_STYLE) { "Add an expense" }
                            }
                        } @else {
                            (recent_expenses_table)
                        }
                    }

                    @if !self.has_expenses {
                        p class="text-sm text-gray-500 dark:text-gray-400"
                        {
                            "Want to see what the charts look like? "
                            a href=(endpoints::ADD_SAMPLE_DATA) class=(LINK_STYLE) { "Add sample data" }
                        }
                    }
                }
            }
        };

        base("Dashboard", &[], &content)
    }

    fn recent_expenses_table(&self) -> Markup {
        let show_owner = self.user.is_admin();

        html! {
            div class="relative overflow-x-auto shadow-md rounded-lg"
            {
                table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                            @if show_owner {
                                th scope="col" class=(TABLE_CELL_STYLE) { "User" }
                            }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Type" }
                            th scope="col" class="px-6 py-4 text-right" { "Amount" }
                        }
                    }

                    tbody
                    {
                        @for expense in &self.summary.recent_expenses {
                            tr class=(TABLE_ROW_STYLE)
                            {
                                td class=(TABLE_CELL_STYLE) { (format_date_display(expense.date.date())) }
                                @if show_owner {
                                    td class=(TABLE_CELL_STYLE)
                                    {
                                        (self.usernames.get(&expense.user_id).map(String::as_str).unwrap_or("Unknown"))
                                    }
                                }
                                td class=(TABLE_CELL_STYLE) { (expense.category) }
                                td class=(TABLE_CELL_STYLE)
                                {
                                    @match expense.expense_type {
                                        ExpenseType::Wanted => {
                                            span class=(WANTED_BADGE_STYLE) { "Wanted" }
                                        }
                                        ExpenseType::Unwanted => {
                                            span class=(UNWANTED_BADGE_STYLE) { "Unwanted" }
                                        }
                                    }
                                }
                                td class="px-6 py-4 text-right" { (format_currency(expense.amount)) }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn stat_card(label: &str, value: &str, link: Option<&str>) -> Markup {
    html! {
        div class=(CARD_STYLE) data-stat=(label)
        {
            p class="text-sm text-gray-500 dark:text-gray-400" { (label) }
            p class="text-2xl font-bold" { (value) }
            @if let Some(link) = link {
                a href=(link) class=(LINK_STYLE) { "Manage" }
            }
        }
    }
}

fn savings_goal_view(goal: &SavingsGoal) -> Markup {
    html! {
        section class=(CARD_STYLE) id="savings-goal"
        {
            div class="flex justify-between items-baseline mb-2"
            {
                h2 class="text-xl font-semibold" { "Savings Goal" }
                a href=(endpoints::SETTINGS_VIEW) class=(LINK_STYLE) { "Edit" }
            }

            p
            {
                "Save " (format_currency(goal.target_amount)) " in " (goal.target_months)
                @if goal.target_months == 1 { " month" } @else { " months" }
                ", " (format_currency(goal.monthly_needed())) " per month."
            }
            p class="text-sm text-gray-500 dark:text-gray-400"
            {
                "Saved so far: " (format_currency(goal.current_savings))
            }
            a href=(endpoints::REPORTS_VIEW) class=(LINK_STYLE) { "See suggestions" }
        }
    }
}
