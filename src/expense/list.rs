//! The paginated, filterable list of expenses.

use std::collections::HashMap;

use axum::{
    Extension,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use maud::{Markup, html};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    auth::CurrentUser,
    datetime::{format_date_display, format_date_for_input, parse_optional_date},
    endpoints::{self, format_endpoint},
    expense::ExpenseState,
    flash::{Flash, flash_view, take_flash},
    html::{
        BUTTON_DELETE_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE,
        PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        UNWANTED_BADGE_STYLE, WANTED_BADGE_STYLE, base, format_currency,
    },
    models::{CATEGORIES, Expense, ExpenseType, UserId},
    navigation::NavBar,
    pagination::{Page, paginate, pagination_view},
    store::ExpenseFilter,
};

/// The query parameters of the expenses page.
///
/// Blank values are the same as missing ones.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExpenseListQuery {
    #[serde(default, skip_serializing)]
    pub page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub expense_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

impl ExpenseListQuery {
    /// Drop blank values so that they do not show up in page links.
    fn normalized(self) -> Self {
        Self {
            page: non_blank(self.page),
            category: non_blank(self.category),
            expense_type: non_blank(self.expense_type),
            start_date: non_blank(self.start_date),
            end_date: non_blank(self.end_date),
        }
    }

    fn page_number(&self, default_page: u64) -> u64 {
        self.page
            .as_deref()
            .and_then(|page| page.parse().ok())
            .unwrap_or(default_page)
    }

    /// Build the store filter for the owners in `owner`.
    ///
    /// Filter values that cannot be parsed are ignored.
    fn to_filter(&self, owner: Option<UserId>) -> ExpenseFilter {
        let expense_type = self
            .expense_type
            .as_deref()
            .and_then(|raw| raw.parse::<ExpenseType>().ok());

        let parse_date = |raw: Option<&str>| {
            parse_optional_date(raw)
                .inspect_err(|error| tracing::debug!("Ignoring date filter: {error}"))
                .ok()
                .flatten()
        };

        ExpenseFilter {
            owner,
            category: self.category.clone(),
            expense_type,
            start_date: parse_date(self.start_date.as_deref()),
            end_date: parse_date(self.end_date.as_deref()),
            ..Default::default()
        }
    }

    /// The link to `page` that keeps the current filters.
    fn page_url(&self, page: u64) -> String {
        let filters = serde_urlencoded::to_string(self).unwrap_or_default();

        if filters.is_empty() {
            format!("{}?page={page}", endpoints::EXPENSES_VIEW)
        } else {
            format!("{}?{filters}&page={page}", endpoints::EXPENSES_VIEW)
        }
    }
}

/// Renders one page of the expenses the user may see, newest first.
///
/// Admins see every user's expenses along with the owner's username.
pub async fn get_expenses_page(
    State(state): State<ExpenseState>,
    jar: PrivateCookieJar,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ExpenseListQuery>,
) -> Result<Response, Error> {
    let query = query.normalized();
    let filter = query.to_filter(user.scope().owner_filter());
    let expenses = state.store.get_expenses(&filter).await?;

    let usernames = if user.is_admin() {
        state
            .store
            .get_users()
            .await?
            .into_iter()
            .map(|user| (user.id, user.username))
            .collect()
    } else {
        HashMap::new()
    };

    let page = paginate(
        expenses,
        query.page_number(state.pagination_config.default_page),
        state.pagination_config.default_page_size,
    );

    let (jar, flash) = take_flash(jar);
    let view = ExpensesView {
        user: &user,
        flash,
        query: &query,
        page: &page,
        usernames: &usernames,
        max_pages: state.pagination_config.max_pages,
    };

    Ok((jar, view.into_html()).into_response())
}

struct ExpensesView<'a> {
    user: &'a CurrentUser,
    flash: Option<Flash>,
    query: &'a ExpenseListQuery,
    page: &'a Page<Expense>,
    usernames: &'a HashMap<UserId, String>,
    max_pages: u64,
}

impl ExpensesView<'_> {
    fn into_html(self) -> Markup {
        let nav_bar = NavBar::new(endpoints::EXPENSES_VIEW, self.user.is_admin()).into_html();
        let show_owner = self.user.is_admin();
        let query = self.query;

        let content = html! {
            (nav_bar)
            (flash_view(self.flash))

            div class=(PAGE_CONTAINER_STYLE)
            {
                div class="w-full max-w-screen-xl"
                {
                    div class="flex justify-between items-center mb-4"
                    {
                        h1 class="text-2xl font-bold" { "Expenses" }

                        a href=(endpoints::ADD_EXPENSE_VIEW) class=(LINK_STYLE) { "Add Expense" }
                    }

                    (filter_form(query))

                    @if self.page.items.is_empty() {
                        p class="my-8 text-center text-gray-500 dark:text-gray-400"
                        {
                            "No expenses found. "
                            a href=(endpoints::ADD_EXPENSE_VIEW) class=(LINK_STYLE) { "Add one" }
                        }
                    } @else {
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
                                        th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                                        th scope="col" class=(TABLE_CELL_STYLE) { "Type" }
                                        th scope="col" class="px-6 py-4 text-right" { "Amount" }
                                        th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                                    }
                                }

                                tbody
                                {
                                    @for expense in &self.page.items {
                                        (expense_row(expense, show_owner.then(|| {
                                            self.usernames
                                                .get(&expense.user_id)
                                                .map(String::as_str)
                                                .unwrap_or("Unknown")
                                        })))
                                    }
                                }
                            }
                        }

                        p class="mt-2 text-sm text-gray-500 dark:text-gray-400"
                        {
                            (self.page.total) " expenses"
                        }
                    }

                    (pagination_view(
                        self.page.page,
                        self.page.pages,
                        self.max_pages,
                        |page| query.page_url(page),
                    ))
                }
            }
        };

        base("Expenses", &[], &content)
    }
}

fn filter_form(query: &ExpenseListQuery) -> Markup {
    let selected_type = query.expense_type.as_deref().unwrap_or_default();

    html! {
        form
            method="get"
            action=(endpoints::EXPENSES_VIEW)
            class="grid grid-cols-1 md:grid-cols-5 gap-4 items-end mb-6"
        {
            div
            {
                label for="category" class=(FORM_LABEL_STYLE) { "Category" }
                select name="category" id="category" class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="" { "All" }
                    @for category in CATEGORIES {
                        option
                            value=(category)
                            selected[query.category.as_deref() == Some(category)]
                        {
                            (category)
                        }
                    }
                }
            }

            div
            {
                label for="type" class=(FORM_LABEL_STYLE) { "Type" }
                select name="type" id="type" class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="" { "All" }
                    @for expense_type in ExpenseType::ALL {
                        option
                            value=(expense_type.as_str())
                            selected[selected_type == expense_type.as_str()]
                        {
                            (expense_type.label())
                        }
                    }
                }
            }

            div
            {
                label for="start_date" class=(FORM_LABEL_STYLE) { "From" }
                input
                    type="date"
                    name="start_date"
                    id="start_date"
                    value=[query.start_date.as_deref()]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="end_date" class=(FORM_LABEL_STYLE) { "To" }
                input
                    type="date"
                    name="end_date"
                    id="end_date"
                    value=[query.end_date.as_deref()]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div class="flex gap-4 items-center"
            {
                button type="submit" class="px-4 py-2 bg-blue-500 text-white rounded" { "Filter" }
                a href=(endpoints::EXPENSES_VIEW) class=(LINK_STYLE) { "Clear" }
            }
        }
    }
}

fn expense_row(expense: &Expense, owner: Option<&str>) -> Markup {
    let badge_style = match expense.expense_type {
        ExpenseType::Wanted => WANTED_BADGE_STYLE,
        ExpenseType::Unwanted => UNWANTED_BADGE_STYLE,
    };
    let edit_url = format_endpoint(endpoints::EDIT_EXPENSE_VIEW, expense.id);
    let delete_url = format_endpoint(endpoints::DELETE_EXPENSE, expense.id);

    html! {
        tr class=(TABLE_ROW_STYLE) data-expense-id=(expense.id)
        {
            td class=(TABLE_CELL_STYLE)
            {
                time datetime=(format_date_for_input(expense.date.date()))
                {
                    (format_date_display(expense.date.date()))
                }
            }
            @if let Some(owner) = owner {
                td class=(TABLE_CELL_STYLE) { (owner) }
            }
            td class=(TABLE_CELL_STYLE) { (expense.category) }
            td class=(TABLE_CELL_STYLE) { (expense.description.as_deref().unwrap_or_default()) }
            td class=(TABLE_CELL_STYLE)
            {
                span class=(badge_style) { (expense.expense_type.label()) }
            }
            td class="px-6 py-4 text-right" { (format_currency(expense.amount)) }
            td class="px-6 py-4 flex gap-4"
            {
                a href=(edit_url) class=(LINK_STYLE) { "Edit" }
                a
                    href=(delete_url)
                    class=(BUTTON_DELETE_STYLE)
                    onclick="return confirm('Are you sure you want to delete this expense?')"
                {
                    "Delete"
                }
            }
        }
    }
}
