//! The admin overview of every user and how much they have spent.

use std::collections::HashMap;

use axum::{
    Extension,
    extract::State,
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use maud::{Markup, html};

use crate::{
    Error,
    admin::AdminState,
    auth::CurrentUser,
    datetime::format_date_display,
    endpoints::{self, format_endpoint},
    flash::{Flash, flash_view, take_flash},
    html::{
        BUTTON_DELETE_STYLE, CARD_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, format_currency,
    },
    models::{User, UserId},
    navigation::NavBar,
    store::ExpenseFilter,
};

/// A user with the totals shown in the admin table.
struct UserRow {
    user: User,
    expense_count: usize,
    total_expenses: f64,
}

/// Display every user with their expense totals.
pub async fn get_admin_page(
    State(state): State<AdminState>,
    jar: PrivateCookieJar,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Response, Error> {
    let users = state.store.get_users().await?;
    let expenses = state
        .store
        .get_expenses(&ExpenseFilter::default().unordered())
        .await?;

    let mut totals: HashMap<UserId, (usize, f64)> = HashMap::new();
    for expense in &expenses {
        let entry = totals.entry(expense.user_id).or_default();
        entry.0 += 1;
        entry.1 += expense.amount;
    }

    let total_expenses = expenses.iter().map(|expense| expense.amount).sum();
    let rows: Vec<UserRow> = users
        .into_iter()
        .map(|user| {
            let (expense_count, total_expenses) =
                totals.get(&user.id).copied().unwrap_or_default();

            UserRow {
                user,
                expense_count,
                total_expenses,
            }
        })
        .collect();

    let (jar, flash) = take_flash(jar);

    Ok((
        jar,
        admin_view(&current_user, flash, &rows, total_expenses),
    )
        .into_response())
}

fn admin_view(
    current_user: &CurrentUser,
    flash: Option<Flash>,
    rows: &[UserRow],
    total_expenses: f64,
) -> Markup {
    let nav_bar = NavBar::new(endpoints::ADMIN_VIEW, true).into_html();

    let content = html! {
        (nav_bar)
        (flash_view(flash))

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-screen-xl space-y-8"
            {
                div class="flex justify-between items-center"
                {
                    h1 class="text-2xl font-bold" { "Admin" }
                    a href=(endpoints::ADMIN_ADD_USER) class=(LINK_STYLE) { "Add User" }
                }

                section class="grid grid-cols-1 sm:grid-cols-2 gap-4"
                {
                    div class=(CARD_STYLE) data-stat="Users"
                    {
                        p class="text-sm text-gray-500 dark:text-gray-400" { "Users" }
                        p class="text-2xl font-bold" { (rows.len()) }
                    }
                    div class=(CARD_STYLE) data-stat="Total Expenses"
                    {
                        p class="text-sm text-gray-500 dark:text-gray-400" { "Total Expenses" }
                        p class="text-2xl font-bold" { (format_currency(total_expenses)) }
                    }
                }

                div class="relative overflow-x-auto shadow-md rounded-lg"
                {
                    table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Username" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Email" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Role" }
                                th scope="col" class="px-6 py-4 text-right" { "Income" }
                                th scope="col" class="px-6 py-4 text-right" { "Expenses" }
                                th scope="col" class="px-6 py-4 text-right" { "Total Spent" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Joined" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                            }
                        }

                        tbody
                        {
                            @for row in rows {
                                (user_row(row, row.user.id == current_user.id()))
                            }
                        }
                    }
                }
            }
        }
    };

    base("Admin", &[], &content)
}

fn user_row(row: &UserRow, is_current_user: bool) -> Markup {
    let user = &row.user;

    html! {
        tr class=(TABLE_ROW_STYLE) data-user-id=(user.id)
        {
            td class=(TABLE_CELL_STYLE) { (user.username) }
            td class=(TABLE_CELL_STYLE) { (user.email) }
            td class=(TABLE_CELL_STYLE)
            {
                @if user.is_admin { "Admin" } @else { "User" }
            }
            td class="px-6 py-4 text-right" { (format_currency(user.monthly_income)) }
            td class="px-6 py-4 text-right" { (row.expense_count) }
            td class="px-6 py-4 text-right" { (format_currency(row.total_expenses)) }
            td class=(TABLE_CELL_STYLE) { (format_date_display(user.created_at.date())) }
            td class="px-6 py-4 flex gap-4"
            {
                a href=(format_endpoint(endpoints::ADMIN_EDIT_USER, user.id)) class=(LINK_STYLE)
                {
                    "Edit"
                }

                @if !is_current_user {
                    button
                        hx-post=(format_endpoint(endpoints::ADMIN_DELETE_USER, user.id))
                        hx-confirm={ "Delete " (user.username) " and all of their data?" }
                        hx-target-error="#alert-container"
                        class=(BUTTON_DELETE_STYLE)
                    {
                        "Delete"
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{Extension, Router, routing::get};
    use axum_test::TestServer;
    use scraper::{Html, Selector};
    use time::macros::datetime;

    use crate::{
        auth::CurrentUser,
        endpoints,
        html::format_currency,
        models::{ExpenseType, NewExpense},
        test_utils::{assert_valid_html, create_test_user, get_test_state},
    };

    use super::get_admin_page;

    #[tokio::test]
    async fn lists_users_with_totals() {
        let state = get_test_state();
        let admin = create_test_user(state.store.as_ref(), "admin", true).await;
        let user = create_test_user(state.store.as_ref(), "asha", false).await;
        for amount in [100.0, 50.0] {
            state
                .store
                .create_expense(
                    NewExpense::new(
                        user.id,
                        amount,
                        "Food",
                        None,
                        ExpenseType::Wanted,
                        datetime!(2025-03-05 12:00),
                    )
                    .unwrap(),
                )
                .await
                .unwrap();
        }
        let app = Router::new()
            .route(endpoints::ADMIN_VIEW, get(get_admin_page))
            .layer(Extension(CurrentUser(admin.clone())))
            .with_state(state.clone());
        let server = TestServer::new(app);

        let response = server.get(endpoints::ADMIN_VIEW).await;

        response.assert_status_ok();
        let document = Html::parse_document(&response.text());
        assert_valid_html(&document);

        let row_selector = Selector::parse(&format!("tr[data-user-id='{}'] td", user.id)).unwrap();
        let cells: Vec<String> = document
            .select(&row_selector)
            .map(|td| td.text().collect::<String>().trim().to_owned())
            .collect();
        assert_eq!(cells[0], "asha");
        assert_eq!(cells[4], "2");
        assert_eq!(cells[5], format_currency(150.0));

        // Admins cannot delete themselves from the table.
        let own_delete = Selector::parse(&format!("tr[data-user-id='{}'] button", admin.id)).unwrap();
        assert!(document.select(&own_delete).next().is_none());
    }
}
