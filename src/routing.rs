//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_htmx::HxRedirect;
use tower_http::services::ServeDir;

use crate::{
    AppState,
    admin::{
        add_user_endpoint, delete_user_endpoint, edit_user_endpoint, get_add_user_page,
        get_admin_page, get_edit_user_page, reset_password_endpoint,
    },
    auth::{
        admin_guard, auth_guard, auth_guard_hx, get_log_in_page, get_log_out, get_register_page,
        post_log_in, register_user,
    },
    dashboard::get_dashboard_page,
    endpoints,
    expense::{
        create_expense_endpoint, delete_expense_endpoint, edit_expense_endpoint,
        get_add_expense_page, get_edit_expense_page, get_expenses_page,
    },
    export::{export_csv, export_json},
    import::{get_import_page, import_expenses},
    internal_server_error::get_internal_server_error_page,
    not_found::get_404_not_found,
    reports::{get_chart_data, get_reports_page, get_savings_suggestions, get_user_expenses},
    sample_data::add_sample_data,
    settings::{clear_data, get_settings_page, update_profile, update_savings_goal},
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(
            endpoints::LOG_IN_VIEW,
            get(get_log_in_page).post(post_log_in),
        )
        .route(
            endpoints::REGISTER_VIEW,
            get(get_register_page).post(register_user),
        )
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let protected_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .route(endpoints::ADD_EXPENSE_VIEW, get(get_add_expense_page))
        .route(endpoints::EXPENSES_VIEW, get(get_expenses_page))
        .route(endpoints::EDIT_EXPENSE_VIEW, get(get_edit_expense_page))
        .route(endpoints::DELETE_EXPENSE, get(delete_expense_endpoint))
        .route(endpoints::REPORTS_VIEW, get(get_reports_page))
        .route(endpoints::CHART_DATA_API, get(get_chart_data))
        .route(endpoints::SAVINGS_SUGGESTIONS_API, get(get_savings_suggestions))
        .route(endpoints::USER_EXPENSES_API, get(get_user_expenses))
        .route(endpoints::SETTINGS_VIEW, get(get_settings_page))
        .route(endpoints::ADD_SAMPLE_DATA, get(add_sample_data))
        .route(endpoints::EXPORT_CSV, get(export_csv))
        .route(endpoints::EXPORT_JSON, get(export_json))
        .route(endpoints::IMPORT_VIEW, get(get_import_page))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // These POST routes need to use the HX-REDIRECT header for auth redirects to work properly for HTMX requests.
    let protected_hx_routes = Router::new()
        .route(endpoints::ADD_EXPENSE_VIEW, post(create_expense_endpoint))
        .route(endpoints::EDIT_EXPENSE_VIEW, post(edit_expense_endpoint))
        .route(endpoints::UPDATE_PROFILE, post(update_profile))
        .route(endpoints::UPDATE_SAVINGS_GOAL, post(update_savings_goal))
        .route(endpoints::CLEAR_DATA, post(clear_data))
        .route(endpoints::IMPORT_VIEW, post(import_expenses))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx));

    // The admin guard reads the user placed in the request by the auth guard,
    // so it has to be the inner layer.
    let admin_routes = Router::new()
        .route(endpoints::ADMIN_VIEW, get(get_admin_page))
        .route(
            endpoints::ADMIN_ADD_USER,
            get(get_add_user_page).post(add_user_endpoint),
        )
        .route(
            endpoints::ADMIN_EDIT_USER,
            get(get_edit_user_page).post(edit_user_endpoint),
        )
        .route(endpoints::ADMIN_DELETE_USER, post(delete_user_endpoint))
        .route(
            endpoints::ADMIN_RESET_PASSWORD,
            post(reset_password_endpoint),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_guard))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(protected_hx_routes)
        .merge(admin_routes)
        .merge(unprotected_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The root path '/' redirects to the dashboard page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD_VIEW)
}

/// Get a response that will redirect the client to the internal server error 500 page.
///
/// **Note**: This redirect is intended to be served as a response to a POST request initiated by HTMX.
/// Route handlers using GET should use `axum::response::Redirect` to redirect via a response.
pub(crate) fn get_internal_server_error_redirect() -> Response {
    (
        HxRedirect(endpoints::INTERNAL_ERROR_VIEW.to_owned()),
        StatusCode::INTERNAL_SERVER_ERROR,
    )
        .into_response()
}

#[cfg(test)]
mod root_route_tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use crate::{endpoints, routing::get_index_page};

    #[tokio::test]
    async fn root_redirects_to_dashboard() {
        let response = get_index_page().await.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let location = response.headers().get("location").unwrap();
        assert_eq!(location, endpoints::DASHBOARD_VIEW);
    }
}

#[cfg(test)]
mod router_tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::json;
    use time::macros::datetime;

    use crate::{
        AppState, build_router,
        endpoints::{self, format_endpoint},
        flash::COOKIE_FLASH,
        models::{ExpenseType, NewExpense, User},
        test_utils::{auth_cookie_for, create_test_user, get_test_state},
    };

    fn get_server(state: &AppState) -> TestServer {
        TestServer::new(build_router(state.clone()))
    }

    async fn add_expense(state: &AppState, user: &User, amount: f64) {
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

    #[tokio::test]
    async fn log_in_page_is_public() {
        let state = get_test_state();

        get_server(&state)
            .get(endpoints::LOG_IN_VIEW)
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn pages_require_log_in() {
        let state = get_test_state();
        let server = get_server(&state);

        for page in [
            endpoints::DASHBOARD_VIEW,
            endpoints::EXPENSES_VIEW,
            endpoints::REPORTS_VIEW,
            endpoints::SETTINGS_VIEW,
            endpoints::ADMIN_VIEW,
        ] {
            let response = server.get(page).await;

            response.assert_status_see_other();
            let location = response.header("location");
            assert!(
                location.to_str().unwrap().starts_with(endpoints::LOG_IN_VIEW),
                "{page} redirected to {location:?}"
            );
        }
    }

    #[tokio::test]
    async fn logged_in_user_sees_dashboard() {
        let state = get_test_state();
        let user = create_test_user(state.store.as_ref(), "asha", false).await;

        get_server(&state)
            .get(endpoints::DASHBOARD_VIEW)
            .add_cookie(auth_cookie_for(&state.cookie_key, user.id))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn admin_pages_turn_away_regular_users() {
        let state = get_test_state();
        let user = create_test_user(state.store.as_ref(), "asha", false).await;

        let response = get_server(&state)
            .get(endpoints::ADMIN_VIEW)
            .add_cookie(auth_cookie_for(&state.cookie_key, user.id))
            .await;

        response.assert_status_see_other();
        assert_eq!(response.header("location"), endpoints::DASHBOARD_VIEW);
        assert!(response.maybe_cookie(COOKIE_FLASH).is_some());
    }

    #[tokio::test]
    async fn admin_pages_let_admins_in() {
        let state = get_test_state();
        let admin = create_test_user(state.store.as_ref(), "admin", true).await;

        get_server(&state)
            .get(endpoints::ADMIN_VIEW)
            .add_cookie(auth_cookie_for(&state.cookie_key, admin.id))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn user_expenses_api_is_limited_to_own_totals() {
        let state = get_test_state();
        let asha = create_test_user(state.store.as_ref(), "asha", false).await;
        let ravi = create_test_user(state.store.as_ref(), "ravi", false).await;
        let admin = create_test_user(state.store.as_ref(), "admin", true).await;
        add_expense(&state, &ravi, 40.0).await;
        add_expense(&state, &ravi, 2.5).await;
        let server = get_server(&state);
        let url = format_endpoint(endpoints::USER_EXPENSES_API, ravi.id);

        let response = server
            .get(&url)
            .add_cookie(auth_cookie_for(&state.cookie_key, asha.id))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
        response.assert_json(&json!({ "error": "Unauthorized" }));

        let response = server
            .get(&url)
            .add_cookie(auth_cookie_for(&state.cookie_key, admin.id))
            .await;
        response.assert_status_ok();
        response.assert_json(&json!({ "total_expenses": 42.5 }));
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let state = get_test_state();

        get_server(&state)
            .get("/does/not/exist")
            .await
            .assert_status_not_found();
    }
}
