//! Authentication middleware that validates cookies, extends sessions, and handles redirects.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{StatusCode, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;

use crate::{
    AppState,
    auth::{
        CurrentUser, DEFAULT_COOKIE_DURATION,
        cookie::{extend_auth_cookie_duration_if_needed, get_token_from_cookies},
        invalidate_auth_cookie,
        redirect::{build_log_in_redirect_url, build_log_in_redirect_url_from_target, is_hx_request},
    },
    endpoints,
    flash::{Flash, set_flash},
    store::Store,
};

/// The state needed for the auth middleware
#[derive(Debug, Clone)]
pub struct AuthState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// Used to load the logged-in user.
    pub store: Arc<dyn Store>,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            store: state.store.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

/// Checks for a valid auth cookie and loads the user it names.
///
/// The [CurrentUser] is placed into the request extensions and the request
/// executed normally if the cookie is valid and the user still exists,
/// otherwise a redirect to the log-in page is returned using `get_redirect`.
#[inline]
async fn auth_guard_internal(
    state: AuthState,
    request: Request,
    next: Next,
    get_redirect: impl Fn(&str) -> Response,
) -> Response {
    let log_in_redirect_url = build_log_in_redirect_url(&request).unwrap_or_else(|| {
        tracing::debug!("No usable redirect URL in request. Falling back to dashboard.");

        build_log_in_redirect_url_from_target(endpoints::DASHBOARD_VIEW)
            .unwrap_or_else(|| endpoints::LOG_IN_VIEW.to_owned())
    });

    let (mut parts, body) = request.into_parts();
    let jar = match PrivateCookieJar::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(err) => {
            tracing::error!("Error getting cookie jar: {err:?}. Redirecting to log in page.");
            return get_redirect(&log_in_redirect_url);
        }
    };
    let user_id = match get_token_from_cookies(&jar) {
        Ok(token) => token.user_id,
        Err(_) => return get_redirect(&log_in_redirect_url),
    };

    let user = match state.store.get_user(user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::warn!("Auth cookie names user {user_id} who no longer exists.");
            let jar = invalidate_auth_cookie(jar);
            return (jar, get_redirect(&log_in_redirect_url)).into_response();
        }
        Err(error) => {
            tracing::error!("Could not load user {user_id}: {error}");
            return error.into_response();
        }
    };

    parts.extensions.insert(CurrentUser(user));
    let request = Request::from_parts(parts, body);
    let response = next.run(request).await;

    let (mut parts, body) = response.into_parts();
    let jar = match extend_auth_cookie_duration_if_needed(jar.clone(), DEFAULT_COOKIE_DURATION) {
        Ok(updated_jar) => updated_jar,
        Err(err) => {
            tracing::error!("Error extending cookie duration: {err:?}. Rolling back cookie jar.");
            jar
        }
    };
    for (key, val) in jar.into_response().headers().iter() {
        if key != SET_COOKIE {
            continue;
        }

        parts.headers.append(key, val.to_owned());
    }

    Response::from_parts(parts, body)
}

/// Middleware function that checks for a valid authorization cookie.
/// The current user is placed into the request and then the request executed normally if the cookie is valid, otherwise a redirect to the log-in page is returned.
///
/// **Note**: Route handlers can use the function argument `Extension(user): Extension<CurrentUser>` to receive the user.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        Redirect::to(redirect_url).into_response()
    })
    .await
}

/// Middleware function that checks for a valid authorization cookie.
/// The current user is placed into the request and then the request executed normally if the cookie is valid, otherwise a HTMX redirect to the log-in page is returned.
///
/// **Note**: Route handlers can use the function argument `Extension(user): Extension<CurrentUser>` to receive the user.
pub async fn auth_guard_hx(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        (HxRedirect(redirect_url.to_owned()), StatusCode::OK).into_response()
    })
    .await
}

/// Middleware function that lets only admins through.
///
/// Must run after [auth_guard] or [auth_guard_hx]. Everybody else is sent to
/// the dashboard with the message "Access denied. Admin only.".
pub async fn admin_guard(jar: PrivateCookieJar, request: Request, next: Next) -> Response {
    let is_admin = request
        .extensions()
        .get::<CurrentUser>()
        .is_some_and(CurrentUser::is_admin);

    if is_admin {
        return next.run(request).await;
    }

    tracing::warn!("Non-admin request to {} was denied.", request.uri().path());
    let jar = set_flash(jar, Flash::error("Access denied. Admin only."));

    if is_hx_request(&request) {
        (
            jar,
            HxRedirect(endpoints::DASHBOARD_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response()
    } else {
        (jar, Redirect::to(endpoints::DASHBOARD_VIEW)).into_response()
    }
}
