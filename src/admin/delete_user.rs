use axum::{
    Extension,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use axum_htmx::HxRedirect;

use crate::{
    Error,
    admin::AdminState,
    auth::CurrentUser,
    endpoints,
    flash::{Flash, set_flash},
    models::UserId,
};

/// Delete a user together with their expenses and savings goals.
///
/// Admins cannot delete their own account.
pub async fn delete_user_endpoint(
    State(state): State<AdminState>,
    jar: PrivateCookieJar,
    Extension(current_user): Extension<CurrentUser>,
    Path(user_id): Path<UserId>,
) -> Response {
    if user_id == current_user.id() {
        return Error::CannotDeleteSelf.into_alert_response();
    }

    match state.store.delete_user(user_id).await {
        Ok(true) => {
            tracing::info!("Admin {} deleted user {user_id}", current_user.id());
            (
                set_flash(jar, Flash::success("User deleted successfully!")),
                HxRedirect(endpoints::ADMIN_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Ok(false) => Error::NotFound.into_alert_response(),
        Err(error) => error.into_alert_response(),
    }
}
