//! Sessions, log-in and registration, and the rules for who may see what.

mod access;
mod cookie;
mod log_in;
mod log_out;
mod middleware;
mod redirect;
mod register;
mod token;

pub use access::{AccessScope, CurrentUser, load_authorized_expense};
pub use cookie::{DEFAULT_COOKIE_DURATION, invalidate_auth_cookie, set_auth_cookie};
pub use log_in::{get_log_in_page, post_log_in};
pub use log_out::get_log_out;
pub use middleware::{admin_guard, auth_guard, auth_guard_hx};
pub use redirect::normalize_redirect_url;
pub use register::{get_register_page, register_user};

#[cfg(test)]
pub use cookie::COOKIE_TOKEN;

#[cfg(test)]
pub use middleware::AuthState;
