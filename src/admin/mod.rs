//! Pages and endpoints for managing users. Every route here sits behind
//! the admin guard.

use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use maud::{Markup, html};

use crate::{
    AppState, endpoints,
    html::{FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, LINK_STYLE, base, rupee_input_styles},
    navigation::NavBar,
    store::Store,
};

mod add_user;
mod delete_user;
mod edit_user;
mod reset_password;
mod users;

pub use add_user::{add_user_endpoint, get_add_user_page};
pub use delete_user::delete_user_endpoint;
pub use edit_user::{edit_user_endpoint, get_edit_user_page};
pub use reset_password::reset_password_endpoint;
pub use users::get_admin_page;

/// The state needed by the admin pages.
#[derive(Debug, Clone)]
pub struct AdminState {
    pub cookie_key: Key,
    pub store: Arc<dyn Store>,
}

impl FromRef<AppState> for AdminState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            store: state.store.clone(),
        }
    }
}

impl FromRef<AdminState> for Key {
    fn from_ref(state: &AdminState) -> Self {
        state.cookie_key.clone()
    }
}

/// The minimum password length checked in the browser before the strength check on the server.
const PASSWORD_INPUT_MIN_LENGTH: u8 = 8;

fn admin_checkbox(checked: bool) -> Markup {
    html! {
        div class="flex items-center gap-2"
        {
            input type="checkbox" name="is_admin" id="is_admin" checked[checked];
            label for="is_admin" class=(FORM_LABEL_STYLE) { "Admin" }
        }
    }
}

/// A full admin page holding one or more forms.
fn admin_form_page(title: &str, forms: &Markup) -> Markup {
    let nav_bar = NavBar::new(endpoints::ADMIN_VIEW, true).into_html();

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            div class="w-full space-y-6"
            {
                h1 class="text-xl font-bold" { (title) }
                (forms)
                a href=(endpoints::ADMIN_VIEW) class=(LINK_STYLE) { "Back to users" }
            }
        }
    };

    base(title, &[rupee_input_styles()], &content)
}
