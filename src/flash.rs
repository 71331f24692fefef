//! One-shot messages that survive a redirect.
//!
//! A handler that redirects after a mutation stores a [Flash] in a private
//! cookie. The next page that renders takes the message out of the jar, which
//! removes the cookie, and shows it as an [Alert] above the page content.

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use maud::{Markup, html};
use serde::{Deserialize, Serialize};

use crate::alert::Alert;

pub(crate) const COOKIE_FLASH: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

/// A message to show on the next page the user sees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    pub fn into_alert(self) -> Alert {
        match self.kind {
            FlashKind::Success => Alert::SuccessSimple {
                message: self.message,
            },
            FlashKind::Error => Alert::ErrorSimple {
                message: self.message,
            },
        }
    }
}

/// Add `flash` to the cookie jar, replacing any message that has not been shown yet.
pub fn set_flash(jar: PrivateCookieJar, flash: Flash) -> PrivateCookieJar {
    match serde_json::to_string(&flash) {
        Ok(value) => jar.add(
            Cookie::build((COOKIE_FLASH, value))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax),
        ),
        Err(error) => {
            tracing::error!("Could not serialize flash message {flash:?}: {error}");
            jar
        }
    }
}

/// Remove the pending flash message from the jar, if there is one.
///
/// A cookie that cannot be decoded is discarded.
pub fn take_flash(jar: PrivateCookieJar) -> (PrivateCookieJar, Option<Flash>) {
    let Some(cookie) = jar.get(COOKIE_FLASH) else {
        return (jar, None);
    };

    let flash = serde_json::from_str::<Flash>(cookie.value())
        .inspect_err(|error| tracing::warn!("Discarding unreadable flash cookie: {error}"))
        .ok();

    (jar.remove(Cookie::build(COOKIE_FLASH).path("/")), flash)
}

/// Render the flash message as an alert, or nothing.
pub fn flash_view(flash: Option<Flash>) -> Markup {
    html! {
        @if let Some(flash) = flash {
            div id="flash" class="w-full max-w-screen-xl mx-auto px-4 pt-4"
            {
                (flash.into_alert().into_html())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum_extra::extract::{
        PrivateCookieJar,
        cookie::{Cookie, Key},
    };
    use sha2::{Digest, Sha512};

    use super::{COOKIE_FLASH, Flash, FlashKind, flash_view, set_flash, take_flash};

    fn get_jar() -> PrivateCookieJar {
        let hash = Sha512::digest(b"foobar");

        PrivateCookieJar::new(Key::from(&hash))
    }

    #[test]
    fn flash_is_taken_once() {
        let jar = set_flash(get_jar(), Flash::success("Expense added successfully!"));

        let (jar, flash) = take_flash(jar);
        let (_, second) = take_flash(jar);

        assert_eq!(flash, Some(Flash::success("Expense added successfully!")));
        assert_eq!(second, None);
    }

    #[test]
    fn unreadable_flash_is_discarded() {
        let jar = get_jar().add(Cookie::new(COOKIE_FLASH, "not json"));

        let (jar, flash) = take_flash(jar);

        assert_eq!(flash, None);
        assert!(jar.get(COOKIE_FLASH).is_none());
    }

    #[test]
    fn flash_view_renders_alert() {
        let markup = flash_view(Some(Flash {
            kind: FlashKind::Error,
            message: "Access denied. Admin only.".to_owned(),
        }))
        .into_string();

        assert!(markup.contains("Access denied. Admin only."));
        assert!(markup.contains("data-alert-kind=\"error\""));
    }

    #[test]
    fn no_flash_renders_nothing() {
        assert_eq!(flash_view(None).into_string(), "");
    }
}
