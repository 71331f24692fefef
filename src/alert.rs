//! Alert system for displaying success and error messages to users.
//!
//! Alerts are either swapped into the page's `#alert-container` by htmx, or
//! rendered inline at the top of a page when carried over a redirect as a
//! flash message.

use maud::{Markup, html};

/// An alert message with styling based on whether it reports a success or an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    Success { message: String, details: String },
    SuccessSimple { message: String },
    Error { message: String, details: String },
    ErrorSimple { message: String },
}

impl Alert {
    fn is_success(&self) -> bool {
        matches!(self, Alert::Success { .. } | Alert::SuccessSimple { .. })
    }

    fn message(&self) -> &str {
        match self {
            Alert::Success { message, .. }
            | Alert::SuccessSimple { message }
            | Alert::Error { message, .. }
            | Alert::ErrorSimple { message } => message.as_str(),
        }
    }

    fn details(&self) -> Option<&str> {
        match self {
            Alert::Success { details, .. } | Alert::Error { details, .. }
                if !details.is_empty() =>
            {
                Some(details.as_str())
            }
            _ => None,
        }
    }

    /// Render the alert as a dismissible banner.
    pub fn into_html(self) -> Markup {
        let style = if self.is_success() {
            "p-4 mb-4 text-sm text-green-800 rounded-lg bg-green-50 \
            dark:bg-gray-800 dark:text-green-400 border border-green-300 dark:border-green-800"
        } else {
            "p-4 mb-4 text-sm text-red-800 rounded-lg bg-red-50 \
            dark:bg-gray-800 dark:text-red-400 border border-red-300 dark:border-red-800"
        };

        html! {
            div
                class=(style)
                role="alert"
                data-alert-kind=(if self.is_success() { "success" } else { "error" })
            {
                div class="flex items-start justify-between gap-4"
                {
                    div
                    {
                        span class="font-medium" { (self.message()) }

                        @if let Some(details) = self.details() {
                            p class="mt-1" { (details) }
                        }
                    }

                    button
                        type="button"
                        aria-label="Dismiss"
                        class="font-bold"
                        onclick="this.closest('[role=alert]').remove()"
                    {
                        "×"
                    }
                }
            }
        }
    }
}
