//! This file defines the navigation bar shown at the top of every page for logged-in users.

use maud::{Markup, html};

use crate::endpoints;

/// A link in the navigation bar.
///
/// It will change appearance if `is_current` is set to
/// `true`. Only one link should be set as active at any one time.
#[derive(Clone)]
struct Link<'a> {
    url: &'a str,
    title: &'a str,
    is_current: bool,
}

impl Link<'_> {
    fn into_html(self) -> Markup {
        let style = if self.is_current {
            "block py-2 px-3 text-white bg-blue-700 rounded-sm lg:bg-transparent
        lg:text-blue-700 lg:p-0 dark:text-white lg:dark:text-blue-500"
        } else {
            "block py-2 px-3 text-gray-900 rounded-sm hover:bg-gray-100
        lg:hover:bg-transparent lg:border-0 lg:hover:text-blue-700 lg:p-0
        dark:text-white lg:dark:hover:text-blue-500 dark:hover:bg-gray-700
        dark:hover:text-white lg:dark:hover:bg-transparent"
        };

        html!(
            a
                href=(self.url)
                class=(style)
                aria-current=[self.is_current.then_some("page")]
            {
                (self.title)
            }
        )
    }
}

pub struct NavBar<'a> {
    links: Vec<Link<'a>>,
}

impl NavBar<'_> {
    /// Get the navigation bar.
    ///
    /// If a link matches `active_endpoint`, then that link will be
    /// marked as active and displayed differently in the HTML.
    /// The admin link is only included when `is_admin` is `true`.
    pub fn new(active_endpoint: &str, is_admin: bool) -> NavBar<'_> {
        let mut pages = vec![
            (endpoints::DASHBOARD_VIEW, "Dashboard"),
            (endpoints::EXPENSES_VIEW, "Expenses"),
            (endpoints::ADD_EXPENSE_VIEW, "Add Expense"),
            (endpoints::REPORTS_VIEW, "Reports"),
            (endpoints::IMPORT_VIEW, "Import"),
            (endpoints::SETTINGS_VIEW, "Settings"),
        ];

        if is_admin {
            pages.push((endpoints::ADMIN_VIEW, "Admin"));
        }

        let mut links: Vec<Link<'_>> = pages
            .into_iter()
            .map(|(url, title)| Link {
                url,
                title,
                is_current: active_endpoint == url,
            })
            .collect();

        links.push(Link {
            url: endpoints::LOG_OUT,
            title: "Log out",
            is_current: false,
        });

        NavBar { links }
    }

    pub fn into_html(self) -> Markup {
        // Template adapted from https://flowbite.com/docs/components/navbar/#default-navbar
        html!(
            nav class="bg-white border-gray-200 dark:bg-gray-900"
            {
                div
                    class="max-w-screen-xl flex flex-wrap items-center justify-between mx-auto p-4"
                {
                    a
                        href=(endpoints::DASHBOARD_VIEW)
                        class="flex items-center space-x-3 rtl:space-x-reverse"
                    {
                        span
                            class="self-center text-2xl font-semibold whitespace-nowrap dark:text-white"
                        {
                            "Expense Tracker"
                        }
                    }

                    div class="w-full lg:block lg:w-auto"
                    {
                        ul
                            class="font-medium flex flex-col p-4 lg:p-0 mt-4
                            border border-gray-100 rounded bg-gray-50
                            lg:flex-row lg:space-x-8 rtl:space-x-reverse lg:mt-0
                            lg:border-0 lg:bg-white dark:bg-gray-800
                            lg:dark:bg-gray-900 dark:border-gray-700"
                        {
                            @for link in self.links {
                                li { (link.into_html()) }
                            }
                        }
                    }
                }
            }
        )
    }
}

#[cfg(test)]
mod nav_bar_tests {
    use std::collections::HashMap;

    use crate::{endpoints, navigation::NavBar};

    #[test]
    fn set_active_endpoint() {
        let mut cases = HashMap::new();
        cases.insert(endpoints::DASHBOARD_VIEW, true);
        cases.insert(endpoints::EXPENSES_VIEW, true);
        cases.insert(endpoints::ADD_EXPENSE_VIEW, true);
        cases.insert(endpoints::REPORTS_VIEW, true);
        cases.insert(endpoints::SETTINGS_VIEW, true);
        cases.insert(endpoints::ADMIN_VIEW, true);

        cases.insert(endpoints::ROOT, false);
        cases.insert(endpoints::LOG_IN_VIEW, false);
        cases.insert(endpoints::LOG_OUT, false);
        cases.insert(endpoints::REGISTER_VIEW, false);
        cases.insert(endpoints::CHART_DATA_API, false);

        for (endpoint, should_be_active) in cases {
            let nav_bar = NavBar::new(endpoint, true);

            assert_link_active(nav_bar, endpoint, should_be_active);
        }
    }

    #[test]
    fn admin_link_only_for_admins() {
        let has_admin_link =
            |nav_bar: NavBar| nav_bar.links.iter().any(|link| link.url == endpoints::ADMIN_VIEW);

        assert!(has_admin_link(NavBar::new(endpoints::DASHBOARD_VIEW, true)));
        assert!(!has_admin_link(NavBar::new(endpoints::DASHBOARD_VIEW, false)));
    }

    #[track_caller]
    fn assert_link_active(nav_bar: NavBar<'_>, endpoint: &str, should_be_active: bool) {
        for link in nav_bar.links {
            if link.url == endpoint {
                assert_eq!(
                    link.is_current, should_be_active,
                    "Link for {endpoint} should have is_current={should_be_active}"
                )
            } else {
                assert!(
                    !link.is_current,
                    "Link for {} should be inactive when {endpoint} is the current page",
                    link.url
                )
            }
        }
    }
}
