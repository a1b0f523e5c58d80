//! This file defines the templates and a convenience function for creating the navigation bar.

use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    Error,
    auth::{UserID, get_user_by_id},
    endpoints,
    notification::count_unread_notifications,
};

/// The logged in user as far as the page layout is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: UserID,
    pub is_treasurer: bool,
    pub unread_notifications: u32,
}

/// Load the role and unread notification count for `user_id`.
pub fn get_viewer(user_id: UserID, connection: &Connection) -> Result<Viewer, Error> {
    let user = get_user_by_id(user_id, connection)
        .inspect_err(|error| tracing::error!("Could not get user {user_id}: {error}"))?;
    let unread_notifications = count_unread_notifications(user_id, connection)
        .inspect_err(|error| tracing::error!("Could not count notifications: {error}"))?;

    Ok(Viewer {
        user_id,
        is_treasurer: user.is_treasurer(),
        unread_notifications,
    })
}

/// Template for a link in the navigation bar.
///
/// It will change appearance if `is_current` is set to
/// `true`. Only one link should be set as active at any one time.
#[derive(Clone)]
struct Link<'a> {
    url: &'a str,
    title: &'a str,
    is_current: bool,
    /// Shown in the bottom bar on small screens rather than under "More".
    is_primary: bool,
}

impl Link<'_> {
    fn into_desktop_html(self, badge: Option<u32>) -> Markup {
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
            a href=(self.url) class=(style)
            {
                (self.title)
                (unread_badge(badge))
            }
        )
    }
}

fn unread_badge(count: Option<u32>) -> Markup {
    html!(
        @if let Some(count) = count.filter(|count| *count > 0) {
            span
                class="ms-1 inline-flex items-center justify-center px-2 text-xs
                    font-semibold text-white bg-red-600 rounded-full"
                data-unread-count=(count)
            {
                (count)
            }
        }
    )
}

pub struct NavBar<'a> {
    links: Vec<Link<'a>>,
    unread_notifications: u32,
}

impl NavBar<'_> {
    /// Get the navigation bar.
    ///
    /// If a link matches `active_endpoint`, then that link will be
    /// marked as active and displayed differently in the HTML.
    /// Treasurer only pages are linked only for treasurers.
    pub fn new(active_endpoint: &str, viewer: Viewer) -> NavBar<'_> {
        let link = |url, title, is_primary| Link {
            url,
            title,
            is_current: active_endpoint == url,
            is_primary,
        };

        let mut links = vec![
            link(endpoints::DASHBOARD_VIEW, "Dashboard", true),
            link(endpoints::TRANSACTIONS_VIEW, "Transactions", true),
            link(endpoints::INCOME_VIEW, "Income", true),
            link(endpoints::BUDGETS_VIEW, "Budgets", false),
            link(endpoints::CATEGORIES_VIEW, "Categories", false),
            link(endpoints::REPORT_VIEW, "Report", false),
        ];

        if viewer.is_treasurer {
            links.push(link(endpoints::AUDIT_LOG_VIEW, "Audit Log", false));
        }

        links.push(link(endpoints::NOTIFICATIONS_VIEW, "Notifications", false));
        links.push(Link {
            url: endpoints::LOG_OUT,
            title: "Log out",
            is_current: false,
            is_primary: false,
        });

        NavBar {
            links,
            unread_notifications: viewer.unread_notifications,
        }
    }

    pub fn into_html(self) -> Markup {
        let unread_notifications = self.unread_notifications;
        let links = self.links;
        let badge_for = |link: &Link| {
            (link.url == endpoints::NOTIFICATIONS_VIEW).then_some(unread_notifications)
        };
        let more_is_active = links
            .iter()
            .any(|link| !link.is_primary && link.is_current);
        let bottom_link_class = |is_current: bool| -> &'static str {
            if is_current {
                "flex w-full min-w-0 items-center justify-center rounded-lg \
                bg-blue-50 px-2.5 py-2 text-xs font-semibold leading-tight \
                text-blue-700 shadow-sm sm:px-4 sm:text-sm \
                dark:bg-blue-900/30 dark:text-blue-200"
            } else {
                "flex w-full min-w-0 items-center justify-center rounded-lg \
                px-2.5 py-2 text-xs font-semibold leading-tight text-gray-600 \
                sm:px-4 sm:text-sm \
                hover:bg-blue-50/70 hover:text-blue-700 dark:text-gray-300 \
                dark:hover:bg-blue-900/20 dark:hover:text-blue-200"
            }
        };
        let more_summary_class = |is_active: bool| -> &'static str {
            if is_active {
                "list-none [&::-webkit-details-marker]:hidden flex w-full min-w-0 \
                items-center justify-center rounded-lg bg-blue-50 px-2.5 py-2 \
                text-xs font-semibold leading-tight sm:px-4 sm:text-sm \
                text-blue-700 shadow-sm cursor-pointer \
                dark:bg-blue-900/30 dark:text-blue-200"
            } else {
                "list-none [&::-webkit-details-marker]:hidden flex w-full min-w-0 \
                items-center justify-center rounded-lg px-2.5 py-2 text-xs \
                font-semibold leading-tight sm:px-4 sm:text-sm \
                text-gray-600 cursor-pointer hover:bg-blue-50/70 hover:text-blue-700 \
                dark:text-gray-300 dark:hover:bg-blue-900/20 \
                dark:hover:text-blue-200"
            }
        };
        let more_item_class = |is_current: bool| -> &'static str {
            if is_current {
                "block rounded-lg bg-blue-50 px-3 py-2 text-blue-700 \
                dark:bg-blue-900/30 dark:text-blue-200"
            } else {
                "block rounded-lg px-3 py-2 text-gray-700 hover:bg-gray-100 \
                hover:text-blue-700 dark:text-gray-200 dark:hover:bg-gray-800/80 \
                dark:hover:text-blue-200"
            }
        };

        // Template adapted from https://flowbite.com/docs/components/navbar/#default-navbar
        html!(
            nav class="bg-white border-gray-200 dark:bg-gray-900 print:hidden"
            {
                div
                    class="max-w-screen-xl flex flex-wrap items-center justify-between mx-auto p-4"
                {
                    a
                        href="/"
                        class="flex items-center space-x-3 rtl:space-x-reverse"
                    {
                        img
                            src="/static/favicon-128x128.png"
                            alt="Fundtrack Logo"
                            class="h-8"
                        ;

                        span
                            class="self-center text-2xl font-semibold whitespace-nowrap dark:text-white"
                        {
                            "Fundtrack"
                        }
                    }

                    div class="hidden w-full lg:block lg:w-auto"
                    {
                        ul
                            class="font-medium flex flex-col p-4 lg:p-0 mt-4
                            border border-gray-100 rounded bg-gray-50
                            lg:flex-row lg:space-x-8 rtl:space-x-reverse lg:mt-0
                            lg:border-0 lg:bg-white dark:bg-gray-800
                            lg:dark:bg-gray-900 dark:border-gray-700"
                        {
                            @for link in links.clone().into_iter() {
                                @let badge = badge_for(&link);
                                li { (link.into_desktop_html(badge)) }
                            }
                        }
                    }
                }
            }

            nav class="fixed inset-x-0 bottom-0 z-40 lg:hidden print:hidden"
            {
                div class="mx-auto max-w-screen-xl px-4 pb-4"
                {
                    div
                        class="rounded-xl border border-gray-200 bg-white/95
                        shadow-lg backdrop-blur dark:border-gray-700 dark:bg-gray-900/95"
                    {
                        ul
                            class="grid grid-cols-4 gap-2 px-4 py-3 text-xs font-semibold
                            text-gray-600 dark:text-gray-300"
                            aria-label="Primary"
                        {
                            @for link in links.iter().filter(|link| link.is_primary) {
                                li class="min-w-0" {
                                    a
                                        href=(link.url)
                                        class=(bottom_link_class(link.is_current))
                                        aria-current=[link.is_current.then_some("page")]
                                    {
                                        span class="truncate" { (link.title) }
                                    }
                                }
                            }

                            li class="min-w-0" {
                                details
                                    class="group relative"
                                {
                                    summary
                                        class=(more_summary_class(more_is_active))
                                        aria-current=[more_is_active.then_some("page")]
                                    {
                                        span class="truncate" { "More" }
                                        (unread_badge(Some(unread_notifications)))
                                    }

                                    div
                                        class="absolute bottom-full right-0 mb-3 w-44 rounded-xl
                                        border border-gray-200 bg-white/95 p-2 shadow-xl
                                        backdrop-blur dark:border-gray-700 dark:bg-gray-900/95"
                                    {
                                        ul class="flex flex-col gap-1 text-sm font-medium"
                                        {
                                            @for link in links.iter().filter(|link| !link.is_primary) {
                                                li {
                                                    a
                                                        href=(link.url)
                                                        class=(more_item_class(link.is_current))
                                                        aria-current=[link.is_current.then_some("page")]
                                                    {
                                                        (link.title)
                                                        (unread_badge(badge_for(link)))
                                                    }
                                                }
                                            }
                                        }
                                    }
                                }
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

    use rusqlite::Connection;
    use scraper::{Html, Selector};

    use crate::{
        auth::{PasswordHash, Role, UserID, create_user},
        db::initialize,
        endpoints,
        navigation::{NavBar, Viewer, get_viewer},
        notification::{NewNotification, NotificationKind, create_notification},
    };

    fn member() -> Viewer {
        Viewer {
            user_id: UserID::new(1),
            is_treasurer: false,
            unread_notifications: 0,
        }
    }

    #[test]
    fn set_active_endpoint() {
        let mut cases = HashMap::new();
        cases.insert(endpoints::DASHBOARD_VIEW, true);
        cases.insert(endpoints::TRANSACTIONS_VIEW, true);
        cases.insert(endpoints::INCOME_VIEW, true);
        cases.insert(endpoints::BUDGETS_VIEW, true);
        cases.insert(endpoints::CATEGORIES_VIEW, true);
        cases.insert(endpoints::REPORT_VIEW, true);
        cases.insert(endpoints::NOTIFICATIONS_VIEW, true);

        cases.insert(endpoints::ROOT, false);
        cases.insert(endpoints::POST_CATEGORY, false);
        cases.insert(endpoints::INTERNAL_ERROR_VIEW, false);
        cases.insert(endpoints::LOG_IN_API, false);
        cases.insert(endpoints::LOG_IN_VIEW, false);
        cases.insert(endpoints::LOG_OUT, false);
        cases.insert(endpoints::REGISTER_VIEW, false);
        cases.insert(endpoints::TRANSACTIONS_API, false);

        for (endpoint, should_be_active) in cases {
            let nav_bar = NavBar::new(endpoint, member());

            assert_link_active(nav_bar, endpoint, should_be_active);
        }
    }

    #[test]
    fn audit_log_only_shown_to_treasurers() {
        let has_audit_link = |nav_bar: NavBar| {
            nav_bar
                .links
                .iter()
                .any(|link| link.url == endpoints::AUDIT_LOG_VIEW)
        };

        assert!(!has_audit_link(NavBar::new(endpoints::DASHBOARD_VIEW, member())));
        assert!(has_audit_link(NavBar::new(
            endpoints::DASHBOARD_VIEW,
            Viewer {
                is_treasurer: true,
                ..member()
            }
        )));
    }

    #[test]
    fn shows_unread_count() {
        let viewer = Viewer {
            unread_notifications: 3,
            ..member()
        };

        let html = NavBar::new(endpoints::DASHBOARD_VIEW, viewer)
            .into_html()
            .into_string();
        let fragment = Html::parse_fragment(&html);
        let badge = fragment
            .select(&Selector::parse("[data-unread-count]").unwrap())
            .next()
            .expect("No unread badge found");

        assert_eq!(badge.text().collect::<String>().trim(), "3");
    }

    #[test]
    fn get_viewer_loads_role_and_unread_count() {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let user = create_user(
            "meera",
            "meera@example.com",
            PasswordHash::new_unchecked("hunter2"),
            Role::Treasurer,
            &connection,
        )
        .unwrap();
        create_notification(
            user.id,
            &NewNotification {
                kind: NotificationKind::FundLow,
                title: "Funds running low".to_owned(),
                message: "Less than 10% of income remains.".to_owned(),
                related: None,
            },
            time::OffsetDateTime::now_utc(),
            &connection,
        )
        .unwrap();

        let viewer = get_viewer(user.id, &connection).unwrap();

        assert_eq!(
            viewer,
            Viewer {
                user_id: user.id,
                is_treasurer: true,
                unread_notifications: 1,
            }
        );
    }

    #[track_caller]
    fn assert_link_active(nav_bar: NavBar<'_>, endpoint: &str, should_be_active: bool) {
        let get_active_string = |is_active: bool| -> &str {
            if is_active {
                "active (true)"
            } else {
                "inactive (false)"
            }
        };

        for link in nav_bar.links {
            if link.url == endpoint {
                assert_eq!(
                    link.is_current,
                    should_be_active,
                    "Link for current page should be {} but got {}",
                    get_active_string(should_be_active),
                    get_active_string(link.is_current),
                )
            } else {
                assert!(
                    !link.is_current,
                    "Link for inactive page should {} but got {}",
                    get_active_string(false),
                    get_active_string(link.is_current)
                )
            }
        }
    }
}
