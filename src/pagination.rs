//! This modules defines the common functionality for paging data.

use maud::{Markup, html};

/// The config for pagination
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// The page number to default to when not specified in a request.
    pub default_page: u64,
    /// The number of items to display per page.
    pub default_page_size: u64,
    /// The maximum number of pages to show in the pagination indicator.
    pub max_pages: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_page_size: 10,
            max_pages: 5,
        }
    }
}

/// One page of a larger, already filtered list.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// The items on this page, empty if `page` is past the last page.
    pub items: Vec<T>,
    /// The 1-based page number.
    pub page: u64,
    pub per_page: u64,
    /// The number of items across all pages.
    pub total: u64,
    /// The number of pages, zero when there are no items.
    pub pages: u64,
}

impl<T> Page<T> {
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.pages
    }
}

/// Take page `page` of `items`.
///
/// Page numbers below one are treated as the first page. A `per_page` of
/// zero is treated as one.
pub fn paginate<T>(items: Vec<T>, page: u64, per_page: u64) -> Page<T> {
    let page = page.max(1);
    let per_page = per_page.max(1);
    let total = items.len() as u64;
    let pages = total.div_ceil(per_page);

    let offset = (page - 1).saturating_mul(per_page);
    let items = items
        .into_iter()
        .skip(usize::try_from(offset).unwrap_or(usize::MAX))
        .take(usize::try_from(per_page).unwrap_or(usize::MAX))
        .collect();

    Page {
        items,
        page,
        per_page,
        total,
        pages,
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum PaginationIndicator {
    Page(u64),
    CurrPage(u64),
    Ellipsis,
    NextButton(u64),
    BackButton(u64),
}

pub fn create_pagination_indicators(
    curr_page: u64,
    page_count: u64,
    max_pages: u64,
) -> Vec<PaginationIndicator> {
    let map_page = |page| {
        if page == curr_page {
            PaginationIndicator::CurrPage(page)
        } else {
            PaginationIndicator::Page(page)
        }
    };

    let mut indicators: Vec<PaginationIndicator> = if page_count <= max_pages {
        (1..=page_count).map(map_page).collect()
    } else if curr_page <= (max_pages / 2) {
        (1..=max_pages).map(map_page).collect()
    } else if curr_page > (page_count - max_pages / 2) {
        ((page_count - max_pages + 1)..=page_count)
            .map(map_page)
            .collect()
    } else {
        ((curr_page - max_pages / 2)..=(curr_page + max_pages / 2))
            .map(map_page)
            .collect()
    };

    if page_count > max_pages {
        if curr_page > (max_pages / 2) + 1 {
            indicators.insert(0, PaginationIndicator::Page(1));
            indicators.insert(1, PaginationIndicator::Ellipsis);
        }

        if curr_page < (page_count - max_pages / 2) {
            indicators.push(PaginationIndicator::Ellipsis);
            indicators.push(PaginationIndicator::Page(page_count));
        }
    }

    if curr_page > 1 {
        indicators.insert(0, PaginationIndicator::BackButton(curr_page - 1));
    }

    if curr_page < page_count {
        indicators.push(PaginationIndicator::NextButton(curr_page + 1));
    }

    indicators
}

/// Render the pager for a list page.
///
/// `page_url` builds the link for a page number so that callers can keep
/// their filter query parameters.
pub fn pagination_view(
    curr_page: u64,
    page_count: u64,
    max_pages: u64,
    page_url: impl Fn(u64) -> String,
) -> Markup {
    let indicators = create_pagination_indicators(curr_page, page_count, max_pages);
    let link_style = "flex items-center justify-center px-3 h-8 leading-tight \
        text-gray-500 bg-white border border-gray-300 hover:bg-gray-100 \
        hover:text-gray-700 dark:bg-gray-800 dark:border-gray-700 \
        dark:text-gray-400 dark:hover:bg-gray-700 dark:hover:text-white";
    let current_style = "flex items-center justify-center px-3 h-8 \
        text-blue-600 border border-gray-300 bg-blue-50 dark:border-gray-700 \
        dark:bg-gray-700 dark:text-white";

    html! {
        @if !indicators.is_empty() {
            nav aria-label="Pagination" class="my-4"
            {
                ul class="inline-flex -space-x-px text-sm"
                {
                    @for indicator in indicators {
                        li {
                            @match indicator {
                                PaginationIndicator::Page(page) => {
                                    a href=(page_url(page)) class=(link_style) { (page) }
                                }
                                PaginationIndicator::CurrPage(page) => {
                                    span aria-current="page" class=(current_style) { (page) }
                                }
                                PaginationIndicator::Ellipsis => {
                                    span class=(link_style) { "..." }
                                }
                                PaginationIndicator::BackButton(page) => {
                                    a href=(page_url(page)) class=(link_style) rel="prev" { "Previous" }
                                }
                                PaginationIndicator::NextButton(page) => {
                                    a href=(page_url(page)) class=(link_style) rel="next" { "Next" }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod paginate_tests {
    use super::paginate;

    #[test]
    fn pages_is_ceiling_of_total_over_page_size() {
        let page = paginate((0..21).collect(), 1, 10);

        assert_eq!(page.pages, 3);
        assert_eq!(page.total, 21);
        assert_eq!(page.items, (0..10).collect::<Vec<_>>());
        assert!(!page.has_prev());
        assert!(page.has_next());
    }

    #[test]
    fn last_page_holds_remainder() {
        let page = paginate((0..21).collect(), 3, 10);

        assert_eq!(page.items, vec![20]);
        assert!(page.has_prev());
        assert!(!page.has_next());
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let page = paginate((0..5).collect::<Vec<i32>>(), 4, 10);

        assert!(page.items.is_empty());
        assert_eq!(page.pages, 1);
        assert!(!page.has_next());
    }

    #[test]
    fn page_zero_is_first_page() {
        let page = paginate((0..5).collect::<Vec<i32>>(), 0, 10);

        assert_eq!(page.page, 1);
        assert_eq!(page.items.len(), 5);
    }

    #[test]
    fn no_items_means_no_pages() {
        let page = paginate(Vec::<i32>::new(), 1, 10);

        assert_eq!(page.pages, 0);
        assert!(!page.has_next());
        assert!(!page.has_prev());
    }
}

#[cfg(test)]
mod indicator_tests {
    use crate::pagination::{PaginationIndicator, create_pagination_indicators};

    #[test]
    fn shows_all_pages() {
        let want = [
            PaginationIndicator::CurrPage(1),
            PaginationIndicator::Page(2),
            PaginationIndicator::Page(3),
            PaginationIndicator::NextButton(2),
        ];

        let got = create_pagination_indicators(1, 3, 5);

        assert_eq!(want, got.as_slice());
    }

    #[test]
    fn shows_page_subset_in_center() {
        let want = [
            PaginationIndicator::BackButton(5),
            PaginationIndicator::Page(1),
            PaginationIndicator::Ellipsis,
            PaginationIndicator::Page(4),
            PaginationIndicator::Page(5),
            PaginationIndicator::CurrPage(6),
            PaginationIndicator::Page(7),
            PaginationIndicator::Page(8),
            PaginationIndicator::Ellipsis,
            PaginationIndicator::Page(12),
            PaginationIndicator::NextButton(7),
        ];

        let got = create_pagination_indicators(6, 12, 5);

        assert_eq!(want, got.as_slice());
    }

    #[test]
    fn shows_page_subset_on_right() {
        let want = [
            PaginationIndicator::BackButton(11),
            PaginationIndicator::Page(1),
            PaginationIndicator::Ellipsis,
            PaginationIndicator::Page(8),
            PaginationIndicator::Page(9),
            PaginationIndicator::Page(10),
            PaginationIndicator::Page(11),
            PaginationIndicator::CurrPage(12),
        ];

        let got = create_pagination_indicators(12, 12, 5);

        assert_eq!(want, got.as_slice());
    }

    #[test]
    fn no_pages_shows_nothing() {
        assert!(create_pagination_indicators(1, 0, 5).is_empty());
    }
}
