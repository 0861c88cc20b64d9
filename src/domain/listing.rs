use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    /// Case-insensitive substring filter
    pub search: Option<String>,
    /// 1-based page number (default: 1)
    pub page: Option<usize>,
    /// Items per page (default: 10, max: 100)
    pub page_size: Option<usize>,
}

impl ListQuery {
    pub fn search_term(&self) -> &str {
        self.search.as_deref().unwrap_or("").trim()
    }

    pub fn paginate<T>(&self, items: Vec<T>) -> Page<T> {
        paginate(items, self.page.unwrap_or(1), self.page_size.unwrap_or(DEFAULT_PAGE_SIZE))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

/// True when `term` is empty or occurs in any of the haystacks, ignoring case.
pub fn matches_search<'a, I>(haystacks: I, term: &str) -> bool
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }

    haystacks
        .into_iter()
        .flatten()
        .any(|haystack| haystack.to_lowercase().contains(&needle))
}

/// Slice one page out of an already filtered list.
///
/// The page size is clamped into `1..=MAX_PAGE_SIZE` and the page number into
/// `1..=total_pages`, so an out-of-range page returns the last one.
pub fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
    let total = items.len();
    let total_pages = total.div_ceil(page_size).max(1);
    let page = page.clamp(1, total_pages);
    let start = (page - 1) * page_size;

    let items = items.into_iter().skip(start).take(page_size).collect();

    Page {
        items,
        total,
        page,
        page_size,
        total_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_search_is_case_insensitive_substring() {
        assert!(matches_search([Some("Makati Branch"), None], "makati"));
        assert!(matches_search([None, Some("coach@academy.ph")], "ACADEMY"));
        assert!(!matches_search([Some("Quezon City")], "cebu"));
        assert!(!matches_search([None, None], "x"));
    }

    #[test]
    fn test_empty_search_matches_everything() {
        assert!(matches_search([None], ""));
        assert!(matches_search([Some("anything")], "   "));
    }

    #[test]
    fn test_paginate_middle_and_last_page() {
        let items: Vec<u32> = (1..=25).collect();

        let page = paginate(items.clone(), 2, 10);
        assert_eq!(page.items, (11..=20).collect::<Vec<_>>());
        assert_eq!(page.total, 25);
        assert_eq!(page.total_pages, 3);

        let last = paginate(items, 3, 10);
        assert_eq!(last.items, vec![21, 22, 23, 24, 25]);
    }

    #[test]
    fn test_paginate_clamps_out_of_range() {
        let items: Vec<u32> = (1..=5).collect();

        let beyond = paginate(items.clone(), 9, 2);
        assert_eq!(beyond.page, 3);
        assert_eq!(beyond.items, vec![5]);

        let zero = paginate(items.clone(), 0, 0);
        assert_eq!(zero.page, 1);
        assert_eq!(zero.page_size, 1);
        assert_eq!(zero.items, vec![1]);

        let huge = paginate(items, 1, 10_000);
        assert_eq!(huge.page_size, MAX_PAGE_SIZE);
    }

    #[test]
    fn test_paginate_empty_list_has_one_page() {
        let page = paginate(Vec::<u32>::new(), 4, 10);
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 1);
        assert!(page.items.is_empty());
    }

    #[test]
    fn test_list_query_defaults() {
        let query = ListQuery::default();
        let page = query.paginate((0..30).collect::<Vec<u32>>());
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(query.search_term(), "");
    }

    proptest! {
        #[test]
        fn every_item_lands_on_exactly_one_page(len in 0usize..300, page_size in 1usize..=100) {
            let items: Vec<usize> = (0..len).collect();
            let first = paginate(items.clone(), 1, page_size);

            let mut seen = Vec::new();
            for page in 1..=first.total_pages {
                seen.extend(paginate(items.clone(), page, page_size).items);
            }

            prop_assert_eq!(seen, items);
        }
    }
}
