//! Limit/offset pagination for listings.

use serde::Serialize;

/// Default page size for listings.
pub const DEFAULT_LIMIT: usize = 10;
/// Upper bound on page size.
pub const MAX_LIMIT: usize = 100;

/// Validated limit/offset pair.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: usize,
    pub offset: usize,
}

impl PageRequest {
    /// Build a request from raw query parameters, clamping the limit into
    /// `1..=MAX_LIMIT` and defaulting missing values.
    pub fn from_params(limit: Option<usize>, offset: Option<usize>) -> Self {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        Self {
            limit,
            offset: offset.unwrap_or(0),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// One page of results plus the totals a caller needs to keep paging.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: usize, request: PageRequest) -> Self {
        Self {
            items,
            total,
            limit: request.limit,
            offset: request.offset,
        }
    }

    pub fn returned(&self) -> usize {
        self.items.len()
    }

    pub fn has_more(&self) -> bool {
        self.offset + self.returned() < self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn limit_defaults_and_clamps() {
        assert_eq!(PageRequest::from_params(None, None).limit, DEFAULT_LIMIT);
        assert_eq!(PageRequest::from_params(Some(0), None).limit, 1);
        assert_eq!(PageRequest::from_params(Some(10_000), None).limit, MAX_LIMIT);
        assert_eq!(PageRequest::from_params(None, Some(30)).offset, 30);
    }

    #[test]
    fn has_more_on_boundaries() {
        let req = PageRequest::from_params(Some(10), Some(0));
        let page = Page::new(vec![1; 10], 25, req);
        assert!(page.has_more());

        let req = PageRequest::from_params(Some(10), Some(20));
        let page = Page::new(vec![1; 5], 25, req);
        assert_eq!(page.returned(), 5);
        assert!(!page.has_more());
    }

    proptest! {
        #[test]
        fn returned_count_matches_window(total in 0usize..500, limit in 1usize..100, offset in 0usize..600) {
            let expected = limit.min(total.saturating_sub(offset));
            let page = Page::new(vec![0u8; expected], total, PageRequest { limit, offset });
            prop_assert_eq!(page.returned(), expected);
            prop_assert_eq!(page.has_more(), offset + expected < total);
        }
    }
}
