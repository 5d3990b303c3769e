//! Pagination
//!
//! Walks `page`/`size` list endpoints. A page holding fewer items than were
//! asked for is the last one.

use crate::error::{LumeError, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Page size used when the caller does not pick one
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// One batch of a paginated listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub size: Option<u32>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub pages: Option<u32>,
}

impl<T> Page<T> {
    /// Whether this page ends the listing for a request of `requested_size` items
    pub fn is_last(&self, requested_size: u32) -> bool {
        self.items.is_empty() || self.items.len() < requested_size as usize
    }
}

/// Where a listing starts and how many items each request asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u32,
    size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    /// Pages are 1-based and must hold at least one item
    pub fn new(page: u32, size: u32) -> Result<Self> {
        if page < 1 {
            return Err(LumeError::Validation(format!(
                "page must be >= 1, got {}",
                page
            )));
        }
        if size < 1 {
            return Err(LumeError::Validation(format!(
                "size must be >= 1, got {}",
                size
            )));
        }
        Ok(Self { page, size })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }
}

/// Collect items from a paginated endpoint
///
/// Without `all`, `fetch_page` is called exactly once with the starting page.
/// With `all`, pages are requested in order until one comes back empty or
/// short. Items keep the server's order and are not de-duplicated. A failing
/// page aborts the walk and the items gathered so far are dropped.
pub async fn collect<T, F, Fut>(
    pagination: Pagination,
    all: bool,
    mut fetch_page: F,
) -> Result<Vec<T>>
where
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let size = pagination.size;
    let mut page = pagination.page;

    if !all {
        return Ok(fetch_page(page, size).await?.items);
    }

    let mut all_items = Vec::new();

    loop {
        let result = fetch_page(page, size).await?;
        let last = result.is_last(size);
        all_items.extend(result.items);

        if last {
            break;
        }
        page += 1;
    }

    tracing::debug!(
        "Collected {} item(s) across pages {}..={}",
        all_items.len(),
        pagination.page,
        page
    );

    Ok(all_items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_of(n: usize) -> Page<u32> {
        Page {
            items: (0..n as u32).collect(),
            page: None,
            size: None,
            total: None,
            pages: None,
        }
    }

    #[test]
    fn test_is_last() {
        assert!(page_of(0).is_last(50));
        assert!(page_of(10).is_last(50));
        assert!(!page_of(50).is_last(50));
    }

    #[test]
    fn test_pagination_validation() {
        assert!(Pagination::new(0, 50).is_err());
        assert!(Pagination::new(1, 0).is_err());

        let p = Pagination::new(3, 20).unwrap();
        assert_eq!((p.page(), p.size()), (3, 20));
        assert_eq!(Pagination::default().size(), DEFAULT_PAGE_SIZE);
        assert_eq!(Pagination::default().page(), 1);
    }

    #[test]
    fn test_page_decodes_without_metadata() {
        let page: Page<serde_json::Value> =
            serde_json::from_str(r#"{"items": [{"id": "a"}]}"#).unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(page.total.is_none());
    }

    #[test]
    fn test_page_requires_items() {
        let page = serde_json::from_str::<Page<serde_json::Value>>(r#"{"page": 1}"#);
        assert!(page.is_err());
    }
}
