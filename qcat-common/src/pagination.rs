//! Pagination utilities shared by every list operation
//!
//! Pages are 0-indexed. A page past the end of the result set is returned
//! empty rather than clamped, so clients can detect the end of a listing.

use serde::{Deserialize, Serialize};

/// Default page size when the client does not ask for one
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Upper bound on page size when no configuration overrides it
pub const MAX_PAGE_SIZE: i64 = 500;

/// Query parameters accepted by list endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageRequest {
    /// Page number (0-indexed)
    #[serde(default)]
    pub page: Option<i64>,

    /// Requested page size
    #[serde(default)]
    pub size: Option<i64>,

    /// Optional free-text filter (case-insensitive substring)
    #[serde(default)]
    pub search: Option<String>,

    /// Size cap set by `bounded`; `MAX_PAGE_SIZE` until then
    #[serde(skip)]
    max_size: Option<i64>,
}

impl PageRequest {
    /// Build a request for a specific page and size
    pub fn new(page: i64, size: i64) -> Self {
        Self {
            page: Some(page),
            size: Some(size),
            search: None,
            max_size: None,
        }
    }

    /// Attach a search term
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Apply configured bounds to the requested size
    ///
    /// Sizes below 1 fall back to `default_size`; sizes above `max_size` are capped.
    pub fn bounded(mut self, default_size: i64, max_size: i64) -> Self {
        let size = match self.size {
            Some(s) if s >= 1 => s.min(max_size),
            _ => default_size,
        };
        self.size = Some(size);
        self.max_size = Some(max_size);
        self
    }

    /// Page number, never negative
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(0).max(0)
    }

    /// Page size, never below 1 nor above the cap in force
    pub fn size(&self) -> i64 {
        match self.size {
            Some(s) if s >= 1 => s.min(self.max_size.unwrap_or(MAX_PAGE_SIZE)),
            _ => DEFAULT_PAGE_SIZE,
        }
    }

    /// LIKE pattern for the search term, or None when no filter applies
    ///
    /// `%`, `_` and `\` in the term are escaped; queries must use `ESCAPE '\'`.
    pub fn like_pattern(&self) -> Option<String> {
        let term = self.search.as_deref()?.trim();
        if term.is_empty() {
            return None;
        }
        let mut escaped = String::with_capacity(term.len() + 2);
        escaped.push('%');
        for c in term.chars() {
            if matches!(c, '%' | '_' | '\\') {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        escaped.push('%');
        Some(escaped)
    }

    /// Pagination metadata for a result set of `total_results` rows
    pub fn pagination(&self, total_results: i64) -> Pagination {
        calculate_pagination(total_results, self.page(), self.size())
    }
}

/// Pagination metadata calculated from total results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page number (0-indexed)
    pub page: i64,
    /// Page size
    pub size: i64,
    /// Total number of pages
    pub total_pages: i64,
    /// Offset for SQL LIMIT/OFFSET query
    pub offset: i64,
}

/// Calculate pagination metadata from total results and requested page
///
/// # Examples
/// ```
/// use qcat_common::pagination::calculate_pagination;
///
/// // 250 total results with size 100 = 3 pages (100 + 100 + 50)
/// let p = calculate_pagination(250, 1, 100);
/// assert_eq!(p.total_pages, 3);
/// assert_eq!(p.offset, 100);
///
/// // Pages past the end keep their offset and yield no rows
/// let p = calculate_pagination(250, 7, 100);
/// assert_eq!(p.page, 7);
/// assert_eq!(p.offset, 700);
/// ```
pub fn calculate_pagination(total_results: i64, page: i64, size: i64) -> Pagination {
    let size = size.max(1);
    let page = page.max(0);
    let total_pages = (total_results.max(0) + size - 1) / size;

    Pagination {
        page,
        size,
        total_pages,
        offset: page.saturating_mul(size),
    }
}

/// Page metadata in the response body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    pub size: i64,
    pub total_elements: i64,
    pub total_pages: i64,
    pub number: i64,
}

/// One page of a listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: PageMetadata,
}

impl<T> Page<T> {
    /// Assemble a page from fetched rows and the total count
    pub fn new(content: Vec<T>, pagination: Pagination, total_elements: i64) -> Self {
        Self {
            content,
            page: PageMetadata {
                size: pagination.size,
                total_elements,
                total_pages: pagination.total_pages,
                number: pagination.page,
            },
        }
    }

    /// Transform the page content, keeping the metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_normal() {
        let p = calculate_pagination(250, 1, 100);
        assert_eq!(p.page, 1);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.offset, 100);
    }

    #[test]
    fn test_pagination_first_page() {
        let p = calculate_pagination(150, 0, 100);
        assert_eq!(p.page, 0);
        assert_eq!(p.total_pages, 2);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn test_pagination_negative_page() {
        let p = calculate_pagination(150, -3, 100);
        assert_eq!(p.page, 0);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn test_pagination_empty() {
        let p = calculate_pagination(0, 0, 20);
        assert_eq!(p.page, 0);
        assert_eq!(p.total_pages, 0);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn test_pagination_exact_page_boundary() {
        let p = calculate_pagination(200, 1, 100);
        assert_eq!(p.total_pages, 2);
        assert_eq!(p.offset, 100);
    }

    #[test]
    fn test_request_size_bounds() {
        let req = PageRequest::new(0, 10_000).bounded(20, 50);
        assert_eq!(req.size(), 50);

        let req = PageRequest::new(0, 0).bounded(20, 50);
        assert_eq!(req.size(), 20);

        let req = PageRequest::default();
        assert_eq!(req.page(), 0);
        assert_eq!(req.size(), DEFAULT_PAGE_SIZE);

        // Unbounded requests still get the compiled cap
        assert_eq!(PageRequest::new(0, 10_000).size(), MAX_PAGE_SIZE);
    }

    #[test]
    fn test_configured_max_above_default_cap() {
        let req = PageRequest::new(0, 800).bounded(20, 1000);
        assert_eq!(req.size(), 800);
        assert_eq!(req.pagination(2000).size, 800);

        let req = PageRequest::new(0, 5000).bounded(20, 1000);
        assert_eq!(req.size(), 1000);
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        let req = PageRequest::default().with_search("100%_a\\b");
        assert_eq!(req.like_pattern().unwrap(), "%100\\%\\_a\\\\b%");
    }

    #[test]
    fn test_like_pattern_blank_search_is_none() {
        let req = PageRequest::default().with_search("   ");
        assert!(req.like_pattern().is_none());
    }
}
