/// Shared types used across the codebase

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Resolved `limit`/`offset` window for paginated reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: i64,
    pub offset: i64,
}

impl PageRequest {
    /// Apply the endpoint default, clamp to the configured maximum and
    /// reject negative values.
    pub fn resolve(
        limit: Option<i64>,
        offset: Option<i64>,
        default_limit: i64,
        max_limit: i64,
    ) -> Result<Self, ApiError> {
        let limit = limit.unwrap_or(default_limit);
        let offset = offset.unwrap_or(0);

        if limit < 0 {
            return Err(ApiError::field_error("limit", "must not be negative"));
        }
        if offset < 0 {
            return Err(ApiError::field_error("offset", "must not be negative"));
        }

        Ok(Self {
            limit: limit.min(max_limit),
            offset,
        })
    }
}

/// One page of results plus the total matching the filter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            limit: request.limit,
            offset: request.offset,
        }
    }
}

/// `?show_inactive=` on single-record reads
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ShowInactive {
    pub show_inactive: Option<bool>,
}

impl ShowInactive {
    pub fn include_inactive(&self) -> bool {
        self.show_inactive.unwrap_or(false)
    }
}

/// Common query string for list and search endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub q: Option<String>,
    pub show_inactive: Option<bool>,
    pub fname: Option<String>,
    pub lname: Option<String>,
    pub business_flag: Option<bool>,
}

impl ListQuery {
    pub fn page(&self, default_limit: i64, max_limit: i64) -> Result<PageRequest, ApiError> {
        PageRequest::resolve(self.limit, self.offset, default_limit, max_limit)
    }

    /// Trimmed, non-empty search term
    pub fn search_term(&self) -> Result<&str, ApiError> {
        match self.q.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => Ok(term),
            _ => Err(ApiError::field_error("q", "search query is required")),
        }
    }

    pub fn include_inactive(&self) -> bool {
        self.show_inactive.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_defaults_and_clamps() {
        let page = PageRequest::resolve(None, None, 20, 100).unwrap();
        assert_eq!(page, PageRequest { limit: 20, offset: 0 });

        let page = PageRequest::resolve(Some(5000), Some(40), 20, 100).unwrap();
        assert_eq!(page, PageRequest { limit: 100, offset: 40 });
    }

    #[test]
    fn negative_window_is_rejected() {
        assert!(PageRequest::resolve(Some(-1), None, 20, 100).is_err());
        assert!(PageRequest::resolve(None, Some(-5), 20, 100).is_err());
    }

    #[test]
    fn blank_search_term_is_rejected() {
        let query = ListQuery {
            q: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(query.search_term().is_err());
        assert!(ListQuery::default().search_term().is_err());

        let query = ListQuery {
            q: Some(" ann ".to_string()),
            ..Default::default()
        };
        assert_eq!(query.search_term().unwrap(), "ann");
    }
}
