//! Pagination for document listings.

use crate::config::Config;
use serde::{Deserialize, Serialize};

/// A 1-based page request, already clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: usize,
    pub limit: usize,
}

impl Page {
    pub fn new(page: usize, limit: usize) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    /// Parse query-string values leniently.
    ///
    /// Missing or unparsable values fall back to page 1 and the configured
    /// default limit; the limit is capped at the configured maximum.
    pub fn from_query(page: Option<&str>, limit: Option<&str>, config: &Config) -> Self {
        let page = page
            .and_then(|p| p.trim().parse::<usize>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1);
        let limit = limit
            .and_then(|l| l.trim().parse::<usize>().ok())
            .filter(|l| *l >= 1)
            .unwrap_or_else(|| config.default_page_limit())
            .min(config.max_page_limit());
        Self::new(page, limit)
    }

    /// Records to skip before this page.
    pub fn skip(&self) -> usize {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
}

impl<T> Paged<T> {
    pub fn new(items: Vec<T>, total: usize, page: Page) -> Self {
        Self {
            items,
            total,
            page: page.page,
            limit: page.limit,
            total_pages: total.div_ceil(page.limit),
        }
    }
}
