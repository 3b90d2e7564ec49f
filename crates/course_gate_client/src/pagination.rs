//! The page envelope shared by live responses and fallback data.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u32,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    /// Metadata for `page` of a result set holding `total` records.
    ///
    /// `page` and `limit` below 1 are treated as 1. An empty set has zero pages.
    pub fn compute(page: u32, limit: u32, total: u32) -> Self {
        let page = page.max(1);
        let limit = limit.max(1);
        let total_pages = total.div_ceil(limit);
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

/// Slice one page out of `records`.
///
/// Pages past the end yield no items while the totals still describe `records`.
pub fn paginate<T: Clone>(records: &[T], page: u32, limit: u32) -> Paginated<T> {
    let total = u32::try_from(records.len()).unwrap_or(u32::MAX);
    let pagination = Pagination::compute(page, limit, total);
    let start = (pagination.page as usize - 1).saturating_mul(pagination.limit as usize);
    let items = records
        .iter()
        .skip(start)
        .take(pagination.limit as usize)
        .cloned()
        .collect();
    Paginated { items, pagination }
}
