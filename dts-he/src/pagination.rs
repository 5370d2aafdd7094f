//! Pagination for record listings (100 records per page)

use serde::Serialize;

/// Page size for all listings
pub const PAGE_SIZE: i64 = 100;

/// Page window computed from a total and a requested page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Current page (1-indexed, clamped)
    pub page: i64,
    pub total_pages: i64,
    pub total: i64,
    pub page_size: i64,
    #[serde(skip)]
    pub offset: i64,
}

/// Clamp `requested_page` into `[1, total_pages]` and compute the offset
///
/// ```
/// use dts_he::pagination::calculate_pagination;
///
/// let p = calculate_pagination(250, 99);
/// assert_eq!(p.page, 3);
/// assert_eq!(p.offset, 200);
/// ```
pub fn calculate_pagination(total: i64, requested_page: i64) -> Pagination {
    let total_pages = (total + PAGE_SIZE - 1) / PAGE_SIZE;
    let page = requested_page.clamp(1, total_pages.max(1));

    Pagination {
        page,
        total_pages,
        total,
        page_size: PAGE_SIZE,
        offset: (page - 1) * PAGE_SIZE,
    }
}
