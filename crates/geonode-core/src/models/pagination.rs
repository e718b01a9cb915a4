use serde::{Deserialize, Serialize};

/// Pagination metadata for a page of search results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationInfo {
    /// Total number of records matching the query
    pub total_records: u64,

    /// 1-based index of the current page
    pub current_page: u64,

    /// Number of records per page
    pub page_size: u64,
}

impl PaginationInfo {
    pub fn new(total_records: u64, current_page: u64, page_size: u64) -> Self {
        Self { total_records, current_page, page_size }
    }

    /// Number of pages needed to hold all records
    ///
    /// An empty result set, or a zero page size, still counts as a single page.
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 1;
        }
        self.total_records.div_ceil(self.page_size).max(1)
    }

    pub fn has_next_page(&self) -> bool {
        self.current_page < self.total_pages()
    }
}
