//! FILENAME: core/drilldown-engine/src/paginate.rs
//! Paginator - slices the flattened row list into fixed-size pages.
//!
//! Out-of-range input is clamped, never rejected: page 0 reads page 1 and a
//! page past the end reads the last page.

use serde::{Deserialize, Serialize};

use crate::definition::DEFAULT_PAGE_SIZE;
use crate::view::PageInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginator {
    /// Requested page, 1-indexed. Clamped when slicing.
    page: usize,
    page_size: usize,
}

impl Default for Paginator {
    fn default() -> Self {
        Paginator::new(DEFAULT_PAGE_SIZE)
    }
}

impl Paginator {
    pub fn new(page_size: usize) -> Self {
        Paginator {
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    /// Changing the page size always returns to the first page.
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.page = 1;
    }

    pub fn reset(&mut self) {
        self.page = 1;
    }

    pub fn next(&mut self, total_rows: usize) {
        let last = self.total_pages(total_rows);
        self.page = (self.clamped_page(total_rows) + 1).min(last);
    }

    pub fn prev(&mut self, total_rows: usize) {
        self.page = self.clamped_page(total_rows).saturating_sub(1).max(1);
    }

    /// `max(1, ceil(total_rows / page_size))`.
    pub fn total_pages(&self, total_rows: usize) -> usize {
        total_rows.div_ceil(self.page_size).max(1)
    }

    pub fn clamped_page(&self, total_rows: usize) -> usize {
        self.page.clamp(1, self.total_pages(total_rows))
    }

    pub fn info(&self, total_rows: usize) -> PageInfo {
        PageInfo {
            page: self.clamped_page(total_rows),
            page_size: self.page_size,
            total_pages: self.total_pages(total_rows),
            total_rows,
        }
    }

    /// Rows of the current (clamped) page.
    pub fn slice<'a, T>(&self, rows: &'a [T]) -> (&'a [T], PageInfo) {
        let info = self.info(rows.len());
        let start = ((info.page - 1) * self.page_size).min(rows.len());
        let end = (start + self.page_size).min(rows.len());
        (&rows[start..end], info)
    }
}
