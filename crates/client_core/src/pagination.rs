pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Zero-based page window over the filtered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: usize,
    size: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Pagination {
    pub fn new(size: usize) -> Self {
        Self {
            page: 0,
            size: size.max(1),
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    /// Changing the page size always returns to the first page.
    pub fn set_size(&mut self, size: usize) {
        self.size = size.max(1);
        self.page = 0;
    }

    pub fn total_pages(&self, total: usize) -> usize {
        total.div_ceil(self.size)
    }

    /// Moves back to the last page that still has rows when the list shrank.
    pub fn clamp(&mut self, total: usize) {
        let last = self.total_pages(total).saturating_sub(1);
        if self.page > last {
            self.page = last;
        }
    }

    pub fn range(&self, total: usize) -> std::ops::Range<usize> {
        let start = self.page.saturating_mul(self.size).min(total);
        let end = start.saturating_add(self.size).min(total);
        start..end
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[self.range(items.len())]
    }
}

#[cfg(test)]
#[path = "tests/pagination_tests.rs"]
mod tests;
