//! Page-number pagination with a fixed page size

use super::params::QueryParams;

/// The page a request asked for, before the total is known
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    /// Missing, malformed or non-positive `page` means the first page.
    pub fn from_params(params: &QueryParams, page_size: u32) -> Self {
        let page = params
            .int("page")
            .filter(|p| *p >= 1)
            .map(|p| u32::try_from(p).unwrap_or(u32::MAX))
            .unwrap_or(1);
        Self::new(page, page_size)
    }

    /// Number of pages for `total` items; an empty result still has one page.
    pub fn num_pages(&self, total: i64) -> u32 {
        let size = i64::from(self.page_size);
        let pages = (total.max(0) + size - 1) / size;
        u32::try_from(pages.max(1)).unwrap_or(u32::MAX)
    }

    /// Clamp the requested page into `1..=num_pages`.
    pub fn resolve(&self, total: i64) -> Self {
        Self::new(self.page.min(self.num_pages(total)), self.page_size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }
}

/// One page of results plus the metadata needed for links
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub count: i64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    /// `request` must already be resolved against `count`.
    pub fn new(items: Vec<T>, count: i64, request: PageRequest) -> Self {
        Self {
            items,
            count,
            page: request.page,
            page_size: request.page_size,
        }
    }

    pub fn num_pages(&self) -> u32 {
        PageRequest::new(self.page, self.page_size).num_pages(self.count)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.num_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn next_page(&self) -> Option<u32> {
        self.has_next().then(|| self.page + 1)
    }

    pub fn previous_page(&self) -> Option<u32> {
        self.has_previous().then(|| self.page - 1)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            count: self.count,
            page: self.page,
            page_size: self.page_size,
        }
    }

    /// Slice an in-memory, already ordered result set.
    pub fn from_ordered(all: Vec<T>, request: PageRequest) -> Self {
        let count = all.len() as i64;
        let request = request.resolve(count);
        let items = all
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.page_size as usize)
            .collect();
        Self::new(items, count, request)
    }
}
