/// One page of a larger ordered sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagedList<T> {
    pub items: Vec<T>,
    /// 1-based.
    pub page_index: u64,
    pub page_size: u64,
    pub total_count: u64,
    pub total_pages: u64,
}

impl<T> PagedList<T> {
    /// Cut page `page_index` out of `source`. Pages past the end are empty.
    pub fn create(source: Vec<T>, page_index: u64, page_size: u64) -> Self {
        let page_index = page_index.max(1);
        let page_size = page_size.max(1);
        let total_count = source.len() as u64;
        let skip = usize::try_from((page_index - 1).saturating_mul(page_size)).unwrap_or(usize::MAX);
        let take = usize::try_from(page_size).unwrap_or(usize::MAX);

        Self {
            items: source.into_iter().skip(skip).take(take).collect(),
            page_index,
            page_size,
            total_count,
            total_pages: total_count.div_ceil(page_size),
        }
    }

    pub fn has_previous_page(&self) -> bool {
        self.page_index > 1
    }

    pub fn has_next_page(&self) -> bool {
        self.page_index < self.total_pages
    }
}
