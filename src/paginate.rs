//! Fixed-size pages over a fully fetched result set.

/// Default number of items per page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// A borrowed, contiguous slice of a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    /// 1-based index after clamping.
    pub index: usize,
    /// Highest valid index; 1 for an empty result set.
    pub last: usize,
    pub size: usize,
}

impl<T> Page<'_, T> {
    /// Global 1-based rank of the item at `local` within this page.
    pub fn rank_of(&self, local: usize) -> usize {
        (self.index - 1) * self.size + local + 1
    }

    /// Rank of the first item, 0 when the page is empty.
    pub fn first_rank(&self) -> usize {
        if self.items.is_empty() {
            0
        } else {
            self.rank_of(0)
        }
    }

    pub fn last_rank(&self) -> usize {
        if self.items.is_empty() {
            0
        } else {
            self.rank_of(self.items.len() - 1)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_next(&self) -> bool {
        self.index < self.last
    }

    pub fn has_prev(&self) -> bool {
        self.index > 1
    }
}

/// Number of pages for `len` items, never less than 1.
pub fn last_page(len: usize, size: usize) -> usize {
    if size == 0 {
        return 1;
    }
    len.div_ceil(size).max(1)
}

/// Clamp a requested page index into `1..=last_page(len, size)`.
pub fn clamp_page(index: usize, len: usize, size: usize) -> usize {
    index.clamp(1, last_page(len, size))
}

/// Slice `results` into the page at `index` (1-based, clamped).
///
/// Bounds are the half-open range `[(index-1)*size, min(index*size, len))`.
pub fn paginate<T>(results: &[T], size: usize, index: usize) -> Page<'_, T> {
    let last = last_page(results.len(), size);
    let index = index.clamp(1, last);

    let items = if size == 0 {
        &results[..0]
    } else {
        let start = (index - 1) * size;
        let end = (index * size).min(results.len());
        &results[start.min(end)..end]
    };

    Page {
        items,
        index,
        last,
        size,
    }
}
