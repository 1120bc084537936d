//! Offset/limit window over root entities

/// Offset/limit window applied to root entities
///
/// Backends must apply the window to distinct roots, never to joined rows,
/// so a page always holds `limit` entities at most regardless of how many
/// relation rows were joined.
///
/// # Example
///
/// ```rust
/// use catalog_access::repository::Pagination;
///
/// let third = Pagination::page(2, 20);
/// assert_eq!(third.offset, 40);
/// assert_eq!(third.limit, 20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Number of roots to skip
    pub offset: u64,
    /// Maximum number of roots to return
    pub limit: u64,
}

impl Pagination {
    #[must_use]
    pub const fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }

    /// Window for a zero-based page index; saturates instead of overflowing
    #[must_use]
    pub const fn page(page_index: u64, page_size: u64) -> Self {
        Self {
            offset: page_index.saturating_mul(page_size),
            limit: page_size,
        }
    }

    /// Apply the window to an iterator of roots
    pub fn slice<T>(&self, rows: impl IntoIterator<Item = T>) -> Vec<T> {
        let offset = usize::try_from(self.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.limit).unwrap_or(usize::MAX);
        rows.into_iter().skip(offset).take(limit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_offset() {
        assert_eq!(Pagination::page(0, 10), Pagination::new(0, 10));
        assert_eq!(Pagination::page(3, 10).offset, 30);
    }

    #[test]
    fn test_page_offset_saturates() {
        let window = Pagination::page(u64::MAX, 100);
        assert_eq!(window.offset, u64::MAX);
        assert!(window.slice(0..10).is_empty());
    }

    #[test]
    fn test_slice() {
        assert_eq!(Pagination::new(2, 3).slice(0..10), vec![2, 3, 4]);
        assert_eq!(Pagination::new(8, 5).slice(0..10), vec![8, 9]);
    }
}
