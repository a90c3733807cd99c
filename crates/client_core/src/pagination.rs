//! Page-link window for list views.
//!
//! Small page counts are listed in full. Larger ones keep the first and last
//! page, a window around the current page, and an ellipsis wherever pages
//! were skipped.

use std::fmt;

/// Page counts up to this many are rendered without any ellipsis.
pub const MAX_BUTTONS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMarker {
    Page(u32),
    Ellipsis,
}

impl fmt::Display for PageMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageMarker::Page(n) => write!(f, "{n}"),
            PageMarker::Ellipsis => f.write_str("…"),
        }
    }
}

/// `ceil(total / limit)`; zero items means zero pages.
pub fn total_pages(total: u64, limit: u32) -> u32 {
    if limit == 0 {
        return 0;
    }
    let pages = total.div_ceil(u64::from(limit));
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Markers to render for `current` out of `total_pages`.
///
/// Returns an empty vec when there is at most one page: nothing to render.
/// The inner window spans `current - 1 ..= current + 1`, bounded by the
/// first and last page, and never shrinks below two pages on the edges so
/// page 1 of 10 shows `1 2 3 … 10`.
pub fn visible_pages(current: u32, total_pages: u32) -> Vec<PageMarker> {
    if total_pages <= 1 {
        return Vec::new();
    }
    let current = current.clamp(1, total_pages);

    if total_pages <= MAX_BUTTONS {
        return (1..=total_pages).map(PageMarker::Page).collect();
    }

    let last_inner = total_pages - 1;
    let start = current
        .saturating_sub(1)
        .min(total_pages - 2)
        .max(2);
    let end = current.saturating_add(1).max(3).min(last_inner);

    let mut markers = Vec::with_capacity(7);
    markers.push(PageMarker::Page(1));
    if start > 2 {
        markers.push(PageMarker::Ellipsis);
    }
    markers.extend((start..=end).map(PageMarker::Page));
    if end < last_inner {
        markers.push(PageMarker::Ellipsis);
    }
    markers.push(PageMarker::Page(total_pages));

    markers.dedup_by(|a, b| *a == PageMarker::Ellipsis && *b == PageMarker::Ellipsis);
    markers
}

/// Target of the "Previous" control.
pub fn previous_page(current: u32) -> u32 {
    current.saturating_sub(1).max(1)
}

/// Target of the "Next" control.
pub fn next_page(current: u32, total_pages: u32) -> u32 {
    current.saturating_add(1).min(total_pages.max(1))
}

/// A rendered row of page links with the current page highlighted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageWindow {
    pub current: u32,
    pub total_pages: u32,
    pub markers: Vec<PageMarker>,
}

impl PageWindow {
    pub fn new(current: u32, total_pages: u32) -> Self {
        Self {
            current,
            total_pages,
            markers: visible_pages(current, total_pages),
        }
    }

    pub fn has_previous(&self) -> bool {
        self.current > 1
    }

    pub fn has_next(&self) -> bool {
        self.current < self.total_pages
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

impl fmt::Display for PageWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, marker) in self.markers.iter().enumerate() {
            if index > 0 {
                f.write_str(" ")?;
            }
            match marker {
                PageMarker::Page(n) if *n == self.current => write!(f, "[{n}]")?,
                other => write!(f, "{other}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/pagination_tests.rs"]
mod tests;
