use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current_page: usize,
    pub total_pages: usize,
    /// Zero-based index of the first result on the page.
    pub offset: usize,
    /// Contiguous page numbers to display.
    pub window: Vec<usize>,
}

/// Clamp a requested page (1-based, possibly zero, negative or past the end) to
/// a valid one and work out which page links to show.
pub fn paginate(total: usize, requested: i64, page_size: usize, window_width: usize) -> Pagination {
    let page_size = page_size.max(1);
    let total_pages = total.div_ceil(page_size);

    let mut current_page = if requested < 1 { 1 } else { requested as usize };
    let offset = (current_page - 1).saturating_mul(page_size);
    if offset >= total {
        current_page = 1;
    }

    let window = if window_width > 0 && total_pages >= window_width {
        let half = window_width / 2;
        let latest_start = total_pages - window_width + 1;
        let start = current_page.saturating_sub(half).max(1).min(latest_start);
        (start..start + window_width).collect()
    } else {
        (1..=total_pages).collect()
    };

    Pagination { current_page, total_pages, offset: (current_page - 1) * page_size, window }
}
