//! Typed list-query building blocks
//!
//! Sortable columns are an allow-list of enums mapped to fixed SQL
//! fragments; client input never reaches the ORDER BY clause as a string.

use serde::Serialize;

/// Sortable columns for the book list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BookSort {
    #[default]
    Title,
    Year,
    /// Catalog tag order: main category, subcategory, sequence number
    Tag,
    CreatedAt,
}

impl BookSort {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "title" => Some(BookSort::Title),
            "year" => Some(BookSort::Year),
            "tag" => Some(BookSort::Tag),
            "created_at" => Some(BookSort::CreatedAt),
            _ => None,
        }
    }

    pub fn order_by(&self) -> &'static str {
        match self {
            BookSort::Title => "title COLLATE NOCASE",
            BookSort::Year => "year",
            BookSort::Tag => "code_maincategory, code_category, number_in_category",
            BookSort::CreatedAt => "created_at",
        }
    }
}

/// Sortable columns for the staging list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanSort {
    #[default]
    ScannedAt,
    Title,
    AuthorsRaw,
}

impl ScanSort {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scanned_at" => Some(ScanSort::ScannedAt),
            "title" => Some(ScanSort::Title),
            "authors_raw" => Some(ScanSort::AuthorsRaw),
            _ => None,
        }
    }

    pub fn order_by(&self) -> &'static str {
        match self {
            ScanSort::ScannedAt => "scanned_at",
            ScanSort::Title => "title COLLATE NOCASE",
            ScanSort::AuthorsRaw => "authors_raw COLLATE NOCASE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// One page of a list query (1-based page number)
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub page: u32,
    pub per_page: u32,
}

impl Page {
    /// Build a page spec; page numbers below 1 clamp to the first page
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.per_page as i64
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// A page of results plus pagination bookkeeping
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: i64, page: Page) -> Self {
        let total_pages = ((total.max(0) as u32) + page.per_page - 1) / page.per_page;
        Self {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
            total_pages: total_pages.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_parsing_rejects_unknown_columns() {
        assert_eq!(BookSort::parse("title"), Some(BookSort::Title));
        assert_eq!(BookSort::parse("isbn; DROP TABLE books"), None);
        assert_eq!(ScanSort::parse("authors_raw"), Some(ScanSort::AuthorsRaw));
        assert_eq!(ScanSort::parse("status"), None);
    }

    #[test]
    fn page_arithmetic() {
        let page = Page::new(0, 50);
        assert_eq!(page.page, 1);
        assert_eq!(page.offset(), 0);

        let page = Page::new(3, 20);
        assert_eq!(page.offset(), 40);
        assert_eq!(page.limit(), 20);
    }

    #[test]
    fn paginated_total_pages() {
        let p = Paginated::new(vec![1, 2, 3], 101, Page::new(1, 50));
        assert_eq!(p.total_pages, 3);

        let empty: Paginated<i32> = Paginated::new(vec![], 0, Page::new(1, 50));
        assert_eq!(empty.total_pages, 1);
    }
}
