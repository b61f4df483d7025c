//! Entity models
//!
//! Plain data structs mirroring the catalog tables. Row mapping lives next
//! to the queries in obm-api; these types carry no persistence logic apart
//! from tag derivation, which is a pure function of the category codes and
//! sequence number and is never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Root of the two-level taxonomy. Codes are 2-letter and immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainCategory {
    pub code: String,
    pub title: String,
}

/// Subcategory. Code is unique only within its main category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub code: String,
    pub code_maincategory: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
}

/// Catalog book
///
/// number_in_category is assigned from the category sequence at creation
/// (or re-categorization) and never recomputed retroactively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub subtitle: Option<String>,
    pub year: Option<i64>,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub language: Option<String>,
    pub notes: Option<String>,
    pub pages: Option<i64>,
    pub cover_image: Option<String>,
    pub code_category: String,
    pub code_maincategory: String,
    pub number_in_category: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Human-readable catalog tag, e.g. "WR PH 0042". Computed on read.
    pub fn tag(&self) -> String {
        book_tag(
            &self.code_maincategory,
            &self.code_category,
            self.number_in_category,
        )
    }
}

/// Format a catalog tag: main category, subcategory, zero-padded number
pub fn book_tag(code_maincategory: &str, code_category: &str, number: i64) -> String {
    format!("{} {} {:04}", code_maincategory, code_category, number)
}

/// Staging record lifecycle state
///
/// pending -> reviewed -> imported, or pending <-> skipped. Imported is
/// terminal and transient: promotion deletes the staging row in the same
/// transaction, so the state is never observed at rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Pending,
    Reviewed,
    Skipped,
    Imported,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Pending => "pending",
            ScanStatus::Reviewed => "reviewed",
            ScanStatus::Skipped => "skipped",
            ScanStatus::Imported => "imported",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ScanStatus::Pending),
            "reviewed" => Some(ScanStatus::Reviewed),
            "skipped" => Some(ScanStatus::Skipped),
            "imported" => Some(ScanStatus::Imported),
            _ => None,
        }
    }
}

/// Staged scan awaiting review and import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannedBook {
    pub id: Uuid,
    pub isbn: String,
    pub title: String,
    pub subtitle: Option<String>,
    /// Free-text author names as delivered by the metadata provider
    pub authors_raw: Option<String>,
    pub published_year: Option<i64>,
    pub publisher: Option<String>,
    pub pages: Option<i64>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub cover_local: Option<String>,
    pub status: ScanStatus,
    pub scanned_at: DateTime<Utc>,
}

/// Wishlist entry, independent of the catalog entities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WishlistItem {
    pub id: Uuid,
    pub title: String,
    pub author_name: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Authenticated principal attached to each request context
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub username: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_is_zero_padded_to_four_digits() {
        assert_eq!(book_tag("WR", "PH", 42), "WR PH 0042");
        assert_eq!(book_tag("WR", "PH", 1), "WR PH 0001");
        assert_eq!(book_tag("SF", "KL", 12345), "SF KL 12345");
    }

    #[test]
    fn tag_ignores_unrelated_fields() {
        let mut book = Book {
            id: Uuid::new_v4(),
            title: "A Title".to_string(),
            subtitle: None,
            year: Some(1999),
            isbn: None,
            publisher: None,
            language: None,
            notes: None,
            pages: None,
            cover_image: None,
            code_category: "PH".to_string(),
            code_maincategory: "WR".to_string(),
            number_in_category: 7,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let before = book.tag();
        book.title = "Another Title".to_string();
        book.notes = Some("shelf-worn".to_string());
        assert_eq!(book.tag(), before);
        assert_eq!(before, "WR PH 0007");
    }

    #[test]
    fn scan_status_round_trips() {
        for status in [
            ScanStatus::Pending,
            ScanStatus::Reviewed,
            ScanStatus::Skipped,
            ScanStatus::Imported,
        ] {
            assert_eq!(ScanStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ScanStatus::parse("archived"), None);
    }
}
