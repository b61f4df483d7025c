//! Author name parsing and matching
//!
//! Turns free-text author strings into structured (first, last) candidates,
//! each either matched to an existing author or marked for creation. Pure
//! query+transform: nothing is written here; creation happens only inside
//! promotion.
//!
//! The raw string splits on every comma first, so a single name written as
//! "Last, First" mixed with comma-separated multiple authors cannot be
//! disambiguated: "King, Stephen, Martin, George" parses as four
//! single-token authors. This is a known limitation of the format, kept
//! deliberately and pinned by the tests below.

use obm_common::Result;
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::authors;

/// One parsed author, matched or to-be-created
///
/// existing_id is Some for a case-insensitive match against the author
/// table; None means promotion will create this author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorCandidate {
    pub first_name: String,
    pub last_name: String,
    pub existing_id: Option<Uuid>,
}

/// Split one author name into (first, last)
///
/// A comma means "Last, First". Otherwise the last whitespace token is the
/// last name and everything before it the first name; a single token is a
/// last name with an empty first name.
pub fn split_author_name(name: &str) -> (String, String) {
    let name = name.trim();

    if let Some((last, first)) = name.split_once(',') {
        return (first.trim().to_string(), last.trim().to_string());
    }

    let mut tokens: Vec<&str> = name.split_whitespace().collect();
    match tokens.len() {
        0 => (String::new(), String::new()),
        1 => (String::new(), tokens[0].to_string()),
        _ => {
            let last = tokens.pop().unwrap_or_default();
            (tokens.join(" "), last.to_string())
        }
    }
}

/// Split a raw multi-author string into individual name entries
///
/// Commas separate entries; there is no escaping, so commas inside a single
/// name are indistinguishable from entry separators (see module docs).
pub fn split_authors_raw(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a raw author string and match each candidate against the store
pub async fn parse_and_match(pool: &SqlitePool, raw: &str) -> Result<Vec<AuthorCandidate>> {
    let mut candidates = Vec::new();
    for entry in split_authors_raw(raw) {
        let (first_name, last_name) = split_author_name(&entry);
        if last_name.is_empty() {
            continue;
        }
        let existing_id = authors::find_by_name(pool, &first_name, &last_name)
            .await?
            .map(|author| author.id);
        candidates.push(AuthorCandidate {
            first_name,
            last_name,
            existing_id,
        });
    }
    Ok(candidates)
}
