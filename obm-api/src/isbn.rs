//! ISBN normalization

use obm_common::{Error, Result};

/// Normalize a raw ISBN string
///
/// Strips everything except digits and the ISBN-10 check character 'X'
/// (uppercased), then requires the result to be exactly 10 or 13
/// characters.
pub fn normalize_isbn(raw: &str) -> Result<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || c.eq_ignore_ascii_case(&'X'))
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if cleaned.len() == 10 || cleaned.len() == 13 {
        Ok(cleaned)
    } else {
        Err(Error::Validation(format!(
            "Invalid ISBN format: '{}' normalizes to {} characters, expected 10 or 13",
            raw.trim(),
            cleaned.len()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_hyphens_and_spaces() {
        assert_eq!(normalize_isbn("978-0-316-06652-5").unwrap(), "9780316066525");
        assert_eq!(normalize_isbn(" 0 316 06652 8 ").unwrap(), "0316066528");
    }

    #[test]
    fn uppercases_check_character() {
        assert_eq!(normalize_isbn("155860832x").unwrap(), "155860832X");
    }

    #[test]
    fn rejects_wrong_lengths() {
        assert!(normalize_isbn("12345").is_err());
        assert!(normalize_isbn("").is_err());
        assert!(normalize_isbn("978031606652").is_err());
        assert!(normalize_isbn("no digits at all").is_err());
    }

    #[test]
    fn rejects_fourteen_digits() {
        assert!(normalize_isbn("97803160665251").is_err());
    }
}
