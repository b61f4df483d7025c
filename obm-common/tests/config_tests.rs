//! Configuration parsing and resolution tests

use obm_common::config::{load_toml_config, Config, TomlConfig, DEFAULT_LISTEN_ADDR};
use tempfile::TempDir;

#[test]
fn toml_config_parses_all_fields() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
listen_addr = "0.0.0.0:8080"
database_path = "/var/lib/obm/obm.db"
covers_dir = "/var/lib/obm/covers"
google_books_api_key = "test-key"

[pagination]
books = 25
authors = 10
categories = 40
wishlist = 15
"#,
    )
    .unwrap();

    let config = load_toml_config(&path).unwrap();
    assert_eq!(config.listen_addr.as_deref(), Some("0.0.0.0:8080"));
    assert_eq!(config.google_books_api_key.as_deref(), Some("test-key"));
    assert_eq!(config.pagination.books, 25);
    assert_eq!(config.pagination.wishlist, 15);
}

#[test]
fn empty_toml_uses_pagination_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "").unwrap();

    let config = load_toml_config(&path).unwrap();
    assert!(config.listen_addr.is_none());
    assert_eq!(config.pagination.books, 50);
    assert_eq!(config.pagination.authors, 20);
}

#[test]
fn missing_file_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    let result = load_toml_config(&dir.path().join("nope.toml"));
    assert!(matches!(result, Err(obm_common::Error::Config(_))));
}

#[test]
fn invalid_listen_addr_is_rejected() {
    let toml_config = TomlConfig {
        listen_addr: Some("not-an-address".to_string()),
        ..Default::default()
    };
    // Only valid when no env override is present, which is the normal case
    if std::env::var("OBM_LISTEN_ADDR").is_err() {
        assert!(Config::from_sources(&toml_config).is_err());
    }
}

#[test]
fn blank_api_key_is_treated_as_absent() {
    if std::env::var("OBM_GOOGLE_BOOKS_API_KEY").is_ok() {
        return;
    }
    let toml_config = TomlConfig {
        listen_addr: Some(DEFAULT_LISTEN_ADDR.to_string()),
        google_books_api_key: Some("   ".to_string()),
        ..Default::default()
    };
    let config = Config::from_sources(&toml_config).unwrap();
    assert!(config.google_books_api_key.is_none());
}
