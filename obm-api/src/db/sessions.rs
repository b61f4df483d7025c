//! User and session persistence
//!
//! Session tokens are random 32-byte hex strings handed out at login and
//! validated on every request; passwords are stored as salted SHA-256
//! digests in `salt$digest` form.

use chrono::{Duration, Utc};
use obm_common::db::Principal;
use obm_common::{Error, Result};
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Session lifetime: two weeks
const SESSION_LIFETIME_DAYS: i64 = 14;

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn digest_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex_encode(&hasher.finalize())
}

/// Produce a `salt$digest` password record
fn hash_password(password: &str) -> String {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = hex_encode(&salt_bytes);
    let digest = digest_password(&salt, password);
    format!("{salt}${digest}")
}

fn verify_password(stored: &str, password: &str) -> bool {
    match stored.split_once('$') {
        Some((salt, digest)) => digest_password(salt, password) == digest,
        None => false,
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex_encode(&bytes)
}

pub async fn count_users(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Create the user
pub async fn create_user(pool: &SqlitePool, username: &str, password: &str) -> Result<Uuid> {
    let username = username.trim();
    if username.is_empty() {
        return Err(Error::Validation("Username is required".to_string()));
    }
    if password.len() < 8 {
        return Err(Error::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, username, password_digest) VALUES (?, ?, ?)")
        .bind(id.to_string())
        .bind(username)
        .bind(hash_password(password))
        .execute(pool)
        .await?;
    Ok(id)
}

/// Create the initial admin account if no users exist yet
///
/// Returns true if the account was created.
pub async fn ensure_admin_user(pool: &SqlitePool, password: &str) -> Result<bool> {
    if count_users(pool).await? > 0 {
        return Ok(false);
    }
    create_user(pool, "admin", password).await?;
    Ok(true)
}

/// Verify credentials and open a new session
pub async fn login(pool: &SqlitePool, username: &str, password: &str) -> Result<(String, Principal)> {
    let row = sqlx::query("SELECT id, username, password_digest FROM users WHERE username = ?")
        .bind(username.trim())
        .fetch_optional(pool)
        .await?;

    let row = row.ok_or_else(|| Error::Validation("Invalid username or password".to_string()))?;
    let stored: String = row.get("password_digest");
    if !verify_password(&stored, password) {
        return Err(Error::Validation("Invalid username or password".to_string()));
    }

    let user_id: String = row.get("id");
    let user_id = Uuid::parse_str(&user_id)
        .map_err(|e| Error::Storage(sqlx::Error::Decode(Box::new(e))))?;
    let principal = Principal {
        user_id,
        username: row.get("username"),
    };

    let token = generate_token();
    let expires_at = (Utc::now() + Duration::days(SESSION_LIFETIME_DAYS)).to_rfc3339();
    sqlx::query("INSERT INTO sessions (token, user_id, expires_at) VALUES (?, ?, ?)")
        .bind(&token)
        .bind(principal.user_id.to_string())
        .bind(&expires_at)
        .execute(pool)
        .await?;

    tracing::info!(username = %principal.username, "Session opened");
    Ok((token, principal))
}

/// Resolve a session token to its principal
///
/// Returns None for unknown or expired tokens; expired rows are removed as
/// a side effect.
pub async fn authenticate(pool: &SqlitePool, token: &str) -> Result<Option<Principal>> {
    let row = sqlx::query(
        r#"
        SELECT s.expires_at, u.id, u.username
        FROM sessions s
        JOIN users u ON u.id = s.user_id
        WHERE s.token = ?
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let expires_at: String = row.get("expires_at");
    let expired = chrono::DateTime::parse_from_rfc3339(&expires_at)
        .map(|t| t < Utc::now())
        .unwrap_or(true);
    if expired {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(pool)
            .await?;
        return Ok(None);
    }

    let user_id: String = row.get("id");
    let user_id = Uuid::parse_str(&user_id)
        .map_err(|e| Error::Storage(sqlx::Error::Decode(Box::new(e))))?;
    Ok(Some(Principal {
        user_id,
        username: row.get("username"),
    }))
}

/// Close a session; unknown tokens are a no-op
pub async fn logout(pool: &SqlitePool, token: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await
            .unwrap();
        obm_common::db::create_users_table(&pool).await.unwrap();
        obm_common::db::create_sessions_table(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn login_round_trip() {
        let pool = test_pool().await;
        create_user(&pool, "admin", "correct horse").await.unwrap();

        let (token, principal) = login(&pool, "admin", "correct horse").await.unwrap();
        assert_eq!(principal.username, "admin");

        let resolved = authenticate(&pool, &token).await.unwrap().unwrap();
        assert_eq!(resolved.user_id, principal.user_id);

        logout(&pool, &token).await.unwrap();
        assert!(authenticate(&pool, &token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn wrong_password_is_rejected_without_detail() {
        let pool = test_pool().await;
        create_user(&pool, "admin", "correct horse").await.unwrap();

        let err = login(&pool, "admin", "battery staple").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        let err = login(&pool, "nobody", "battery staple").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn ensure_admin_is_idempotent() {
        let pool = test_pool().await;
        assert!(ensure_admin_user(&pool, "first-password").await.unwrap());
        assert!(!ensure_admin_user(&pool, "second-password").await.unwrap());
        assert_eq!(count_users(&pool).await.unwrap(), 1);
    }

    #[test]
    fn password_digests_use_distinct_salts() {
        let a = hash_password("same password");
        let b = hash_password("same password");
        assert_ne!(a, b);
        assert!(verify_password(&a, "same password"));
        assert!(verify_password(&b, "same password"));
        assert!(!verify_password(&a, "other password"));
    }
}
