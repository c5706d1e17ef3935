//! SQLite-backed durable account store.
//!
//! The durable mirror of the login-attempt state lives on the account
//! record; this module owns the pool and the `AccountStore` impl over it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};

use crate::error::SecurityError;
use crate::store::{AccountSecurityRecord, AccountStore};

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, SecurityError> {
        let pool = SqlitePool::connect(database_url).await?;
        let db = Database { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// In-memory database for tests. A single connection, otherwise each
    /// pooled connection would see its own empty database.
    pub async fn new_in_memory() -> Result<Self, SecurityError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let db = Database { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    pub async fn run_migrations(&self) -> Result<(), SecurityError> {
        sqlx::query(include_str!("../migrations/001_account_security.sql"))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Seed an account row (the CRM's user provisioning owns this in
    /// production).
    pub async fn upsert_account(&self, user_id: &str, email: &str) -> Result<(), SecurityError> {
        sqlx::query(
            r#"
            INSERT INTO account_security (user_id, email)
            VALUES (?1, ?2)
            ON CONFLICT (user_id) DO UPDATE SET email = excluded.email
            "#,
        )
        .bind(user_id)
        .bind(email.to_lowercase())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn parse_timestamp(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    })
}

#[async_trait]
impl AccountStore for Database {
    async fn security_record(
        &self,
        user_id: &str,
    ) -> Result<Option<AccountSecurityRecord>, SecurityError> {
        let row = sqlx::query(
            r#"
            SELECT login_attempts, attempt_window_expiry, lock_until
            FROM account_security
            WHERE user_id = ?1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| AccountSecurityRecord {
            login_attempts: row.get::<i64, _>("login_attempts") as u32,
            attempt_window_expiry: parse_timestamp(row.get("attempt_window_expiry")),
            lock_until: parse_timestamp(row.get("lock_until")),
        }))
    }

    async fn update_attempts(
        &self,
        user_id: &str,
        attempts: u32,
        window_expiry: DateTime<Utc>,
    ) -> Result<(), SecurityError> {
        sqlx::query(
            r#"
            INSERT INTO account_security (user_id, login_attempts, attempt_window_expiry)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (user_id) DO UPDATE SET
                login_attempts = excluded.login_attempts,
                attempt_window_expiry = excluded.attempt_window_expiry
            "#,
        )
        .bind(user_id)
        .bind(attempts as i64)
        .bind(window_expiry.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn establish_lock(
        &self,
        user_id: &str,
        lock_until: DateTime<Utc>,
        attempts: u32,
    ) -> Result<(), SecurityError> {
        sqlx::query(
            r#"
            INSERT INTO account_security (user_id, login_attempts, lock_until)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (user_id) DO UPDATE SET
                login_attempts = excluded.login_attempts,
                lock_until = excluded.lock_until,
                attempt_window_expiry = NULL
            "#,
        )
        .bind(user_id)
        .bind(attempts as i64)
        .bind(lock_until.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear_security_state(&self, user_id: &str) -> Result<(), SecurityError> {
        sqlx::query(
            r#"
            UPDATE account_security
            SET login_attempts = 0, attempt_window_expiry = NULL, lock_until = NULL
            WHERE user_id = ?1
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_user_id_by_email(&self, email: &str) -> Result<Option<String>, SecurityError> {
        let row = sqlx::query("SELECT user_id FROM account_security WHERE email = ?1")
            .bind(email.to_lowercase())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| row.get("user_id")))
    }
}
