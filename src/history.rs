//! Account and chat-history persistence.
//!
//! One SQLite database with two tables: `users` (credentials) and
//! `chat_history` (question/answer exchanges with optional feedback).
//! Passwords are stored as salted Argon2id hashes.

use std::path::PathBuf;

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use crate::core::errors::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Positive,
    Negative,
}

impl Feedback {
    fn as_str(&self) -> &'static str {
        match self {
            Feedback::Positive => "positive",
            Feedback::Negative => "negative",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "positive" => Some(Feedback::Positive),
            "negative" => Some(Feedback::Negative),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRecord {
    pub id: i64,
    pub user_message: String,
    pub bot_response: String,
    pub feedback: Option<Feedback>,
    pub timestamp: String,
}

#[derive(Clone)]
pub struct SessionStore {
    pool: SqlitePool,
}

impl SessionStore {
    pub async fn new(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to connect to session db: {}", e)))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to init users table: {}", e)))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chat_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL,
                user_message TEXT NOT NULL,
                bot_response TEXT NOT NULL,
                feedback TEXT DEFAULT NULL,
                timestamp DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to init chat_history table: {}", e)))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chat_history_username ON chat_history(username)")
            .execute(&pool)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to create index: {}", e)))?;

        Ok(Self { pool })
    }

    /// Register a new account. Returns false when the username is taken;
    /// other database failures are errors.
    pub async fn register_user(&self, username: &str, password: &str) -> Result<bool, ApiError> {
        let password_hash = hash_password(password)?;
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO users (username, password_hash, created_at) VALUES (?, ?, ?)",
        )
        .bind(username)
        .bind(&password_hash)
        .bind(&now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(true),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Ok(false),
            Err(err) => Err(ApiError::internal(err)),
        }
    }

    pub async fn authenticate_user(&self, username: &str, password: &str) -> Result<bool, ApiError> {
        let stored: Option<String> =
            sqlx::query_scalar("SELECT password_hash FROM users WHERE username = ?")
                .bind(username)
                .fetch_optional(&self.pool)
                .await
                .map_err(ApiError::internal)?;

        match stored {
            Some(hash) => Ok(verify_password(password, &hash)),
            None => Ok(false),
        }
    }

    /// Persist one question/answer exchange and return its row id.
    pub async fn save_exchange(
        &self,
        username: &str,
        user_message: &str,
        bot_response: &str,
    ) -> Result<i64, ApiError> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO chat_history (username, user_message, bot_response, timestamp)
             VALUES (?, ?, ?, ?)",
        )
        .bind(username)
        .bind(user_message)
        .bind(bot_response)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(result.last_insert_rowid())
    }

    /// Attach feedback to an existing exchange, in place. Returns false when
    /// no exchange with that id belongs to the user.
    pub async fn set_feedback(
        &self,
        exchange_id: i64,
        username: &str,
        feedback: Feedback,
    ) -> Result<bool, ApiError> {
        let result = sqlx::query(
            "UPDATE chat_history SET feedback = ? WHERE id = ? AND username = ?",
        )
        .bind(feedback.as_str())
        .bind(exchange_id)
        .bind(username)
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(result.rows_affected() > 0)
    }

    /// Most recent exchanges for a user, newest first.
    pub async fn get_history(
        &self,
        username: &str,
        limit: i64,
    ) -> Result<Vec<ExchangeRecord>, ApiError> {
        let rows = sqlx::query(
            "SELECT id, user_message, bot_response, feedback, timestamp
             FROM chat_history
             WHERE username = ?
             ORDER BY id DESC
             LIMIT ?",
        )
        .bind(username)
        .bind(limit.max(1))
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        let mut exchanges = Vec::new();
        for row in rows {
            let feedback: Option<String> = row.try_get("feedback").unwrap_or(None);
            exchanges.push(ExchangeRecord {
                id: row.try_get::<i64, _>("id").unwrap_or_default(),
                user_message: row.try_get::<String, _>("user_message").unwrap_or_default(),
                bot_response: row.try_get::<String, _>("bot_response").unwrap_or_default(),
                feedback: feedback.as_deref().and_then(Feedback::parse),
                timestamp: row.try_get::<String, _>("timestamp").unwrap_or_default(),
            });
        }

        Ok(exchanges)
    }
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(ApiError::internal)
}

fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> SessionStore {
        let tmp = std::env::temp_dir().join(format!(
            "chronicle-session-test-{}.db",
            uuid::Uuid::new_v4()
        ));
        SessionStore::new(tmp).await.unwrap()
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let store = test_store().await;

        assert!(store.register_user("alice", "secret").await.unwrap());
        assert!(!store.register_user("alice", "other").await.unwrap());
    }

    #[tokio::test]
    async fn authentication_checks_the_password() {
        let store = test_store().await;
        store.register_user("alice", "correct horse").await.unwrap();

        assert!(!store.authenticate_user("alice", "wrong").await.unwrap());
        assert!(store.authenticate_user("alice", "correct horse").await.unwrap());
        assert!(!store.authenticate_user("nobody", "correct horse").await.unwrap());
    }

    #[tokio::test]
    async fn password_hashes_are_salted() {
        let store = test_store().await;
        store.register_user("alice", "same password").await.unwrap();
        store.register_user("bob", "same password").await.unwrap();

        let hashes: Vec<String> =
            sqlx::query_scalar("SELECT password_hash FROM users ORDER BY username")
                .fetch_all(&store.pool)
                .await
                .unwrap();

        assert_eq!(hashes.len(), 2);
        assert_ne!(hashes[0], hashes[1]);
        assert!(!hashes[0].contains("same password"));
    }

    #[tokio::test]
    async fn history_is_newest_first_and_limited() {
        let store = test_store().await;
        store.register_user("alice", "pw").await.unwrap();

        for i in 0..5 {
            store
                .save_exchange("alice", &format!("question {}", i), &format!("answer {}", i))
                .await
                .unwrap();
        }

        let history = store.get_history("alice", 3).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].user_message, "question 4");
        assert_eq!(history[2].user_message, "question 2");
    }

    #[tokio::test]
    async fn feedback_updates_the_exchange_row_in_place() {
        let store = test_store().await;
        store.register_user("alice", "pw").await.unwrap();

        let id = store
            .save_exchange("alice", "question", "answer")
            .await
            .unwrap();

        assert!(store
            .set_feedback(id, "alice", Feedback::Positive)
            .await
            .unwrap());

        let history = store.get_history("alice", 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].feedback, Some(Feedback::Positive));
    }

    #[tokio::test]
    async fn feedback_requires_the_owning_user() {
        let store = test_store().await;
        let id = store.save_exchange("alice", "q", "a").await.unwrap();

        assert!(!store
            .set_feedback(id, "mallory", Feedback::Negative)
            .await
            .unwrap());
        assert!(!store
            .set_feedback(id + 100, "alice", Feedback::Negative)
            .await
            .unwrap());
    }
}
