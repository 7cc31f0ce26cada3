use sqlx::{SqliteConnection, SqliteExecutor};
use uuid::Uuid;

use crate::{db::{self, User}, AppError, AppResult};

pub(crate) async fn by_id<'e>(db: impl SqliteExecutor<'e>, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT id,email,handle,created_at FROM users WHERE id=?")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub(crate) async fn by_email<'e>(db: impl SqliteExecutor<'e>, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT id,email,handle,created_at FROM users WHERE email=?")
        .bind(email)
        .fetch_optional(db)
        .await
}

/// Case-insensitive, through the column collation.
pub(crate) async fn by_handle<'e>(db: impl SqliteExecutor<'e>, handle: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT id,email,handle,created_at FROM users WHERE handle=?")
        .bind(handle)
        .fetch_optional(db)
        .await
}

/// Unique violations come back as the matching conflict, so a registration
/// that lost a race still reports `HandleTaken`.
pub(crate) async fn insert(conn: &mut SqliteConnection, email: &str, handle: &str) -> AppResult<User> {
    let uuid = Uuid::now_v7();

    sqlx::query_as("INSERT INTO users (id,email,handle,created_at) VALUES (?,?,?,?) RETURNING id,email,handle,created_at")
        .bind(uuid.to_string())
        .bind(email)
        .bind(handle)
        .bind(db::now())
        .fetch_one(conn)
        .await
        .map_err(|err| match err.as_database_error() {
            Some(db_err) if db_err.is_unique_violation() => {
                if db_err.message().contains("users.email") {
                    AppError::EmailAlreadyRegistered
                } else {
                    AppError::HandleTaken
                }
            }
            _ => err.into(),
        })
}
