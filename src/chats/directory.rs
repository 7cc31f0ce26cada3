//! Who can talk to whom: pairwise chats and their members.

use sqlx::SqlitePool;

use crate::{auth::users, db::{self, Chat, User}, AppError, AppResult};

/// Trims and adds the leading `@` when missing. `None` for blank input.
pub fn normalize_handle(raw: &str) -> Option<String> {
    let handle = raw.trim();
    if handle.is_empty() {
        return None;
    }

    if handle.starts_with('@') {
        Some(handle.to_owned())
    } else {
        Some(format!("@{handle}"))
    }
}

/// Not finding anyone is a normal answer, not an error.
pub async fn find_by_handle(db_pool: &SqlitePool, raw: &str) -> AppResult<Option<User>> {
    let Some(handle) = normalize_handle(raw) else {
        return Ok(None);
    };

    Ok(users::by_handle(db_pool, &handle).await?)
}

/// Opens the chat between `requester` and the owner of `target_handle`, or
/// returns the one they already share. The flag is `true` when this call
/// created it.
///
/// The pair is stored ordered, under a unique constraint, so two users
/// opening a chat with each other at once still end up with a single row.
pub async fn create_chat(db_pool: &SqlitePool, requester: &User, target_handle: &str) -> AppResult<(Chat, bool)> {
    let handle = normalize_handle(target_handle).ok_or(AppError::MissingHandle)?;
    let target = users::by_handle(db_pool, &handle)
        .await?
        .ok_or(AppError::UserNotFound)?;

    if target.id == requester.id {
        return Err(AppError::SelfChat);
    }

    let (low, high) = if requester.id < target.id {
        (&requester.id, &target.id)
    } else {
        (&target.id, &requester.id)
    };
    let name = format!("{} & {}", requester.handle, target.handle);

    let mut tx = db::begin_write(db_pool).await?;

    let inserted: Option<Chat> = sqlx::query_as(
        "INSERT INTO chats (name,user_low,user_high,created_at) VALUES (?,?,?,?)
         ON CONFLICT (user_low,user_high) DO NOTHING
         RETURNING id,name,created_at",
    )
        .bind(&name)
        .bind(low)
        .bind(high)
        .bind(db::now())
        .fetch_optional(&mut *tx)
        .await?;

    let (chat, created) = match inserted {
        Some(chat) => {
            for user_id in [low, high] {
                sqlx::query("INSERT INTO chat_members (chat_id,user_id) VALUES (?,?)")
                    .bind(chat.id)
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await?;
            }
            (chat, true)
        }
        None => {
            let chat = sqlx::query_as("SELECT id,name,created_at FROM chats WHERE user_low=? AND user_high=?")
                .bind(low)
                .bind(high)
                .fetch_one(&mut *tx)
                .await?;
            (chat, false)
        }
    };
    tx.commit().await?;

    if created {
        tracing::info!(chat_id = chat.id, requester = %requester.id, target = %target.id, "chat created");
    }
    Ok((chat, created))
}

/// Oldest first.
pub async fn list_chats_for(db_pool: &SqlitePool, user: &User) -> AppResult<Vec<Chat>> {
    Ok(
        sqlx::query_as(
            "SELECT c.id,c.name,c.created_at FROM chats c
             JOIN chat_members m ON m.chat_id=c.id
             WHERE m.user_id=? ORDER BY c.id",
        )
            .bind(&user.id)
            .fetch_all(db_pool)
            .await?
    )
}

pub async fn get_chat(db_pool: &SqlitePool, chat_id: i64) -> AppResult<Chat> {
    sqlx::query_as("SELECT id,name,created_at FROM chats WHERE id=?")
        .bind(chat_id)
        .fetch_optional(db_pool)
        .await?
        .ok_or(AppError::ChatNotFound)
}

/// A chat that does not exist is as forbidden as someone else's.
pub async fn authorize_access(db_pool: &SqlitePool, user: &User, chat_id: i64) -> AppResult<()> {
    let member: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM chat_members WHERE chat_id=? AND user_id=?")
        .bind(chat_id)
        .bind(&user.id)
        .fetch_optional(db_pool)
        .await?;

    member.map(|_| ()).ok_or(AppError::Forbidden)
}

pub async fn participants(db_pool: &SqlitePool, chat_id: i64) -> AppResult<Vec<User>> {
    Ok(
        sqlx::query_as(
            "SELECT u.id,u.email,u.handle,u.created_at FROM users u
             JOIN chat_members m ON m.user_id=u.id
             WHERE m.chat_id=? ORDER BY u.handle",
        )
            .bind(chat_id)
            .fetch_all(db_pool)
            .await?
    )
}
