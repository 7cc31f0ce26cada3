use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::{db::{self, Message, User}, AppError, AppResult};

use super::directory;

/// A message as a poller sees it, joined with its author's handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct PolledMessage {
    pub id: i64,
    pub user: String,
    pub text: String,
    pub is_me: bool,
    pub created_at: i64,
}

/// Stores `text` trimmed. Ids come from one AUTOINCREMENT sequence, so they
/// only grow within every chat.
pub async fn append(db_pool: &SqlitePool, chat_id: i64, author: &User, text: &str) -> AppResult<Message> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::EmptyMessage);
    }

    directory::authorize_access(db_pool, author, chat_id).await?;

    let message: Message = sqlx::query_as(
        "INSERT INTO messages (chat_id,user_id,text,created_at) VALUES (?,?,?,?)
         RETURNING id,chat_id,user_id,text,created_at",
    )
        .bind(chat_id)
        .bind(&author.id)
        .bind(text)
        .bind(db::now())
        .fetch_one(db_pool)
        .await?;

    tracing::debug!(chat_id, message_id = message.id, "message stored");
    Ok(message)
}

/// Everything after `after_id`, ascending.
pub async fn poll_since(db_pool: &SqlitePool, chat_id: i64, requester: &User, after_id: i64) -> AppResult<Vec<PolledMessage>> {
    directory::authorize_access(db_pool, requester, chat_id).await?;

    Ok(
        sqlx::query_as(
            "SELECT m.id, COALESCE(u.handle,'unknown') AS user, m.text, m.user_id=? AS is_me, m.created_at
             FROM messages m LEFT JOIN users u ON u.id=m.user_id
             WHERE m.chat_id=? AND m.id>?
             ORDER BY m.id ASC",
        )
            .bind(&requester.id)
            .bind(chat_id)
            .bind(after_id)
            .fetch_all(db_pool)
            .await?
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{chats::directory::create_chat, testing::register_user};

    async fn pair(db_pool: &SqlitePool) -> (User, User, i64) {
        let alice = register_user(db_pool, "a@x.com", "@alice").await;
        let bob = register_user(db_pool, "b@x.com", "@bobby").await;
        let (chat, _) = create_chat(db_pool, &alice, "@bobby").await.unwrap();
        (alice, bob, chat.id)
    }

    #[tokio::test]
    async fn polling_returns_messages_in_order() {
        let db_pool = db::connect_memory().await.unwrap();
        let (alice, bob, chat_id) = pair(&db_pool).await;

        let m1 = append(&db_pool, chat_id, &alice, "one").await.unwrap();
        let m2 = append(&db_pool, chat_id, &bob, "two").await.unwrap();
        let m3 = append(&db_pool, chat_id, &alice, "  three  ").await.unwrap();
        assert!(m1.id < m2.id && m2.id < m3.id);
        assert_eq!(m3.text, "three");

        let all = poll_since(&db_pool, chat_id, &bob, 0).await.unwrap();
        let ids: Vec<i64> = all.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![m1.id, m2.id, m3.id]);
        assert_eq!(all[0].user, "@alice");
        assert!(!all[0].is_me);
        assert!(all[1].is_me);

        let rest = poll_since(&db_pool, chat_id, &alice, m2.id).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id, m3.id);
        assert_eq!(rest[0].text, "three");
        assert!(rest[0].is_me);

        assert!(poll_since(&db_pool, chat_id, &alice, m3.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_text_is_rejected() {
        let db_pool = db::connect_memory().await.unwrap();
        let (alice, _, chat_id) = pair(&db_pool).await;

        let err = append(&db_pool, chat_id, &alice, "  \n ").await.unwrap_err();
        assert!(matches!(err, AppError::EmptyMessage));
        assert!(poll_since(&db_pool, chat_id, &alice, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn outsiders_are_forbidden() {
        let db_pool = db::connect_memory().await.unwrap();
        let (alice, _, chat_id) = pair(&db_pool).await;
        let mallory = register_user(&db_pool, "m@x.com", "@mallory").await;
        append(&db_pool, chat_id, &alice, "secret").await.unwrap();

        let err = append(&db_pool, chat_id, &mallory, "hi").await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
        let err = poll_since(&db_pool, chat_id, &mallory, 0).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }
}
