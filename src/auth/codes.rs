use sqlx::{FromRow, SqliteConnection};

/// An outstanding login code. Live while `expires_at` is in the future and
/// the row still exists; requesting a new code for the email deletes it.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct AuthCode {
    pub(crate) id: i64,
    pub(crate) expires_at: i64,
}

/// Supersedes every earlier code for `email`. Run inside a transaction so the
/// delete and the insert land together.
pub(crate) async fn replace(
    conn: &mut SqliteConnection,
    email: &str,
    code: &str,
    expires_at: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM auth_codes WHERE email=?")
        .bind(email)
        .execute(&mut *conn)
        .await?;

    sqlx::query("INSERT INTO auth_codes (email,code,expires_at) VALUES (?,?,?)")
        .bind(email)
        .bind(code)
        .bind(expires_at)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub(crate) async fn find_live(
    conn: &mut SqliteConnection,
    email: &str,
    code: &str,
    now: i64,
) -> Result<Option<AuthCode>, sqlx::Error> {
    sqlx::query_as("SELECT id,expires_at FROM auth_codes WHERE email=? AND code=? AND expires_at>?")
        .bind(email)
        .bind(code)
        .bind(now)
        .fetch_optional(conn)
        .await
}

/// Deletes the code. `false` means someone else consumed it first.
pub(crate) async fn consume(conn: &mut SqliteConnection, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM auth_codes WHERE id=?")
        .bind(id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn replace_supersedes_older_codes() {
        let db_pool = db::connect_memory().await.unwrap();
        let mut conn = db_pool.acquire().await.unwrap();
        let later = db::now() + 300;

        replace(&mut conn, "a@x.com", "111111", later).await.unwrap();
        replace(&mut conn, "a@x.com", "222222", later).await.unwrap();

        assert!(find_live(&mut conn, "a@x.com", "111111", db::now()).await.unwrap().is_none());
        let live = find_live(&mut conn, "a@x.com", "222222", db::now()).await.unwrap().unwrap();
        assert_eq!(live.expires_at, later);
    }

    #[tokio::test]
    async fn expired_codes_are_not_live() {
        let db_pool = db::connect_memory().await.unwrap();
        let mut conn = db_pool.acquire().await.unwrap();
        let now = db::now();

        replace(&mut conn, "a@x.com", "111111", now).await.unwrap();
        assert!(find_live(&mut conn, "a@x.com", "111111", now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn consume_only_once() {
        let db_pool = db::connect_memory().await.unwrap();
        let mut conn = db_pool.acquire().await.unwrap();

        replace(&mut conn, "a@x.com", "111111", db::now() + 300).await.unwrap();
        let live = find_live(&mut conn, "a@x.com", "111111", db::now()).await.unwrap().unwrap();

        assert!(consume(&mut conn, live.id).await.unwrap());
        assert!(!consume(&mut conn, live.id).await.unwrap());
    }
}
