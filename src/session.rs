//! Binds a signed-in user to the client's session.
//!
//! The cookie only carries an opaque, signed session id; the user id lives in
//! the `tower_sessions` table next to the rest of the data.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use sqlx::SqlitePool;
use tower_sessions::Session;
use tower_sessions_sqlx_store::SqliteStore;

use crate::{auth, db::User, AppError, AppResult};

pub const USER_ID: &str = "user_id";
pub const COOKIE_NAME: &str = "bridgegram_session";

/// Session store in the application database, table created on first use.
pub async fn store(db_pool: &SqlitePool) -> Result<SqliteStore, sqlx::Error> {
    let store = SqliteStore::new(db_pool.clone());
    store.migrate().await?;
    Ok(store)
}

/// Issues a fresh session id before binding, so an id planted before login
/// never becomes authenticated.
pub async fn create_session(session: &Session, user: &User) -> AppResult<()> {
    session.cycle_id().await?;
    session.insert(USER_ID, &user.id).await?;
    Ok(())
}

pub async fn resolve(session: &Session, db_pool: &SqlitePool) -> AppResult<User> {
    let Some(user_id) = session.get::<String>(USER_ID).await? else {
        return Err(AppError::Unauthenticated);
    };

    match auth::users::by_id(db_pool, &user_id).await? {
        Some(user) => Ok(user),
        None => {
            tracing::info!(%user_id, "dropping session of missing user");
            session.flush().await?;
            Err(AppError::SessionInvalidated)
        }
    }
}

/// Safe to call without a session.
pub async fn destroy(session: &Session) -> AppResult<()> {
    session.flush().await?;
    Ok(())
}

/// The signed-in user; rejects with `Unauthenticated` or `SessionInvalidated`.
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    SqlitePool: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AppError::Internal(anyhow::anyhow!(msg)))?;
        let db_pool = SqlitePool::from_ref(state);

        Ok(CurrentUser(resolve(&session, &db_pool).await?))
    }
}
