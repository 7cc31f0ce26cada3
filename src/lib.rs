pub mod appresult;
pub mod auth;
pub mod chats;
pub mod config;
pub mod db;
pub mod extract;
pub mod index;
pub mod logging;
pub mod res;
pub mod session;
#[cfg(test)]
mod testing;

use std::sync::Arc;

use axum::{extract::FromRef, routing::get, Router};
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;
use tower_sessions::{cookie::SameSite, Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;

pub use appresult::{AppError, AppResult, ErrorKind};
use auth::{AuthSettings, Notifier};
use config::SessionSettings;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub notifier: Arc<dyn Notifier>,
    pub auth: AuthSettings,
}

/// The whole HTTP surface, sessions included.
pub fn app(app_state: AppState, session_store: SqliteStore, settings: SessionSettings) -> Router {
    let session_layer = SessionManagerLayer::new(session_store)
        .with_name(session::COOKIE_NAME)
        .with_secure(settings.secure)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(settings.idle))
        .with_signed(settings.key);

    Router::new()
        .route("/", get(index::index))
        .route("/chats", get(index::chats))

        .merge(auth::router())
        .merge(chats::router())

        .with_state(app_state)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
}
