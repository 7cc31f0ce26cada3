use axum::{routing::{get, post}, Router};

use crate::AppState;

pub mod directory;
pub mod msg;
mod new;
mod room;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search-user", get(new::search_user))
        .route("/create-chat", post(new::create_chat))
        .route("/chat/{id}", get(room::chat_page))
        .route("/chat/{id}/send-message", post(room::send_message))
        .route("/chat/{id}/messages", get(room::messages))
}
