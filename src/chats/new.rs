use axum::{debug_handler, extract::State, Json};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::{extract::{JsonBody, QueryArgs}, session::CurrentUser, AppResult, AppState};

use super::directory;

#[derive(Deserialize)]
pub(crate) struct SearchQuery {
    username: String,
}

#[derive(Serialize)]
#[serde(untagged)]
pub(crate) enum SearchResult {
    Found { username: String },
    Missing { detail: &'static str },
}

#[derive(Deserialize)]
pub(crate) struct NewChatBody {
    username: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct NewChat {
    message: &'static str,
    chat_id: i64,
}

#[debug_handler(state = AppState)]
pub(crate) async fn search_user(
    State(db_pool): State<SqlitePool>,
    CurrentUser(_user): CurrentUser,
    QueryArgs(SearchQuery { username }): QueryArgs<SearchQuery>,
) -> AppResult<Json<SearchResult>> {
    let result = match directory::find_by_handle(&db_pool, &username).await? {
        Some(user) => SearchResult::Found { username: user.handle },
        None => SearchResult::Missing { detail: "user not found" },
    };

    Ok(Json(result))
}

#[debug_handler(state = AppState)]
pub(crate) async fn create_chat(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user): CurrentUser,
    JsonBody(NewChatBody { username }): JsonBody<NewChatBody>,
) -> AppResult<Json<NewChat>> {
    let (chat, created) = directory::create_chat(&db_pool, &user, username.as_deref().unwrap_or_default()).await?;

    Ok(Json(NewChat {
        message: if created { "chat created" } else { "chat already exists" },
        chat_id: chat.id,
    }))
}
