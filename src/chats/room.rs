use axum::{debug_handler, extract::State, response::Html, Json};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::{
    extract::{JsonBody, PathArg, QueryArgs},
    include_res,
    res::escape_html,
    session::CurrentUser,
    AppResult, AppState,
};

use super::{directory, msg::{self, PolledMessage}};

#[derive(Deserialize)]
pub(crate) struct SendMessageBody {
    text: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct Sent {
    id: i64,
    user: String,
    text: String,
}

#[derive(Deserialize)]
pub(crate) struct PollQuery {
    after_id: Option<i64>,
}

#[derive(Serialize)]
pub(crate) struct Polled {
    messages: Vec<PolledMessage>,
}

pub(crate) fn msg_to_html(message: &PolledMessage) -> String {
    include_res!(str, "/pages/message.html")
        .replace("{id}", &message.id.to_string())
        .replace("{side}", if message.is_me { "me" } else { "them" })
        .replace("{user}", &escape_html(&message.user))
        .replace("{text}", &escape_html(&message.text))
}

#[debug_handler(state = AppState)]
pub(crate) async fn chat_page(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user): CurrentUser,
    PathArg(chat_id): PathArg<i64>,
) -> AppResult<Html<String>> {
    let chat = directory::get_chat(&db_pool, chat_id).await?;
    directory::authorize_access(&db_pool, &user, chat.id).await?;

    let history = msg::poll_since(&db_pool, chat.id, &user, 0).await?;
    let last_id = history.last().map_or(0, |m| m.id);
    let messages: String = history.iter().map(msg_to_html).collect();

    Ok(Html(
        include_res!(str, "/pages/chat.html")
            .replace("{chat_id}", &chat.id.to_string())
            .replace("{chat_name}", &escape_html(&chat.name))
            .replace("{my_username}", &escape_html(&user.handle))
            .replace("{last_id}", &last_id.to_string())
            .replace("{messages}", &messages)
    ))
}

#[debug_handler(state = AppState)]
pub(crate) async fn send_message(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user): CurrentUser,
    PathArg(chat_id): PathArg<i64>,
    JsonBody(SendMessageBody { text }): JsonBody<SendMessageBody>,
) -> AppResult<Json<Sent>> {
    let message = msg::append(&db_pool, chat_id, &user, text.as_deref().unwrap_or_default()).await?;

    Ok(Json(Sent { id: message.id, user: user.handle, text: message.text }))
}

#[debug_handler(state = AppState)]
pub(crate) async fn messages(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user): CurrentUser,
    PathArg(chat_id): PathArg<i64>,
    QueryArgs(PollQuery { after_id }): QueryArgs<PollQuery>,
) -> AppResult<Json<Polled>> {
    let messages = msg::poll_since(&db_pool, chat_id, &user, after_id.unwrap_or(0)).await?;
    Ok(Json(Polled { messages }))
}
