use axum::{debug_handler, extract::State, response::{Html, IntoResponse, Redirect, Response}};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{chats::directory, include_res, res::escape_html, session::{self, USER_ID}, AppError, AppResult};

#[debug_handler]
pub async fn index(
    session: Session
) -> AppResult<Response> {
    if session.get::<String>(USER_ID).await?.is_some() {
        return Ok(
            Redirect::to("/chats")
                .into_response()
        );
    }

    Ok(Html(include_res!(str, "/pages/login.html")).into_response())
}

#[debug_handler(state = crate::AppState)]
pub async fn chats(
    State(db_pool): State<SqlitePool>,
    session: Session
) -> AppResult<Response> {
    let user = match session::resolve(&session, &db_pool).await {
        Ok(user) => user,
        Err(AppError::Unauthenticated | AppError::SessionInvalidated) => {
            return Ok(Redirect::to("/").into_response());
        }
        Err(err) => return Err(err),
    };

    let mut chat_items = String::new();
    for chat in directory::list_chats_for(&db_pool, &user).await? {
        chat_items += &include_res!(str, "/pages/chat_item.html")
            .replace("{id}", &chat.id.to_string())
            .replace("{name}", &escape_html(&chat.name));
    }

    Ok(
        Html(
            include_res!(str, "/pages/chats.html")
                .replace("{my_username}", &escape_html(&user.handle))
                .replace("{chat_items}", &chat_items)
        ).into_response()
    )
}
