use axum::{debug_handler, extract::State, Json};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{extract::{JsonBody, QueryArgs}, session, AppResult, AppState};

use super::identity;

#[derive(Deserialize)]
pub(crate) struct RegisterBody {
    email: String,
    username: String,
    code: String,
}

#[derive(Serialize)]
pub(crate) struct Registered {
    message: &'static str,
    username: String,
}

#[derive(Deserialize)]
pub(crate) struct CheckQuery {
    username: String,
}

#[derive(Serialize)]
pub(crate) struct Availability {
    available: bool,
}

#[debug_handler(state = AppState)]
pub(crate) async fn register(
    State(db_pool): State<SqlitePool>,
    session: Session,
    JsonBody(RegisterBody { email, username, code }): JsonBody<RegisterBody>,
) -> AppResult<Json<Registered>> {
    let user = identity::register(&db_pool, &email, &username, &code).await?;
    session::create_session(&session, &user).await?;

    Ok(Json(Registered { message: "account created", username: user.handle }))
}

#[debug_handler(state = AppState)]
pub(crate) async fn check_username(
    State(db_pool): State<SqlitePool>,
    QueryArgs(CheckQuery { username }): QueryArgs<CheckQuery>,
) -> AppResult<Json<Availability>> {
    let available = identity::check_handle_available(&db_pool, &username).await?;
    Ok(Json(Availability { available }))
}
