use std::sync::Arc;

use axum::{debug_handler, extract::State, Json};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{extract::JsonBody, session, AppResult, AppState};

use super::{identity, AuthSettings, LoginOutcome, Notifier};

#[derive(Deserialize)]
pub(crate) struct SendCodeBody {
    email: String,
}

#[derive(Deserialize)]
pub(crate) struct LoginBody {
    email: String,
    code: String,
}

#[derive(Serialize)]
pub(crate) struct Ack {
    message: &'static str,
}

#[derive(Serialize)]
#[serde(untagged)]
pub(crate) enum LoginResponse {
    LoggedIn { id: String, username: String },
    NeedRegister { need_register: bool },
}

#[debug_handler(state = AppState)]
pub(crate) async fn send_code(
    State(db_pool): State<SqlitePool>,
    State(notifier): State<Arc<dyn Notifier>>,
    State(settings): State<AuthSettings>,
    JsonBody(SendCodeBody { email }): JsonBody<SendCodeBody>,
) -> AppResult<Json<Ack>> {
    identity::request_code(&db_pool, notifier.as_ref(), &settings, &email).await?;
    Ok(Json(Ack { message: "code sent" }))
}

#[debug_handler(state = AppState)]
pub(crate) async fn login(
    State(db_pool): State<SqlitePool>,
    session: Session,
    JsonBody(LoginBody { email, code }): JsonBody<LoginBody>,
) -> AppResult<Json<LoginResponse>> {
    let response = match identity::authenticate(&db_pool, &email, &code).await? {
        LoginOutcome::NeedsRegistration => LoginResponse::NeedRegister { need_register: true },
        LoginOutcome::LoggedIn(user) => {
            session::create_session(&session, &user).await?;
            LoginResponse::LoggedIn { id: user.id, username: user.handle }
        }
    };

    Ok(Json(response))
}
