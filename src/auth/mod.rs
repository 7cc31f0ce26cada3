use axum::{routing::{get, post}, Router};

use crate::AppState;

mod codes;
pub mod identity;
mod login;
mod logout;
mod notifier;
mod register;
pub(crate) mod users;

pub use identity::{AuthSettings, LoginOutcome};
pub use notifier::{Notifier, NotifyError, ResendNotifier};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/send-code", post(login::send_code))
        .route("/auth/login", post(login::login))
        .route("/auth/register", post(register::register))
        .route("/auth/check-username", get(register::check_username))
        .route("/logout", get(logout::logout))
}
