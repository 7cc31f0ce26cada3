use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::NotifyError;

pub type AppResult<T> = Result<T, AppError>;

/// Coarse failure class, one per HTTP status family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Auth,
    Dependency,
    Internal,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("username must be @ followed by 4-31 letters, digits or underscores")]
    InvalidHandle,
    #[error("invalid email address")]
    InvalidEmail,
    #[error("message is empty")]
    EmptyMessage,
    #[error("username is required")]
    MissingHandle,
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("username is already taken")]
    HandleTaken,
    #[error("an account with this email already exists")]
    EmailAlreadyRegistered,
    #[error("cannot start a chat with yourself")]
    SelfChat,

    #[error("user not found")]
    UserNotFound,
    #[error("chat not found")]
    ChatNotFound,

    #[error("invalid or expired code")]
    InvalidOrExpiredCode,
    #[error("not signed in")]
    Unauthenticated,
    #[error("session user no longer exists")]
    SessionInvalidated,
    #[error("access denied")]
    Forbidden,

    #[error("could not deliver the code")]
    Notification(#[source] NotifyError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    detail: String,
    code: &'a str,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        use AppError::*;
        match self {
            InvalidHandle | InvalidEmail | EmptyMessage | MissingHandle | MalformedRequest(_) => ErrorKind::Validation,
            HandleTaken | EmailAlreadyRegistered | SelfChat => ErrorKind::Conflict,
            UserNotFound | ChatNotFound => ErrorKind::NotFound,
            InvalidOrExpiredCode | Unauthenticated | SessionInvalidated | Forbidden => ErrorKind::Auth,
            Notification(_) => ErrorKind::Dependency,
            Internal(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable name, sent to clients next to the message.
    pub fn code(&self) -> &'static str {
        use AppError::*;
        match self {
            InvalidHandle => "invalid_handle",
            InvalidEmail => "invalid_email",
            EmptyMessage => "empty_message",
            MissingHandle => "missing_handle",
            MalformedRequest(_) => "malformed_request",
            HandleTaken => "handle_taken",
            EmailAlreadyRegistered => "email_already_registered",
            SelfChat => "self_chat",
            UserNotFound => "user_not_found",
            ChatNotFound => "chat_not_found",
            InvalidOrExpiredCode => "invalid_or_expired_code",
            Unauthenticated => "unauthenticated",
            SessionInvalidated => "session_invalidated",
            Forbidden => "forbidden",
            Notification(_) => "notification_failed",
            Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation | ErrorKind::Conflict => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Auth => match self {
                AppError::Forbidden => StatusCode::FORBIDDEN,
                AppError::InvalidOrExpiredCode => StatusCode::BAD_REQUEST,
                _ => StatusCode::UNAUTHORIZED,
            },
            ErrorKind::Dependency | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let detail = match &self {
            AppError::Internal(err) => {
                tracing::error!(error = %err, backtrace = %err.backtrace(), "request failed");
                "internal server error".to_owned()
            }
            AppError::Notification(err) => {
                tracing::error!(error = %err, "notifier failed");
                self.to_string()
            }
            _ => self.to_string(),
        };

        (
            self.status(),
            Json(ErrorBody { detail, code: self.code() }),
        )
            .into_response()
    }
}

macro_rules! apperr_impl {
    ($E:ty) => {
        impl From<$E> for AppError {
            fn from(err: $E) -> Self {
                Self::Internal(anyhow::Error::from(err))
            }
        }
    };
}

macro_rules! rejection_impl {
    ($E:ty) => {
        impl From<$E> for AppError {
            fn from(rejection: $E) -> Self {
                Self::MalformedRequest(rejection.body_text())
            }
        }
    };
}

rejection_impl!(JsonRejection);
rejection_impl!(QueryRejection);
rejection_impl!(PathRejection);

apperr_impl!(sqlx::Error);
apperr_impl!(tower_sessions::session::Error);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_kind() {
        assert_eq!(AppError::InvalidHandle.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::MalformedRequest(String::new()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::HandleTaken.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::SelfChat.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::UserNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::ChatNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::InvalidOrExpiredCode.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::SessionInvalidated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::Notification(NotifyError::Rejected { status: 422, body: String::new() }).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn kinds_group_the_taxonomy() {
        assert_eq!(AppError::EmptyMessage.kind(), ErrorKind::Validation);
        assert_eq!(AppError::EmailAlreadyRegistered.kind(), ErrorKind::Conflict);
        assert_eq!(AppError::Forbidden.kind(), ErrorKind::Auth);
        assert_eq!(AppError::from(sqlx::Error::RowNotFound).kind(), ErrorKind::Internal);
    }

    #[tokio::test]
    async fn internal_details_are_hidden() {
        let response = AppError::from(sqlx::Error::RowNotFound).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["detail"], "internal server error");
        assert_eq!(body["code"], "internal");
    }
}
