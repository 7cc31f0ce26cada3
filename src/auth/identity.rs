//! Login codes, account creation and handle rules.
//!
//! Every multi-step change runs in one write transaction, so a failed check
//! never leaves a half-created account or a consumed code behind.

use std::time::Duration;

use rand::Rng;
use sqlx::SqlitePool;

use super::{codes, users, Notifier, NotifyError};
use crate::{db::{self, User}, AppError, AppResult};

const HANDLE_MIN: usize = 4;
const HANDLE_MAX: usize = 31;

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub code_ttl: Duration,
    pub notify_timeout: Duration,
}

impl Default for AuthSettings {
    fn default() -> Self {
        AuthSettings {
            code_ttl: Duration::from_secs(5 * 60),
            notify_timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    LoggedIn(User),
    /// The code is right but no account uses the email yet. The code stays
    /// live for the registration call that follows.
    NeedsRegistration,
}

/// `@` followed by 4 to 31 ASCII letters, digits or underscores.
pub fn is_valid_handle(handle: &str) -> bool {
    let Some(body) = handle.strip_prefix('@') else {
        return false;
    };

    (HANDLE_MIN..=HANDLE_MAX).contains(&body.len())
        && body.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Trims and lowercases. Rejects anything without a single `@` between a
/// non-empty local part and domain.
pub fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();

    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && !domain.is_empty() && !domain.contains('@') && !email.contains(char::is_whitespace) =>
        {
            Ok(email)
        }
        _ => Err(AppError::InvalidEmail),
    }
}

fn generate_code() -> String {
    rand::rng().random_range(100_000..=999_999).to_string()
}

/// Issues a fresh code for `email` and mails it.
///
/// The code is committed before the notifier runs. When delivery fails the
/// caller gets `Notification` and the stored code is left as is; a new
/// request supersedes it.
pub async fn request_code(
    db_pool: &SqlitePool,
    notifier: &dyn Notifier,
    settings: &AuthSettings,
    email: &str,
) -> AppResult<()> {
    let email = normalize_email(email)?;
    let code = generate_code();
    let expires_at = db::now() + settings.code_ttl.as_secs() as i64;

    let mut tx = db::begin_write(db_pool).await?;
    codes::replace(&mut tx, &email, &code, expires_at).await?;
    tx.commit().await?;

    tracing::info!(%email, expires_at, "login code issued");

    let delivery = tokio::time::timeout(settings.notify_timeout, notifier.send_code(&email, &code))
        .await
        .unwrap_or(Err(NotifyError::TimedOut(settings.notify_timeout)));

    if let Err(err) = delivery {
        tracing::warn!(%email, error = %err, "login code not delivered");
        return Err(AppError::Notification(err));
    }

    Ok(())
}

pub async fn authenticate(db_pool: &SqlitePool, email: &str, code: &str) -> AppResult<LoginOutcome> {
    let email = normalize_email(email)?;

    let mut tx = db::begin_write(db_pool).await?;
    let Some(record) = codes::find_live(&mut tx, &email, code.trim(), db::now()).await? else {
        return Err(AppError::InvalidOrExpiredCode);
    };
    tracing::debug!(code_id = record.id, expires_at = record.expires_at, "login code accepted");

    let Some(user) = users::by_email(&mut *tx, &email).await? else {
        return Ok(LoginOutcome::NeedsRegistration);
    };

    if !codes::consume(&mut tx, record.id).await? {
        return Err(AppError::InvalidOrExpiredCode);
    }
    tx.commit().await?;

    tracing::info!(user_id = %user.id, "logged in");
    Ok(LoginOutcome::LoggedIn(user))
}

pub async fn register(db_pool: &SqlitePool, email: &str, handle: &str, code: &str) -> AppResult<User> {
    if !is_valid_handle(handle) {
        return Err(AppError::InvalidHandle);
    }
    let email = normalize_email(email)?;

    let mut tx = db::begin_write(db_pool).await?;

    if users::by_handle(&mut *tx, handle).await?.is_some() {
        return Err(AppError::HandleTaken);
    }

    if users::by_email(&mut *tx, &email).await?.is_some() {
        return Err(AppError::EmailAlreadyRegistered);
    }

    let Some(record) = codes::find_live(&mut tx, &email, code.trim(), db::now()).await? else {
        return Err(AppError::InvalidOrExpiredCode);
    };

    let user = users::insert(&mut tx, &email, handle).await?;
    if !codes::consume(&mut tx, record.id).await? {
        return Err(AppError::InvalidOrExpiredCode);
    }
    tx.commit().await?;

    tracing::info!(user_id = %user.id, handle = %user.handle, "account created");
    Ok(user)
}

/// Advisory only; `register` re-checks under its transaction.
pub async fn check_handle_available(db_pool: &SqlitePool, handle: &str) -> AppResult<bool> {
    Ok(users::by_handle(db_pool, handle.trim()).await?.is_none())
}
