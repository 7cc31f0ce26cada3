//! Test doubles shared by the unit tests.

use std::{fs, path::PathBuf, sync::Mutex, time::Duration};

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::{
    auth::{identity, Notifier, NotifyError},
    db::{self, User},
};

/// Keeps every code it is asked to send.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub(crate) fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn last_code(&self, email: &str) -> Option<String> {
        self.sent()
            .into_iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, code)| code)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_code(&self, email: &str, code: &str) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push((email.to_owned(), code.to_owned()));
        Ok(())
    }
}

pub(crate) struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send_code(&self, _email: &str, _code: &str) -> Result<(), NotifyError> {
        Err(NotifyError::Rejected { status: 503, body: "unavailable".to_owned() })
    }
}

/// Never answers.
pub(crate) struct StalledNotifier;

#[async_trait]
impl Notifier for StalledNotifier {
    async fn send_code(&self, _email: &str, _code: &str) -> Result<(), NotifyError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }
}

/// Runs the whole code-then-register flow for a new account.
pub(crate) async fn register_user(db_pool: &SqlitePool, email: &str, handle: &str) -> User {
    let notifier = RecordingNotifier::default();
    identity::request_code(db_pool, &notifier, &identity::AuthSettings::default(), email)
        .await
        .unwrap();
    let code = notifier.last_code(email).unwrap();

    identity::register(db_pool, email, handle, &code).await.unwrap()
}

/// A database file under the temp dir, shared by several connections so
/// transactions can actually overlap. Removed on drop.
pub(crate) struct TempDb {
    pub(crate) db_pool: SqlitePool,
    path: PathBuf,
}

impl TempDb {
    pub(crate) async fn new(max_connections: u32) -> TempDb {
        let path = std::env::temp_dir().join(format!("bridgegram-{}.db", uuid::Uuid::now_v7()));
        let db_pool = db::connect(&format!("sqlite://{}", path.display()), max_connections)
            .await
            .unwrap();
        TempDb { db_pool, path }
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = fs::remove_file(file);
        }
    }
}
