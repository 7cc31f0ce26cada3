use std::sync::Arc;

use bridgegram::{auth::ResendNotifier, config::Config, db, logging, session, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let config = Config::from_env()?;

    let db_pool = db::connect(&config.database_url, config.max_connections).await?;
    let session_store = session::store(&db_pool).await?;

    let notifier = ResendNotifier::new(
        config.resend_api_key.clone(),
        config.email_from.clone(),
        config.auth.notify_timeout,
        config.auth.code_ttl,
    )?;

    let app_state = AppState {
        db_pool,
        notifier: Arc::new(notifier),
        auth: config.auth.clone(),
    };

    let app = bridgegram::app(app_state, session_store, config.session.clone());
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
