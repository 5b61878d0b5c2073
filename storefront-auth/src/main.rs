//! Storefront account service

use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_auth::{
    routes, AppState, AuthStore, Config, ConsoleEmailSender, EmailSender, InMemoryStore,
    SessionSweeper, SmtpEmailSender, SqliteStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storefront_auth=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    tracing::info!(?config, "Loaded configuration");

    let email_sender: Box<dyn EmailSender> = match config.smtp.clone() {
        Some(smtp) => {
            let sender = SmtpEmailSender::new(smtp)
                .map_err(|e| anyhow::anyhow!("SMTP setup failed: {e}"))?;
            Box::new(sender)
        }
        None => {
            tracing::warn!("SMTP not configured, emails will be printed to the console");
            Box::new(ConsoleEmailSender::new())
        }
    };

    match config.database_path.clone() {
        Some(path) => {
            let store = SqliteStore::open(&path)?;
            tracing::info!(path = %path, "Opened SQLite database");
            serve(config, Arc::new(store), email_sender).await
        }
        None => {
            tracing::warn!("DATABASE_PATH not set, accounts will not survive a restart");
            serve(config, Arc::new(InMemoryStore::new()), email_sender).await
        }
    }
}

async fn serve<S>(config: Config, store: Arc<S>, email_sender: Box<dyn EmailSender>) -> Result<()>
where
    S: AuthStore + 'static,
{
    let sweeper = SessionSweeper::spawn(store.clone(), config.sweep_interval);

    let state = Arc::new(AppState::new(store, email_sender, config.auth_settings()));
    let app = routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.shutdown().await;
    tracing::info!("Shut down cleanly");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
