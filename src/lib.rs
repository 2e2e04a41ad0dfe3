pub mod api;
pub mod comparison;
pub mod config;
pub mod core_state;
pub mod db;
pub mod llm;
pub mod mail;
pub mod models;
pub mod proposals;
pub mod rfps;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::config::{Config, ConfigError};
use crate::core_state::CoreState;
use crate::db::DatabaseError;
use crate::llm::{LlmError, OpenAiClient};
use crate::mail::{ImapMailbox, MailError, SmtpMailer};

/// Failures that stop the service before or while serving.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("AI client error: {0}")]
    Llm(#[from] LlmError),
    #[error("Mail client error: {0}")]
    Mail(#[from] MailError),
    #[error(transparent)]
    Server(#[from] api::server::ServerError),
}

/// Install the global subscriber. `LOG_FORMAT=json` selects JSON lines.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let result = if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };
    // Already installed when embedded in another binary.
    let _ = result;
}

/// Wire the production collaborators around a loaded config.
pub fn build_state(config: Config) -> Result<CoreState, StartupError> {
    let llm = OpenAiClient::new(
        &config.openai.base_url,
        &config.openai.api_key,
        &config.openai.model,
    )?;
    let mailer = SmtpMailer::new(&config.email.smtp)?;
    let mailbox = ImapMailbox::new(config.email.imap.clone());
    Ok(CoreState::new(
        config,
        Arc::new(llm),
        Arc::new(mailer),
        Arc::new(mailbox),
    ))
}

/// Load configuration, migrate the store and serve until Ctrl+C / SIGTERM.
pub async fn run() -> Result<(), StartupError> {
    // A missing .env is fine; the process environment may carry everything.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = Config::from_env()?;
    tracing::info!(
        "{} v{} starting ({}, production: {})",
        config::APP_NAME,
        config::APP_VERSION,
        config.environment,
        config.is_production()
    );

    let port = config.port;
    let state = Arc::new(build_state(config)?);
    drop(db::open_database(state.db_path())?);
    tracing::info!(path = %state.db_path().display(), "Database ready");

    let poller = proposals::spawn_inbox_poller(state.clone());

    let result = api::serve(state, port, shutdown_signal()).await;

    if let Some(poller) = poller {
        poller.abort();
    }
    result?;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
