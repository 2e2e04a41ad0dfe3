//! Shared application state and the service-level error type.
//!
//! `CoreState` is built once at startup, wrapped in `Arc`, and handed to the
//! axum router and the inbox poller. Collaborators sit behind trait objects
//! so tests can swap in the mocks.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::db::{self, DatabaseError};
use crate::llm::{LlmClient, LlmError};
use crate::mail::{MailError, Mailbox, Mailer};

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState {
    config: Config,
    db_path: PathBuf,
    llm: Arc<dyn LlmClient>,
    mailer: Arc<dyn Mailer>,
    mailbox: Arc<dyn Mailbox>,
}

impl CoreState {
    pub fn new(
        config: Config,
        llm: Arc<dyn LlmClient>,
        mailer: Arc<dyn Mailer>,
        mailbox: Arc<dyn Mailbox>,
    ) -> Self {
        let db_path = config.database_path();
        Self {
            config,
            db_path,
            llm,
            mailer,
            mailbox,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Open a fresh connection. Migrations are idempotent, so this is safe
    /// on every call.
    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        Ok(db::open_database(&self.db_path)?)
    }

    pub fn llm(&self) -> &dyn LlmClient {
        self.llm.as_ref()
    }

    pub fn mailer(&self) -> &dyn Mailer {
        self.mailer.as_ref()
    }

    pub fn mailbox(&self) -> &dyn Mailbox {
        self.mailbox.as_ref()
    }
}

// ═══════════════════════════════════════════════════════════
// CoreError
// ═══════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("AI service error: {0}")]
    Llm(#[from] LlmError),

    #[error("Email service error: {0}")]
    Mail(#[from] MailError),

    /// A referenced record does not exist.
    #[error("{message}")]
    NotFound { code: &'static str, message: String },

    /// The request is well-formed but breaks a business rule.
    #[error("{message}")]
    Rejected { code: &'static str, message: String },
}

impl CoreError {
    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        CoreError::NotFound {
            code,
            message: message.into(),
        }
    }

    pub fn rejected(code: &'static str, message: impl Into<String>) -> Self {
        CoreError::Rejected {
            code,
            message: message.into(),
        }
    }
}
