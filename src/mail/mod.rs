//! Mail collaborators: outbound SMTP delivery and inbound IMAP retrieval.
//!
//! Both sides sit behind async traits so the services can run against the
//! in-memory mocks in tests.

pub mod imap;
pub mod smtp;

pub use self::imap::*;
pub use self::smtp::*;

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mailparse::MailAddr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Invalid email address {address:?}: {reason}")]
    Address { address: String, reason: String },

    #[error("SMTP error: {0}")]
    Smtp(String),

    #[error("IMAP error: {0}")]
    Imap(String),

    #[error("Message parsing error: {0}")]
    Parse(String),

    #[error("Mail task failed: {0}")]
    Task(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InboundEmail {
    /// Mailbox UID, handed back to `Mailbox::mark_seen`.
    pub uid: u32,
    /// Raw `From` header.
    pub from: String,
    pub subject: String,
    pub body: String,
    pub message_id: Option<String>,
    pub received_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError>;
}

#[async_trait]
pub trait Mailbox: Send + Sync {
    /// Unread messages. Fetching leaves them unread until `mark_seen`.
    async fn fetch_unseen(&self) -> Result<Vec<InboundEmail>, MailError>;

    /// Flag messages as handled so the next fetch skips them.
    async fn mark_seen(&self, uids: &[u32]) -> Result<(), MailError>;
}

/// Bare lower-cased address from a header such as `"Jane" <Jane@Acme.test>`.
///
/// Takes the first mailbox, including one inside a group. A header that does
/// not parse is used as-is.
pub fn sender_address(from_header: &str) -> String {
    let first = mailparse::addrparse(from_header)
        .ok()
        .and_then(|list| {
            list.iter().find_map(|addr| match addr {
                MailAddr::Single(info) => Some(info.addr.clone()),
                MailAddr::Group(group) => group.addrs.first().map(|info| info.addr.clone()),
            })
        });
    first
        .as_deref()
        .unwrap_or(from_header)
        .trim()
        .to_lowercase()
}

/// Mock mailer for testing. Records every message; sending to an address in
/// the failure list returns `MailError::Smtp`.
#[derive(Default)]
pub struct MockMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail_for: HashSet<String>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(addresses: &[&str]) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_for: addresses.iter().map(|a| a.to_lowercase()).collect(),
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        if self.fail_for.contains(&email.to.to_lowercase()) {
            return Err(MailError::Smtp(format!("mailbox unavailable: {}", email.to)));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email.clone());
        }
        Ok(())
    }
}

/// Mock mailbox for testing. Messages stay pending until marked seen; each
/// pushed message gets the next UID.
#[derive(Default)]
pub struct MockMailbox {
    pending: Mutex<Vec<InboundEmail>>,
    seen: Mutex<Vec<u32>>,
    unavailable: bool,
}

impl MockMailbox {
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Queue a message and return the UID it was given.
    pub fn push(&self, mut message: InboundEmail) -> u32 {
        let Ok(mut pending) = self.pending.lock() else {
            return 0;
        };
        message.uid = pending.iter().map(|m| m.uid).max().unwrap_or(0) + 1;
        let uid = message.uid;
        pending.push(message);
        uid
    }

    /// UIDs flagged so far, in call order.
    pub fn seen(&self) -> Vec<u32> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailbox for MockMailbox {
    async fn fetch_unseen(&self) -> Result<Vec<InboundEmail>, MailError> {
        if self.unavailable {
            return Err(MailError::Imap("connection refused".into()));
        }
        let seen = self.seen();
        let pending = self
            .pending
            .lock()
            .map_err(|e| MailError::Task(e.to_string()))?;
        Ok(pending
            .iter()
            .filter(|m| !seen.contains(&m.uid))
            .cloned()
            .collect())
    }

    async fn mark_seen(&self, uids: &[u32]) -> Result<(), MailError> {
        let mut seen = self.seen.lock().map_err(|e| MailError::Task(e.to_string()))?;
        seen.extend_from_slice(uids);
        Ok(())
    }
}
