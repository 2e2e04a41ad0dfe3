pub mod openai;
pub mod parser;
pub mod prompt;

pub use openai::*;
pub use parser::*;
pub use prompt::*;

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("AI service unreachable at {0}")]
    Connection(String),

    #[error("AI service returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("AI service returned no completion")]
    EmptyResponse,

    #[error("Malformed AI response: {0}")]
    MalformedResponse(String),
}

/// Chat-completion collaborator (allows mocking).
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Run one system + user exchange and return the assistant text.
    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError>;
}

/// Mock LLM client for testing.
///
/// Queued replies are consumed first; once the queue is empty every call
/// returns the default reply, or `EmptyResponse` when there is none.
pub struct MockLlmClient {
    queue: Mutex<VecDeque<Result<String, LlmError>>>,
    default: Option<String>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            default: Some(response.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A client whose every call fails.
    pub fn failing() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            default: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_replies(replies: Vec<Result<String, LlmError>>) -> Self {
        Self {
            queue: Mutex::new(replies.into()),
            default: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a reply ahead of the default.
    pub fn push_reply(&self, reply: Result<String, LlmError>) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(reply);
        }
    }

    /// `(system, user)` prompts received so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((system.to_string(), user.to_string()));
        }
        let queued = self.queue.lock().ok().and_then(|mut q| q.pop_front());
        match queued {
            Some(reply) => reply,
            None => self.default.clone().ok_or(LlmError::EmptyResponse),
        }
    }
}
