//! JSON HTTP API.
//!
//! `api_router()` returns the full axum `Router`: `/health` plus every
//! resource under `/api`, wrapped in CORS and the access log.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod response;
pub mod router;
pub mod schemas;
pub mod server;
pub mod validate;

use std::sync::Arc;

use crate::core_state::CoreState;

pub use error::{ApiError, ValidationIssue};
pub use router::api_router;
pub use server::serve;

/// Handler state. Cheap to clone.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}
