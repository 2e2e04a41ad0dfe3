//! Data-transfer types shared by the store, the services and the HTTP layer.
//!
//! Everything serializes camelCase; status enums serialize uppercase.

pub mod comparison;
pub mod enums;
pub mod filters;
pub mod proposal;
pub mod rfp;
pub mod vendor;

pub use comparison::*;
pub use filters::*;
pub use proposal::*;
pub use rfp::*;
pub use vendor::*;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// One page of a listing plus the unpaged total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}
