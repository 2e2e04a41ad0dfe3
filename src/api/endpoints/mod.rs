//! Route handlers, one module per resource.

pub mod health;
pub mod proposals;
pub mod rfps;
pub mod vendors;
