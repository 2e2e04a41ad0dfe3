//! HTTP middleware. CORS comes from `tower-http`; the access log is ours.

pub mod audit;
