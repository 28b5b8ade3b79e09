//! Middleware for request correlation and metrics collection.

pub mod metrics;
pub mod request_id;

pub use metrics::*;
pub use request_id::*;
