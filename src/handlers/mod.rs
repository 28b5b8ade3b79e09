//! HTTP request handlers.
//!
//! Authentication (login/logout), self-service and admin session endpoints,
//! and the operational health, version and metrics endpoints.

pub mod admin;
pub mod auth;
mod context;
pub mod error;
pub mod health;
pub mod metrics;
pub mod openapi;
pub mod sessions;
pub mod version;

pub use admin::*;
pub use auth::*;
pub use error::*;
pub use health::*;
pub use metrics::*;
pub use openapi::*;
pub use sessions::*;
pub use version::*;
