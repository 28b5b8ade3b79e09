//! Data models for sessions, location observations, detector verdicts
//! and the HTTP request/response bodies built on them.

pub mod api;
pub mod audit;
pub mod auth;
pub mod location;
pub mod session;
pub mod verdict;

pub use api::*;
pub use audit::*;
pub use auth::*;
pub use location::*;
pub use session::*;
pub use verdict::*;
