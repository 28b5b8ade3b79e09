//! Utility functions for inspecting HTTP requests.

pub mod http;
pub mod route;

pub use http::*;
pub use route::*;
