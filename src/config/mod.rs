//! Configuration structures and loading utilities.
//!
//! Every configuration struct has a `Default` and a `from_env()` loader that
//! falls back to the default for unset or unparsable variables.

pub mod auth;
pub mod detector;
pub mod observability;
pub mod rate_limit;
pub mod store;

pub use auth::*;
pub use detector::*;
pub use observability::*;
pub use rate_limit::*;
pub use store::*;
