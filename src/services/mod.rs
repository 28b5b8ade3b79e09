//! Business logic and service layer modules.
//!
//! Session lifecycle management, suspicious-activity detection, device and
//! geo enrichment, metrics collection and login rate limiting.

pub mod detector;
pub mod device;
pub mod geo;
pub mod lifecycle;
pub mod metrics;
pub mod rate_limit;

pub use detector::*;
pub use device::*;
pub use geo::*;
pub use lifecycle::*;
pub use metrics::*;
pub use rate_limit::*;
