//! IP geolocation.

use crate::models::GeoLocation;

/// Resolves an IP address to a geographic location
pub trait GeoLocator: Send + Sync {
    fn locate(&self, ip_address: &str) -> Option<GeoLocation>;
}

/// Locator that never resolves anything.
///
/// Observations are still recorded with the raw IP address.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullGeoLocator;

impl GeoLocator for NullGeoLocator {
    fn locate(&self, _ip_address: &str) -> Option<GeoLocation> {
        None
    }
}
