//! IP geolocation observations attached to sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Resolved geographic details for an IP address
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub country_code: Option<String>,
    pub country_name: Option<String>,
    pub region_name: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl GeoLocation {
    /// Short label such as "Nairobi, Kenya"
    pub fn display_string(&self) -> Option<String> {
        match (&self.city, &self.country_name) {
            (Some(city), Some(country)) => Some(format!("{city}, {country}")),
            (None, Some(country)) => Some(country.clone()),
            (Some(city), None) => Some(city.clone()),
            (None, None) => None,
        }
    }
}

/// One IP-based location sample owned by exactly one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationObservation {
    pub id: Uuid,
    pub user_id: String,
    pub session_id: Uuid,
    pub ip_address: String,
    pub country_code: Option<String>,
    pub country_name: Option<String>,
    pub region_name: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_suspicious: bool,
    pub created_at: DateTime<Utc>,
}

impl LocationObservation {
    pub fn new(
        user_id: impl Into<String>,
        session_id: Uuid,
        ip_address: impl Into<String>,
        geo: GeoLocation,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            session_id,
            ip_address: ip_address.into(),
            country_code: geo.country_code,
            country_name: geo.country_name,
            region_name: geo.region_name,
            city: geo.city,
            latitude: geo.latitude,
            longitude: geo.longitude,
            is_suspicious: false,
            created_at: now,
        }
    }
}
