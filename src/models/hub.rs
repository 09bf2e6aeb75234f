use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Finite and inside [-90, 90] x [-180, 180].
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hub {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub location: Option<GeoPoint>,
    pub is_active: bool,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Hub {
    /// Hubs that scoped requests may target: active and not soft-deleted.
    pub fn is_usable(&self) -> bool {
        self.is_active && !self.deleted
    }

    pub fn summary(&self) -> HubSummary {
        HubSummary {
            id: self.id,
            code: self.code.clone(),
            name: self.name.clone(),
            location: self.location,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubSummary {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub location: Option<GeoPoint>,
}
