use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::hub::GeoPoint;
use crate::models::route::Priority;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParcelStatus {
    Pending,
    Assigned,
    InTransit,
    Delivered,
    Failed,
}

impl ParcelStatus {
    /// Parcels in these states pin their zone.
    pub fn is_active_delivery(&self) -> bool {
        matches!(self, ParcelStatus::Assigned | ParcelStatus::InTransit)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parcel {
    pub id: Uuid,
    pub hub_id: Uuid,
    pub zone_id: Option<Uuid>,
    pub barcode: String,
    pub recipient_name: String,
    pub recipient_location: Option<GeoPoint>,
    pub priority: Priority,
    pub status: ParcelStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rider {
    pub id: Uuid,
    pub hub_id: Uuid,
    pub zone_id: Option<Uuid>,
    pub name: String,
    pub location: Option<GeoPoint>,
}
