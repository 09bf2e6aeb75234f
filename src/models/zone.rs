use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::point_in_polygon;
use crate::models::hub::GeoPoint;

pub const MIN_BOUNDARY_VERTICES: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub id: Uuid,
    pub hub_id: Uuid,
    pub name: String,
    pub code: String,
    pub is_active: bool,
    pub boundary: Option<Vec<GeoPoint>>,
    pub color_code: Option<String>,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Zone {
    /// Whether the zone has a polygon usable for detection.
    pub fn has_boundary(&self) -> bool {
        self.boundary
            .as_ref()
            .is_some_and(|vertices| vertices.len() >= MIN_BOUNDARY_VERTICES)
    }

    pub fn contains_point(&self, point: &GeoPoint) -> bool {
        match &self.boundary {
            Some(vertices) => point_in_polygon(vertices, point),
            None => false,
        }
    }

    pub fn outline(&self) -> ZoneOutline {
        ZoneOutline {
            id: self.id,
            name: self.name.clone(),
            code: self.code.clone(),
            color_code: self.color_code.clone(),
            boundary: self.boundary.clone().unwrap_or_default(),
        }
    }
}

/// Lightweight boundary view for map overlays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneOutline {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub color_code: Option<String>,
    pub boundary: Vec<GeoPoint>,
}
