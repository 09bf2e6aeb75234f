use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::hub::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Normal,
    Express,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Shortest,
    Priority,
    Balanced,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Shortest => "shortest",
            Strategy::Priority => "priority",
            Strategy::Balanced => "balanced",
        }
    }
}

/// Optional per-request overrides; a missing field keeps the strategy default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteWeights {
    pub distance: Option<f64>,
    pub priority: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteStop {
    pub id: Uuid,
    pub location: Option<GeoPoint>,
    pub priority: Priority,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedStop {
    pub stop_order: usize,
    pub stop_id: Uuid,
    pub location: Option<GeoPoint>,
    pub priority: Priority,
    /// Leg distance from the previous stop; `None` for stops without coordinates.
    pub distance_km: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutePlan {
    pub strategy: Strategy,
    pub stops: Vec<PlannedStop>,
    pub total_distance_km: f64,
    pub eta_minutes: u32,
}
