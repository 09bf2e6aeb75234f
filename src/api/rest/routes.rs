use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::api::rest::session::RequestContext;
use crate::engine::routing::suggest_route;
use crate::error::AppError;
use crate::models::hub::GeoPoint;
use crate::models::parcel::Parcel;
use crate::models::route::{Priority, RouteStop, RouteWeights, Strategy};
use crate::state::AppState;

const MAX_WEIGHT: f64 = 10.0;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/routes/suggest", post(suggest))
}

#[derive(Deserialize)]
pub struct SuggestRouteRequest {
    pub parcel_ids: Vec<Uuid>,
    pub strategy: Strategy,
    pub start_lat: f64,
    pub start_lng: f64,
    pub weights: Option<RouteWeights>,
}

#[derive(Serialize)]
pub struct SuggestedStop {
    pub stop_order: usize,
    pub parcel_id: Uuid,
    pub barcode: String,
    pub recipient: String,
    pub zone_id: Option<Uuid>,
    pub priority: Priority,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub distance_km: Option<f64>,
}

#[derive(Serialize)]
pub struct SuggestRouteResponse {
    pub strategy: Strategy,
    pub total_stops: usize,
    pub distance_km: f64,
    pub eta_min: u32,
    pub stops: Vec<SuggestedStop>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn validate_weights(weights: Option<RouteWeights>) -> Result<(), AppError> {
    let Some(weights) = weights else {
        return Ok(());
    };

    for (name, value) in [("distance", weights.distance), ("priority", weights.priority)] {
        if let Some(value) = value {
            if !(0.0..=MAX_WEIGHT).contains(&value) {
                return Err(AppError::BadRequest(format!(
                    "weights.{name} must be between 0 and {MAX_WEIGHT}"
                )));
            }
        }
    }
    Ok(())
}

async fn suggest(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<SuggestRouteRequest>,
) -> Result<Json<SuggestRouteResponse>, AppError> {
    let ctx = RequestContext::from_headers(&state, &headers)?;
    let scope = ctx.scope(&state)?;

    if payload.parcel_ids.is_empty() {
        return Err(AppError::BadRequest("parcel_ids cannot be empty".to_string()));
    }
    let start = GeoPoint::new(payload.start_lat, payload.start_lng);
    if !start.is_valid() {
        return Err(AppError::BadRequest("start location is out of range".to_string()));
    }
    validate_weights(payload.weights)?;

    let parcels: Vec<Parcel> = payload
        .parcel_ids
        .iter()
        .map(|id| {
            state
                .parcels
                .get(id)
                .map(|entry| entry.value().clone())
                .filter(|parcel| scope.permits(parcel.hub_id))
                .ok_or_else(|| AppError::NotFound(format!("parcel {id} not found")))
        })
        .collect::<Result<_, _>>()?;

    let stops: Vec<RouteStop> = parcels
        .iter()
        .map(|parcel| RouteStop {
            id: parcel.id,
            location: parcel.recipient_location,
            priority: parcel.priority,
        })
        .collect();

    let plan = suggest_route(start, &stops, payload.strategy, payload.weights);
    state
        .metrics
        .route_suggestions_total
        .with_label_values(&[plan.strategy.as_str()])
        .inc();

    info!(
        admin_id = %ctx.principal.id,
        stops = plan.stops.len(),
        distance_km = plan.total_distance_km,
        "route suggested"
    );

    let stops = plan
        .stops
        .iter()
        .filter_map(|planned| {
            let parcel = parcels.iter().find(|p| p.id == planned.stop_id)?;
            Some(SuggestedStop {
                stop_order: planned.stop_order,
                parcel_id: parcel.id,
                barcode: parcel.barcode.clone(),
                recipient: parcel.recipient_name.clone(),
                zone_id: parcel.zone_id,
                priority: planned.priority,
                lat: planned.location.map(|p| p.lat),
                lng: planned.location.map(|p| p.lng),
                distance_km: planned.distance_km.map(round2),
            })
        })
        .collect::<Vec<_>>();

    Ok(Json(SuggestRouteResponse {
        strategy: plan.strategy,
        total_stops: stops.len(),
        distance_km: round2(plan.total_distance_km),
        eta_min: plan.eta_minutes,
        stops,
    }))
}
