use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::rest::session::RequestContext;
use crate::engine::scope::ScopeDecision;
use crate::engine::zone_service::{self, NewZone, ZoneUpdate};
use crate::error::AppError;
use crate::models::hub::GeoPoint;
use crate::models::zone::{Zone, ZoneOutline};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/zones", get(list_zones).post(create_zone))
        .route("/zones/boundaries", get(boundaries))
        .route("/zones/detect", post(detect))
        .route("/zones/detect-batch", post(detect_batch))
        .route("/zones/check-overlap", post(check_overlap))
        .route("/zones/:id", put(update_zone).delete(delete_zone))
}

/// Single hub an operation targets: an explicit id inside the scope, or the
/// scope's own hub.
fn target_hub(scope: &ScopeDecision, explicit: Option<Uuid>) -> Result<Uuid, AppError> {
    match explicit {
        Some(hub_id) if scope.permits(hub_id) => Ok(hub_id),
        Some(_) => Err(AppError::HubAccessDenied),
        None => scope
            .single_hub()
            .ok_or_else(|| AppError::BadRequest("select a hub first".to_string())),
    }
}

fn ensure_point(point: &GeoPoint) -> Result<(), AppError> {
    if point.is_valid() {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "coordinates ({}, {}) are out of range",
            point.lat, point.lng
        )))
    }
}

async fn list_zones(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Zone>>, AppError> {
    let ctx = RequestContext::from_headers(&state, &headers)?;
    let scope = ctx.scope(&state)?;
    Ok(Json(zone_service::list_zones(&state, &scope)))
}

async fn create_zone(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<NewZone>,
) -> Result<Json<Zone>, AppError> {
    let ctx = RequestContext::from_headers(&state, &headers)?;
    let scope = ctx.scope(&state)?;
    Ok(Json(zone_service::create_zone(&state, &ctx.principal, &scope, payload)?))
}

async fn update_zone(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<ZoneUpdate>,
) -> Result<Json<Zone>, AppError> {
    let ctx = RequestContext::from_headers(&state, &headers)?;
    let scope = ctx.scope(&state)?;
    Ok(Json(zone_service::update_zone(&state, &ctx.principal, &scope, id, payload)?))
}

async fn delete_zone(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let ctx = RequestContext::from_headers(&state, &headers)?;
    let scope = ctx.scope(&state)?;
    zone_service::delete_zone(&state, &ctx.principal, &scope, id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct HubQuery {
    pub hub_id: Option<Uuid>,
}

async fn boundaries(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<HubQuery>,
) -> Result<Json<Vec<ZoneOutline>>, AppError> {
    let ctx = RequestContext::from_headers(&state, &headers)?;
    let hub_id = target_hub(&ctx.scope(&state)?, query.hub_id)?;
    Ok(Json(state.zone_engine.boundaries_for_hub(&*state, hub_id)))
}

#[derive(Deserialize)]
pub struct DetectRequest {
    pub hub_id: Option<Uuid>,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Serialize)]
pub struct DetectResponse {
    pub zone_id: Option<Uuid>,
    pub zone_name: Option<String>,
    pub zone_code: Option<String>,
}

async fn detect(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<DetectRequest>,
) -> Result<Json<DetectResponse>, AppError> {
    let ctx = RequestContext::from_headers(&state, &headers)?;
    let hub_id = target_hub(&ctx.scope(&state)?, payload.hub_id)?;
    let point = GeoPoint::new(payload.lat, payload.lng);
    ensure_point(&point)?;

    let zone = state.zone_engine.detect(&*state, hub_id, &point);
    Ok(Json(DetectResponse {
        zone_id: zone.as_ref().map(|z| z.id),
        zone_name: zone.as_ref().map(|z| z.name.clone()),
        zone_code: zone.map(|z| z.code),
    }))
}

#[derive(Deserialize)]
pub struct DetectBatchRequest {
    pub hub_id: Option<Uuid>,
    pub points: Vec<GeoPoint>,
}

#[derive(Serialize)]
pub struct DetectBatchResponse {
    pub zone_ids: Vec<Option<Uuid>>,
}

async fn detect_batch(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<DetectBatchRequest>,
) -> Result<Json<DetectBatchResponse>, AppError> {
    let ctx = RequestContext::from_headers(&state, &headers)?;
    let hub_id = target_hub(&ctx.scope(&state)?, payload.hub_id)?;
    for point in &payload.points {
        ensure_point(point)?;
    }

    let zone_ids = state
        .zone_engine
        .detect_batch(&*state, hub_id, &payload.points);
    Ok(Json(DetectBatchResponse { zone_ids }))
}

#[derive(Deserialize)]
pub struct CheckOverlapRequest {
    pub hub_id: Option<Uuid>,
    pub boundary: Vec<GeoPoint>,
    pub exclude_zone_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct CheckOverlapResponse {
    pub overlapping_zone_id: Option<Uuid>,
}

async fn check_overlap(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CheckOverlapRequest>,
) -> Result<Json<CheckOverlapResponse>, AppError> {
    let ctx = RequestContext::from_headers(&state, &headers)?;
    let hub_id = target_hub(&ctx.scope(&state)?, payload.hub_id)?;
    zone_service::validate_boundary(&payload.boundary)?;

    let overlapping_zone_id = state.zone_engine.check_overlap(
        &*state,
        &payload.boundary,
        hub_id,
        payload.exclude_zone_id,
    )?;
    Ok(Json(CheckOverlapResponse { overlapping_zone_id }))
}
