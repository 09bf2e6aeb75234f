//! Zone writes. Every successful write invalidates the owning hub's boundary
//! cache before returning.

use std::sync::MutexGuard;

use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::engine::scope::ScopeDecision;
use crate::error::AppError;
use crate::models::admin::AdminPrincipal;
use crate::models::hub::GeoPoint;
use crate::models::zone::{Zone, MIN_BOUNDARY_VERTICES};
use crate::state::AppState;
use crate::store::HubDirectory;

#[derive(Debug, Deserialize)]
pub struct NewZone {
    pub hub_id: Option<Uuid>,
    pub name: String,
    pub code: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub boundary: Option<Vec<GeoPoint>>,
    pub color_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ZoneUpdate {
    pub name: Option<String>,
    pub code: Option<String>,
    pub is_active: Option<bool>,
    pub boundary: Option<Vec<GeoPoint>>,
    #[serde(default)]
    pub clear_boundary: bool,
    pub color_code: Option<String>,
}

fn default_active() -> bool {
    true
}

fn ensure_can_manage(principal: &AdminPrincipal) -> Result<(), AppError> {
    if principal.role.can_manage_zones() {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

fn write_lock(state: &AppState) -> Result<MutexGuard<'_, ()>, AppError> {
    state
        .zone_writes
        .lock()
        .map_err(|_| AppError::Internal("zone write lock poisoned".to_string()))
}

pub fn validate_boundary(vertices: &[GeoPoint]) -> Result<(), AppError> {
    if vertices.len() < MIN_BOUNDARY_VERTICES {
        return Err(AppError::InvalidBoundary(format!(
            "a boundary needs at least {MIN_BOUNDARY_VERTICES} vertices, got {}",
            vertices.len()
        )));
    }

    if let Some(index) = vertices.iter().position(|v| !v.is_valid()) {
        return Err(AppError::InvalidBoundary(format!(
            "vertex {index} is outside valid coordinates"
        )));
    }

    Ok(())
}

fn required_text(raw: &str, field: &str) -> Result<String, AppError> {
    let value = raw.trim().to_string();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{field} cannot be empty")));
    }
    Ok(value)
}

fn ensure_unique(
    state: &AppState,
    hub_id: Uuid,
    name: &str,
    code: &str,
    exclude: Option<Uuid>,
) -> Result<(), AppError> {
    for entry in state.zones.iter() {
        let zone = entry.value();
        if zone.hub_id != hub_id || zone.deleted || Some(zone.id) == exclude {
            continue;
        }
        if zone.code == code {
            return Err(AppError::Conflict(format!("zone code {code} already exists in this hub")));
        }
        if zone.name == name {
            return Err(AppError::Conflict(format!("zone name {name} already exists in this hub")));
        }
    }
    Ok(())
}

fn ensure_no_overlap(
    state: &AppState,
    vertices: &[GeoPoint],
    hub_id: Uuid,
    exclude: Option<Uuid>,
) -> Result<(), AppError> {
    match state
        .zone_engine
        .find_overlapping(state, vertices, hub_id, exclude)?
    {
        Some(sibling) => Err(AppError::BoundaryOverlap {
            zone_id: sibling.id,
            name: sibling.name,
            code: sibling.code,
        }),
        None => Ok(()),
    }
}

/// Zone by id if it is live and inside the scope. Out-of-scope zones read as missing.
pub fn scoped_zone(state: &AppState, scope: &ScopeDecision, zone_id: Uuid) -> Result<Zone, AppError> {
    state
        .zones
        .get(&zone_id)
        .map(|entry| entry.value().clone())
        .filter(|zone| !zone.deleted && scope.permits(zone.hub_id))
        .ok_or_else(|| AppError::NotFound(format!("zone {zone_id} not found")))
}

pub fn list_zones(state: &AppState, scope: &ScopeDecision) -> Vec<Zone> {
    let live = state
        .zones
        .iter()
        .filter(|entry| !entry.deleted)
        .map(|entry| entry.value().clone());

    let mut zones = scope.apply(live);
    zones.sort_by(|a, b| a.code.cmp(&b.code));
    zones
}

pub fn create_zone(
    state: &AppState,
    principal: &AdminPrincipal,
    scope: &ScopeDecision,
    payload: NewZone,
) -> Result<Zone, AppError> {
    ensure_can_manage(principal)?;

    let hub_id = payload
        .hub_id
        .or_else(|| scope.single_hub())
        .ok_or_else(|| AppError::BadRequest("hub context is required to create a zone".to_string()))?;
    if !scope.permits(hub_id) {
        return Err(AppError::HubAccessDenied);
    }
    if !state.is_active_hub(hub_id) {
        return Err(AppError::HubNotFound);
    }

    let name = required_text(&payload.name, "name")?;
    let code = required_text(&payload.code, "code")?.to_uppercase();
    if let Some(vertices) = &payload.boundary {
        validate_boundary(vertices)?;
    }

    let _guard = write_lock(state)?;
    ensure_unique(state, hub_id, &name, &code, None)?;
    if let (true, Some(vertices)) = (payload.is_active, &payload.boundary) {
        ensure_no_overlap(state, vertices, hub_id, None)?;
    }

    let now = Utc::now();
    let zone = Zone {
        id: Uuid::new_v4(),
        hub_id,
        name,
        code,
        is_active: payload.is_active,
        boundary: payload.boundary,
        color_code: payload.color_code,
        deleted: false,
        created_at: now,
        updated_at: now,
    };

    state.zones.insert(zone.id, zone.clone());
    state.zone_engine.invalidate_hub_cache(hub_id);
    info!(zone_id = %zone.id, hub_id = %hub_id, code = %zone.code, "zone created");

    Ok(zone)
}

pub fn update_zone(
    state: &AppState,
    principal: &AdminPrincipal,
    scope: &ScopeDecision,
    zone_id: Uuid,
    payload: ZoneUpdate,
) -> Result<Zone, AppError> {
    ensure_can_manage(principal)?;
    if let Some(vertices) = &payload.boundary {
        validate_boundary(vertices)?;
    }

    let _guard = write_lock(state)?;
    let mut zone = scoped_zone(state, scope, zone_id)?;

    if let Some(name) = &payload.name {
        zone.name = required_text(name, "name")?;
    }
    if let Some(code) = &payload.code {
        zone.code = required_text(code, "code")?.to_uppercase();
    }
    if let Some(is_active) = payload.is_active {
        zone.is_active = is_active;
    }
    if payload.clear_boundary {
        zone.boundary = None;
    } else if let Some(vertices) = payload.boundary {
        zone.boundary = Some(vertices);
    }
    if let Some(color_code) = payload.color_code {
        zone.color_code = Some(color_code);
    }

    ensure_unique(state, zone.hub_id, &zone.name, &zone.code, Some(zone.id))?;
    if let (true, Some(vertices)) = (zone.is_active, &zone.boundary) {
        ensure_no_overlap(state, vertices, zone.hub_id, Some(zone.id))?;
    }

    zone.updated_at = Utc::now();
    state.zones.insert(zone.id, zone.clone());
    state.zone_engine.invalidate_hub_cache(zone.hub_id);
    info!(zone_id = %zone.id, hub_id = %zone.hub_id, "zone updated");

    Ok(zone)
}

/// Soft delete, blocked while parcels in the zone are assigned or in transit.
pub fn delete_zone(
    state: &AppState,
    principal: &AdminPrincipal,
    scope: &ScopeDecision,
    zone_id: Uuid,
) -> Result<(), AppError> {
    ensure_can_manage(principal)?;

    let _guard = write_lock(state)?;
    let zone = scoped_zone(state, scope, zone_id)?;

    let busy = state
        .parcels
        .iter()
        .any(|parcel| parcel.zone_id == Some(zone.id) && parcel.status.is_active_delivery());
    if busy {
        return Err(AppError::ZoneHasActiveDeliveries);
    }

    if let Some(mut stored) = state.zones.get_mut(&zone.id) {
        stored.deleted = true;
        stored.updated_at = Utc::now();
    }
    state.zone_engine.invalidate_hub_cache(zone.hub_id);
    info!(zone_id = %zone.id, hub_id = %zone.hub_id, "zone deleted");

    Ok(())
}
