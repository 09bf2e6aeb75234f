use std::collections::BTreeSet;

use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::admin::{AdminPrincipal, Role};
use crate::models::hub::{GeoPoint, Hub};
use crate::state::AppState;

const MAX_HUB_CODE_LEN: usize = 10;

#[derive(Debug, Deserialize)]
pub struct NewHub {
    pub code: String,
    pub name: String,
    pub location: Option<GeoPoint>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct HubUpdate {
    pub name: Option<String>,
    pub location: Option<GeoPoint>,
    pub is_active: Option<bool>,
}

fn default_active() -> bool {
    true
}

pub fn ensure_super_admin(principal: &AdminPrincipal) -> Result<(), AppError> {
    match principal.role {
        Role::SuperAdmin => Ok(()),
        Role::RegionalManager | Role::HubAdmin | Role::Staff => Err(AppError::Forbidden),
    }
}

fn normalize_code(raw: &str) -> Result<String, AppError> {
    let code = raw.trim().to_uppercase();
    let valid = !code.is_empty()
        && code.len() <= MAX_HUB_CODE_LEN
        && code.chars().all(|c| c.is_ascii_alphanumeric());

    if valid {
        Ok(code)
    } else {
        Err(AppError::BadRequest(format!(
            "hub code must be 1-{MAX_HUB_CODE_LEN} alphanumeric characters"
        )))
    }
}

fn validate_location(location: Option<GeoPoint>) -> Result<(), AppError> {
    match location {
        Some(point) if !point.is_valid() => {
            Err(AppError::BadRequest("hub location is out of range".to_string()))
        }
        _ => Ok(()),
    }
}

pub fn create_hub(
    state: &AppState,
    principal: &AdminPrincipal,
    payload: NewHub,
) -> Result<Hub, AppError> {
    ensure_super_admin(principal)?;

    let code = normalize_code(&payload.code)?;
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }
    validate_location(payload.location)?;

    let taken = state
        .hubs
        .iter()
        .any(|entry| !entry.deleted && entry.code == code);
    if taken {
        return Err(AppError::Conflict(format!("hub code {code} is already in use")));
    }

    let now = Utc::now();
    let hub = Hub {
        id: Uuid::new_v4(),
        code,
        name,
        location: payload.location,
        is_active: payload.is_active,
        deleted: false,
        created_at: now,
        updated_at: now,
    };

    state.hubs.insert(hub.id, hub.clone());
    info!(hub_id = %hub.id, code = %hub.code, "hub created");

    Ok(hub)
}

pub fn update_hub(
    state: &AppState,
    principal: &AdminPrincipal,
    hub_id: Uuid,
    payload: HubUpdate,
) -> Result<Hub, AppError> {
    ensure_super_admin(principal)?;
    validate_location(payload.location)?;

    let mut hub = state
        .hubs
        .get_mut(&hub_id)
        .filter(|hub| !hub.deleted)
        .ok_or_else(|| AppError::NotFound(format!("hub {hub_id} not found")))?;

    if let Some(name) = payload.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::BadRequest("name cannot be empty".to_string()));
        }
        hub.name = name;
    }
    if let Some(location) = payload.location {
        hub.location = Some(location);
    }
    if let Some(is_active) = payload.is_active {
        hub.is_active = is_active;
    }
    hub.updated_at = Utc::now();

    Ok(hub.clone())
}

/// Soft delete. Blocked while riders are assigned; grants to the hub go with it.
///
/// The hub's entry stays write-locked from the rider check until it is flagged
/// deleted, so a rider write that validates its hub through `state.hubs` is
/// ordered either before the check or after the delete.
pub fn delete_hub(
    state: &AppState,
    principal: &AdminPrincipal,
    hub_id: Uuid,
) -> Result<(), AppError> {
    ensure_super_admin(principal)?;

    {
        let mut hub = state
            .hubs
            .get_mut(&hub_id)
            .filter(|hub| !hub.deleted)
            .ok_or_else(|| AppError::NotFound(format!("hub {hub_id} not found")))?;

        if state.riders.iter().any(|rider| rider.hub_id == hub_id) {
            return Err(AppError::HubHasRiders);
        }

        hub.deleted = true;
        hub.is_active = false;
        hub.updated_at = Utc::now();
    }

    for mut granted in state.grants.iter_mut() {
        granted.remove(&hub_id);
    }
    state.zone_engine.invalidate_hub_cache(hub_id);

    info!(hub_id = %hub_id, "hub deleted");
    Ok(())
}

fn ensure_hubs_exist(state: &AppState, hub_ids: &[Uuid]) -> Result<(), AppError> {
    match hub_ids
        .iter()
        .find(|id| !state.hubs.get(*id).is_some_and(|hub| !hub.deleted))
    {
        Some(missing) => Err(AppError::NotFound(format!("hub {missing} not found"))),
        None => Ok(()),
    }
}

/// Idempotent: hubs already granted are left alone.
pub fn grant_access(
    state: &AppState,
    principal: &AdminPrincipal,
    admin_id: Uuid,
    hub_ids: &[Uuid],
) -> Result<(), AppError> {
    ensure_super_admin(principal)?;
    ensure_hubs_exist(state, hub_ids)?;
    state
        .grants
        .entry(admin_id)
        .or_default()
        .extend(hub_ids.iter().copied());

    info!(admin_id = %admin_id, hubs = hub_ids.len(), "hub access granted");
    Ok(())
}

pub fn revoke_access(
    state: &AppState,
    principal: &AdminPrincipal,
    admin_id: Uuid,
    hub_ids: &[Uuid],
) -> Result<(), AppError> {
    ensure_super_admin(principal)?;

    if let Some(mut granted) = state.grants.get_mut(&admin_id) {
        for hub_id in hub_ids {
            granted.remove(hub_id);
        }
    }

    info!(admin_id = %admin_id, hubs = hub_ids.len(), "hub access revoked");
    Ok(())
}

/// Replaces the admin's grant set.
pub fn set_access(
    state: &AppState,
    principal: &AdminPrincipal,
    admin_id: Uuid,
    hub_ids: &[Uuid],
) -> Result<(), AppError> {
    ensure_super_admin(principal)?;
    ensure_hubs_exist(state, hub_ids)?;
    state
        .grants
        .insert(admin_id, hub_ids.iter().copied().collect::<BTreeSet<_>>());

    info!(admin_id = %admin_id, hubs = hub_ids.len(), "hub access replaced");
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct NewAdmin {
    pub name: String,
    pub role: String,
    pub assigned_hub: Option<Uuid>,
}

pub fn create_admin(
    state: &AppState,
    principal: &AdminPrincipal,
    payload: NewAdmin,
) -> Result<AdminPrincipal, AppError> {
    ensure_super_admin(principal)?;

    let role: Role = payload.role.parse()?;
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    let assigned_hub = if role.requires_assigned_hub() {
        let hub_id = payload.assigned_hub.ok_or_else(|| {
            AppError::BadRequest(format!("{role} accounts need an assigned hub"))
        })?;
        ensure_hubs_exist(state, &[hub_id])?;
        Some(hub_id)
    } else {
        None
    };

    let admin = AdminPrincipal {
        id: Uuid::new_v4(),
        name,
        role,
        assigned_hub,
    };

    state.admins.insert(admin.id, admin.clone());
    info!(admin_id = %admin.id, role = %admin.role, "admin created");

    Ok(admin)
}

/// Removes the admin together with every grant they held.
pub fn remove_admin(
    state: &AppState,
    principal: &AdminPrincipal,
    admin_id: Uuid,
) -> Result<AdminPrincipal, AppError> {
    ensure_super_admin(principal)?;

    let (_, admin) = state
        .admins
        .remove(&admin_id)
        .ok_or_else(|| AppError::NotFound(format!("admin {admin_id} not found")))?;
    state.grants.remove(&admin_id);

    info!(admin_id = %admin_id, "admin removed");
    Ok(admin)
}
