use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post, put};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::rest::session::RequestContext;
use crate::engine::hub_service::{
    self, create_admin, create_hub, delete_hub, ensure_super_admin, update_hub, HubUpdate,
    NewAdmin, NewHub,
};
use crate::error::AppError;
use crate::models::admin::AdminPrincipal;
use crate::models::hub::Hub;
use crate::state::AppState;
use crate::store::GrantStore;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/hubs", get(list_hubs).post(create))
        .route("/hubs/:id", put(update).delete(remove))
        .route("/admins", post(create_admin_account))
        .route("/admins/:id", delete(remove_admin_account))
        .route(
            "/admins/:id/hubs",
            get(list_grants)
                .post(grant_hubs)
                .put(replace_hubs)
                .delete(revoke_hubs),
        )
}

#[derive(Deserialize)]
pub struct HubIdsRequest {
    pub hub_ids: Vec<Uuid>,
}

/// Live hubs inside the caller's scope; the unrestricted view includes inactive ones.
async fn list_hubs(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Hub>>, AppError> {
    let ctx = RequestContext::from_headers(&state, &headers)?;
    let scope = ctx.scope(&state)?;

    let live = state
        .hubs
        .iter()
        .filter(|entry| !entry.deleted)
        .map(|entry| entry.value().clone());

    let mut hubs = scope.apply(live);
    hubs.sort_by(|a, b| a.code.cmp(&b.code));
    Ok(Json(hubs))
}

async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<NewHub>,
) -> Result<Json<Hub>, AppError> {
    let ctx = RequestContext::from_headers(&state, &headers)?;
    Ok(Json(create_hub(&state, &ctx.principal, payload)?))
}

async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<HubUpdate>,
) -> Result<Json<Hub>, AppError> {
    let ctx = RequestContext::from_headers(&state, &headers)?;
    Ok(Json(update_hub(&state, &ctx.principal, id, payload)?))
}

async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let ctx = RequestContext::from_headers(&state, &headers)?;
    delete_hub(&state, &ctx.principal, id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_admin_account(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<NewAdmin>,
) -> Result<Json<AdminPrincipal>, AppError> {
    let ctx = RequestContext::from_headers(&state, &headers)?;
    Ok(Json(create_admin(&state, &ctx.principal, payload)?))
}

async fn remove_admin_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let ctx = RequestContext::from_headers(&state, &headers)?;
    hub_service::remove_admin(&state, &ctx.principal, id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Caller of a grant endpoint, once the target admin is known to exist.
fn grant_caller(
    state: &AppState,
    headers: &HeaderMap,
    admin_id: Uuid,
) -> Result<AdminPrincipal, AppError> {
    let ctx = RequestContext::from_headers(state, headers)?;
    ensure_super_admin(&ctx.principal)?;

    if !state.admins.contains_key(&admin_id) {
        return Err(AppError::NotFound(format!("admin {admin_id} not found")));
    }
    Ok(ctx.principal)
}

async fn list_grants(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<Vec<Uuid>>, AppError> {
    grant_caller(&state, &headers, id)?;
    Ok(Json(state.granted_hubs(id).into_iter().collect()))
}

async fn grant_hubs(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<HubIdsRequest>,
) -> Result<Json<Vec<Uuid>>, AppError> {
    let caller = grant_caller(&state, &headers, id)?;
    hub_service::grant_access(&state, &caller, id, &payload.hub_ids)?;
    Ok(Json(state.granted_hubs(id).into_iter().collect()))
}

async fn replace_hubs(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<HubIdsRequest>,
) -> Result<Json<Vec<Uuid>>, AppError> {
    let caller = grant_caller(&state, &headers, id)?;
    hub_service::set_access(&state, &caller, id, &payload.hub_ids)?;
    Ok(Json(state.granted_hubs(id).into_iter().collect()))
}

async fn revoke_hubs(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<HubIdsRequest>,
) -> Result<Json<Vec<Uuid>>, AppError> {
    let caller = grant_caller(&state, &headers, id)?;
    hub_service::revoke_access(&state, &caller, id, &payload.hub_ids)?;
    Ok(Json(state.granted_hubs(id).into_iter().collect()))
}
