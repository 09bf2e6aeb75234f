use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::engine::scope::{HubContext, ScopeDecision};
use crate::error::AppError;
use crate::models::admin::AdminPrincipal;
use crate::models::hub::HubSummary;
use crate::state::AppState;

pub const ADMIN_HEADER: &str = "x-admin-id";
pub const HUB_HEADER: &str = "x-hub-id";

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/me/hub-context", get(hub_context))
        .route("/switch-hub", post(switch_hub))
}

/// Who is calling and which hub, if any, they asked for.
pub struct RequestContext {
    pub principal: AdminPrincipal,
    pub requested_hub: Option<Uuid>,
}

impl RequestContext {
    pub fn from_headers(state: &AppState, headers: &HeaderMap) -> Result<Self, AppError> {
        let admin_id = headers
            .get(ADMIN_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
            .ok_or(AppError::Unauthenticated)?;

        let principal = state
            .admins
            .get(&admin_id)
            .map(|entry| entry.value().clone())
            .ok_or(AppError::Unauthenticated)?;

        let requested_hub = match headers.get(HUB_HEADER) {
            Some(value) => {
                let raw = value
                    .to_str()
                    .map_err(|_| AppError::BadRequest("invalid x-hub-id header".to_string()))?;
                let id = Uuid::parse_str(raw.trim())
                    .map_err(|_| AppError::BadRequest("invalid x-hub-id header".to_string()))?;
                Some(id)
            }
            None => None,
        };

        Ok(Self {
            principal,
            requested_hub,
        })
    }

    pub fn scope(&self, state: &AppState) -> Result<ScopeDecision, AppError> {
        let result = state
            .resolver()
            .resolve(&self.principal, self.requested_hub);

        let outcome = match &result {
            Ok(decision) => decision.outcome_label(),
            Err(_) => "denied",
        };
        state
            .metrics
            .scope_resolutions_total
            .with_label_values(&[outcome])
            .inc();

        result
    }
}

async fn hub_context(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<HubContext>, AppError> {
    let ctx = RequestContext::from_headers(&state, &headers)?;
    let context = state
        .resolver()
        .hub_context(&ctx.principal, ctx.requested_hub)?;
    Ok(Json(context))
}

#[derive(Deserialize)]
pub struct SwitchHubRequest {
    pub hub_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct SwitchHubResponse {
    pub ok: bool,
    pub hub: Option<HubSummary>,
    pub active_hub_id: Option<Uuid>,
}

async fn switch_hub(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<SwitchHubRequest>,
) -> Result<Json<SwitchHubResponse>, AppError> {
    let ctx = RequestContext::from_headers(&state, &headers)?;
    let hub = state
        .resolver()
        .switch_hub(&ctx.principal, payload.hub_id)?;

    info!(admin_id = %ctx.principal.id, hub_id = ?payload.hub_id, "active hub switched");

    Ok(Json(SwitchHubResponse {
        ok: true,
        active_hub_id: hub.as_ref().map(|h| h.id),
        hub,
    }))
}
