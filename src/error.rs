use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("no hub assigned to your account, contact a super admin")]
    NoHubAssigned,

    #[error("invalid or inactive hub")]
    HubNotFound,

    #[error("you do not have access to this hub")]
    HubAccessDenied,

    #[error("your role does not allow hub switching")]
    RoleCannotSwitch,

    #[error("only super admins can view all hubs globally")]
    GlobalViewDenied,

    #[error("forbidden")]
    Forbidden,

    #[error("invalid boundary: {0}")]
    InvalidBoundary(String),

    #[error("boundary overlaps with zone {name} ({code})")]
    BoundaryOverlap { zone_id: Uuid, name: String, code: String },

    #[error("cannot delete hub with assigned riders")]
    HubHasRiders,

    #[error("cannot delete zone with active deliveries")]
    ZoneHasActiveDeliveries,

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NoHubAssigned
            | AppError::HubAccessDenied
            | AppError::RoleCannotSwitch
            | AppError::GlobalViewDenied
            | AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::HubNotFound
            | AppError::InvalidBoundary(_)
            | AppError::BoundaryOverlap { .. }
            | AppError::HubHasRiders
            | AppError::ZoneHasActiveDeliveries => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = json!({
            "error": self.to_string()
        });

        if let AppError::BoundaryOverlap { zone_id, .. } = &self {
            body["zone_id"] = json!(zone_id);
        }

        (status, Json(body)).into_response()
    }
}
