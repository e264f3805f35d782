//! Permission request workflow handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::helpers::{ListParams, ListResponse};
use crate::middleware::AuthIdentity;
use crate::models::{Permission, PermissionRequest};
use crate::services::CreateRequestOutcome;
use crate::AppState;
use service_core::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePermissionRequestBody {
    pub service: String,
    pub ownership_level: String,
    pub action: String,
    pub resource_hierarchy: String,
    #[serde(default)]
    pub message: String,
}

/// POST /permissions/requests - 201 with the new id, or 202 when the
/// request is already satisfied or an identical open request exists.
pub async fn create(
    State(state): State<AppState>,
    AuthIdentity(identity): AuthIdentity,
    Json(body): Json<CreatePermissionRequestBody>,
) -> Result<Response, AppError> {
    let permission = Permission::parse(&format!(
        "{}::{}::{}::{}",
        body.service, body.ownership_level, body.action, body.resource_hierarchy
    ))?;

    let outcome = state
        .requests
        .create(identity.service_account_id, &permission, &body.message)
        .await?;

    match outcome {
        CreateRequestOutcome::Created(id) => {
            Ok((StatusCode::CREATED, Json(json!({ "id": id }))).into_response())
        }
        CreateRequestOutcome::AlreadyHeld | CreateRequestOutcome::DuplicateOpen => {
            tracing::info!(
                requester = %identity.service_account_id,
                permission = %permission,
                outcome = ?outcome,
                "permission request accepted without effect"
            );
            Ok(StatusCode::ACCEPTED.into_response())
        }
    }
}

/// GET /permissions/requests/open - open requests the caller may moderate.
pub async fn list_open(
    State(state): State<AppState>,
    AuthIdentity(identity): AuthIdentity,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse<PermissionRequest>>, AppError> {
    let lo = params.to_options(state.config.pagination.default_page_size)?;
    let (requests, count) = state
        .requests
        .list_open_visible_to(&lo, identity.service_account_id)
        .await?;
    Ok(Json(ListResponse {
        count,
        results: requests,
    }))
}

/// PUT /permissions/requests/:id/grant
pub async fn grant(
    State(state): State<AppState>,
    AuthIdentity(identity): AuthIdentity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .requests
        .grant(identity.service_account_id, id)
        .await?;
    Ok(StatusCode::ACCEPTED)
}

/// PUT /permissions/requests/:id/deny
pub async fn deny(
    State(state): State<AppState>,
    AuthIdentity(identity): AuthIdentity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.requests.deny(identity.service_account_id, id).await?;
    Ok(StatusCode::ACCEPTED)
}
