//! Permission evaluation and management handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::{require_permission, AuthIdentity};
use crate::models::Permission;
use crate::AppState;
use service_core::error::AppError;

#[derive(Debug, Deserialize)]
pub struct PermissionParams {
    pub permission: Option<String>,
}

fn required_permission_param(params: &PermissionParams) -> Result<Permission, AppError> {
    let raw = params.permission.as_deref().ok_or_else(|| {
        AppError::Validation(anyhow::anyhow!("querystrings.permission is required"))
    })?;
    Ok(Permission::parse(raw)?)
}

/// GET /permissions/has - 200 when the caller holds the permission, 403
/// otherwise, 422 when the permission string is malformed.
pub async fn has(
    State(state): State<AppState>,
    AuthIdentity(identity): AuthIdentity,
    Query(params): Query<PermissionParams>,
) -> Result<StatusCode, AppError> {
    let requested = required_permission_param(&params)?;
    if state
        .accounts
        .has_permission(identity.service_account_id, &requested)
        .await?
    {
        Ok(StatusCode::OK)
    } else {
        Err(AppError::Forbidden(anyhow::anyhow!(
            "missing permission {}",
            requested
        )))
    }
}

#[derive(Debug, Serialize)]
pub struct HasManyResult {
    pub permission: String,
    pub has: bool,
}

/// POST /permissions/hasMany - batch form of `has`; evaluates every entry
/// and reports each decision instead of failing on the first denial.
pub async fn has_many(
    State(state): State<AppState>,
    AuthIdentity(identity): AuthIdentity,
    Json(permissions): Json<Vec<String>>,
) -> Result<Json<Vec<HasManyResult>>, AppError> {
    let parsed = Permission::parse_many(&permissions)?;

    let mut results = Vec::with_capacity(parsed.len());
    for (raw, requested) in permissions.iter().zip(parsed.iter()) {
        let has = state
            .accounts
            .has_permission(identity.service_account_id, requested)
            .await?;
        results.push(HasManyResult {
            permission: raw.clone(),
            has,
        });
    }
    Ok(Json(results))
}

/// DELETE /permissions/:id - detach a stored permission. Requires Owner
/// authority over the permission's scope. Unknown ids are a no-op.
pub async fn delete_permission(
    State(state): State<AppState>,
    AuthIdentity(identity): AuthIdentity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let Some(permission) = state.db.find_permission(id).await? else {
        return Ok(StatusCode::NO_CONTENT);
    };

    require_permission(&state, &identity, &permission.as_owner()).await?;
    state.db.delete_permission(id).await?;
    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributePermissionRequest {
    pub permission: String,
    pub service_account_ids: Vec<Uuid>,
}

/// PUT /permissions/attribute - attach one permission to many accounts'
/// base roles. Requires Owner authority over the permission's scope.
pub async fn attribute(
    State(state): State<AppState>,
    AuthIdentity(identity): AuthIdentity,
    Json(body): Json<AttributePermissionRequest>,
) -> Result<StatusCode, AppError> {
    let permission = Permission::parse(&body.permission)?;
    require_permission(&state, &identity, &permission.as_owner()).await?;
    state
        .accounts
        .attribute_permission(&body.service_account_ids, &permission)
        .await?;
    Ok(StatusCode::OK)
}
