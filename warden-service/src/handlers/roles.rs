//! Role handlers: CRUD plus permission attachment.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::helpers::{ListParams, ListResponse};
use super::permissions::PermissionParams;
use super::service_accounts::SearchParams;
use crate::middleware::{require_permission, AuthIdentity};
use crate::models::{Permission, Role, RoleWithPermissions};
use crate::AppState;
use service_core::error::AppError;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoleRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub service_accounts_ids: Vec<Uuid>,
}

/// POST /roles - create a role with initial permissions and bindings. Each
/// attached permission requires Owner authority from the caller.
pub async fn create(
    State(state): State<AppState>,
    AuthIdentity(identity): AuthIdentity,
    Json(body): Json<CreateRoleRequest>,
) -> Result<(StatusCode, Json<Role>), AppError> {
    require_permission(
        &state,
        &identity,
        &Permission::warden_lender("CreateRoles", "*"),
    )
    .await?;
    body.validate()?;

    let permissions = Permission::parse_many(&body.permissions)?;
    for permission in &permissions {
        require_permission(&state, &identity, &permission.as_owner()).await?;
    }

    let role = state
        .roles
        .create(&body.name, &permissions, &body.service_accounts_ids)
        .await?;
    Ok((StatusCode::CREATED, Json(role)))
}

/// GET /roles
pub async fn list(
    State(state): State<AppState>,
    AuthIdentity(_identity): AuthIdentity,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse<Role>>, AppError> {
    let lo = params.to_options(state.config.pagination.default_page_size)?;
    let (roles, count) = state.roles.list(&lo).await?;
    Ok(Json(ListResponse {
        count,
        results: roles,
    }))
}

/// GET /roles/search?term=
pub async fn search(
    State(state): State<AppState>,
    AuthIdentity(_identity): AuthIdentity,
    Query(params): Query<SearchParams>,
) -> Result<Json<ListResponse<Role>>, AppError> {
    let term = params.term.as_deref().unwrap_or_default();
    let lo = params
        .list_params()
        .to_options(state.config.pagination.default_page_size)?;
    let (roles, count) = state.roles.search(term, &lo).await?;
    Ok(Json(ListResponse {
        count,
        results: roles,
    }))
}

/// GET /roles/:id
pub async fn get(
    State(state): State<AppState>,
    AuthIdentity(identity): AuthIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<RoleWithPermissions>, AppError> {
    require_permission(
        &state,
        &identity,
        &Permission::warden_lender("EditRole", &id.to_string()),
    )
    .await?;
    Ok(Json(state.roles.get(id).await?))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoleRequest {
    #[validate(length(min = 1))]
    pub name: String,
    pub service_accounts_ids: Option<Vec<Uuid>>,
}

/// PUT /roles/:id
pub async fn update(
    State(state): State<AppState>,
    AuthIdentity(identity): AuthIdentity,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateRoleRequest>,
) -> Result<StatusCode, AppError> {
    require_permission(
        &state,
        &identity,
        &Permission::warden_lender("EditRole", &id.to_string()),
    )
    .await?;
    body.validate()?;
    state
        .roles
        .update(id, &body.name, body.service_accounts_ids.as_deref())
        .await?;
    Ok(StatusCode::OK)
}

/// POST /roles/:id/permissions?permission= - attach a permission. Requires
/// Owner authority over the permission being attached.
pub async fn create_permission(
    State(state): State<AppState>,
    AuthIdentity(identity): AuthIdentity,
    Path(id): Path<Uuid>,
    Query(params): Query<PermissionParams>,
) -> Result<StatusCode, AppError> {
    let raw = params.permission.as_deref().ok_or_else(|| {
        AppError::Validation(anyhow::anyhow!("querystrings.permission is required"))
    })?;
    let permission = Permission::parse(raw)?;
    require_permission(&state, &identity, &permission.as_owner()).await?;
    state.roles.attach_permission(id, &permission).await?;
    Ok(StatusCode::CREATED)
}

/// GET /roles/:id/permissions
pub async fn permissions(
    State(state): State<AppState>,
    AuthIdentity(_identity): AuthIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Permission>>, AppError> {
    Ok(Json(state.roles.permissions(id).await?))
}
