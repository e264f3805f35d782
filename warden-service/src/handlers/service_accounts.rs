//! Service account handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::helpers::{ListParams, ListResponse};
use crate::middleware::{require_permission, AuthIdentity};
use crate::models::{
    AuthenticationType, KeyPairCredentials, Permission, ServiceAccountResponse,
};
use crate::AppState;
use service_core::error::AppError;

/// GET /service_accounts
pub async fn list(
    State(state): State<AppState>,
    AuthIdentity(_identity): AuthIdentity,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse<ServiceAccountResponse>>, AppError> {
    let lo = params.to_options(state.config.pagination.default_page_size)?;
    let (accounts, count) = state.accounts.list(&lo).await?;
    Ok(Json(ListResponse {
        count,
        results: accounts.into_iter().map(Into::into).collect(),
    }))
}

// serde_urlencoded cannot flatten nested structs, so search params carry
// their pagination fields inline.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub term: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl SearchParams {
    pub fn list_params(&self) -> ListParams {
        ListParams {
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// GET /service_accounts/search?term=
pub async fn search(
    State(state): State<AppState>,
    AuthIdentity(_identity): AuthIdentity,
    Query(params): Query<SearchParams>,
) -> Result<Json<ListResponse<ServiceAccountResponse>>, AppError> {
    let term = params.term.as_deref().unwrap_or_default();
    let lo = params
        .list_params()
        .to_options(state.config.pagination.default_page_size)?;
    let (accounts, count) = state.accounts.search(term, &lo).await?;
    Ok(Json(ListResponse {
        count,
        results: accounts.into_iter().map(Into::into).collect(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithPermissionParams {
    pub permission: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// GET /service_accounts/with_permission?permission= - accounts whose
/// effective permissions cover the given one, ordered by name.
pub async fn with_permission(
    State(state): State<AppState>,
    AuthIdentity(_identity): AuthIdentity,
    Query(params): Query<WithPermissionParams>,
) -> Result<Json<ListResponse<ServiceAccountResponse>>, AppError> {
    let raw = params.permission.as_deref().ok_or_else(|| {
        AppError::Validation(anyhow::anyhow!("querystrings.permission is required"))
    })?;
    let requested = Permission::parse(raw)?;
    let lo = ListParams {
        page: params.page,
        page_size: params.page_size,
    }
    .to_options(state.config.pagination.default_page_size)?;
    let (accounts, count) = state.accounts.list_with_permission(&lo, &requested).await?;
    Ok(Json(ListResponse {
        count,
        results: accounts.into_iter().map(Into::into).collect(),
    }))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateServiceAccountRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(email)]
    pub email: Option<String>,
    pub authentication_type: Option<AuthenticationType>,
}

#[derive(Debug, Serialize)]
pub struct CreateServiceAccountResponse {
    #[serde(flatten)]
    pub account: ServiceAccountResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<KeyPairCredentials>,
}

/// POST /service_accounts - key-pair credentials are returned exactly once.
pub async fn create(
    State(state): State<AppState>,
    AuthIdentity(identity): AuthIdentity,
    Json(body): Json<CreateServiceAccountRequest>,
) -> Result<(StatusCode, Json<CreateServiceAccountResponse>), AppError> {
    require_permission(
        &state,
        &identity,
        &Permission::warden_lender("CreateServiceAccounts", "*"),
    )
    .await?;
    body.validate()?;

    let response = match body.authentication_type {
        Some(AuthenticationType::KeyPair) => {
            let account = state.accounts.create_key_pair_type(&body.name).await?;
            let credentials = match (&account.key_id, &account.key_secret) {
                (Some(key_id), Some(key_secret)) => Some(KeyPairCredentials {
                    key_id: key_id.clone(),
                    key_secret: key_secret.clone(),
                }),
                _ => None,
            };
            CreateServiceAccountResponse {
                account: account.into(),
                credentials,
            }
        }
        _ => {
            let email = body.email.as_deref().ok_or_else(|| {
                AppError::Validation(anyhow::anyhow!(
                    "email is required for oauth2 service accounts"
                ))
            })?;
            let account = state
                .accounts
                .create_oauth2_type(&body.name, email, None)
                .await?;
            CreateServiceAccountResponse {
                account: account.into(),
                credentials: None,
            }
        }
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /service_accounts/:id
pub async fn get(
    State(state): State<AppState>,
    AuthIdentity(identity): AuthIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<ServiceAccountResponse>, AppError> {
    require_permission(
        &state,
        &identity,
        &Permission::warden_lender("EditServiceAccount", &id.to_string()),
    )
    .await?;
    let account = state.accounts.get(id).await?;
    Ok(Json(account.into()))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateServiceAccountRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(email)]
    pub email: Option<String>,
    pub picture: Option<String>,
}

/// PUT /service_accounts/:id
pub async fn update(
    State(state): State<AppState>,
    AuthIdentity(identity): AuthIdentity,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateServiceAccountRequest>,
) -> Result<StatusCode, AppError> {
    require_permission(
        &state,
        &identity,
        &Permission::warden_lender("EditServiceAccount", &id.to_string()),
    )
    .await?;
    body.validate()?;

    let mut account = state.accounts.get(id).await?;
    account.name = body.name;
    if body.email.is_some() {
        account.email = body.email;
    }
    if body.picture.is_some() {
        account.picture = body.picture;
    }
    state.accounts.update(&account).await?;
    Ok(StatusCode::OK)
}

/// DELETE /service_accounts/:id/bindings - remove every role binding except
/// the base role's.
pub async fn drop_bindings(
    State(state): State<AppState>,
    AuthIdentity(identity): AuthIdentity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_permission(
        &state,
        &identity,
        &Permission::warden_lender("EditServiceAccount", &id.to_string()),
    )
    .await?;
    state.accounts.drop_bindings(id).await?;
    Ok(StatusCode::OK)
}
