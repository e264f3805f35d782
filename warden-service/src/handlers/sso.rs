//! SSO handlers driving the OAuth2 login flow.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::middleware::AuthIdentity;
use crate::AppState;
use service_core::error::AppError;

#[derive(Debug, Deserialize)]
pub struct AuthDoParams {
    pub referer: Option<String>,
}

/// GET /sso/auth/do - send the browser to the provider's consent screen,
/// carrying the referer through `state`.
pub async fn auth_do(
    State(state): State<AppState>,
    Query(params): Query<AuthDoParams>,
) -> Result<Redirect, AppError> {
    let referer = params.referer.as_deref().ok_or_else(|| {
        AppError::Validation(anyhow::anyhow!("querystrings.referer is required"))
    })?;
    Ok(Redirect::to(&state.provider.build_auth_url(referer)))
}

#[derive(Debug, Deserialize)]
pub struct AuthDoneParams {
    pub code: Option<String>,
    pub state: Option<String>,
}

/// GET /sso/auth/done - exchange the auth code, provision the account on
/// first login, and bounce back to the SSO page with the token.
pub async fn auth_done(
    State(state): State<AppState>,
    Query(params): Query<AuthDoneParams>,
) -> Result<Response, AppError> {
    let (Some(code), Some(referer)) = (params.code.as_deref(), params.state.as_deref()) else {
        return Ok(StatusCode::FORBIDDEN.into_response());
    };

    let auth = state.provider.exchange_code(code).await?;

    if state.accounts.find_by_email(&auth.email).await?.is_none() {
        state
            .accounts
            .create_oauth2_type(&auth.email, &auth.email, auth.picture.clone())
            .await?;
        tracing::info!(email = %auth.email, "provisioned service account on first login");
    }

    let query = serde_urlencoded::to_string([
        ("accessToken", auth.access_token.as_str()),
        ("email", auth.email.as_str()),
        ("referer", referer),
    ])
    .unwrap_or_default();
    Ok(Redirect::to(&format!("/sso?{}", query)).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthValidParams {
    pub referer: Option<String>,
    pub access_token: Option<String>,
}

/// GET /sso/auth/valid - validate (and maybe refresh) an access token, then
/// return to the referer; an invalid token restarts the login flow.
pub async fn auth_valid(
    State(state): State<AppState>,
    Query(params): Query<AuthValidParams>,
) -> Result<Redirect, AppError> {
    let referer = params.referer.as_deref().ok_or_else(|| {
        AppError::Validation(anyhow::anyhow!("querystrings.referer is required"))
    })?;
    let access_token = params.access_token.as_deref().ok_or_else(|| {
        AppError::Validation(anyhow::anyhow!("querystrings.accessToken is required"))
    })?;

    match state.accounts.authenticate_access_token(access_token).await {
        Ok(auth) => {
            let sep = if referer.contains('?') { '&' } else { '?' };
            let query = serde_urlencoded::to_string([
                ("referer", referer),
                ("accessToken", auth.access_token.as_str()),
            ])
            .unwrap_or_default();
            Ok(Redirect::to(&format!("{}{}{}", referer, sep, query)))
        }
        Err(AppError::Unauthorized(err)) => {
            tracing::info!(error = %err, "access token invalid, restarting login");
            let query =
                serde_urlencoded::to_string([("referer", referer)]).unwrap_or_default();
            Ok(Redirect::to(&format!("/sso/auth/do?{}", query)))
        }
        Err(err) => Err(err),
    }
}

/// GET /sso/auth - the auth middleware did the work; reaching the handler
/// means the credential resolved.
pub async fn auth(AuthIdentity(_identity): AuthIdentity) -> StatusCode {
    StatusCode::OK
}
