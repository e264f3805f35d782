//! Authentication middleware: resolves `Authorization: KeyPair <id>:<secret>`
//! or `Authorization: Bearer <token>` to a typed [`Identity`] attached to the
//! request, before any authorization decision runs.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderValue},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::models::Permission;
use crate::AppState;

pub const SERVICE_ACCOUNT_NAME_HEADER: &str = "x-service-account-name";
pub const EMAIL_HEADER: &str = "x-email";
pub const ACCESS_TOKEN_HEADER: &str = "x-access-token";

/// Request-scoped identity of the authenticated caller.
#[derive(Debug, Clone)]
pub struct Identity {
    pub service_account_id: Uuid,
}

/// Credentials carried by the authorization header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    KeyPair { key_id: String, key_secret: String },
    Bearer { access_token: String },
}

/// Parse an authorization header into credentials. `None` means the header
/// is absent, malformed, or names an unknown scheme.
pub fn parse_authorization(header: &str) -> Option<Credentials> {
    let (method, content) = header.split_once(' ')?;
    if content.is_empty() {
        return None;
    }
    if method.eq_ignore_ascii_case("keypair") {
        let (key_id, key_secret) = content.split_once(':')?;
        if key_id.is_empty() || key_secret.is_empty() {
            return None;
        }
        Some(Credentials::KeyPair {
            key_id: key_id.to_string(),
            key_secret: key_secret.to_string(),
        })
    } else if method.eq_ignore_ascii_case("bearer") {
        Some(Credentials::Bearer {
            access_token: content.to_string(),
        })
    } else {
        None
    }
}

/// Middleware to require an authenticated caller.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let credentials = parse_authorization(header).ok_or_else(|| {
        AppError::Unauthorized(anyhow::anyhow!("missing or malformed authorization header"))
    })?;

    match credentials {
        Credentials::KeyPair { key_id, key_secret } => {
            let auth = state
                .accounts
                .authenticate_key_pair(&key_id, &key_secret)
                .await?;
            req.extensions_mut().insert(Identity {
                service_account_id: auth.service_account_id,
            });

            let mut response = next.run(req).await;
            if let Ok(value) = HeaderValue::from_str(&auth.name) {
                response
                    .headers_mut()
                    .insert(SERVICE_ACCOUNT_NAME_HEADER, value);
            }
            Ok(response)
        }
        Credentials::Bearer { access_token } => {
            let auth = state
                .accounts
                .authenticate_access_token(&access_token)
                .await?;
            req.extensions_mut().insert(Identity {
                service_account_id: auth.service_account_id,
            });

            let mut response = next.run(req).await;
            if let Ok(value) = HeaderValue::from_str(&auth.email) {
                response.headers_mut().insert(EMAIL_HEADER, value);
            }
            if auth.access_token != access_token {
                if let Ok(value) = HeaderValue::from_str(&auth.access_token) {
                    response.headers_mut().insert(ACCESS_TOKEN_HEADER, value);
                }
            }
            Ok(response)
        }
    }
}

/// Extractor for the identity the middleware attached.
pub struct AuthIdentity(pub Identity);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(AuthIdentity)
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("identity missing from request extensions"))
            })
    }
}

/// Guard: reject with 403 unless the caller effectively holds `permission`.
pub async fn require_permission(
    state: &AppState,
    identity: &Identity,
    permission: &Permission,
) -> Result<(), AppError> {
    if state
        .accounts
        .has_permission(identity.service_account_id, permission)
        .await?
    {
        Ok(())
    } else {
        Err(AppError::Forbidden(anyhow::anyhow!(
            "missing permission {}",
            permission
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_pair() {
        let creds = parse_authorization("KeyPair abc:s3cret").unwrap();
        assert_eq!(
            creds,
            Credentials::KeyPair {
                key_id: "abc".to_string(),
                key_secret: "s3cret".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_bearer() {
        let creds = parse_authorization("Bearer tok-123").unwrap();
        assert_eq!(
            creds,
            Credentials::Bearer {
                access_token: "tok-123".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_is_case_insensitive_on_scheme() {
        assert!(parse_authorization("keypair a:b").is_some());
        assert!(parse_authorization("BEARER tok").is_some());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_authorization("").is_none());
        assert!(parse_authorization("Bearer").is_none());
        assert!(parse_authorization("Bearer ").is_none());
        assert!(parse_authorization("KeyPair missing-colon").is_none());
        assert!(parse_authorization("KeyPair :secret").is_none());
        assert!(parse_authorization("KeyPair id:").is_none());
        assert!(parse_authorization("Basic dXNlcjpwYXNz").is_none());
    }
}
