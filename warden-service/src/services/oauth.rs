//! OAuth2 provider boundary: Google for real deployments, a dev stub for
//! local work. Providers are constructed explicitly with their HTTP client
//! and store handle injected; nothing here is process-global.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;
use service_core::error::AppError;
use std::sync::Arc;

use super::database::Database;
use crate::config::{DevOAuth2Config, GoogleOAuth2Config, OAuth2ProviderKind, WardenConfig};
use crate::models::{AuthResult, Token};

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Contract any OAuth2 implementation must follow.
#[async_trait]
pub trait Provider: Send + Sync {
    /// URL the browser is sent to for user consent; `state` is carried back.
    fn build_auth_url(&self, state: &str) -> String;

    /// Validate an auth code, persist the resulting token, and return the
    /// authenticated identity.
    async fn exchange_code(&self, code: &str) -> Result<AuthResult, AppError>;

    /// Verify an access token, refreshing it when expired. The returned
    /// access token may differ from the presented one.
    async fn authenticate(&self, access_token: &str) -> Result<AuthResult, AppError>;
}

/// Select a provider from configuration.
pub fn provider_from_config(
    config: &WardenConfig,
    http: reqwest::Client,
    db: Database,
) -> Arc<dyn Provider> {
    match config.oauth2.provider {
        OAuth2ProviderKind::Dev => {
            Arc::new(DevProvider::new(config.oauth2.dev.clone(), http, db))
        }
        OAuth2ProviderKind::Google => {
            Arc::new(GoogleProvider::new(config.oauth2.google.clone(), http, db))
        }
    }
}

/// Token endpoint response shape shared by Google and the dev server.
#[derive(Debug, Deserialize)]
struct TokenPayload {
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(default)]
    expires_in: f64,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl TokenPayload {
    fn into_token(self, email: String, fallback_ttl: Duration) -> Token {
        let ttl = if self.expires_in > 0.0 {
            Duration::seconds(self.expires_in as i64)
        } else {
            fallback_ttl
        };
        Token {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type,
            expiry: Utc::now() + ttl,
            email,
        }
    }
}

async fn post_token_form(
    http: &reqwest::Client,
    token_url: &str,
    form: &[(&str, &str)],
) -> Result<TokenPayload, AppError> {
    let response = http
        .post(token_url)
        .form(form)
        .send()
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("token endpoint unreachable: {}", e)))?;

    if response.status().is_client_error() {
        return Err(AppError::Unauthorized(anyhow::anyhow!(
            "token endpoint rejected the request"
        )));
    }

    response
        .error_for_status()
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?
        .json::<TokenPayload>()
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid token payload: {}", e)))
}

fn auth_url(base: &str, pairs: &[(&str, &str)]) -> String {
    let query = serde_urlencoded::to_string(pairs).unwrap_or_default();
    format!("{}?{}", base, query)
}

// ==================== Google ====================

pub struct GoogleProvider {
    config: GoogleOAuth2Config,
    http: reqwest::Client,
    db: Database,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    email: String,
    #[serde(default)]
    picture: Option<String>,
}

impl GoogleProvider {
    pub fn new(config: GoogleOAuth2Config, http: reqwest::Client, db: Database) -> Self {
        Self { config, http, db }
    }
}

#[async_trait]
impl Provider for GoogleProvider {
    fn build_auth_url(&self, state: &str) -> String {
        auth_url(
            GOOGLE_AUTH_URL,
            &[
                ("response_type", "code"),
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("scope", "openid email profile"),
                ("access_type", "offline"),
                ("state", state),
            ],
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<AuthResult, AppError> {
        let payload = post_token_form(
            &self.http,
            GOOGLE_TOKEN_URL,
            &[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ],
        )
        .await?;

        let userinfo = self
            .http
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(&payload.access_token)
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("userinfo unreachable: {}", e)))?
            .error_for_status()
            .map_err(|e| AppError::Unauthorized(anyhow::anyhow!("userinfo rejected token: {}", e)))?
            .json::<GoogleUserInfo>()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid userinfo payload: {}", e)))?;

        let token = payload.into_token(userinfo.email.clone(), Duration::hours(1));
        self.db.save_token(&token).await?;

        Ok(AuthResult {
            access_token: token.access_token,
            email: userinfo.email,
            picture: userinfo.picture,
        })
    }

    async fn authenticate(&self, access_token: &str) -> Result<AuthResult, AppError> {
        let token = self.db.find_token(access_token).await?.ok_or_else(|| {
            AppError::Unauthorized(anyhow::anyhow!("unknown access token"))
        })?;

        if !token.expired() {
            return Ok(AuthResult {
                access_token: token.access_token,
                email: token.email,
                picture: None,
            });
        }

        if token.refresh_token.is_empty() {
            return Err(AppError::Unauthorized(anyhow::anyhow!(
                "access token expired and no refresh token is available"
            )));
        }

        let payload = post_token_form(
            &self.http,
            GOOGLE_TOKEN_URL,
            &[
                ("refresh_token", token.refresh_token.as_str()),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "refresh_token"),
            ],
        )
        .await?;

        let refreshed = Token {
            refresh_token: token.refresh_token.clone(),
            email: token.email.clone(),
            ..payload.into_token(token.email.clone(), Duration::hours(1))
        };
        self.db.replace_token(access_token, &refreshed).await?;

        Ok(AuthResult {
            access_token: refreshed.access_token,
            email: refreshed.email,
            picture: None,
        })
    }
}

// ==================== Dev stub ====================

/// Provider used in development; speaks to a local OAuth2 dev server and
/// trusts any token it has stored.
pub struct DevProvider {
    config: DevOAuth2Config,
    http: reqwest::Client,
    db: Database,
}

impl DevProvider {
    pub fn new(config: DevOAuth2Config, http: reqwest::Client, db: Database) -> Self {
        Self { config, http, db }
    }
}

#[async_trait]
impl Provider for DevProvider {
    fn build_auth_url(&self, state: &str) -> String {
        auth_url(
            &self.config.authorization_url,
            &[
                ("response_type", "code"),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("state", state),
            ],
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<AuthResult, AppError> {
        let payload = post_token_form(
            &self.http,
            &self.config.token_url,
            &[
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ],
        )
        .await?;

        // The dev server carries no identity; pin a fixed address so the
        // whole login flow can run locally.
        let token = payload.into_token("any@example.org".to_string(), Duration::days(14));
        self.db.save_token(&token).await?;

        Ok(AuthResult {
            access_token: token.access_token,
            email: token.email,
            picture: None,
        })
    }

    async fn authenticate(&self, access_token: &str) -> Result<AuthResult, AppError> {
        let token = self.db.find_token(access_token).await?.ok_or_else(|| {
            AppError::Unauthorized(anyhow::anyhow!("unknown access token"))
        })?;
        Ok(AuthResult {
            access_token: token.access_token,
            email: token.email,
            picture: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_url_encodes_query() {
        let url = auth_url(
            "https://auth.example.org/authorize",
            &[("response_type", "code"), ("state", "https://a/b?c=d")],
        );
        assert!(url.starts_with("https://auth.example.org/authorize?response_type=code&state="));
        assert!(url.contains("state=https%3A%2F%2Fa%2Fb%3Fc%3Dd"));
    }

    #[test]
    fn test_token_payload_expiry_fallback() {
        let payload = TokenPayload {
            access_token: "at".to_string(),
            refresh_token: String::new(),
            token_type: "Bearer".to_string(),
            expires_in: 0.0,
        };
        let token = payload.into_token("a@b.com".to_string(), Duration::days(14));
        assert!(token.expiry > Utc::now() + Duration::days(13));
    }

    #[test]
    fn test_token_payload_expiry_from_expires_in() {
        let payload = TokenPayload {
            access_token: "at".to_string(),
            refresh_token: "rt".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 3600.0,
        };
        let token = payload.into_token("a@b.com".to_string(), Duration::days(14));
        assert!(token.expiry <= Utc::now() + Duration::seconds(3601));
    }
}
