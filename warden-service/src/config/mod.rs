use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct WardenConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub database: DatabaseConfig,
    pub oauth2: OAuth2Config,
    pub security: SecurityConfig,
    pub pagination: PaginationConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OAuth2Config {
    pub provider: OAuth2ProviderKind,
    pub google: GoogleOAuth2Config,
    pub dev: DevOAuth2Config,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum OAuth2ProviderKind {
    Dev,
    Google,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleOAuth2Config {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DevOAuth2Config {
    pub authorization_url: String,
    pub token_url: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaginationConfig {
    pub default_page_size: i64,
}

impl WardenConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::Config(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = WardenConfig {
            common,
            environment,
            service_name: get_env("SERVICE_NAME", Some("warden-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            database: DatabaseConfig {
                url: get_env(
                    "DATABASE_URL",
                    Some("postgres://localhost/warden"),
                    is_prod,
                )?,
                max_connections: get_env("DATABASE_MAX_CONNECTIONS", Some("10"), is_prod)?
                    .parse()
                    .unwrap_or(10),
                min_connections: get_env("DATABASE_MIN_CONNECTIONS", Some("1"), is_prod)?
                    .parse()
                    .unwrap_or(1),
            },
            oauth2: OAuth2Config {
                provider: get_env("OAUTH2_PROVIDER", Some("dev"), is_prod)?
                    .parse()
                    .map_err(|e: String| AppError::Config(anyhow::anyhow!(e)))?,
                google: GoogleOAuth2Config {
                    client_id: get_env("GOOGLE_CLIENT_ID", Some(""), is_prod)?,
                    client_secret: get_env("GOOGLE_CLIENT_SECRET", Some(""), is_prod)?,
                    redirect_uri: get_env(
                        "GOOGLE_REDIRECT_URI",
                        Some("http://localhost:8080/sso/auth/done"),
                        is_prod,
                    )?,
                },
                dev: DevOAuth2Config {
                    authorization_url: get_env(
                        "DEV_OAUTH2_AUTHORIZATION_URL",
                        Some("http://localhost:9000/authorize"),
                        is_prod,
                    )?,
                    token_url: get_env(
                        "DEV_OAUTH2_TOKEN_URL",
                        Some("http://localhost:9000/token"),
                        is_prod,
                    )?,
                    redirect_uri: get_env(
                        "DEV_OAUTH2_REDIRECT_URI",
                        Some("http://localhost:8080/sso/auth/done"),
                        is_prod,
                    )?,
                },
            },
            security: SecurityConfig {
                allowed_origins: get_env("ALLOWED_ORIGINS", Some("*"), is_prod)?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect(),
            },
            pagination: PaginationConfig {
                default_page_size: get_env("DEFAULT_PAGE_SIZE", Some("15"), is_prod)?
                    .parse()
                    .unwrap_or(15),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::Config(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.pagination.default_page_size < 0 {
            return Err(AppError::Config(anyhow::anyhow!(
                "DEFAULT_PAGE_SIZE must not be negative"
            )));
        }

        if self.environment == Environment::Prod {
            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::Config(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }

            if self.oauth2.provider == OAuth2ProviderKind::Google
                && (self.oauth2.google.client_id.is_empty()
                    || self.oauth2.google.client_secret.is_empty())
            {
                return Err(AppError::Config(anyhow::anyhow!(
                    "Google OAuth2 credentials are required in production"
                )));
            }
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::Config(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::Config(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

impl std::str::FromStr for OAuth2ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(OAuth2ProviderKind::Dev),
            "google" => Ok(OAuth2ProviderKind::Google),
            _ => Err(format!("Invalid OAuth2 provider: {}", s)),
        }
    }
}
