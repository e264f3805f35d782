pub mod config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
    Json, Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::WardenConfig;
use crate::services::{AccountService, Database, Provider, RequestService, RoleService};
use service_core::error::AppError;
use service_core::middleware::tracing::request_id_middleware;

#[derive(Clone)]
pub struct AppState {
    pub config: WardenConfig,
    pub db: Database,
    pub accounts: AccountService,
    pub roles: RoleService,
    pub requests: RequestService,
    pub provider: Arc<dyn Provider>,
}

pub async fn build_router(state: AppState) -> Result<Router, AppError> {
    // Everything behind the auth middleware: callers must resolve to a
    // service account before any of these run.
    let protected = Router::new()
        .route("/sso/auth", get(handlers::sso::auth))
        .route("/permissions/has", get(handlers::permissions::has))
        .route("/permissions/hasMany", post(handlers::permissions::has_many))
        .route("/permissions/attribute", put(handlers::permissions::attribute))
        .route(
            "/permissions/:id",
            delete(handlers::permissions::delete_permission),
        )
        .route("/permissions/requests", post(handlers::requests::create))
        .route(
            "/permissions/requests/open",
            get(handlers::requests::list_open),
        )
        .route(
            "/permissions/requests/:id/grant",
            put(handlers::requests::grant),
        )
        .route(
            "/permissions/requests/:id/deny",
            put(handlers::requests::deny),
        )
        .route(
            "/service_accounts",
            get(handlers::service_accounts::list).post(handlers::service_accounts::create),
        )
        .route(
            "/service_accounts/search",
            get(handlers::service_accounts::search),
        )
        .route(
            "/service_accounts/with_permission",
            get(handlers::service_accounts::with_permission),
        )
        .route(
            "/service_accounts/:id",
            get(handlers::service_accounts::get).put(handlers::service_accounts::update),
        )
        .route(
            "/service_accounts/:id/bindings",
            delete(handlers::service_accounts::drop_bindings),
        )
        .route(
            "/roles",
            get(handlers::roles::list).post(handlers::roles::create),
        )
        .route("/roles/search", get(handlers::roles::search))
        .route(
            "/roles/:id",
            get(handlers::roles::get).put(handlers::roles::update),
        )
        .route(
            "/roles/:id/permissions",
            get(handlers::roles::permissions).post(handlers::roles::create_permission),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let app = Router::new()
        .route("/healthcheck", get(healthcheck))
        // SSO login flow runs before any identity exists.
        .route("/sso/auth/do", get(handlers::sso::auth_do))
        .route("/sso/auth/done", get(handlers::sso::auth_done))
        .route("/sso/auth/valid", get(handlers::sso::auth_valid))
        .merge(protected)
        .with_state(state.clone())
        // Add tracing layer
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        // Add tracing middleware for request_id
        .layer(from_fn(request_id_middleware))
        // Add CORS layer
        .layer(
            CorsLayer::new()
                .allow_origin(
                    state
                        .config
                        .security
                        .allowed_origins
                        .iter()
                        .map(|o| {
                            o.parse::<HeaderValue>().unwrap_or_else(|e| {
                                tracing::error!(
                                    "Invalid CORS origin '{}': {}. Using fallback.",
                                    o,
                                    e
                                );
                                HeaderValue::from_static("*")
                            })
                        })
                        .collect::<Vec<HeaderValue>>(),
                )
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
                .expose_headers([
                    header::HeaderName::from_static(middleware::auth::ACCESS_TOKEN_HEADER),
                    header::HeaderName::from_static(middleware::auth::EMAIL_HEADER),
                    header::HeaderName::from_static(middleware::auth::SERVICE_ACCOUNT_NAME_HEADER),
                ]),
        );

    Ok(app)
}

/// Service health check
pub async fn healthcheck(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.db.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "PostgreSQL health check failed");
        e
    })?;

    Ok(Json(serde_json::json!({
        "healthy": true,
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
    })))
}
