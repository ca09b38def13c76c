/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use socios_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = socios_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{auth::jwt_auth_layer, security::SecurityHeadersLayer},
    routes,
};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    /// JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete router
///
/// ```text
/// /
/// ├── GET /health                       (public)
/// └── /v1/
///     ├── /setup         GET, POST      (public)
///     ├── /auth/login    POST           (public)
///     ├── /auth/refresh  POST           (public)
///     ├── /users/me      GET            (session)
///     ├── /users/me/password  PUT       (session)
///     ├── /members       GET, POST      (session)
///     ├── /members/:id   GET, PUT, DELETE
///     ├── /payments      GET, POST
///     ├── /payments/:id  GET, PUT, DELETE
///     ├── /settings      GET, PUT (PUT admin only)
///     ├── /settings/features  GET
///     └── /dashboard/stats    GET
/// ```
///
/// Layers, outermost first: security headers, CORS, compression, tracing.
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let public_routes = Router::new()
        .route(
            "/setup",
            get(routes::setup::setup_status).post(routes::setup::create_admin),
        )
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/refresh", post(routes::auth::refresh));

    let session_routes = Router::new()
        .route("/users/me", get(routes::users::me))
        .route("/users/me/password", put(routes::users::change_password))
        .route(
            "/members",
            get(routes::members::list_members).post(routes::members::create_member),
        )
        .route(
            "/members/:id",
            get(routes::members::get_member)
                .put(routes::members::update_member)
                .delete(routes::members::deactivate_member),
        )
        .route(
            "/payments",
            get(routes::payments::list_payments).post(routes::payments::create_payment),
        )
        .route(
            "/payments/:id",
            get(routes::payments::get_payment)
                .put(routes::payments::update_payment)
                .delete(routes::payments::cancel_payment),
        )
        .route(
            "/settings",
            get(routes::settings::get_settings).put(routes::settings::update_settings),
        )
        .route("/settings/features", get(routes::settings::list_features))
        .route("/dashboard/stats", get(routes::dashboard::dashboard_stats))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let v1_routes = Router::new().merge(public_routes).merge(session_routes);

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.cors_allows_any() {
        if config.api.production {
            tracing::warn!("CORS allows any origin in production mode");
        }
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
