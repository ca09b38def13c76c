/// Health check endpoint
///
/// ```text
/// GET /health
/// ```
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected",
///   "pool": { "active_connections": 1, "idle_connections": 2, "total_connections": 3 }
/// }
/// ```
///
/// Always answers 200; a database outage shows up as `degraded`.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use serde::Serialize;
use socios_shared::db::pool::{get_pool_stats, health_check as db_health_check};

#[derive(Debug, Serialize)]
pub struct PoolInfo {
    pub active_connections: usize,
    pub idle_connections: usize,
    pub total_connections: usize,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: &'static str,
    pub version: &'static str,

    /// `connected` or `disconnected`
    pub database: &'static str,
    pub pool: PoolInfo,
}

pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let connected = match db_health_check(&state.db).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            false
        }
    };

    let stats = get_pool_stats(&state.db);

    Ok(Json(HealthResponse {
        status: if connected { "healthy" } else { "degraded" },
        version: socios_shared::VERSION,
        database: if connected { "connected" } else { "disconnected" },
        pool: PoolInfo {
            active_connections: stats.active_connections,
            idle_connections: stats.idle_connections,
            total_connections: stats.total_connections,
        },
    }))
}
