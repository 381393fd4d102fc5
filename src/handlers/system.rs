use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

/// GET / - service banner
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "ERP API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Multi-tenant project management API",
            "endpoints": {
                "health": "/health (public)",
                "setup": "/api/setup/* (session)",
                "me": "/api/me (tenant)",
                "projects": "/api/projects[/:id] (tenant)",
                "sprints": "/api/sprints[/:id] (tenant)",
                "tasks": "/api/tasks[/:id] (tenant)",
                "tags": "/api/tags[/:id] (tenant)",
                "decisions": "/api/decisions[/:id] (tenant)",
                "kaizens": "/api/kaizens[/:id] (tenant)",
                "meetings": "/api/meetings[/:id] (tenant)",
                "invitations": "/api/invitations[/:id] (tenant admin)",
                "access_requests": "/api/access-requests[/:id] (tenant admin)"
            }
        }
    }))
}

/// GET /health - pings the data store
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let backend = state.store.backend();

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok",
                    "backend": backend
                }
            })),
        ),
        Err(e) => {
            tracing::error!(backend, "Health check failed: {}", e);
            let error = ApiError::service_unavailable("Database unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, Json(error.to_json()))
        }
    }
}

/// Fallback for unknown routes
pub async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
