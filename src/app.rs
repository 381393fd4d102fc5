use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::SecurityConfig;
use crate::handlers;
use crate::middleware::{require_session, require_tenant};
use crate::state::AppState;

/// Build the full router over `state`
pub fn app(state: AppState) -> Router {
    let body_limit = state.config.api.max_request_size_bytes;
    let cors = cors_layer(&state.config.security);

    let mut router = Router::new()
        // Public
        .route("/", get(handlers::system::root))
        .route("/health", get(handlers::system::health))
        // Session only: onboarding
        .merge(setup_routes(&state))
        // Session + tenant context
        .merge(tenant_routes(&state))
        .fallback(handlers::system::not_found)
        .layer(DefaultBodyLimit::max(body_limit));

    if let Some(cors) = cors {
        router = router.layer(cors);
    }
    if state.config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

fn cors_layer(security: &SecurityConfig) -> Option<CorsLayer> {
    if !security.enable_cors {
        return None;
    }
    if security.cors_origins.iter().any(|o| o == "*") {
        return Some(CorsLayer::permissive());
    }

    let origins: Vec<HeaderValue> = security
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

    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true),
    )
}

fn setup_routes(state: &AppState) -> Router<AppState> {
    use handlers::setup;

    Router::new()
        .route("/api/setup/status", get(setup::status))
        .route("/api/setup/profile", post(setup::profile))
        .route("/api/setup/tenant", post(setup::tenant))
        .route("/api/setup/access-requests", post(setup::request_access))
        .route("/api/setup/invitations/accept", post(setup::accept_invitation))
        .route_layer(from_fn_with_state(state.clone(), require_session))
}

fn tenant_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/me", get(handlers::me::show))
        .merge(project_routes())
        .merge(sprint_routes())
        .merge(task_routes())
        .merge(knowledge_routes())
        .merge(membership_routes())
        // Layers run bottom-up: the session is resolved before the tenant
        .route_layer(from_fn_with_state(state.clone(), require_tenant))
        .route_layer(from_fn_with_state(state.clone(), require_session))
}

fn project_routes() -> Router<AppState> {
    use axum::routing::delete;
    use handlers::projects;

    Router::new()
        .route("/api/projects", get(projects::list).post(projects::create))
        .route(
            "/api/projects/:id",
            get(projects::show)
                .put(projects::update)
                .patch(projects::update)
                .delete(projects::delete),
        )
        .route(
            "/api/projects/:id/members",
            get(projects::list_members).post(projects::add_member),
        )
        .route("/api/projects/:id/members/:user_id", delete(projects::remove_member))
}

fn sprint_routes() -> Router<AppState> {
    use handlers::sprints;

    Router::new()
        .route("/api/sprints", get(sprints::list).post(sprints::create))
        .route(
            "/api/sprints/:id",
            get(sprints::show)
                .put(sprints::update)
                .patch(sprints::update)
                .delete(sprints::delete),
        )
        .route("/api/sprints/:id/burndown", get(sprints::burndown))
}

fn task_routes() -> Router<AppState> {
    use axum::routing::delete;
    use handlers::{tags, tasks, time_logs};

    Router::new()
        .route("/api/tasks", get(tasks::list).post(tasks::create))
        .route("/api/tasks/board", get(tasks::board))
        .route(
            "/api/tasks/:id",
            get(tasks::show)
                .put(tasks::update)
                .patch(tasks::update)
                .delete(tasks::delete),
        )
        .route("/api/tasks/:id/tags", put(tasks::set_tags))
        .route(
            "/api/tasks/:id/time-logs",
            get(time_logs::list).post(time_logs::create),
        )
        .route("/api/tasks/:id/time-logs/:log_id", delete(time_logs::delete))
        .route("/api/tasks/:id/recalculate-hours", post(tasks::recalculate_hours))
        .route("/api/tags", get(tags::list).post(tags::create))
        .route(
            "/api/tags/:id",
            put(tags::update).patch(tags::update).delete(tags::delete),
        )
}

/// Decisions, kaizens and meetings
fn knowledge_routes() -> Router<AppState> {
    use handlers::{decisions, kaizens, meetings};

    Router::new()
        .route("/api/decisions", get(decisions::list).post(decisions::create))
        .route(
            "/api/decisions/:id",
            get(decisions::show)
                .put(decisions::update)
                .patch(decisions::update)
                .delete(decisions::delete),
        )
        .route("/api/kaizens", get(kaizens::list).post(kaizens::create))
        .route(
            "/api/kaizens/:id",
            get(kaizens::show)
                .put(kaizens::update)
                .patch(kaizens::update)
                .delete(kaizens::delete),
        )
        .route("/api/meetings", get(meetings::list).post(meetings::create))
        .route(
            "/api/meetings/:id",
            get(meetings::show)
                .put(meetings::update)
                .patch(meetings::update)
                .delete(meetings::delete),
        )
}

fn membership_routes() -> Router<AppState> {
    use axum::routing::delete;
    use handlers::{access_requests, invitations};

    Router::new()
        .route("/api/invitations", get(invitations::list).post(invitations::create))
        .route("/api/invitations/:id", delete(invitations::delete))
        .route("/api/access-requests", get(access_requests::list))
        .route("/api/access-requests/:id/approve", post(access_requests::approve))
        .route("/api/access-requests/:id/reject", post(access_requests::reject))
}
