// src/routes.rs

use axum::{
    Router,
    http::Method,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{handlers::session, state::AppState};

/// Assembles the main application router.
///
/// * Mounts the session routes under `/api/sessions`.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (collaborators, clock, session registry).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            "http://localhost:3000".parse().expect("static origin"),
            "http://127.0.0.1:3000".parse().expect("static origin"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let session_routes = Router::new()
        .route("/", post(session::create_session))
        .route("/{id}", get(session::get_session))
        .route("/{id}/payment", post(session::pay))
        .route("/{id}/acknowledge", post(session::acknowledge))
        .route("/{id}/answers/{index}", put(session::record_answer))
        .route("/{id}/navigate", post(session::navigate))
        .route("/{id}/signals", post(session::signal))
        .route("/{id}/submit", post(session::submit))
        .route("/{id}/exit", post(session::exit));

    Router::new()
        .nest("/api/sessions", session_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
