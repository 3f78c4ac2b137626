// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    handlers::{admin, assets, learner},
    state::AppState,
    utils::gate::route_gate,
};

/// Assembles the portal router.
///
/// * Learner JSON routes under `/api`, admin JSON routes under `/api/admin`.
/// * CDN assets under `/assets`, everything else from the static directory.
/// * The route gate runs in front of all of it, including the fallback.
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ])
        .allow_credentials(true);

    let learner_routes = Router::new()
        .route("/exams/{exam_id}/start", get(learner::start_attempt))
        .route("/attempts", get(learner::list_my_attempts))
        .route("/attempts/{id}/progress", post(learner::save_progress))
        .route("/attempts/{id}/submit", post(learner::submit_exam))
        .route("/attempts/{id}/result", get(learner::get_result));

    let admin_routes = Router::new()
        .route("/exam-attempts", get(admin::list_attempts))
        .route(
            "/exam-attempts/{id}",
            get(admin::get_attempt)
                .put(admin::update_attempt)
                .delete(admin::delete_attempt),
        )
        .route("/exam-attempts/{id}/reveal", put(admin::reveal_result))
        .route("/exams/{exam_id}/show-results", put(admin::show_results));

    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .nest("/api/admin", admin_routes)
        .nest("/api", learner_routes)
        .route("/assets/{*path}", get(assets::serve_asset))
        .fallback_service(static_files)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(middleware::from_fn(route_gate)),
        )
        .with_state(state)
}
