// src/routes.rs

use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, catalog, dashboard, delivery, profile, progress, scoring},
    state::AppState,
    utils::gate::gate_middleware,
};

/// Assembles the console router.
///
/// * Public pages: landing, login, logout, health.
/// * `/back-office/*` behind the session gate.
/// * Global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-session-id"),
        ])
        .allow_credentials(true);

    let public_routes = Router::new()
        .route("/", get(auth::landing))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/health", get(auth::health));

    let delivery_routes = Router::new()
        .route("/", get(delivery::list_deliveries).post(delivery::create_delivery))
        .route("/scorers", get(delivery::scorer_candidates))
        .route(
            "/{id}",
            get(delivery::get_delivery)
                .put(delivery::update_delivery)
                .delete(delivery::delete_delivery),
        )
        .route("/{id}/control", post(delivery::control_delivery))
        .route("/{id}/assignments", get(delivery::list_assignments))
        .route("/{id}/assign-committee", post(delivery::assign_committee))
        .route("/{id}/assign-scorers", post(delivery::assign_scorers))
        .route("/{id}/progress", get(progress::progress_snapshot))
        .route("/{id}/progress/ws", get(progress::progress_socket));

    let scoring_routes = Router::new()
        .route("/{delivery_id}", get(scoring::list_attempts))
        .route("/{delivery_id}/{attempt_id}", get(scoring::workbench))
        .route("/{delivery_id}/{attempt_id}/score", post(scoring::submit_score));

    let back_office = Router::new()
        .route("/", get(dashboard::index))
        .route("/dashboard", get(dashboard::dashboard))
        .route("/profile", get(profile::get_profile))
        .nest("/delivery", delivery_routes)
        .nest("/scoring", scoring_routes)
        .route("/{page}", get(catalog::list_page).post(catalog::create_record))
        .route(
            "/{page}/{id}",
            get(catalog::detail_page).delete(catalog::delete_record),
        )
        .layer(middleware::from_fn_with_state(state.clone(), gate_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/back-office", back_office)
        // Global Middleware (applied top to bottom)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
