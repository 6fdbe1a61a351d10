// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, attempts, auth, catalog, profile, questions, results},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Public: auth and catalog browsing.
/// * Signed in: profile, attempts, results.
/// * Admin: content management, users and subscriptions.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_layer = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let catalog_routes = Router::new()
        .route("/api/faculties", get(catalog::list_faculties))
        .route("/api/subjects", get(catalog::list_subjects))
        .route("/api/subjects/{id}", get(catalog::get_subject));

    let member_routes = Router::new()
        .route("/api/me", get(profile::me))
        .route("/api/results", get(results::list_results))
        .route("/api/results/stats", get(results::stats))
        .route("/api/attempts", post(attempts::start_attempt))
        .route(
            "/api/attempts/{id}",
            get(attempts::get_attempt).delete(attempts::abandon),
        )
        .route("/api/attempts/{id}/answers", put(attempts::answer))
        .route("/api/attempts/{id}/advance", post(attempts::advance))
        .route("/api/attempts/{id}/previous", post(attempts::previous))
        .route("/api/attempts/{id}/goto", post(attempts::go_to))
        .route("/api/attempts/{id}/finish", post(attempts::finish))
        .route("/api/attempts/{id}/review", get(attempts::review))
        // Route layers leave the fallback alone, so unknown paths stay 404
        .route_layer(auth_layer.clone());

    let admin_routes = Router::new()
        .route("/faculties", post(catalog::create_faculty))
        .route(
            "/faculties/{id}",
            put(catalog::rename_faculty).delete(catalog::delete_faculty),
        )
        .route("/subjects", post(catalog::create_subject))
        .route(
            "/subjects/{id}",
            put(catalog::update_subject).delete(catalog::delete_subject),
        )
        .route(
            "/subjects/{id}/questions",
            get(questions::list_questions).post(questions::create_question),
        )
        .route("/subjects/{id}/import", post(questions::import_questions))
        .route(
            "/questions/{id}",
            put(questions::update_question).delete(questions::delete_question),
        )
        .route("/users", get(admin::list_users))
        .route("/users/{id}", delete(admin::delete_user))
        .route("/users/{id}/results", get(admin::user_results))
        .route("/users/{id}/subscription", put(admin::grant_subscription))
        // Auth runs first, then the admin check
        .route_layer(middleware::from_fn(admin_middleware))
        .route_layer(auth_layer);

    Router::new()
        .nest("/api/auth", auth_routes)
        .merge(catalog_routes)
        .merge(member_routes)
        .nest("/api/admin", admin_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
