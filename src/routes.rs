// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post, put},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{analytics, auth, exams, profile, questions, results},
    state::AppState,
    utils::jwt::{auth_middleware, student_middleware, teacher_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, profile, exams, student, teacher).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (store + config).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let require_auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let profile_routes = Router::new()
        .route("/me", get(profile::get_me))
        .route("/username", put(profile::update_username))
        .route("/password", put(profile::change_password))
        .layer(require_auth.clone());

    let exam_routes = Router::new()
        .route("/", get(exams::list_exams))
        // Taking an exam is for students only
        .merge(
            Router::new()
                .route("/{id}", get(exams::get_paper))
                .route("/{id}/submit", post(exams::submit_exam))
                .layer(middleware::from_fn(student_middleware)),
        )
        .layer(require_auth.clone());

    let student_routes = Router::new()
        .route("/results", get(results::list_my_results))
        .route("/results/{id}", get(results::get_result_review))
        // Auth first, then role check
        .layer(middleware::from_fn(student_middleware))
        .layer(require_auth.clone());

    let teacher_routes = Router::new()
        .route(
            "/questions",
            get(questions::list_questions).post(questions::create_question),
        )
        .route("/questions/batch", post(questions::import_questions))
        .route(
            "/questions/{id}",
            put(questions::update_question).delete(questions::delete_question),
        )
        .route("/exams", get(exams::list_exams).post(exams::create_exam))
        .route("/exams/{id}/analytics", get(analytics::exam_analytics))
        // Auth first, then role check
        .layer(middleware::from_fn(teacher_middleware))
        .layer(require_auth);

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/profile", profile_routes)
        .nest("/api/exams", exam_routes)
        .nest("/api/student", student_routes)
        .nest("/api/teacher", teacher_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
