// src/routes.rs

use axum::{
    Router, http::Method, middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, guru, ulangan},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, guru_middleware, siswa_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, admin, guru, ulangan).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Store + Config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/me", get(auth::me))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route(
            "/users/{id}",
            put(admin::update_user).delete(admin::delete_user),
        )
        .route(
            "/settings",
            get(admin::get_settings).put(admin::save_settings),
        )
        .route("/stats", get(admin::system_stats))
        .route("/backup", get(admin::backup))
        .route("/restore", post(admin::restore))
        .route("/export", get(admin::export_csv))
        .route("/cleanup", post(admin::cleanup))
        .route("/report", get(admin::report))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let guru_routes = Router::new()
        .route("/exams", get(guru::list_exams).post(guru::create_exam))
        .route(
            "/exams/{id}",
            put(guru::update_exam).delete(guru::delete_exam),
        )
        .route("/exams/{id}/status", put(guru::update_exam_status))
        .route("/exams/{id}/statistics", get(guru::exam_statistics))
        .route(
            "/questions",
            get(guru::list_questions).post(guru::create_question),
        )
        .route(
            "/questions/{id}",
            put(guru::update_question).delete(guru::delete_question),
        )
        .route("/grades", get(guru::list_grades).put(guru::upsert_grade))
        .route("/grades/bulk", post(guru::bulk_grades))
        .route("/grades/export", get(guru::export_grades))
        .layer(middleware::from_fn(guru_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let ulangan_routes = Router::new()
        .route("/exams", get(ulangan::list_available))
        .route("/exams/{id}/start", post(ulangan::start_exam))
        .route("/exams/{id}/status", get(ulangan::get_status))
        .route("/exams/{id}/answer", put(ulangan::save_answer))
        .route("/exams/{id}/position", put(ulangan::move_position))
        .route("/exams/{id}/submit", post(ulangan::submit_exam))
        .route("/results", get(ulangan::my_results))
        .layer(middleware::from_fn(siswa_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/guru", guru_routes)
        .nest("/api/ulangan", ulangan_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
