// src/routes.rs

use axum::{
    Router, http::Method, middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, quiz, results, school, session},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, teacher_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, schools, quizzes, sessions, results, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Database Pool, Config, Session Registry).
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
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    // Public: the registration form lists schools before login.
    let school_routes = Router::new().route("/", get(school::list_schools));

    let quiz_routes = Router::new()
        // Student-facing listing comes first so it is not shadowed by {id}.
        .route("/available", get(quiz::available_quizzes))
        .merge(
            Router::new()
                .route("/", get(quiz::list_quizzes).post(quiz::create_quiz))
                .route(
                    "/{id}",
                    get(quiz::get_quiz)
                        .put(quiz::update_quiz)
                        .delete(quiz::delete_quiz),
                )
                .layer(middleware::from_fn(teacher_middleware)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let session_routes = Router::new()
        .route("/", post(session::start_session))
        .route("/{id}", get(session::session_state).delete(session::cancel_session))
        .route("/{id}/answers", put(session::select_answer))
        .route("/{id}/submit", post(session::submit_session))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let result_routes = Router::new()
        .route("/mine", get(results::my_results))
        .route("/{id}", get(results::result_review))
        .merge(
            Router::new()
                .route("/overview", get(results::overview_results))
                .layer(middleware::from_fn(teacher_middleware)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route(
            "/users/{id}",
            put(admin::update_user).delete(admin::delete_user),
        )
        .route("/schools", post(school::create_school))
        .route(
            "/schools/{id}",
            put(school::update_school).delete(school::delete_school),
        )
        .route("/overview", get(admin::overview))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/schools", school_routes)
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/sessions", session_routes)
        .nest("/api/results", result_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
