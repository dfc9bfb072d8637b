use academy_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    middleware::{auth, rate_limit},
    routes, AppState,
};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    let base_routes = Router::new().route("/health", get(routes::health::health));

    let public_api = Router::new()
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/courses", get(routes::courses::list_courses).post(routes::courses::create_course))
        .route("/api/courses/popular", get(routes::courses::popular_courses))
        .route("/api/courses/categories", get(routes::courses::categories))
        .route("/api/courses/levels", get(routes::courses::levels))
        .route(
            "/api/courses/:course_id",
            get(routes::courses::get_course)
                .patch(routes::courses::update_course)
                .delete(routes::courses::delete_course),
        )
        .route("/api/chat/message", post(routes::chat::chat_message))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::new_rps_state(config.public_rps),
            rate_limit::rps_middleware,
        ));

    let authed_api = Router::new()
        .route("/api/auth/me", get(routes::auth::me))
        .route(
            "/api/courses/recommended",
            get(routes::courses::recommended_courses),
        )
        .route(
            "/api/courses/:course_id/tests",
            get(routes::tests::list_tests_for_course).post(routes::tests::create_test),
        )
        .route(
            "/api/tests/:id",
            get(routes::tests::get_test)
                .patch(routes::tests::update_test)
                .delete(routes::tests::delete_test),
        )
        .route("/api/tests/:id/submit", post(routes::tests::submit_test))
        .route("/api/tests/:id/results", get(routes::tests::test_results))
        .route("/api/rewards", get(routes::rewards::list_rewards))
        .route(
            "/api/rewards/recommendations",
            get(routes::rewards::recommendations),
        )
        .route(
            "/api/rewards/difficulty-adjustment",
            get(routes::rewards::difficulty_adjustment),
        )
        .route(
            "/api/payments",
            get(routes::payments::list_payments).post(routes::payments::create_payment),
        )
        .route(
            "/api/payments/discounts",
            get(routes::payments::list_discounts),
        )
        .route(
            "/api/payments/:id/confirm",
            post(routes::payments::confirm_payment),
        )
        .route("/api/payments/:id/fail", post(routes::payments::fail_payment))
        .layer(axum::middleware::from_fn(auth::require_bearer_auth))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::new_rps_state(config.api_rps),
            rate_limit::rps_middleware,
        ));

    let app = base_routes
        .merge(public_api)
        .merge(authed_api)
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
