pub mod ratelimit;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/ratelimit/check", post(ratelimit::check_rate_limit))
        .route(
            "/ratelimit/buckets/{key}",
            get(ratelimit::get_bucket).delete(ratelimit::reset_bucket),
        );

    let router = Router::new()
        .nest("/v1", api)
        .route("/health", get(ratelimit::health_check))
        .layer(TraceLayer::new_for_http());

    // 开发模式下允许任意来源
    #[cfg(debug_assertions)]
    let router = router.layer(tower_http::cors::CorsLayer::permissive());

    router.with_state(state)
}
