use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use liveboard_core::LiveboardConfig;
use liveboard_feeds::{Broadcaster, TopicRegistry};

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: LiveboardConfig,
    pub registry: Arc<TopicRegistry>,
    pub broadcaster: Broadcaster,
}

impl AppState {
    pub fn new(config: LiveboardConfig) -> Self {
        let registry = Arc::new(TopicRegistry::new(config.retention.clone()));
        let broadcaster = Broadcaster::new(Arc::clone(&registry));
        Self {
            config,
            registry,
            broadcaster,
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/ws", get(crate::ws::connection::ws_handler))
        .route(
            "/api/topics/{topic}/sequence",
            get(crate::http::snapshot::sequence_handler),
        )
        .route("/api/publish", post(crate::http::publish::publish_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
