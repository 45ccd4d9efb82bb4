use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

use liveboard_core::TopicId;

use crate::app::AppState;

/// GET /api/topics/{topic}/sequence — the sequence number a freshly
/// rendered page should resume from. Consumed by the page-fetch layer so
/// the client can subscribe without a gap.
pub async fn sequence_handler(
    Path(topic): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match topic.parse::<TopicId>() {
        Ok(topic) => {
            let seq = state.broadcaster.current_sequence(&topic);
            Json(json!({ "topic": topic, "seq": seq })).into_response()
        }
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": { "code": e.code(), "message": e.to_string() } })),
        )
            .into_response(),
    }
}
