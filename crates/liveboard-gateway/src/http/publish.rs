use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use liveboard_core::{EventKind, TopicId};

use crate::app::AppState;

/// POST /api/publish body — one mutation announcement from the posting
/// pipeline.
#[derive(Debug, Deserialize)]
pub struct PublishBody {
    pub topic: TopicId,
    pub kind: EventKind,
    #[serde(default)]
    pub payload: Value,
}

/// POST /api/publish — the single entry point by which the rest of the
/// application announces a change. Returns the assigned sequence number.
pub async fn publish_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PublishBody>,
) -> Json<Value> {
    let seq = state.broadcaster.publish(&body.topic, body.kind, body.payload);
    Json(json!({ "topic": body.topic, "seq": seq }))
}
