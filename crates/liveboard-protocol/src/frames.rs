use serde::{Deserialize, Serialize};
use serde_json::Value;

use liveboard_core::{Event, EventKind, LiveboardError, TopicId};

/// Client → Server request.
/// Wire: `{ "type": "req", "id": "abc", "method": "subscribe", "params": {...} }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReqFrame {
    #[serde(rename = "type")]
    pub frame_type: String,
    pub id: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl ReqFrame {
    pub fn new(id: impl Into<String>, method: impl Into<String>, params: impl Serialize) -> Self {
        Self {
            frame_type: "req".to_string(),
            id: id.into(),
            method: method.into(),
            params: Some(serde_json::to_value(params).unwrap_or(Value::Null)),
        }
    }
}

/// Server → Client response to a request.
/// Wire: `{ "type": "res", "id": "abc", "ok": true, "payload": {...} }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResFrame {
    #[serde(rename = "type")]
    pub frame_type: String,
    pub id: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorShape>,
}

impl ResFrame {
    pub fn ok(id: impl Into<String>, payload: impl Serialize) -> Self {
        Self {
            frame_type: "res".to_string(),
            id: id.into(),
            ok: true,
            payload: Some(serde_json::to_value(payload).unwrap_or(Value::Null)),
            error: None,
        }
    }

    pub fn err(id: impl Into<String>, code: &str, message: &str) -> Self {
        Self {
            frame_type: "res".to_string(),
            id: id.into(),
            ok: false,
            payload: None,
            error: Some(ErrorShape {
                code: code.to_string(),
                message: message.to_string(),
            }),
        }
    }

    /// Build an error response carrying the wire code of a `LiveboardError`.
    pub fn from_error(id: impl Into<String>, err: &LiveboardError) -> Self {
        Self::err(id, err.code(), &err.to_string())
    }
}

/// Server → Client topic event push.
/// Wire: `{ "type": "event", "topic": "42", "seq": 11, "kind": "post-added", "payload": {...} }`
///
/// Delivered in ascending `seq` order per topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventFrame {
    #[serde(rename = "type")]
    pub frame_type: String,
    pub topic: TopicId,
    pub seq: u64,
    pub kind: EventKind,
    pub payload: Value,
}

impl EventFrame {
    pub fn from_event(event: &Event) -> Self {
        Self {
            frame_type: "event".to_string(),
            topic: event.topic.clone(),
            seq: event.seq,
            kind: event.kind,
            payload: event.payload.clone(),
        }
    }
}

/// Server → Client liveness frame.
/// Wire: `{ "type": "heartbeat", "ts": 1712345678901 }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatFrame {
    #[serde(rename = "type")]
    pub frame_type: String,
    pub ts: i64,
}

impl HeartbeatFrame {
    pub fn now() -> Self {
        Self {
            frame_type: "heartbeat".to_string(),
            ts: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Server → Client notice sent best-effort before a server-initiated close.
/// Wire: `{ "type": "disconnect", "code": "SLOW_CONSUMER", "message": "..." }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisconnectFrame {
    #[serde(rename = "type")]
    pub frame_type: String,
    pub code: String,
    pub message: String,
}

impl DisconnectFrame {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            frame_type: "disconnect".to_string(),
            code: code.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorShape {
    pub code: String,
    pub message: String,
}

/// Raw inbound frame — parse the `type` discriminator first, then extract body.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundFrame {
    #[serde(rename = "type")]
    pub frame_type: String,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, Value>,
}

impl InboundFrame {
    /// Try to interpret this frame as a client request.
    pub fn as_req(&self) -> Option<ReqFrame> {
        if self.frame_type != "req" {
            return None;
        }
        let mut map = self.rest.clone();
        map.insert("type".to_string(), Value::String("req".to_string()));
        serde_json::from_value(Value::Object(map)).ok()
    }
}
