use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;

use liveboard_sessions::{run_session, TransportError, TransportRx, TransportTx};

use crate::app::AppState;

/// Axum handler — upgrades HTTP to WebSocket at GET /ws.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| run_connection(socket, state))
}

/// Adapt the socket onto the transport traits and hand it to the session
/// pump for the lifetime of the connection.
async fn run_connection(socket: WebSocket, state: Arc<AppState>) {
    let (sink, stream) = socket.split();
    run_session(
        WsReceiver { stream },
        WsSender { sink },
        Arc::clone(&state.registry),
        &state.config,
    )
    .await;
}

struct WsSender {
    sink: SplitSink<WebSocket, Message>,
}

#[async_trait]
impl TransportTx for WsSender {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.sink
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError(e.to_string()))
    }

    async fn close(&mut self) {
        let _ = self.sink.send(Message::Close(None)).await;
    }
}

struct WsReceiver {
    stream: SplitStream<WebSocket>,
}

#[async_trait]
impl TransportRx for WsReceiver {
    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Some(Ok(text.as_str().to_string())),
                // pings are answered by the websocket layer itself
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(Message::Binary(_))) => {
                    return Some(Err(TransportError(
                        "binary frames are not part of the protocol".into(),
                    )))
                }
                Some(Ok(Message::Close(_))) | None => return None,
                Some(Err(e)) => return Some(Err(TransportError(e.to_string()))),
            }
        }
    }
}
