//! Per-connection event loop — one task per session, alive for the whole
//! connection.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{info, warn};

use liveboard_core::config::{LiveboardConfig, MAX_PAYLOAD_BYTES};
use liveboard_feeds::TopicRegistry;
use liveboard_protocol::frames::{DisconnectFrame, EventFrame, HeartbeatFrame, InboundFrame, ResFrame};
use liveboard_protocol::methods;
use liveboard_protocol::params::{
    ResubscribeParams, ResubscribedOk, SubscribeParams, SubscribedOk, UnsubscribeParams,
    UnsubscribedOk,
};

use crate::session::Session;
use crate::transport::{TransportRx, TransportTx};
use crate::types::CloseReason;

/// Drive one connection until it ends: multiplex inbound control
/// messages, outbound queue drain, slow-consumer cancellation and
/// heartbeats onto the transport.
pub async fn run_session<R, W>(
    mut transport_rx: R,
    mut transport_tx: W,
    registry: Arc<TopicRegistry>,
    config: &LiveboardConfig,
) where
    R: TransportRx,
    W: TransportTx,
{
    let (mut session, mut queue) = Session::new(Arc::clone(&registry), &config.limits);
    let conn_id = session.id().clone();
    let kill = session.kill_token();
    info!(conn_id = %conn_id, "session opened");

    let mut tick = tokio::time::interval(Duration::from_secs(config.heartbeat.interval_secs.max(1)));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // the first tick completes immediately; a heartbeat before any
    // traffic would only confuse frame-order assertions on the client
    tick.tick().await;

    let reason = loop {
        tokio::select! {
            // kill first: an evicted session must stop flushing its
            // queue at a peer that cannot keep up
            biased;

            _ = kill.cancelled() => break CloseReason::SlowConsumer,

            inbound = transport_rx.recv() => match inbound {
                Some(Ok(text)) => {
                    if text.len() > MAX_PAYLOAD_BYTES {
                        warn!(conn_id = %conn_id, size = text.len(), "inbound frame too large");
                        break CloseReason::PayloadTooLarge;
                    }
                    match handle_frame(&text, &mut session) {
                        Ok(res) => {
                            if send_json(&mut transport_tx, &res).await.is_err() {
                                break CloseReason::TransportFailed;
                            }
                        }
                        Err(violation) => {
                            warn!(conn_id = %conn_id, violation = %violation, "protocol violation");
                            break CloseReason::Protocol;
                        }
                    }
                }
                Some(Err(e)) => {
                    warn!(conn_id = %conn_id, error = %e, "transport receive failed");
                    break CloseReason::TransportFailed;
                }
                None => break CloseReason::ClientGone,
            },

            Some(event) = queue.recv() => {
                if session.record_delivery(&event) {
                    let frame = EventFrame::from_event(&event);
                    if send_json(&mut transport_tx, &frame).await.is_err() {
                        break CloseReason::TransportFailed;
                    }
                }
            }

            _ = tick.tick() => {
                if send_json(&mut transport_tx, &HeartbeatFrame::now()).await.is_err() {
                    break CloseReason::TransportFailed;
                }
            }
        }
    };

    // Membership is removed before the final frames go out, so no new
    // event can be enqueued to a session that is going away.
    session.detach();

    match reason {
        CloseReason::Protocol => {
            drain(&mut session, &mut queue, &mut transport_tx).await;
            let bye = DisconnectFrame::new("PROTOCOL_ERROR", "malformed message");
            let _ = send_json(&mut transport_tx, &bye).await;
        }
        CloseReason::PayloadTooLarge => {
            drain(&mut session, &mut queue, &mut transport_tx).await;
            let bye = DisconnectFrame::new("PAYLOAD_TOO_LARGE", "inbound frame exceeds size cap");
            let _ = send_json(&mut transport_tx, &bye).await;
        }
        CloseReason::SlowConsumer => {
            // no drain: the queue overflowed precisely because the peer
            // cannot absorb it — it must resubscribe from its cursor
            let bye = DisconnectFrame::new(
                "SLOW_CONSUMER",
                "outbound queue overflow — resubscribe from your last sequence",
            );
            let _ = send_json(&mut transport_tx, &bye).await;
        }
        CloseReason::ClientGone | CloseReason::TransportFailed => {}
    }

    session.finish();
    transport_tx.close().await;
    info!(conn_id = %conn_id, reason = ?reason, "session closed");
}

/// Best-effort flush of events already queued at close time, still gated
/// by the per-topic cursor.
async fn drain<W: TransportTx>(
    session: &mut Session,
    queue: &mut tokio::sync::mpsc::Receiver<liveboard_core::Event>,
    transport_tx: &mut W,
) {
    while let Ok(event) = queue.try_recv() {
        if session.record_delivery(&event) {
            let frame = EventFrame::from_event(&event);
            if send_json(transport_tx, &frame).await.is_err() {
                return;
            }
        }
    }
}

async fn send_json<W: TransportTx, T: serde::Serialize>(
    transport_tx: &mut W,
    payload: &T,
) -> Result<(), crate::transport::TransportError> {
    let json = serde_json::to_string(payload).unwrap_or_default();
    transport_tx.send(json).await
}

/// Process one inbound text frame into the response to send back.
///
/// `Err` is a protocol violation — the connection must close. Client
/// misuse (double subscribe, stale cursor, limits) comes back as an
/// error RES and the connection stays open.
fn handle_frame(text: &str, session: &mut Session) -> Result<ResFrame, String> {
    let frame: InboundFrame =
        serde_json::from_str(text).map_err(|e| format!("malformed frame: {e}"))?;
    let req = frame
        .as_req()
        .ok_or_else(|| format!("unexpected frame type '{}'", frame.frame_type))?;

    match req.method.as_str() {
        methods::PING => Ok(ResFrame::ok(&req.id, serde_json::json!({ "pong": true }))),

        methods::SUBSCRIBE => {
            let params: SubscribeParams = parse_params(req.params)?;
            match session.subscribe(params.topic.clone()) {
                Ok(seq) => Ok(ResFrame::ok(
                    &req.id,
                    SubscribedOk {
                        topic: params.topic,
                        seq,
                    },
                )),
                Err(e) => Ok(ResFrame::err(&req.id, e.code(), &e.to_string())),
            }
        }

        methods::RESUBSCRIBE => {
            let params: ResubscribeParams = parse_params(req.params)?;
            match session.resubscribe(params.topic.clone(), params.last_seen) {
                Ok((seq, replayed)) => Ok(ResFrame::ok(
                    &req.id,
                    ResubscribedOk {
                        topic: params.topic,
                        seq,
                        replayed,
                    },
                )),
                Err(e) => Ok(ResFrame::err(&req.id, e.code(), &e.to_string())),
            }
        }

        methods::UNSUBSCRIBE => {
            let params: UnsubscribeParams = parse_params(req.params)?;
            session.unsubscribe(&params.topic);
            Ok(ResFrame::ok(
                &req.id,
                UnsubscribedOk {
                    topic: params.topic,
                },
            ))
        }

        other => Ok(ResFrame::err(
            &req.id,
            "METHOD_NOT_FOUND",
            &format!("unknown method '{other}'"),
        )),
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<serde_json::Value>) -> Result<T, String> {
    let value = params.ok_or_else(|| "missing params".to_string())?;
    serde_json::from_value(value).map_err(|e| format!("invalid params: {e}"))
}
