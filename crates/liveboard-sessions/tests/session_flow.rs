// End-to-end session behavior over an in-memory transport: the wire
// surface a real client sees, minus the WebSocket.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use liveboard_core::config::LiveboardConfig;
use liveboard_core::{EventKind, TopicId};
use liveboard_feeds::{Broadcaster, TopicRegistry};
use liveboard_sessions::transport::{TransportError, TransportRx, TransportTx};
use liveboard_sessions::run_session;

struct MockTx {
    tx: mpsc::Sender<String>,
}

#[async_trait]
impl TransportTx for MockTx {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.tx
            .send(text)
            .await
            .map_err(|_| TransportError("peer receiver dropped".into()))
    }

    async fn close(&mut self) {}
}

struct MockRx {
    rx: mpsc::Receiver<String>,
}

#[async_trait]
impl TransportRx for MockRx {
    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        self.rx.recv().await.map(Ok)
    }
}

struct TestClient {
    to_server: Option<mpsc::Sender<String>>,
    from_server: mpsc::Receiver<String>,
    task: JoinHandle<()>,
}

impl TestClient {
    async fn request(&mut self, id: &str, method: &str, params: Value) {
        let frame = json!({ "type": "req", "id": id, "method": method, "params": params });
        self.to_server
            .as_ref()
            .expect("client already disconnected")
            .send(frame.to_string())
            .await
            .unwrap();
    }

    async fn send_raw(&mut self, text: &str) {
        self.to_server
            .as_ref()
            .expect("client already disconnected")
            .send(text.to_string())
            .await
            .unwrap();
    }

    /// Next frame from the server, heartbeats skipped.
    async fn next_frame(&mut self) -> Value {
        loop {
            let text = tokio::time::timeout(Duration::from_secs(2), self.from_server.recv())
                .await
                .expect("timed out waiting for a frame")
                .expect("server closed the connection");
            let value: Value = serde_json::from_str(&text).unwrap();
            if value["type"] != "heartbeat" {
                return value;
            }
        }
    }

    /// Drop the client side and wait for the server task to finish.
    async fn disconnect(mut self) {
        self.to_server = None;
        let _ = tokio::time::timeout(Duration::from_secs(2), self.task).await;
    }
}

fn test_config() -> LiveboardConfig {
    let mut config = LiveboardConfig::default();
    // keep heartbeats out of frame-order assertions
    config.heartbeat.interval_secs = 60;
    config
}

fn connect(registry: &Arc<TopicRegistry>, config: LiveboardConfig, transport_buf: usize) -> TestClient {
    let (in_tx, in_rx) = mpsc::channel(32);
    let (out_tx, out_rx) = mpsc::channel(transport_buf);
    let registry = Arc::clone(registry);
    let task = tokio::spawn(async move {
        run_session(
            MockRx { rx: in_rx },
            MockTx { tx: out_tx },
            registry,
            &config,
        )
        .await;
    });
    TestClient {
        to_server: Some(in_tx),
        from_server: out_rx,
        task,
    }
}

fn default_registry() -> Arc<TopicRegistry> {
    Arc::new(TopicRegistry::new(Default::default()))
}

fn post(n: u64) -> Value {
    json!({ "post": { "id": n, "body": "reply", "time": 0 } })
}

#[tokio::test]
async fn subscribe_then_publish_delivers_next_sequence() {
    let registry = default_registry();
    let broadcaster = Broadcaster::new(Arc::clone(&registry));
    let topic = TopicId::Thread(42);
    for n in 1..=10 {
        broadcaster.publish(&topic, EventKind::PostAdded, post(n));
    }

    let mut client = connect(&registry, test_config(), 32);
    client.request("1", "subscribe", json!({ "topic": "42" })).await;

    let res = client.next_frame().await;
    assert_eq!(res["type"], "res");
    assert_eq!(res["ok"], true);
    assert_eq!(res["payload"]["seq"], 10);

    broadcaster.publish(&topic, EventKind::PostAdded, post(11));
    let event = client.next_frame().await;
    assert_eq!(event["type"], "event");
    assert_eq!(event["topic"], "42");
    assert_eq!(event["seq"], 11);
    assert_eq!(event["kind"], "post-added");

    client.disconnect().await;
}

#[tokio::test]
async fn double_subscribe_is_reported_and_connection_survives() {
    let registry = default_registry();
    let mut client = connect(&registry, test_config(), 32);

    client.request("1", "subscribe", json!({ "topic": "a" })).await;
    assert_eq!(client.next_frame().await["ok"], true);

    client.request("2", "subscribe", json!({ "topic": "a" })).await;
    let res = client.next_frame().await;
    assert_eq!(res["ok"], false);
    assert_eq!(res["error"]["code"], "ALREADY_SUBSCRIBED");

    client.request("3", "ping", json!({})).await;
    assert_eq!(client.next_frame().await["payload"]["pong"], true);

    client.disconnect().await;
}

#[tokio::test]
async fn subscription_cap_is_enforced() {
    let registry = default_registry();
    let mut config = test_config();
    config.limits.max_subscriptions = 2;
    let mut client = connect(&registry, config, 32);

    for (id, topic) in [("1", "a"), ("2", "b")] {
        client.request(id, "subscribe", json!({ "topic": topic })).await;
        assert_eq!(client.next_frame().await["ok"], true);
    }
    client.request("3", "subscribe", json!({ "topic": "c" })).await;
    let res = client.next_frame().await;
    assert_eq!(res["ok"], false);
    assert_eq!(res["error"]["code"], "TOO_MANY_SUBSCRIPTIONS");

    client.disconnect().await;
}

#[tokio::test]
async fn unsubscribe_is_idempotent() {
    let registry = default_registry();
    let mut client = connect(&registry, test_config(), 32);

    client.request("1", "unsubscribe", json!({ "topic": "42" })).await;
    assert_eq!(client.next_frame().await["ok"], true);

    client.request("2", "subscribe", json!({ "topic": "42" })).await;
    assert_eq!(client.next_frame().await["ok"], true);
    client.request("3", "unsubscribe", json!({ "topic": "42" })).await;
    assert_eq!(client.next_frame().await["ok"], true);
    client.request("4", "unsubscribe", json!({ "topic": "42" })).await;
    assert_eq!(client.next_frame().await["ok"], true);

    client.disconnect().await;
}

#[tokio::test]
async fn reconnect_with_resubscribe_replays_exactly_the_missed_events() {
    let registry = default_registry();
    let broadcaster = Broadcaster::new(Arc::clone(&registry));
    let topic = TopicId::Thread(42);
    for n in 1..=10 {
        broadcaster.publish(&topic, EventKind::PostAdded, post(n));
    }

    // first connection sees event 11 live
    let mut client = connect(&registry, test_config(), 32);
    client.request("1", "subscribe", json!({ "topic": "42" })).await;
    assert_eq!(client.next_frame().await["payload"]["seq"], 10);
    broadcaster.publish(&topic, EventKind::PostAdded, post(11));
    assert_eq!(client.next_frame().await["seq"], 11);
    client.disconnect().await;

    // two events land while the client is away
    broadcaster.publish(&topic, EventKind::PostAdded, post(12));
    broadcaster.publish(&topic, EventKind::PostEdited, json!({ "id": 12, "body": "fixed" }));

    // reconnect and backfill from the last applied cursor
    let mut client = connect(&registry, test_config(), 32);
    client
        .request("1", "resubscribe", json!({ "topic": "42", "last_seen": 11 }))
        .await;
    let res = client.next_frame().await;
    assert_eq!(res["ok"], true);
    assert_eq!(res["payload"]["seq"], 13);
    assert_eq!(res["payload"]["replayed"], 2);

    let first = client.next_frame().await;
    assert_eq!(first["seq"], 12);
    assert_eq!(first["kind"], "post-added");
    let second = client.next_frame().await;
    assert_eq!(second["seq"], 13);
    assert_eq!(second["kind"], "post-edited");

    // and live delivery continues from there, no duplicates
    broadcaster.publish(&topic, EventKind::PostAdded, post(14));
    assert_eq!(client.next_frame().await["seq"], 14);

    client.disconnect().await;
}

#[tokio::test]
async fn unsubscribe_then_resubscribe_never_duplicates() {
    let registry = default_registry();
    let broadcaster = Broadcaster::new(Arc::clone(&registry));
    let topic = TopicId::Thread(9);

    let mut client = connect(&registry, test_config(), 32);
    client.request("1", "subscribe", json!({ "topic": "9" })).await;
    assert_eq!(client.next_frame().await["ok"], true);

    broadcaster.publish(&topic, EventKind::PostAdded, post(1));
    broadcaster.publish(&topic, EventKind::PostAdded, post(2));
    assert_eq!(client.next_frame().await["seq"], 1);
    assert_eq!(client.next_frame().await["seq"], 2);

    client.request("2", "unsubscribe", json!({ "topic": "9" })).await;
    assert_eq!(client.next_frame().await["ok"], true);

    client
        .request("3", "resubscribe", json!({ "topic": "9", "last_seen": 2 }))
        .await;
    let res = client.next_frame().await;
    assert_eq!(res["ok"], true);
    assert_eq!(res["payload"]["replayed"], 0);

    broadcaster.publish(&topic, EventKind::PostAdded, post(3));
    let event = client.next_frame().await;
    assert_eq!(event["seq"], 3, "events 1 and 2 must not be redelivered");

    client.disconnect().await;
}

#[tokio::test]
async fn resume_below_retention_floor_is_sequence_too_old() {
    let registry = Arc::new(TopicRegistry::new(
        liveboard_core::config::RetentionConfig {
            min_events: 2,
            min_seconds: 0,
        },
    ));
    let broadcaster = Broadcaster::new(Arc::clone(&registry));
    let topic = TopicId::Thread(42);
    for n in 1..=10 {
        broadcaster.publish(&topic, EventKind::PostAdded, post(n));
    }
    // retained floor is 9

    let mut client = connect(&registry, test_config(), 32);
    client
        .request("1", "resubscribe", json!({ "topic": "42", "last_seen": 5 }))
        .await;
    let res = client.next_frame().await;
    assert_eq!(res["ok"], false);
    assert_eq!(res["error"]["code"], "SEQUENCE_TOO_OLD");

    // the connection stays open — the client now refetches over HTTP and
    // subscribes fresh
    client.request("2", "subscribe", json!({ "topic": "42" })).await;
    let res = client.next_frame().await;
    assert_eq!(res["ok"], true);
    assert_eq!(res["payload"]["seq"], 10);

    client.disconnect().await;
}

#[tokio::test]
async fn malformed_frame_closes_with_protocol_error() {
    let registry = default_registry();
    let mut client = connect(&registry, test_config(), 32);

    client.send_raw("{ not json").await;
    let bye = client.next_frame().await;
    assert_eq!(bye["type"], "disconnect");
    assert_eq!(bye["code"], "PROTOCOL_ERROR");

    // server side is gone afterwards
    let closed = tokio::time::timeout(Duration::from_secs(2), client.from_server.recv())
        .await
        .unwrap();
    assert!(closed.is_none());
}

#[tokio::test]
async fn bad_params_close_with_protocol_error() {
    let registry = default_registry();
    let mut client = connect(&registry, test_config(), 32);

    client.request("1", "subscribe", json!({ "topic": "NOT A TOPIC" })).await;
    let bye = client.next_frame().await;
    assert_eq!(bye["type"], "disconnect");
    assert_eq!(bye["code"], "PROTOCOL_ERROR");
}

#[tokio::test]
async fn unknown_method_is_reported_and_connection_survives() {
    let registry = default_registry();
    let mut client = connect(&registry, test_config(), 32);

    client.request("1", "frobnicate", json!({})).await;
    let res = client.next_frame().await;
    assert_eq!(res["ok"], false);
    assert_eq!(res["error"]["code"], "METHOD_NOT_FOUND");

    client.request("2", "ping", json!({})).await;
    assert_eq!(client.next_frame().await["payload"]["pong"], true);

    client.disconnect().await;
}

#[tokio::test]
async fn slow_consumer_is_disconnected_with_a_signal() {
    let registry = default_registry();
    let broadcaster = Broadcaster::new(Arc::clone(&registry));
    let topic = TopicId::Thread(1);

    let mut config = test_config();
    config.limits.outbound_queue = 2;
    // a transport that can only hold one unread frame
    let mut client = connect(&registry, config, 1);

    client.request("1", "subscribe", json!({ "topic": "1" })).await;
    assert_eq!(client.next_frame().await["ok"], true);

    // far more events than queue + transport can absorb while the client
    // is not reading
    for n in 1..=10 {
        broadcaster.publish(&topic, EventKind::PostAdded, post(n));
    }

    // drain until the eviction notice arrives
    loop {
        let frame = client.next_frame().await;
        if frame["type"] == "disconnect" {
            assert_eq!(frame["code"], "SLOW_CONSUMER");
            break;
        }
        assert_eq!(frame["type"], "event");
    }

    let _ = tokio::time::timeout(Duration::from_secs(2), client.task).await;
    assert_eq!(registry.feed(&topic).subscriber_count(), 0);
}

#[tokio::test]
async fn thread_deleted_reaches_every_subscriber() {
    let registry = default_registry();
    let broadcaster = Broadcaster::new(Arc::clone(&registry));
    let topic = TopicId::Thread(42);

    let mut first = connect(&registry, test_config(), 32);
    let mut second = connect(&registry, test_config(), 32);
    for client in [&mut first, &mut second] {
        client.request("1", "subscribe", json!({ "topic": "42" })).await;
        assert_eq!(client.next_frame().await["ok"], true);
    }

    broadcaster.publish(&topic, EventKind::ThreadDeleted, json!({}));

    for client in [&mut first, &mut second] {
        let event = client.next_frame().await;
        assert_eq!(event["kind"], "thread-deleted");
        assert_eq!(event["seq"], 1);
    }

    first.disconnect().await;
    second.disconnect().await;
}
