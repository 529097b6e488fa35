//! Capture dispatch and delivery: frame normalization through the raw
//! dispatch function, definition-resource enrichment, and the HTTP sink
//! wire format.

mod common;

use common::RecordingSink;
use majsoul_bridge::capture::{
    CaptureDispatcher, CaptureEvent, Direction, HttpSink, CaptureSink, methods,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn dispatcher() -> (CaptureDispatcher, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    (
        CaptureDispatcher::new(sink.clone(), "liqi.json".into()),
        sink,
    )
}

#[test]
fn test_websocket_open_close_forwarded_verbatim() {
    let (dispatcher, sink) = dispatcher();

    dispatcher.handle_event(
        methods::WEBSOCKET_CREATED,
        &json!({ "requestId": "7.3", "url": "wss://game.example.com/gateway" }),
    );
    dispatcher.handle_event(methods::WEBSOCKET_CLOSED, &json!({ "requestId": "7.3" }));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    match &events[0] {
        CaptureEvent::WebSocketOpened { request_id, url, time } => {
            assert_eq!(request_id, "7.3");
            assert_eq!(url, "wss://game.example.com/gateway");
            assert!(*time > 0.0);
        }
        other => panic!("expected WebSocketOpened, got {:?}", other),
    }
    assert!(matches!(&events[1], CaptureEvent::WebSocketClosed { request_id, .. } if request_id == "7.3"));
}

#[test]
fn test_frame_nested_shape_captured() {
    let (dispatcher, sink) = dispatcher();

    // The channel reports numbers as floats; both directions share the
    // nested shape.
    dispatcher.handle_event(
        methods::WEBSOCKET_FRAME_RECEIVED,
        &json!({
            "requestId": "7.3",
            "timestamp": 12345.6,
            "response": { "opcode": 2.0, "mask": false, "payloadData": "AQIDBA==" }
        }),
    );

    let events = sink.events();
    assert_eq!(events.len(), 1);
    match &events[0] {
        CaptureEvent::WebSocketFrame {
            request_id,
            direction,
            data,
            opcode,
            ..
        } => {
            assert_eq!(request_id, "7.3");
            assert_eq!(*direction, Direction::Inbound);
            assert_eq!(data, "AQIDBA==");
            assert_eq!(*opcode, 2);
        }
        other => panic!("expected WebSocketFrame, got {:?}", other),
    }
}

#[test]
fn test_frame_fallback_shape_defaults_opcode() {
    let (dispatcher, sink) = dispatcher();

    dispatcher.handle_event(
        methods::WEBSOCKET_FRAME_SENT,
        &json!({ "requestId": "9.1", "payloadData": "hello" }),
    );

    let events = sink.events();
    assert_eq!(events.len(), 1);
    match &events[0] {
        CaptureEvent::WebSocketFrame {
            direction, opcode, ..
        } => {
            assert_eq!(*direction, Direction::Outbound);
            assert_eq!(*opcode, 2);
        }
        other => panic!("expected WebSocketFrame, got {:?}", other),
    }
}

#[test]
fn test_frame_with_neither_shape_dropped() {
    let (dispatcher, sink) = dispatcher();

    dispatcher.handle_event(
        methods::WEBSOCKET_FRAME_RECEIVED,
        &json!({ "requestId": "9.1", "timestamp": 1.0 }),
    );
    assert!(sink.events().is_empty());
}

#[test]
fn test_unknown_methods_ignored() {
    let (dispatcher, sink) = dispatcher();
    dispatcher.handle_event("Network.requestWillBeSent", &json!({ "requestId": "1" }));
    dispatcher.handle_event("Page.loadEventFired", &json!({}));
    assert!(sink.events().is_empty());
}

#[tokio::test]
async fn test_definition_resource_fetched_and_forwarded() {
    let server = MockServer::start().await;
    let body = r#"{"nested":{"messages":[]}}"#;
    Mock::given(method("GET"))
        .and(path("/1/res/liqi.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let (dispatcher, sink) = dispatcher();
    let resource_url = format!("{}/1/res/liqi.json", server.uri());
    dispatcher.handle_event(
        methods::RESPONSE_RECEIVED,
        &json!({ "requestId": "3.9", "response": { "url": resource_url, "status": 200 } }),
    );

    for _ in 0..100 {
        if !sink.events().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let events = sink.events();
    assert_eq!(events.len(), 1);
    match &events[0] {
        CaptureEvent::ResourceFetched { url, data } => {
            assert_eq!(url, &resource_url);
            assert_eq!(data, body);
        }
        other => panic!("expected ResourceFetched, got {:?}", other),
    }
}

#[tokio::test]
async fn test_definition_fetch_failure_forwards_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1/res/liqi.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let (dispatcher, sink) = dispatcher();
    dispatcher.handle_event(
        methods::RESPONSE_RECEIVED,
        &json!({ "response": { "url": format!("{}/1/res/liqi.json", server.uri()) } }),
    );

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(sink.events().is_empty());
}

#[tokio::test]
async fn test_other_responses_not_fetched() {
    let server = MockServer::start().await;

    let (dispatcher, sink) = dispatcher();
    dispatcher.handle_event(
        methods::RESPONSE_RECEIVED,
        &json!({ "response": { "url": format!("{}/1/res/config.json", server.uri()) } }),
    );

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(sink.events().is_empty());
    assert!(
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .is_empty()
    );
}

#[tokio::test]
async fn test_http_sink_posts_tagged_events() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ingest"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let endpoint = Url::parse(&format!("{}/api/ingest", server.uri())).unwrap();
    let sink = HttpSink::new(endpoint, "bridge".into());

    sink.forward(CaptureEvent::WebSocketFrame {
        request_id: "5.5".into(),
        direction: Direction::Inbound,
        data: "AQID".into(),
        opcode: 2,
        time: 1700000000.5,
    });

    let mut requests = Vec::new();
    for _ in 0..100 {
        requests = server.received_requests().await.unwrap_or_default();
        if !requests.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["source"], "bridge");
    assert_eq!(body["type"], "websocket");
    assert_eq!(body["requestId"], "5.5");
    assert_eq!(body["direction"], "inbound");
    assert_eq!(body["opcode"], 2);
}

#[tokio::test]
async fn test_http_sink_swallows_delivery_failure() {
    // Nothing is listening here; delivery fails quietly.
    let endpoint = Url::parse("http://127.0.0.1:9/api/ingest").unwrap();
    let sink = HttpSink::new(endpoint, "bridge".into());

    sink.forward(CaptureEvent::WebSocketClosed {
        request_id: "1".into(),
        time: 0.0,
    });
    tokio::time::sleep(Duration::from_millis(200)).await;
}
