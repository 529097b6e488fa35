pub mod event;
pub mod frame;
pub mod sink;

use crate::timeouts::secs;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub use event::{CaptureEvent, Direction, unix_time_now};
pub use frame::{FramePayload, parse_ws_frame};
pub use sink::{CaptureSink, HttpSink};

/// CDP method names the dispatcher reacts to. The page adapter forwards
/// raw events keyed by these.
pub mod methods {
    pub const WEBSOCKET_CREATED: &str = "Network.webSocketCreated";
    pub const WEBSOCKET_CLOSED: &str = "Network.webSocketClosed";
    pub const WEBSOCKET_FRAME_RECEIVED: &str = "Network.webSocketFrameReceived";
    pub const WEBSOCKET_FRAME_SENT: &str = "Network.webSocketFrameSent";
    pub const RESPONSE_RECEIVED: &str = "Network.responseReceived";
}

/// Receives every raw channel event and forwards normalized capture
/// events to the sink. Purely passive: nothing here ever feeds back into
/// the page.
pub struct CaptureDispatcher {
    sink: Arc<dyn CaptureSink>,
    http: reqwest::Client,
    definition_resource: String,
}

impl CaptureDispatcher {
    pub fn new(sink: Arc<dyn CaptureSink>, definition_resource: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(secs::ENRICHMENT_FETCH))
            .build()
            .unwrap_or_default();
        Self {
            sink,
            http,
            definition_resource,
        }
    }

    pub fn sink(&self) -> Arc<dyn CaptureSink> {
        self.sink.clone()
    }

    /// Single dispatch point for raw channel events.
    pub fn handle_event(&self, method: &str, params: &Value) {
        match method {
            methods::WEBSOCKET_CREATED => self.on_websocket_created(params),
            methods::WEBSOCKET_CLOSED => self.on_websocket_closed(params),
            methods::WEBSOCKET_FRAME_RECEIVED => self.on_websocket_frame(params, Direction::Inbound),
            methods::WEBSOCKET_FRAME_SENT => self.on_websocket_frame(params, Direction::Outbound),
            methods::RESPONSE_RECEIVED => self.on_response_received(params),
            _ => {}
        }
    }

    fn on_websocket_created(&self, params: &Value) {
        let (Some(request_id), Some(url)) = (
            params.get("requestId").and_then(Value::as_str),
            params.get("url").and_then(Value::as_str),
        ) else {
            return;
        };
        self.sink.forward(CaptureEvent::WebSocketOpened {
            request_id: request_id.to_string(),
            url: url.to_string(),
            time: unix_time_now(),
        });
    }

    fn on_websocket_closed(&self, params: &Value) {
        let Some(request_id) = params.get("requestId").and_then(Value::as_str) else {
            return;
        };
        self.sink.forward(CaptureEvent::WebSocketClosed {
            request_id: request_id.to_string(),
            time: unix_time_now(),
        });
    }

    fn on_websocket_frame(&self, params: &Value, direction: Direction) {
        let Some(request_id) = params.get("requestId").and_then(Value::as_str) else {
            return;
        };
        // Events with neither payload shape carry nothing worth forwarding.
        let Some(frame) = parse_ws_frame(params) else {
            return;
        };
        self.sink.forward(CaptureEvent::WebSocketFrame {
            request_id: request_id.to_string(),
            direction,
            data: frame.data,
            opcode: frame.opcode,
            time: unix_time_now(),
        });
    }

    fn on_response_received(&self, params: &Value) {
        let Some(url) = params
            .get("response")
            .and_then(|r| r.get("url"))
            .and_then(Value::as_str)
        else {
            return;
        };
        if !is_resource_match(url, &self.definition_resource) {
            return;
        }

        // Re-fetch independently rather than asking the channel for the
        // body; by the time we ask, the original response is often no
        // longer retrievable. Best-effort enrichment, never fatal.
        let http = self.http.clone();
        let sink = self.sink.clone();
        let url = url.to_string();
        tokio::spawn(async move {
            match http.get(&url).send().await {
                Ok(response) if response.status().is_success() => match response.text().await {
                    Ok(body) => {
                        sink.forward(CaptureEvent::ResourceFetched { url, data: body });
                    }
                    Err(e) => {
                        tracing::error!("failed to read definition body from {}: {}", url, e);
                    }
                },
                Ok(response) => {
                    tracing::error!(
                        "definition fetch from {} returned HTTP {}",
                        url,
                        response.status()
                    );
                }
                Err(e) => {
                    tracing::error!("failed to fetch definition from {}: {}", url, e);
                }
            }
        });
    }
}

/// Whether `url`'s final path segment names the definition resource.
fn is_resource_match(url: &str, resource: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(|segment| segment == resource)
            .unwrap_or(false),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_match_on_path_segment() {
        assert!(is_resource_match(
            "https://game.example.com/v1/res/liqi.json",
            "liqi.json"
        ));
        assert!(is_resource_match(
            "https://game.example.com/liqi.json?v=123",
            "liqi.json"
        ));
    }

    #[test]
    fn test_resource_match_rejects_other_urls() {
        assert!(!is_resource_match(
            "https://game.example.com/v1/res/config.json",
            "liqi.json"
        ));
        // Name appearing in the query only is not a match.
        assert!(!is_resource_match(
            "https://game.example.com/asset?file=liqi.json",
            "liqi.json"
        ));
        assert!(!is_resource_match("not a url", "liqi.json"));
    }
}
