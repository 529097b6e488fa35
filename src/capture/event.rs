use serde::Serialize;

/// Frame direction relative to the game client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// One observed network occurrence, in the exact shape the ingestion
/// endpoint expects. Created when the channel reports the underlying
/// primitive event and handed straight to the sink; never persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum CaptureEvent {
    #[serde(rename = "websocket_created")]
    WebSocketOpened {
        #[serde(rename = "requestId")]
        request_id: String,
        url: String,
        time: f64,
    },
    #[serde(rename = "websocket_closed")]
    WebSocketClosed {
        #[serde(rename = "requestId")]
        request_id: String,
        time: f64,
    },
    #[serde(rename = "websocket")]
    WebSocketFrame {
        #[serde(rename = "requestId")]
        request_id: String,
        direction: Direction,
        /// Payload exactly as the channel reported it (base64 for binary
        /// frames); forwarded opaquely.
        data: String,
        opcode: i64,
        time: f64,
    },
    #[serde(rename = "liqi_definition")]
    ResourceFetched { url: String, data: String },
    #[serde(rename = "debugger_detached")]
    DebugDetached { reason: String, time: f64 },
}

/// Wall-clock time as fractional seconds since the Unix epoch, the `time`
/// representation the backend ingests.
pub fn unix_time_now() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
