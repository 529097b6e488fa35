use super::event::CaptureEvent;
use crate::timeouts::secs;
use std::time::Duration;
use url::Url;

/// Delivery seam for capture events. Implementations must not block the
/// caller and must swallow their own failures; capture liveness is worth
/// more than any single event.
pub trait CaptureSink: Send + Sync {
    fn forward(&self, event: CaptureEvent);
}

/// Fire-and-forget JSON POST to the backend ingestion endpoint, one call
/// per event, tagged with the configured source.
pub struct HttpSink {
    client: reqwest::Client,
    endpoint: Url,
    source: String,
}

impl HttpSink {
    pub fn new(endpoint: Url, source: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(secs::SINK_REQUEST))
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint,
            source,
        }
    }
}

impl CaptureSink for HttpSink {
    fn forward(&self, event: CaptureEvent) {
        let mut body = match serde_json::to_value(&event) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("failed to serialize capture event: {}", e);
                return;
            }
        };
        if let Some(map) = body.as_object_mut() {
            map.insert("source".to_string(), self.source.clone().into());
        }

        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        tokio::spawn(async move {
            if let Err(e) = client.post(endpoint).json(&body).send().await {
                tracing::error!("failed to deliver capture event: {}", e);
            }
        });
    }
}
