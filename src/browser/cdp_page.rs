use super::{LifecycleEvent, MouseEventKind, PageEvent};
use crate::{
    BridgeError, Result,
    capture::methods,
    timeouts::{ms, secs},
};
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType, MouseButton,
};
use chromiumoxide::cdp::browser_protocol::inspector::{
    EnableParams as InspectorEnableParams, EventDetached, EventTargetCrashed,
};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams as NetworkEnableParams, EventResponseReceived, EventWebSocketClosed,
    EventWebSocketCreated, EventWebSocketFrameReceived, EventWebSocketFrameSent,
};
use chromiumoxide::cdp::browser_protocol::page::{
    EnableParams as PageEnableParams, EventFrameStartedLoading, EventLoadEventFired,
    GetLayoutMetricsParams,
};
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

/// Forwards one typed CDP event stream into the unified page-event channel
/// as raw JSON params keyed by method name. The raw-JSON hop keeps the
/// capture dispatcher shape-tolerant instead of tied to one protocol
/// binding's structs.
macro_rules! pump_protocol {
    ($page:expr, $tx:expr, $ty:ty, $method:expr) => {{
        let mut stream = $page.event_listener::<$ty>().await.map_err(|e| {
            BridgeError::AttachFailed(format!("failed to attach {} listener: {}", $method, e))
        })?;
        let tx = $tx.clone();
        tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                let Ok(params) = serde_json::to_value(event.as_ref()) else {
                    continue;
                };
                if tx
                    .send(PageEvent::Protocol {
                        method: $method,
                        params,
                    })
                    .is_err()
                {
                    break;
                }
            }
        });
    }};
}

/// The live game page, reached over an existing browser's DevTools
/// connection.
pub struct CdpPage {
    page: Arc<Page>,
    alive: Arc<AtomicBool>,
    /// Whether network observation has been established on this channel.
    /// CDP offers no query for it, so the adapter remembers what it did.
    observing: AtomicBool,
}

impl CdpPage {
    pub fn new(page: Arc<Page>) -> Self {
        Self {
            page,
            alive: Arc::new(AtomicBool::new(true)),
            observing: AtomicBool::new(false),
        }
    }

    /// Cheap command round-trip against the target. Success means the
    /// channel is responsive, whoever established it.
    async fn probe(&self) -> Result<()> {
        self.page
            .url()
            .await
            .map_err(|e| BridgeError::AttachFailed(e.to_string()))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl super::GamePage for CdpPage {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn channel_attached(&self) -> bool {
        self.observing.load(Ordering::SeqCst) && self.is_alive() && self.probe().await.is_ok()
    }

    async fn attach_channel(&self) -> Result<()> {
        if !self.is_alive() {
            return Err(BridgeError::AttachFailed("target is gone".into()));
        }
        self.probe().await
    }

    async fn detach_channel(&self) -> Result<()> {
        // The browser connection is shared with everything else; detach
        // just stops network observation on this target.
        self.observing.store(false, Ordering::SeqCst);
        self.page
            .execute(
                chromiumoxide::cdp::browser_protocol::network::DisableParams::default(),
            )
            .await
            .map_err(|e| BridgeError::Connection(e.to_string()))?;
        Ok(())
    }

    async fn enable_network_events(&self) -> Result<()> {
        self.page
            .execute(NetworkEnableParams::default())
            .await
            .map_err(|e| BridgeError::AttachFailed(format!("could not enable Network: {}", e)))?;
        self.observing.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn subscribe(&self) -> Result<mpsc::UnboundedReceiver<PageEvent>> {
        let (tx, rx) = mpsc::unbounded_channel();

        // Lifecycle domains are best-effort; capture still works without
        // them, just with a blinder reattach story.
        let _ = self.page.execute(PageEnableParams::default()).await;
        let _ = self.page.execute(InspectorEnableParams::default()).await;

        pump_protocol!(
            self.page,
            tx,
            EventWebSocketCreated,
            methods::WEBSOCKET_CREATED
        );
        pump_protocol!(
            self.page,
            tx,
            EventWebSocketClosed,
            methods::WEBSOCKET_CLOSED
        );
        pump_protocol!(
            self.page,
            tx,
            EventWebSocketFrameReceived,
            methods::WEBSOCKET_FRAME_RECEIVED
        );
        pump_protocol!(
            self.page,
            tx,
            EventWebSocketFrameSent,
            methods::WEBSOCKET_FRAME_SENT
        );
        pump_protocol!(
            self.page,
            tx,
            EventResponseReceived,
            methods::RESPONSE_RECEIVED
        );

        let mut crash_stream = self
            .page
            .event_listener::<EventTargetCrashed>()
            .await
            .map_err(|e| BridgeError::AttachFailed(format!("crash listener: {}", e)))?;
        let crash_tx = tx.clone();
        tokio::spawn(async move {
            while crash_stream.next().await.is_some() {
                let event = PageEvent::Lifecycle(LifecycleEvent::RendererGone {
                    reason: "crashed".to_string(),
                });
                if crash_tx.send(event).is_err() {
                    break;
                }
            }
        });

        let mut detach_stream = self
            .page
            .event_listener::<EventDetached>()
            .await
            .map_err(|e| BridgeError::AttachFailed(format!("detach listener: {}", e)))?;
        let detach_tx = tx.clone();
        tokio::spawn(async move {
            while let Some(event) = detach_stream.next().await {
                let event = PageEvent::Lifecycle(LifecycleEvent::ChannelDetached {
                    reason: event.reason.clone(),
                });
                if detach_tx.send(event).is_err() {
                    break;
                }
            }
        });

        let mut nav_stream = self
            .page
            .event_listener::<EventFrameStartedLoading>()
            .await
            .map_err(|e| BridgeError::AttachFailed(format!("navigation listener: {}", e)))?;
        let nav_tx = tx.clone();
        tokio::spawn(async move {
            while nav_stream.next().await.is_some() {
                if nav_tx
                    .send(PageEvent::Lifecycle(LifecycleEvent::NavigationStarted))
                    .is_err()
                {
                    break;
                }
            }
        });

        let mut load_stream = self
            .page
            .event_listener::<EventLoadEventFired>()
            .await
            .map_err(|e| BridgeError::AttachFailed(format!("load listener: {}", e)))?;
        let alive = self.alive.clone();
        tokio::spawn(async move {
            while load_stream.next().await.is_some() {
                if tx
                    .send(PageEvent::Lifecycle(LifecycleEvent::LoadFinished))
                    .is_err()
                {
                    break;
                }
            }
            // The stream only ends when the handler for this target is
            // gone, i.e. the connection itself is dead.
            alive.store(false, Ordering::SeqCst);
        });

        Ok(rx)
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| BridgeError::EvaluationError(e.to_string()))?;

        result
            .into_value()
            .map_err(|e| BridgeError::EvaluationError(format!("failed to parse result: {}", e)))
    }

    async fn content_bounds(&self) -> Option<(f64, f64)> {
        let metrics = self
            .page
            .execute(GetLayoutMetricsParams::default())
            .await
            .ok()?;
        let viewport = &metrics.css_visual_viewport;
        Some((viewport.client_width, viewport.client_height))
    }

    async fn dispatch_mouse(&self, kind: MouseEventKind, x: f64, y: f64) -> Result<()> {
        let builder = DispatchMouseEventParams::builder().x(x).y(y);

        let builder = match kind {
            MouseEventKind::Move => builder.r#type(DispatchMouseEventType::MouseMoved),
            MouseEventKind::Press => builder
                .r#type(DispatchMouseEventType::MousePressed)
                .button(MouseButton::Left)
                .click_count(1),
            MouseEventKind::Release => builder
                .r#type(DispatchMouseEventType::MouseReleased)
                .button(MouseButton::Left)
                .click_count(1),
        };

        let params = builder.build().map_err(BridgeError::InputFailed)?;

        self.page
            .execute(params)
            .await
            .map_err(|e| BridgeError::InputFailed(e.to_string()))?;
        Ok(())
    }
}

/// Connect to an already-running browser through its HTTP debug endpoint,
/// retrying briefly in case it is still starting up. The bridge never
/// launches or owns the browser process.
pub async fn connect_browser(cdp_port: u16) -> Result<Arc<Browser>> {
    const MAX_RETRIES: u32 = 10;

    for attempt in 1..=MAX_RETRIES {
        match try_connect(cdp_port).await {
            Ok(browser) => return Ok(browser),
            Err(_) => {
                tracing::debug!("connection attempt {} failed", attempt);
                tokio::time::sleep(Duration::from_millis(ms::CONNECT_RETRY)).await;
            }
        }
    }

    Err(BridgeError::ConnectionLost)
}

async fn try_connect(cdp_port: u16) -> Result<Arc<Browser>> {
    use chromiumoxide::handler::HandlerConfig;

    let url = format!("http://127.0.0.1:{}/json/version", cdp_port);

    let response: serde_json::Value = reqwest::Client::new()
        .get(&url)
        .send()
        .await
        .map_err(|_| BridgeError::ConnectionLost)?
        .json()
        .await
        .map_err(|_| BridgeError::ConnectionLost)?;

    let ws_url = response
        .get("webSocketDebuggerUrl")
        .and_then(|v| v.as_str())
        .ok_or(BridgeError::ConnectionLost)?;

    let handler_config = HandlerConfig {
        request_timeout: Duration::from_secs(secs::REQUEST),
        ..Default::default()
    };

    let (browser, mut handler) = Browser::connect_with_config(ws_url, handler_config)
        .await
        .map_err(|_| BridgeError::ConnectionLost)?;

    tokio::spawn(async move { while handler.next().await.is_some() {} });

    Ok(Arc::new(browser))
}

/// Locate the page hosting the game among open targets, preferring a URL
/// containing the configured hint. Retries briefly since targets may still
/// be materializing right after connect.
pub async fn find_game_page(browser: &Arc<Browser>, url_hint: &str) -> Result<Arc<Page>> {
    const MAX_RETRIES: u32 = 10;

    for attempt in 1..=MAX_RETRIES {
        if let Ok(pages) = browser.pages().await
            && !pages.is_empty()
        {
            for page in &pages {
                let url = page.url().await.unwrap_or_default().unwrap_or_default();
                if url.contains(url_hint) {
                    return Ok(Arc::new(page.clone()));
                }
            }
            tracing::debug!(
                "no page matching '{}' among {} targets, using first",
                url_hint,
                pages.len()
            );
            if let Some(page) = pages.into_iter().next() {
                return Ok(Arc::new(page));
            }
        }

        tracing::debug!("page discovery attempt {} failed", attempt);
        tokio::time::sleep(Duration::from_millis(ms::PAGE_DISCOVERY_RETRY)).await;
    }

    Err(BridgeError::PageNotFound(url_hint.to_string()))
}
