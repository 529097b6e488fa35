use super::state::SessionState;
use crate::Result;
use crate::browser::{GamePage, LifecycleEvent, PageEvent};
use crate::capture::{CaptureDispatcher, CaptureEvent, CaptureSink, unix_time_now};
use crate::timeouts::ms;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;

struct Inner {
    page: Arc<dyn GamePage>,
    capture: Arc<CaptureDispatcher>,
    sink: Arc<dyn CaptureSink>,
    state: Mutex<SessionState>,
    listening: AtomicBool,
}

/// Owns the automation-channel attachment for one page and arbitrates
/// every transition: initial attach, detach, crash, and reattach after
/// navigation. The page itself is an external resource that may go away
/// at any moment; nothing here is allowed to take the process down.
///
/// Cheap to clone; all clones share one session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(
        page: Arc<dyn GamePage>,
        capture: Arc<CaptureDispatcher>,
        sink: Arc<dyn CaptureSink>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                page,
                capture,
                sink,
                state: Mutex::new(SessionState::new()),
                listening: AtomicBool::new(false),
            }),
        }
    }

    pub fn page(&self) -> Arc<dyn GamePage> {
        self.inner.page.clone()
    }

    pub fn is_attached(&self) -> bool {
        self.with_state(|s| s.is_attached())
    }

    /// Arrival-order sequence gate, shared with the autoplay executor.
    pub fn accept_seq(&self, seq: Option<u64>) -> bool {
        self.with_state(|s| s.accept_seq(seq))
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut guard = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Idempotent attach. Registers the page listeners (once, before the
    /// first attach probe) and then attempts the attach itself. A failed
    /// probe is logged, not raised; the next navigation-finished signal or
    /// external attach request retries.
    pub async fn attach(&self) -> Result<()> {
        if self.is_attached() || !self.inner.page.is_alive() {
            return Ok(());
        }

        if !self.inner.listening.swap(true, Ordering::SeqCst) {
            let rx = self.inner.page.subscribe().await?;
            let manager = self.clone();
            tokio::spawn(manager.event_loop(rx));
        }

        self.try_attach().await;
        Ok(())
    }

    /// Idempotent detach; no-op when not attached.
    pub async fn detach(&self) {
        if !self.is_attached() {
            return;
        }
        if let Err(e) = self.inner.page.detach_channel().await {
            tracing::warn!("detach failed: {}", e);
        }
        self.with_state(|s| s.mark_detached());
    }

    /// Attach, retrying once if currently detached. Returns whether the
    /// session ended up attached to a live page.
    pub async fn ensure_attached(&self) -> bool {
        if !self.is_attached() {
            self.try_attach().await;
        }
        self.is_attached() && self.inner.page.is_alive()
    }

    async fn try_attach(&self) {
        if !self.inner.page.is_alive() {
            return;
        }
        if !self.with_state(|s| s.begin_attach()) {
            return;
        }

        // The internal flag and the channel's actual state can diverge
        // when someone else attached; trust the channel.
        if self.inner.page.channel_attached().await {
            self.with_state(|s| s.confirm_attach());
            return;
        }

        match self.inner.page.attach_channel().await {
            Ok(()) => {
                self.with_state(|s| s.confirm_attach());
                // Degraded-but-connected beats a retry storm: capture just
                // sees fewer events until the next reattach cycle.
                if let Err(e) = self.inner.page.enable_network_events().await {
                    tracing::warn!("{}", e);
                }
            }
            Err(e) => {
                tracing::error!("attach failed: {}", e);
                self.with_state(|s| {
                    s.fail_attach();
                    s.clear_reattach();
                });
            }
        }
    }

    async fn event_loop(self, mut rx: mpsc::UnboundedReceiver<PageEvent>) {
        while let Some(event) = rx.recv().await {
            match event {
                PageEvent::Lifecycle(lifecycle) => self.handle_lifecycle(lifecycle).await,
                PageEvent::Protocol { method, params } => {
                    self.inner.capture.handle_event(method, &params);
                }
            }
        }
        tracing::debug!("page event stream ended");
    }

    /// React to one page lifecycle signal.
    pub async fn handle_lifecycle(&self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::RendererGone { reason } => {
                tracing::error!("renderer process gone: {}", reason);
                self.with_state(|s| s.mark_detached());
            }
            LifecycleEvent::NavigationStarted => {
                tracing::info!("page navigation started");
            }
            LifecycleEvent::LoadFinished => {
                if !self.inner.page.is_alive() {
                    return;
                }
                // Let the freshly navigated page settle before probing it.
                if self.with_state(|s| s.schedule_reattach()) {
                    let manager = self.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(Duration::from_millis(ms::REATTACH_SETTLE)).await;
                        manager.try_attach().await;
                    });
                }
            }
            LifecycleEvent::ChannelDetached { reason } => {
                tracing::warn!("automation channel detached: {}", reason);
                self.with_state(|s| s.mark_detached());

                // Target-closed churn comes from navigation and a reattach
                // is already on its way; anything else gets reported.
                if SessionState::should_report_detach(&reason) {
                    self.inner.sink.forward(CaptureEvent::DebugDetached {
                        reason,
                        time: unix_time_now(),
                    });
                }
            }
        }
    }
}
