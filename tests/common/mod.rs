//! In-memory doubles for the page and sink seams, so session and autoplay
//! behavior can be exercised without a live browser.

#![allow(dead_code)]

use majsoul_bridge::Result;
use majsoul_bridge::browser::{GamePage, MouseEventKind, PageEvent};
use majsoul_bridge::capture::{CaptureEvent, CaptureSink};
use majsoul_bridge::error::BridgeError;
use serde_json::{Value, json};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::mpsc;
use tokio::time::Instant;

/// One synthetic pointer event the fake page received, with the virtual
/// time it arrived.
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub kind: MouseEventKind,
    pub x: f64,
    pub y: f64,
    pub at: Instant,
}

pub struct FakePage {
    pub alive: AtomicBool,
    /// What the channel-attachment probe reports.
    pub channel_ready: AtomicBool,
    pub attach_fails: AtomicBool,
    pub enable_network_fails: AtomicBool,
    pub attach_calls: AtomicUsize,
    pub enable_network_calls: AtomicUsize,
    pub rect_json: Mutex<Value>,
    pub evaluate_fails: AtomicBool,
    pub bounds: Mutex<Option<(f64, f64)>>,
    pub dispatched: Mutex<Vec<Dispatched>>,
    pub dispatch_fails: AtomicBool,
    events_tx: Mutex<Option<mpsc::UnboundedSender<PageEvent>>>,
}

impl Default for FakePage {
    fn default() -> Self {
        Self {
            alive: AtomicBool::new(true),
            channel_ready: AtomicBool::new(false),
            attach_fails: AtomicBool::new(false),
            enable_network_fails: AtomicBool::new(false),
            attach_calls: AtomicUsize::new(0),
            enable_network_calls: AtomicUsize::new(0),
            rect_json: Mutex::new(json!({
                "left": 100.0, "top": 50.0, "width": 1600.0, "height": 900.0
            })),
            evaluate_fails: AtomicBool::new(false),
            bounds: Mutex::new(None),
            dispatched: Mutex::new(Vec::new()),
            dispatch_fails: AtomicBool::new(false),
            events_tx: Mutex::new(None),
        }
    }
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatched(&self) -> Vec<Dispatched> {
        self.dispatched.lock().unwrap().clone()
    }

    /// Inject a page event as if the channel reported it.
    pub fn emit(&self, event: PageEvent) {
        if let Some(tx) = self.events_tx.lock().unwrap().as_ref() {
            let _ = tx.send(event);
        }
    }
}

#[async_trait::async_trait]
impl GamePage for FakePage {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn channel_attached(&self) -> bool {
        self.is_alive() && self.channel_ready.load(Ordering::SeqCst)
    }

    async fn attach_channel(&self) -> Result<()> {
        self.attach_calls.fetch_add(1, Ordering::SeqCst);
        if self.attach_fails.load(Ordering::SeqCst) {
            return Err(BridgeError::AttachFailed("fake attach failure".into()));
        }
        self.channel_ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn detach_channel(&self) -> Result<()> {
        self.channel_ready.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn enable_network_events(&self) -> Result<()> {
        self.enable_network_calls.fetch_add(1, Ordering::SeqCst);
        if self.enable_network_fails.load(Ordering::SeqCst) {
            return Err(BridgeError::AttachFailed("fake enable failure".into()));
        }
        Ok(())
    }

    async fn subscribe(&self) -> Result<mpsc::UnboundedReceiver<PageEvent>> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.events_tx.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    async fn evaluate(&self, _script: &str) -> Result<Value> {
        if self.evaluate_fails.load(Ordering::SeqCst) {
            return Err(BridgeError::EvaluationError("fake evaluate failure".into()));
        }
        Ok(self.rect_json.lock().unwrap().clone())
    }

    async fn content_bounds(&self) -> Option<(f64, f64)> {
        *self.bounds.lock().unwrap()
    }

    async fn dispatch_mouse(&self, kind: MouseEventKind, x: f64, y: f64) -> Result<()> {
        if self.dispatch_fails.load(Ordering::SeqCst) {
            return Err(BridgeError::InputFailed("fake dispatch failure".into()));
        }
        self.dispatched.lock().unwrap().push(Dispatched {
            kind,
            x,
            y,
            at: Instant::now(),
        });
        Ok(())
    }
}

/// Sink that records forwarded events instead of delivering them.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<CaptureEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CaptureEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl CaptureSink for RecordingSink {
    fn forward(&self, event: CaptureEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Poll until the fake page has seen `count` dispatched events. Under a
/// paused clock the sleeps auto-advance, so this terminates immediately
/// once the worker has drained.
pub async fn wait_for_dispatches(page: &FakePage, count: usize) {
    for _ in 0..1000 {
        if page.dispatched.lock().unwrap().len() >= count {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!(
        "timed out waiting for {} dispatched events (got {})",
        count,
        page.dispatched.lock().unwrap().len()
    );
}
