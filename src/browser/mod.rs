pub mod cdp_page;

use crate::Result;
use serde_json::Value;
use tokio::sync::mpsc;

pub use cdp_page::{CdpPage, connect_browser, find_game_page};

/// Synthetic pointer event kinds the executor can dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEventKind {
    Move,
    Press,
    Release,
}

/// Page lifecycle signals the session manager reacts to.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    RendererGone { reason: String },
    NavigationStarted,
    LoadFinished,
    ChannelDetached { reason: String },
}

/// One occurrence on the observed page: either a lifecycle signal or a raw
/// protocol event identified by its CDP method name.
#[derive(Debug, Clone)]
pub enum PageEvent {
    Lifecycle(LifecycleEvent),
    Protocol { method: &'static str, params: Value },
}

/// The live page collaborator. The bridge never owns the page lifecycle;
/// every method may fail because the page navigated, reloaded, or crashed,
/// and callers must tolerate that at each step.
#[async_trait::async_trait]
pub trait GamePage: Send + Sync {
    /// Whether the underlying target is still believed reachable.
    fn is_alive(&self) -> bool;

    /// Probe whether the automation channel itself is attached. This can
    /// diverge from the manager's own flag when an external actor attached
    /// (or the connection outlived a renderer swap).
    async fn channel_attached(&self) -> bool;

    /// Raw channel attach. Idempotency is the session manager's concern.
    async fn attach_channel(&self) -> Result<()>;

    async fn detach_channel(&self) -> Result<()>;

    /// Turn on network-event observation for the channel.
    async fn enable_network_events(&self) -> Result<()>;

    /// Register all page-level listeners and return the unified event
    /// stream. The receiver yields events until the page goes away.
    async fn subscribe(&self) -> Result<mpsc::UnboundedReceiver<PageEvent>>;

    /// Evaluate a script inside the page and return its JSON result.
    async fn evaluate(&self, script: &str) -> Result<Value>;

    /// Viewport dimensions obtained without running page script, used as a
    /// fallback when in-page evaluation is unavailable.
    async fn content_bounds(&self) -> Option<(f64, f64)>;

    /// Dispatch one synthetic pointer event at viewport coordinates.
    async fn dispatch_mouse(&self, kind: MouseEventKind, x: f64, y: f64) -> Result<()>;
}
