use super::payload::{AutoplayPayload, Step, clamp_delay};
use super::rect::{Rect, apply_jitter, resolve_rect, to_viewport_px};
use crate::Result;
use crate::browser::MouseEventKind;
use crate::session::SessionManager;
use crate::timeouts::ms;
use std::time::Duration;
use tokio::sync::mpsc;

/// Accepts autoplay payloads and executes them as serialized batches. A
/// single worker drains an explicit FIFO, so two batches can never
/// interleave their dispatched input events; acceptance (and the sequence
/// gate) happens at arrival, execution later.
pub struct AutoplayExecutor {
    manager: SessionManager,
    queue: mpsc::UnboundedSender<Vec<Step>>,
}

impl AutoplayExecutor {
    pub fn spawn(manager: SessionManager) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(worker(manager.clone(), rx));
        Self { manager, queue: tx }
    }

    /// Validate and enqueue one payload. Returns whether it was accepted
    /// into the queue, not whether it has run; execution is asynchronous.
    pub fn submit(&self, payload: AutoplayPayload) -> bool {
        if payload.steps.is_empty() {
            return false;
        }
        // Record the sequence before execution: staleness is a function
        // of arrival order, not completion order.
        if !self.manager.accept_seq(payload.seq) {
            tracing::debug!("dropping stale autoplay payload (seq {:?})", payload.seq);
            return false;
        }
        self.queue.send(payload.steps).is_ok()
    }
}

async fn worker(manager: SessionManager, mut rx: mpsc::UnboundedReceiver<Vec<Step>>) {
    while let Some(steps) = rx.recv().await {
        // A failed batch must not take the queue down with it.
        if let Err(e) = run_batch(&manager, &steps).await {
            tracing::error!("autoplay batch aborted: {}", e);
        }
    }
}

async fn run_batch(manager: &SessionManager, steps: &[Step]) -> Result<()> {
    if !manager.ensure_attached().await {
        tracing::debug!("skipping autoplay batch: session not attached");
        return Ok(());
    }

    let page = manager.page();

    // One rect per batch: all of its coordinates share one spatial
    // reference, and the page should not be resizing mid-batch.
    let rect = resolve_rect(page.as_ref()).await;

    for step in steps {
        if !page.is_alive() {
            tracing::debug!("page went away mid-batch, aborting remaining steps");
            return Ok(());
        }

        match step {
            Step::Delay { ms } => {
                tokio::time::sleep(Duration::from_millis(clamp_delay(*ms))).await;
            }
            Step::Move { x16, y9 } => {
                let (x, y) = target(*x16, *y9, &rect);
                page.dispatch_mouse(MouseEventKind::Move, x, y).await?;
            }
            Step::Click { x16, y9 } => {
                let (x, y) = target(*x16, *y9, &rect);
                page.dispatch_mouse(MouseEventKind::Move, x, y).await?;
                page.dispatch_mouse(MouseEventKind::Press, x, y).await?;
                tokio::time::sleep(Duration::from_millis(ms::CLICK_HOLD)).await;
                page.dispatch_mouse(MouseEventKind::Release, x, y).await?;
            }
        }
    }

    Ok(())
}

fn target(x16: f64, y9: f64, rect: &Rect) -> (f64, f64) {
    let (x, y) = to_viewport_px(x16, y9, rect);
    apply_jitter(x, y)
}
