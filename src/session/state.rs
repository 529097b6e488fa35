/// Channel-detach reason reported when the target was closed by
/// navigation; expected churn, not worth reporting since a reattach is
/// already in flight.
pub const REASON_TARGET_CLOSED: &str = "target_closed";

/// Attachment progress of the automation channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttachState {
    #[default]
    Detached,
    Attaching,
    Attached,
}

/// The session's entire mutable state, owned in one place so transitions
/// and the sequence gate can be exercised without a live page. Mutated
/// only inside single lock scopes; no transition spans an await.
#[derive(Debug, Default)]
pub struct SessionState {
    attach: AttachState,
    reattach_pending: bool,
    last_seq: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach_state(&self) -> AttachState {
        self.attach
    }

    pub fn is_attached(&self) -> bool {
        self.attach == AttachState::Attached
    }

    /// Claim the attach slot. Returns false when already attached or an
    /// attach attempt is in flight, making `attach()` a no-op for callers.
    pub fn begin_attach(&mut self) -> bool {
        if self.attach != AttachState::Detached {
            return false;
        }
        self.attach = AttachState::Attaching;
        true
    }

    pub fn confirm_attach(&mut self) {
        self.attach = AttachState::Attached;
        self.reattach_pending = false;
    }

    pub fn fail_attach(&mut self) {
        if self.attach == AttachState::Attaching {
            self.attach = AttachState::Detached;
        }
    }

    /// The renderer crashed or the channel dropped; either way the
    /// attachment no longer exists.
    pub fn mark_detached(&mut self) {
        self.attach = AttachState::Detached;
    }

    /// Whether a channel detach with this reason should be reported to
    /// the sink. Navigation churn closes targets constantly and is
    /// expected; everything else is news.
    pub fn should_report_detach(reason: &str) -> bool {
        reason != REASON_TARGET_CLOSED
    }

    /// Claim the single pending-reattach slot, so multiple load-finished
    /// signals schedule at most one probe.
    pub fn schedule_reattach(&mut self) -> bool {
        if self.is_attached() || self.reattach_pending {
            return false;
        }
        self.reattach_pending = true;
        true
    }

    pub fn clear_reattach(&mut self) {
        self.reattach_pending = false;
    }

    /// Arrival-order staleness gate. A nonzero sequence must strictly
    /// exceed the last accepted one and is recorded immediately, before
    /// any execution, so later stale commands are judged against it even
    /// while this one is still queued. Zero or absent bypasses the gate.
    pub fn accept_seq(&mut self, seq: Option<u64>) -> bool {
        match seq {
            Some(seq) if seq != 0 => {
                if seq <= self.last_seq {
                    return false;
                }
                self.last_seq = seq;
                true
            }
            _ => true,
        }
    }

    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }
}
