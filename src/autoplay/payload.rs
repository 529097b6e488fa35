use crate::timeouts::ms;
use serde::Deserialize;

/// One abstract input step. Coordinates are fractions of a fixed 16x9
/// grid, independent of the page's actual resolution; they get scaled
/// against the live surface rect at dispatch time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Step {
    Delay { ms: u64 },
    Move { x16: f64, y9: f64 },
    Click { x16: f64, y9: f64 },
}

/// An inbound autoplay command. `seq`, when present and nonzero, must
/// strictly increase across accepted payloads; stale commands from a
/// since-superseded recommendation are dropped at the gate.
#[derive(Debug, Clone, Deserialize)]
pub struct AutoplayPayload {
    #[serde(default)]
    pub seq: Option<u64>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// Clamp an inbound delay to something a queued batch can afford.
pub fn clamp_delay(requested_ms: u64) -> u64 {
    requested_ms.min(ms::DELAY_CLAMP)
}
