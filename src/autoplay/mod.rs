pub mod executor;
pub mod payload;
pub mod rect;

pub use executor::AutoplayExecutor;
pub use payload::{AutoplayPayload, Step, clamp_delay};
pub use rect::{DEFAULT_RECT, Rect, apply_jitter, resolve_rect, to_viewport_px};
