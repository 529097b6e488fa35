use crate::browser::GamePage;
use serde_json::Value;

/// Viewport-relative bounding box of the game surface, in page pixels.
/// Resolved fresh for every batch; the page may have resized or repainted
/// between batches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Terminal fallback when neither the page nor the viewport can be asked.
pub const DEFAULT_RECT: Rect = Rect {
    left: 0.0,
    top: 0.0,
    width: 1280.0,
    height: 720.0,
};

/// Finds the largest rendered canvas, the presumed game surface. Falls
/// back to the window's inner size when no canvas exists.
const SURFACE_RECT_JS: &str = r#"(() => {
    const canvases = Array.from(document.querySelectorAll('canvas'));
    let bestRect = null;
    let bestArea = 0;
    for (const c of canvases) {
        const r = c.getBoundingClientRect();
        const area = r.width * r.height;
        if (area > bestArea) {
            bestRect = r;
            bestArea = area;
        }
    }
    const r = bestRect || { left: 0, top: 0, width: window.innerWidth, height: window.innerHeight };
    return { left: r.left, top: r.top, width: r.width, height: r.height };
})()"#;

/// Map a 16x9 grid coordinate onto the rect, unjittered.
pub fn to_viewport_px(x16: f64, y9: f64, rect: &Rect) -> (f64, f64) {
    let x = rect.left + (x16 / 16.0) * rect.width;
    let y = rect.top + (y9 / 9.0) * rect.height;
    (x, y)
}

/// Independent uniform jitter of up to one pixel on each axis; keeps
/// movement less robotic while staying accurate.
pub fn apply_jitter(x: f64, y: f64) -> (f64, f64) {
    use rand::Rng;
    let mut rng = rand::rng();
    (
        x + rng.random_range(-1.0..=1.0),
        y + rng.random_range(-1.0..=1.0),
    )
}

/// Resolve the current game surface rect. Never fails: a page that cannot
/// be asked (mid-navigation, detached) degrades to the viewport bounds,
/// and past that to a fixed default.
pub async fn resolve_rect(page: &dyn GamePage) -> Rect {
    match page.evaluate(SURFACE_RECT_JS).await {
        Ok(value) => {
            if let Some(rect) = rect_from_value(&value) {
                return rect;
            }
            tracing::warn!("surface rect query returned an unusable shape");
        }
        Err(e) => {
            tracing::warn!("failed to read game surface rect: {}", e);
        }
    }

    if let Some((width, height)) = page.content_bounds().await
        && width > 0.0
        && height > 0.0
    {
        return Rect {
            left: 0.0,
            top: 0.0,
            width,
            height,
        };
    }

    DEFAULT_RECT
}

fn rect_from_value(value: &Value) -> Option<Rect> {
    let left = value.get("left")?.as_f64()?;
    let top = value.get("top")?.as_f64()?;
    let width = value.get("width")?.as_f64()?;
    let height = value.get("height")?.as_f64()?;

    let all_finite =
        left.is_finite() && top.is_finite() && width.is_finite() && height.is_finite();
    if !all_finite || width <= 0.0 || height <= 0.0 {
        return None;
    }

    Some(Rect {
        left,
        top,
        width,
        height,
    })
}
