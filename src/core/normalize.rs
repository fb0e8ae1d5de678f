//! Conversion of engine-native rectangles into page-relative boxes.

use serde::{Deserialize, Serialize};

use crate::core::geometry::BBox;
use crate::core::model::{NormalizedBox, WordToken};

/// Width and height of the coordinate space a raw box was measured in
/// (pixels of a rendered page, PDF points, ...).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PageExtent {
    pub width: f32,
    pub height: f32,
}

impl PageExtent {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// The unit square; raw boxes measured against it are already normalized.
    pub fn unit() -> Self {
        Self::new(1.0, 1.0)
    }

    fn is_usable(&self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }
}

/// A rectangle as an engine emits it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub confidence: Option<f32>,
}

impl RawBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0,
            y0,
            x1,
            y1,
            text: None,
            confidence: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

/// Scale `raw` into the unit square and clamp it there. Returns `None` for
/// rectangles with zero or negative area after clamping, or when the extent
/// itself is unusable.
pub fn normalize_box(
    raw: &RawBox,
    extent: PageExtent,
    page: usize,
    source: &str,
) -> Option<NormalizedBox> {
    let bbox = scale_to_unit(raw.x0, raw.y0, raw.x1, raw.y1, extent)?;
    let mut normalized = NormalizedBox::new(page, bbox, source)?;
    if let Some(text) = &raw.text {
        normalized = normalized.with_text(text.clone());
    }
    normalized.confidence = raw.confidence;
    Some(normalized)
}

/// Normalize a whole page of raw boxes, silently dropping degenerate ones.
pub fn normalize_page(
    raws: &[RawBox],
    extent: PageExtent,
    page: usize,
    source: &str,
) -> Vec<NormalizedBox> {
    let boxes: Vec<NormalizedBox> = raws
        .iter()
        .filter_map(|raw| normalize_box(raw, extent, page, source))
        .collect();
    if boxes.len() < raws.len() {
        tracing::debug!(
            engine = source,
            page,
            dropped = raws.len() - boxes.len(),
            "dropped degenerate boxes"
        );
    }
    boxes
}

/// Normalize a word token; `None` when its rectangle is degenerate.
pub fn normalize_word(raw: &RawBox, extent: PageExtent) -> Option<WordToken> {
    let bbox = scale_to_unit(raw.x0, raw.y0, raw.x1, raw.y1, extent)?;
    Some(WordToken::new(raw.text.clone().unwrap_or_default(), bbox))
}

fn scale_to_unit(x0: f32, y0: f32, x1: f32, y1: f32, extent: PageExtent) -> Option<BBox> {
    if !extent.is_usable() {
        return None;
    }
    let bbox = BBox::new(
        x0 / extent.width,
        y0 / extent.height,
        x1 / extent.width,
        y1 / extent.height,
    )
    .clamp_unit();
    if bbox.is_degenerate() {
        None
    } else {
        Some(bbox)
    }
}

/// Map a unit box onto a `width` x `height` pixel grid, rounding to the
/// nearest pixel. `None` when the result has no pixels.
pub fn to_pixels(bbox: &BBox, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    if width == 0 || height == 0 {
        return None;
    }
    let w = width as f32;
    let h = height as f32;
    let x0 = (bbox.x0 * w).round().clamp(0.0, w - 1.0) as u32;
    let y0 = (bbox.y0 * h).round().clamp(0.0, h - 1.0) as u32;
    let x1 = (bbox.x1 * w).round().clamp(0.0, w) as u32;
    let y1 = (bbox.y1 * h).round().clamp(0.0, h) as u32;
    (x1 > x0 && y1 > y0).then_some((x0, y0, x1, y1))
}
