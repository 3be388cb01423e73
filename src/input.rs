//! Pointer and touch handling for the comparison surface.

use crate::layer::ViewportExtent;

/// Clamp a pointer position (already relative to the comparison layer's
/// bounding box) into the valid split-target range.
///
/// The lower bound on y keeps the target below the reference caption so the
/// split never drags under fixed text.
pub fn clamp_to_layer(
    x: f32,
    y: f32,
    extent: ViewportExtent,
    caption_height: f32,
) -> (f32, f32) {
    let mut tx = x;
    let mut ty = y;
    if tx < 0.0 {
        tx = 0.0;
    }
    if ty < caption_height {
        ty = caption_height;
    }
    if tx >= extent.width {
        tx = extent.width - 1.0;
    }
    if ty >= extent.height {
        ty = extent.height - 1.0;
    }
    (tx, ty)
}

/// Remembers the latest pointer sample and whether the split is stuck.
///
/// While stuck, samples are recorded but not applied; unsticking replays the
/// most recent one so the split catches up to the pointer.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointerTracker {
    sticky: bool,
    last: Option<(f32, f32)>,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sample; returns true when it should drive the target.
    pub fn record(&mut self, x: f32, y: f32) -> bool {
        self.last = Some((x, y));
        !self.sticky
    }

    /// Flip sticky mode, returning the new state.
    pub fn toggle_sticky(&mut self) -> bool {
        self.sticky = !self.sticky;
        self.sticky
    }

    pub fn is_sticky(&self) -> bool {
        self.sticky
    }

    pub fn last(&self) -> Option<(f32, f32)> {
        self.last
    }
}
