//! The split-view widget controller.
//!
//! One `SplitView` instance owns everything the original page kept in
//! module globals: both layers, the split animation state, the sticky flag
//! and the selected quality. All display writes go through the [`Renderer`]
//! passed to each operation, so instances are independent and testable
//! without a window.

use std::sync::Arc;
use std::time::Instant;

use log::debug;

use crate::animate::{Point, SplitAnimator, Ticker};
use crate::image_loader::LoadedImage;
use crate::input::{clamp_to_layer, PointerTracker};
use crate::layer::{Layer, LayerRole, ViewportExtent};
use crate::render::{CaptionOffset, Renderer};

/// Clamp floor for the split target until the overlay reports a measured
/// caption height.
pub const DEFAULT_CAPTION_HEIGHT: f32 = 24.0;

const CAPTION_ALPHA_INITIAL: f32 = 0.3;
const CAPTION_ALPHA_DIM: f32 = 0.4;
const CAPTION_ALPHA_HIDDEN: f32 = 0.0;

pub struct SplitView {
    layers: [Layer; 2],
    animator: SplitAnimator,
    ticker: Ticker,
    pointer: PointerTracker,
    caption_height: f32,
    quality: u8,
    seeded: bool,
}

impl SplitView {
    pub fn new(quality: u8) -> Self {
        Self {
            layers: [
                Layer::new(LayerRole::Reference),
                Layer::new(LayerRole::Comparison),
            ],
            animator: SplitAnimator::new(),
            ticker: Ticker::new(),
            pointer: PointerTracker::new(),
            caption_height: DEFAULT_CAPTION_HEIGHT,
            quality,
            seeded: false,
        }
    }

    /// Write the initial captions and start the (immediately converging)
    /// animation schedule.
    pub fn attach<R: Renderer>(&mut self, renderer: &mut R, now: Instant) {
        self.set_caption(LayerRole::Reference, "original <-", renderer);
        let caption = format!("-> Q: {}", self.quality);
        self.set_caption(LayerRole::Comparison, &caption, renderer);
        renderer.set_caption_opacity(CAPTION_ALPHA_INITIAL);
        self.ticker.arm(now);
    }

    pub fn layer(&self, role: LayerRole) -> &Layer {
        &self.layers[role.index()]
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn caption_height(&self) -> f32 {
        self.caption_height
    }

    pub fn set_caption_height(&mut self, height: f32) {
        if height > 0.0 {
            self.caption_height = height;
        }
    }

    pub fn is_sticky(&self) -> bool {
        self.pointer.is_sticky()
    }

    /// True while the animation schedule is armed.
    pub fn is_animating(&self) -> bool {
        self.ticker.is_armed()
    }

    pub fn split_current(&self) -> Point {
        self.animator.current()
    }

    pub fn split_target(&self) -> Point {
        self.animator.target()
    }

    /// Drop a layer back to its placeholder fill while a new image decodes.
    pub fn begin_load<R: Renderer>(&mut self, role: LayerRole, renderer: &mut R) {
        renderer.clear_layer_image(role);
    }

    /// A decode finished: bind the image, size the layer, and (first
    /// comparison load only) seed the split at the image center.
    pub fn image_loaded<R: Renderer>(
        &mut self,
        role: LayerRole,
        image: Arc<LoadedImage>,
        renderer: &mut R,
        now: Instant,
    ) {
        let extent = image.extent();
        debug!(
            "{:?} layer now {}x{}",
            role, extent.width, extent.height
        );
        renderer.set_layer_image(role, image);
        renderer.set_layer_extent(role, extent);
        self.layers[role.index()].extent = extent;

        if role == LayerRole::Comparison && !self.seeded {
            let (cx, cy) = extent.center();
            self.animator.seed(cx, cy);
            self.seeded = true;
        }
        self.ticker.arm(now);
    }

    /// Forget the seeded split; the next comparison load recenters it.
    /// Called when a brand-new source image replaces the current one.
    pub fn reset_seed(&mut self) {
        self.seeded = false;
    }

    /// Pointer or touch sample, relative to the comparison layer's box.
    pub fn pointer_event(&mut self, x: f32, y: f32, now: Instant) {
        let extent = self.layer(LayerRole::Comparison).extent;
        if !self.pointer.record(x, y) {
            return;
        }
        if extent.width <= 0.0 || extent.height <= 0.0 {
            return;
        }
        let (tx, ty) = clamp_to_layer(x, y, extent, self.caption_height);
        self.animator.set_target(tx, ty);
        self.ticker.arm(now);
    }

    /// Flip sticky mode. Unsticking re-applies the triggering position (or
    /// the last recorded one) so the split catches up to the pointer, and
    /// restores the dim caption background; sticking hides it.
    pub fn toggle_sticky<R: Renderer>(
        &mut self,
        position: Option<(f32, f32)>,
        renderer: &mut R,
        now: Instant,
    ) {
        if self.pointer.toggle_sticky() {
            renderer.set_caption_opacity(CAPTION_ALPHA_HIDDEN);
        } else {
            renderer.set_caption_opacity(CAPTION_ALPHA_DIM);
            if let Some((x, y)) = position.or_else(|| self.pointer.last()) {
                self.pointer_event(x, y, now);
            }
        }
    }

    /// Select a new transcode quality; the caller is responsible for
    /// running the codec and reloading the comparison layer.
    pub fn set_quality<R: Renderer>(&mut self, quality: u8, renderer: &mut R) {
        self.quality = quality;
        let caption = format!("-> Q: {}", quality);
        self.set_caption(LayerRole::Comparison, &caption, renderer);
    }

    fn set_caption<R: Renderer>(&mut self, role: LayerRole, text: &str, renderer: &mut R) {
        self.layers[role.index()].caption = text.to_owned();
        renderer.set_caption_text(role, text);
    }

    /// Advance the animation by however many fixed intervals have elapsed,
    /// writing layout geometry on every tick. The schedule disarms in the
    /// tick where both axes converge.
    pub fn pump<R: Renderer>(&mut self, now: Instant, renderer: &mut R) {
        while self.ticker.fire(now) {
            let converged = self.animator.tick();
            self.write_geometry(renderer);
            if converged {
                self.ticker.disarm();
                break;
            }
        }
    }

    /// Derived layout: the reference layer is clipped at the split x, and
    /// both captions pin to the split point, bottom-aligned to it.
    fn write_geometry<R: Renderer>(&mut self, renderer: &mut R) {
        let current = self.animator.current();
        let viewport = self.layer(LayerRole::Comparison).extent;
        let reference_height = self.layer(LayerRole::Reference).extent.height;

        renderer.set_layer_extent(
            LayerRole::Reference,
            ViewportExtent::new(current.x, reference_height),
        );
        renderer.set_caption_offset(
            LayerRole::Reference,
            CaptionOffset {
                x: viewport.width - current.x,
                y: viewport.height - current.y,
            },
        );
        renderer.set_caption_offset(
            LayerRole::Comparison,
            CaptionOffset {
                x: current.x + 1.0,
                y: viewport.height - current.y,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animate::TICK_INTERVAL;
    use crate::render::Scene;

    fn test_image(width: u32, height: u32) -> Arc<LoadedImage> {
        Arc::new(LoadedImage::new(
            width,
            height,
            vec![0u8; (width * height * 4) as usize],
        ))
    }

    fn settle(widget: &mut SplitView, scene: &mut Scene, mut now: Instant) -> Instant {
        for _ in 0..1_000 {
            if !widget.is_animating() {
                return now;
            }
            now += TICK_INTERVAL;
            widget.pump(now, scene);
        }
        panic!("widget never settled");
    }

    #[test]
    fn first_comparison_load_seeds_the_center() {
        let mut widget = SplitView::new(5);
        let mut scene = Scene::new();
        let now = Instant::now();
        widget.attach(&mut scene, now);

        widget.image_loaded(LayerRole::Comparison, test_image(900, 600), &mut scene, now);
        assert_eq!(widget.split_target(), Point::new(450.0, 300.0));
        assert_eq!(widget.split_current(), Point::new(450.0, 300.0));

        settle(&mut widget, &mut scene, now);
        assert_eq!(widget.split_current(), Point::new(450.0, 300.0));
        assert_eq!(scene.layer(LayerRole::Reference).extent.width, 450.0);
    }

    #[test]
    fn later_comparison_loads_keep_the_user_split() {
        let mut widget = SplitView::new(5);
        let mut scene = Scene::new();
        let mut now = Instant::now();
        widget.attach(&mut scene, now);
        widget.image_loaded(LayerRole::Comparison, test_image(900, 600), &mut scene, now);
        now = settle(&mut widget, &mut scene, now);

        widget.pointer_event(100.0, 200.0, now);
        assert_eq!(widget.split_target(), Point::new(100.0, 200.0));

        // Quality change reloads the comparison image at the same size.
        widget.image_loaded(LayerRole::Comparison, test_image(900, 600), &mut scene, now);
        assert_eq!(widget.split_target(), Point::new(100.0, 200.0));
    }

    #[test]
    fn new_source_reseeds_after_reset() {
        let mut widget = SplitView::new(5);
        let mut scene = Scene::new();
        let now = Instant::now();
        widget.attach(&mut scene, now);
        widget.image_loaded(LayerRole::Comparison, test_image(900, 600), &mut scene, now);
        widget.pointer_event(100.0, 200.0, now);

        widget.reset_seed();
        widget.image_loaded(LayerRole::Comparison, test_image(600, 400), &mut scene, now);
        assert_eq!(widget.split_target(), Point::new(300.0, 200.0));
    }

    #[test]
    fn scheduler_stops_on_convergence_and_restarts_on_retarget() {
        let mut widget = SplitView::new(5);
        let mut scene = Scene::new();
        let mut now = Instant::now();
        widget.attach(&mut scene, now);
        widget.image_loaded(LayerRole::Comparison, test_image(900, 600), &mut scene, now);
        now = settle(&mut widget, &mut scene, now);
        assert!(!widget.is_animating());

        widget.pointer_event(10.0, 30.0, now);
        assert!(widget.is_animating());
    }

    #[test]
    fn sticky_freezes_the_target_and_unstick_catches_up() {
        let mut widget = SplitView::new(5);
        let mut scene = Scene::new();
        let mut now = Instant::now();
        widget.attach(&mut scene, now);
        widget.image_loaded(LayerRole::Comparison, test_image(900, 600), &mut scene, now);
        now = settle(&mut widget, &mut scene, now);

        widget.toggle_sticky(Some((400.0, 300.0)), &mut scene, now);
        assert!(widget.is_sticky());
        assert_eq!(scene.caption_alpha, 0.0);

        let frozen = widget.split_target();
        widget.pointer_event(10.0, 40.0, now);
        widget.pointer_event(700.0, 500.0, now);
        assert_eq!(widget.split_target(), frozen);

        widget.toggle_sticky(Some((700.0, 500.0)), &mut scene, now);
        assert!(!widget.is_sticky());
        assert_eq!(scene.caption_alpha, 0.4);
        assert_eq!(widget.split_target(), Point::new(700.0, 500.0));
    }

    #[test]
    fn pointer_targets_clamp_to_the_layer() {
        let mut widget = SplitView::new(5);
        let mut scene = Scene::new();
        let now = Instant::now();
        widget.attach(&mut scene, now);
        widget.image_loaded(LayerRole::Comparison, test_image(900, 600), &mut scene, now);

        widget.pointer_event(-50.0, -10.0, now);
        assert_eq!(
            widget.split_target(),
            Point::new(0.0, DEFAULT_CAPTION_HEIGHT)
        );

        widget.pointer_event(1000.0, 700.0, now);
        assert_eq!(widget.split_target(), Point::new(899.0, 599.0));
    }

    #[test]
    fn captions_stay_pinned_to_the_split() {
        let mut widget = SplitView::new(5);
        let mut scene = Scene::new();
        let mut now = Instant::now();
        widget.attach(&mut scene, now);
        widget.image_loaded(LayerRole::Comparison, test_image(900, 600), &mut scene, now);
        widget.image_loaded(LayerRole::Reference, test_image(900, 600), &mut scene, now);
        now = settle(&mut widget, &mut scene, now);

        let reference = scene.layer(LayerRole::Reference);
        assert_eq!(reference.caption_offset, CaptionOffset { x: 450.0, y: 300.0 });
        let comparison = scene.layer(LayerRole::Comparison);
        assert_eq!(
            comparison.caption_offset,
            CaptionOffset { x: 451.0, y: 300.0 }
        );
    }

    #[test]
    fn quality_change_updates_the_comparison_caption() {
        let mut widget = SplitView::new(5);
        let mut scene = Scene::new();
        widget.attach(&mut scene, Instant::now());
        assert_eq!(scene.layer(LayerRole::Comparison).caption, "-> Q: 5");
        widget.set_quality(20, &mut scene);
        assert_eq!(widget.quality(), 20);
        assert_eq!(scene.layer(LayerRole::Comparison).caption, "-> Q: 20");
    }
}
