//! Display boundary for the split-view widget.
//!
//! All style/layout writes the widget performs go through the [`Renderer`]
//! trait, so the animation and input logic never touch a window directly.
//! [`Scene`] is the plain implementation the GPU and overlay layers read
//! from each frame; tests drive the widget against it with no display at
//! all.

use std::sync::Arc;

use crate::image_loader::LoadedImage;
use crate::layer::{LayerRole, ViewportExtent};

/// Offset of a caption from its layer's anchored edges, in pixels.
///
/// The reference caption anchors to the layer's right/bottom edges, the
/// comparison caption to its left/bottom edges, so both stay pinned to the
/// split point as it moves.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CaptionOffset {
    pub x: f32,
    pub y: f32,
}

pub trait Renderer {
    /// Resize a layer. For the reference layer this doubles as the split
    /// clip: its width follows the animated split position.
    fn set_layer_extent(&mut self, role: LayerRole, extent: ViewportExtent);

    /// Bind a decoded image as the layer's background.
    fn set_layer_image(&mut self, role: LayerRole, image: Arc<LoadedImage>);

    /// Drop the layer back to the neutral placeholder fill.
    fn clear_layer_image(&mut self, role: LayerRole);

    fn set_caption_text(&mut self, role: LayerRole, text: &str);

    fn set_caption_offset(&mut self, role: LayerRole, offset: CaptionOffset);

    /// Background translucency for both captions at once.
    fn set_caption_opacity(&mut self, alpha: f32);

    /// Push the formatted transcode size to the readout element.
    fn set_size_text(&mut self, text: &str);
}

/// Recorded visual state for one layer.
#[derive(Debug, Clone, Default)]
pub struct LayerVisual {
    pub extent: ViewportExtent,
    pub image: Option<Arc<LoadedImage>>,
    /// Bumped whenever `image` changes so the GPU layer knows to re-upload.
    pub image_generation: u64,
    pub caption: String,
    pub caption_offset: CaptionOffset,
}

/// Plain state store implementing [`Renderer`].
#[derive(Debug, Clone)]
pub struct Scene {
    layers: [LayerVisual; 2],
    pub caption_alpha: f32,
    pub size_text: Option<String>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            layers: [LayerVisual::default(), LayerVisual::default()],
            caption_alpha: 0.3,
            size_text: None,
        }
    }

    pub fn layer(&self, role: LayerRole) -> &LayerVisual {
        &self.layers[role.index()]
    }

    fn layer_mut(&mut self, role: LayerRole) -> &mut LayerVisual {
        &mut self.layers[role.index()]
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for Scene {
    fn set_layer_extent(&mut self, role: LayerRole, extent: ViewportExtent) {
        self.layer_mut(role).extent = extent;
    }

    fn set_layer_image(&mut self, role: LayerRole, image: Arc<LoadedImage>) {
        let layer = self.layer_mut(role);
        layer.image = Some(image);
        layer.image_generation += 1;
    }

    fn clear_layer_image(&mut self, role: LayerRole) {
        let layer = self.layer_mut(role);
        layer.image = None;
        layer.image_generation += 1;
    }

    fn set_caption_text(&mut self, role: LayerRole, text: &str) {
        self.layer_mut(role).caption = text.to_owned();
    }

    fn set_caption_offset(&mut self, role: LayerRole, offset: CaptionOffset) {
        self.layer_mut(role).caption_offset = offset;
    }

    fn set_caption_opacity(&mut self, alpha: f32) {
        self.caption_alpha = alpha;
    }

    fn set_size_text(&mut self, text: &str) {
        self.size_text = Some(text.to_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_generation_tracks_set_and_clear() {
        let mut scene = Scene::new();
        let before = scene.layer(LayerRole::Comparison).image_generation;
        let img = Arc::new(LoadedImage::new(2, 2, vec![0u8; 16]));
        scene.set_layer_image(LayerRole::Comparison, img);
        assert_eq!(scene.layer(LayerRole::Comparison).image_generation, before + 1);
        scene.clear_layer_image(LayerRole::Comparison);
        assert_eq!(scene.layer(LayerRole::Comparison).image_generation, before + 2);
        assert!(scene.layer(LayerRole::Comparison).image.is_none());
    }
}
