//! imgui overlay: the two captions pinned to the split line, the transcode
//! size readout, and the quality slider.

use std::time::Instant;

use anyhow::{anyhow, Result};
use imgui::{Condition, FontConfig, FontSource, WindowFlags};
use imgui_winit_support::{HiDpiMode, WinitPlatform};
use winit::event::Event;
use winit::window::Window;

use crate::layer::LayerRole;
use crate::render::Scene;

/// What the overlay reported back for this frame.
#[derive(Debug, Default)]
pub struct UiFrame {
    /// Newly selected quality, when the slider moved.
    pub quality: Option<u8>,
    /// Rendered height of the reference caption, for the input clamp.
    pub caption_height: Option<f32>,
}

pub struct UiLayer {
    context: imgui::Context,
    platform: WinitPlatform,
    renderer: imgui_wgpu::Renderer,
    last_frame: Instant,
}

impl UiLayer {
    pub fn new(
        window: &Window,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
    ) -> Self {
        let mut context = imgui::Context::create();
        context.set_ini_filename(None);

        let mut platform = WinitPlatform::init(&mut context);
        platform.attach_window(context.io_mut(), window, HiDpiMode::Default);

        let hidpi_factor = platform.hidpi_factor();
        let font_size = (13.0 * hidpi_factor) as f32;
        context.io_mut().font_global_scale = (1.0 / hidpi_factor) as f32;
        context.fonts().add_font(&[FontSource::DefaultFontData {
            config: Some(FontConfig {
                size_pixels: font_size,
                ..Default::default()
            }),
        }]);

        let renderer = imgui_wgpu::Renderer::new(
            &mut context,
            device,
            queue,
            imgui_wgpu::RendererConfig {
                texture_format: format,
                ..Default::default()
            },
        );

        Self {
            context,
            platform,
            renderer,
            last_frame: Instant::now(),
        }
    }

    pub fn handle_event(&mut self, window: &Window, event: &Event<'_, ()>) {
        self.platform
            .handle_event(self.context.io_mut(), window, event);
    }

    /// True while the overlay itself is using the pointer (e.g. the slider).
    pub fn wants_pointer(&self) -> bool {
        self.context.io().want_capture_mouse
    }

    /// Build this frame's overlay from the scene state.
    pub fn prepare(&mut self, window: &Window, scene: &Scene, quality: u8) -> Result<UiFrame> {
        let now = Instant::now();
        self.context
            .io_mut()
            .update_delta_time(now - self.last_frame);
        self.last_frame = now;

        self.platform
            .prepare_frame(self.context.io_mut(), window)
            .map_err(|err| anyhow!("imgui frame preparation: {err}"))?;
        let ui = self.context.frame();

        let mut out = UiFrame::default();
        let caption_flags = WindowFlags::NO_DECORATION
            | WindowFlags::ALWAYS_AUTO_RESIZE
            | WindowFlags::NO_MOVE
            | WindowFlags::NO_NAV
            | WindowFlags::NO_MOUSE_INPUTS
            | WindowFlags::NO_SAVED_SETTINGS;

        let alpha = scene.caption_alpha;
        let reference = scene.layer(LayerRole::Reference);
        let comparison = scene.layer(LayerRole::Comparison);
        let viewport = comparison.extent;
        if viewport.width > 0.0 && viewport.height > 0.0 {
            // Both captions anchor at the split point, bottom-aligned to it:
            // the reference caption ends at the split, the comparison caption
            // starts just past it.
            let split_x = viewport.width - reference.caption_offset.x;
            let split_y = viewport.height - reference.caption_offset.y;
            ui.window("reference caption")
                .flags(caption_flags)
                .position([split_x, split_y], Condition::Always)
                .position_pivot([1.0, 1.0])
                .bg_alpha(alpha)
                .build(|| {
                    ui.text(&reference.caption);
                    out.caption_height = Some(ui.window_size()[1]);
                });
            ui.window("comparison caption")
                .flags(caption_flags)
                .position(
                    [comparison.caption_offset.x, split_y],
                    Condition::Always,
                )
                .position_pivot([0.0, 1.0])
                .bg_alpha(alpha)
                .build(|| {
                    ui.text(&comparison.caption);
                });
        }

        ui.window("controls")
            .position([10.0, 10.0], Condition::FirstUseEver)
            .always_auto_resize(true)
            .build(|| {
                let mut q = quality;
                if ui.slider("quality", 1u8, 100u8, &mut q) && q != quality {
                    out.quality = Some(q);
                }
                let size = scene.size_text.as_deref().unwrap_or("-");
                ui.text(format!("size: {} kB", size));
                ui.text_disabled("click the image to lock the split");
            });

        self.platform.prepare_render(ui, window);
        Ok(out)
    }

    /// Draw the overlay into an already-begun render pass.
    pub fn render_into<'r>(
        &'r mut self,
        pass: &mut wgpu::RenderPass<'r>,
        queue: &wgpu::Queue,
        device: &wgpu::Device,
    ) -> Result<()> {
        let draw_data = self.context.render();
        self.renderer
            .render(draw_data, queue, device, pass)
            .map_err(|err| anyhow!("imgui draw: {err}"))?;
        Ok(())
    }
}
