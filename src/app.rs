use std::time::Instant;

use anyhow::{Context as _, Result};
use log::{debug, error, info};
use winit::event::{ElementState, Event, MouseButton, TouchPhase, WindowEvent};
use winit::window::Window;

use crate::codec::{size_kb_label, CodecBridge, JpegCodec};
use crate::gpu::Gpu;
use crate::image_loader::{load_bytes, PendingLoad};
use crate::layer::LayerRole;
use crate::render::{Renderer as _, Scene};
use crate::ui::UiLayer;
use crate::widget::SplitView;

pub struct AppConfig {
    pub image_path: String,
    pub quality: u8,
}

pub struct AppState {
    widget: SplitView,
    scene: Scene,
    gpu: Gpu,
    ui: UiLayer,
    bridge: CodecBridge,
    /// Raw bytes of the source image; every transcode starts from these.
    source: Vec<u8>,
    loads: Vec<PendingLoad>,
    cursor: Option<(f32, f32)>,
}

impl AppState {
    pub async fn new(window: &Window, config: AppConfig) -> Result<Self> {
        info!("Initializing viewer for {}", config.image_path);
        let source = std::fs::read(&config.image_path)
            .with_context(|| format!("failed to read source image '{}'", config.image_path))?;

        let gpu = Gpu::new(window).await?;
        let ui = UiLayer::new(window, gpu.device(), gpu.queue(), gpu.surface_format());

        let mut scene = Scene::new();
        let mut widget = SplitView::new(config.quality);
        widget.attach(&mut scene, Instant::now());

        let mut bridge = CodecBridge::new();
        bridge.install(Box::new(JpegCodec::new()));

        let mut state = Self {
            widget,
            scene,
            gpu,
            ui,
            bridge,
            source,
            loads: Vec::new(),
            cursor: None,
        };
        state.load_source();
        Ok(state)
    }

    /// Start the original image into both layers, then kick off a transcode
    /// at the current quality to replace the comparison side.
    fn load_source(&mut self) {
        self.widget.reset_seed();
        for role in [LayerRole::Reference, LayerRole::Comparison] {
            self.widget.begin_load(role, &mut self.scene);
            self.loads.push(load_bytes(role, self.source.clone()));
        }
        self.request_transcode(self.widget.quality());
    }

    /// Run the codec at `quality` and reload the comparison layer from its
    /// output. Skipped silently while the codec module is unavailable.
    fn request_transcode(&mut self, quality: u8) {
        self.widget.set_quality(quality, &mut self.scene);
        let Some(out) = self.bridge.transcode(&self.source, quality) else {
            return;
        };
        self.scene.set_size_text(&size_kb_label(out.size));
        self.widget.begin_load(LayerRole::Comparison, &mut self.scene);
        self.loads.push(load_bytes(LayerRole::Comparison, out.bytes));
    }

    pub fn handle_event(&mut self, window: &Window, event: &Event<'_, ()>) {
        self.ui.handle_event(window, event);

        let Event::WindowEvent { event, .. } = event else {
            return;
        };
        match event {
            WindowEvent::Resized(size) => {
                self.gpu.resize(size.width, size.height);
            }
            WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                self.gpu.resize(new_inner_size.width, new_inner_size.height);
            }
            WindowEvent::CursorMoved { position, .. } => {
                let sample = (position.x as f32, position.y as f32);
                self.cursor = Some(sample);
                if !self.ui.wants_pointer() {
                    self.widget.pointer_event(sample.0, sample.1, Instant::now());
                }
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                if !self.ui.wants_pointer() {
                    self.widget
                        .toggle_sticky(self.cursor, &mut self.scene, Instant::now());
                    debug!("sticky split: {}", self.widget.is_sticky());
                }
            }
            WindowEvent::Touch(touch)
                if matches!(touch.phase, TouchPhase::Started | TouchPhase::Moved) =>
            {
                let sample = (touch.location.x as f32, touch.location.y as f32);
                self.cursor = Some(sample);
                self.widget.pointer_event(sample.0, sample.1, Instant::now());
            }
            _ => {}
        }
    }

    pub fn update(&mut self) {
        let now = Instant::now();

        // Apply finished decodes in order; a layer with several loads in
        // flight keeps whichever resolves last.
        let widget = &mut self.widget;
        let scene = &mut self.scene;
        self.loads.retain_mut(|load| match load.poll() {
            None => true,
            Some(Ok(image)) => {
                widget.image_loaded(load.role, image, scene, now);
                false
            }
            Some(Err(err)) => {
                error!("decode for {:?} failed: {}", load.role, err);
                false
            }
        });

        self.widget.pump(now, &mut self.scene);
    }

    pub fn render(&mut self, window: &Window) -> Result<()> {
        let frame = self
            .ui
            .prepare(window, &self.scene, self.widget.quality())?;
        if let Some(height) = frame.caption_height {
            self.widget.set_caption_height(height);
        }
        if let Some(quality) = frame.quality {
            info!("quality changed to {}", quality);
            self.request_transcode(quality);
        }
        self.gpu.render(&self.scene, &mut self.ui)
    }
}
