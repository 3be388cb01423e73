//! Asynchronous image decoding for the two layers.
//!
//! Decodes run on a short-lived worker thread; the result comes back as a
//! pollable one-shot value so every mutation still happens on the event-loop
//! thread. There is no cancellation: issuing a new load for a layer while an
//! older one is in flight is allowed, and the last one to resolve wins.

use std::sync::Arc;
use std::thread;

use futures::channel::oneshot;
use image::ImageError;
use log::debug;

use crate::layer::{LayerRole, ViewportExtent};

/// A fully decoded image: RGBA8 pixels plus final dimensions.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl LoadedImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize * 4);
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn extent(&self) -> ViewportExtent {
        ViewportExtent::new(self.width as f32, self.height as f32)
    }
}

/// Synchronous decode to RGBA8.
pub fn decode(bytes: &[u8]) -> Result<LoadedImage, ImageError> {
    let img = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = img.dimensions();
    Ok(LoadedImage::new(width, height, img.into_raw()))
}

/// An in-flight decode for one layer.
pub struct PendingLoad {
    pub role: LayerRole,
    rx: oneshot::Receiver<Result<LoadedImage, ImageError>>,
}

impl PendingLoad {
    /// Non-blocking check for completion. Yields the decode result exactly
    /// once; `None` while still in flight.
    pub fn poll(&mut self) -> Option<Result<Arc<LoadedImage>, ImageError>> {
        match self.rx.try_recv() {
            Ok(Some(result)) => Some(result.map(Arc::new)),
            Ok(None) => None,
            Err(oneshot::Canceled) => Some(Err(ImageError::IoError(
                std::io::Error::new(std::io::ErrorKind::Other, "decode worker vanished"),
            ))),
        }
    }
}

/// Kick off an asynchronous decode of `bytes` for `role`.
pub fn load_bytes(role: LayerRole, bytes: Vec<u8>) -> PendingLoad {
    let (tx, rx) = oneshot::channel();
    debug!("spawning decode for {:?} ({} bytes)", role, bytes.len());
    thread::spawn(move || {
        let result = decode(&bytes);
        // The receiver may have been dropped on shutdown; nothing to do.
        let _ = tx.send(result);
    });
    PendingLoad { role, rx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::png::PngEncoder;
    use image::{ColorType, ImageEncoder};
    use std::time::{Duration, Instant};

    fn tiny_png(width: u32, height: u32) -> Vec<u8> {
        let mut out = Vec::new();
        let pixels = vec![128u8; (width * height * 4) as usize];
        PngEncoder::new(&mut out)
            .write_image(&pixels, width, height, ColorType::Rgba8)
            .unwrap();
        out
    }

    #[test]
    fn decode_reports_final_dimensions() {
        let img = decode(&tiny_png(9, 6)).unwrap();
        assert_eq!((img.width(), img.height()), (9, 6));
        assert_eq!(img.pixels().len(), 9 * 6 * 4);
        assert_eq!(img.extent(), ViewportExtent::new(9.0, 6.0));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode(b"not an image").is_err());
    }

    #[test]
    fn load_bytes_resolves_on_poll() {
        let mut pending = load_bytes(LayerRole::Comparison, tiny_png(4, 3));
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            if let Some(result) = pending.poll() {
                let img = result.unwrap();
                assert_eq!((img.width(), img.height()), (4, 3));
                break;
            }
            assert!(Instant::now() < deadline, "decode never resolved");
            thread::sleep(Duration::from_millis(1));
        }
    }
}
