//! Bridge to the transcoding codec module.
//!
//! The codec is reached through a narrow, allocator-style ABI: a byte-
//! addressable memory region, `alloc`/`free` for scratch space inside it,
//! and a `transcode` entry point that overwrites its input window in place
//! and reports the compressed size. [`CodecBridge`] owns the marshalling;
//! [`JpegCodec`] is the in-process module implementing the ABI.

use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, ImageEncoder};
use log::{debug, warn};

/// The codec collaborator's ABI. Offsets index into the module's memory.
pub trait CodecModule {
    /// Reserve `len` bytes of scratch space; `None` when exhausted.
    fn alloc(&mut self, len: usize) -> Option<usize>;

    /// Release a region previously returned by [`CodecModule::alloc`].
    fn free(&mut self, offset: usize);

    fn memory(&self) -> &[u8];

    fn memory_mut(&mut self) -> &mut [u8];

    /// Re-encode the image in `[offset, offset + len)` at `quality`,
    /// overwriting that window, and return the compressed size in bytes.
    /// Returns 0 on failure; the window's tail past the compressed size is
    /// left as-is.
    fn transcode(&mut self, offset: usize, len: usize, quality: u8) -> usize;
}

/// Result of one transcode: the read-back scratch window and the size the
/// module reported. `bytes` is the full input-length window, so everything
/// past `size` is stale padding, exactly as the module left it.
#[derive(Debug, Clone)]
pub struct Transcoded {
    pub bytes: Vec<u8>,
    pub size: usize,
}

/// Kilobyte readout with two decimals for the size display element.
pub fn size_kb_label(size: usize) -> String {
    format!("{:.2}", size as f64 / 1024.0)
}

/// Marshals byte buffers in and out of the codec module.
#[derive(Default)]
pub struct CodecBridge {
    module: Option<Box<dyn CodecModule>>,
}

impl CodecBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&mut self, module: Box<dyn CodecModule>) {
        self.module = Some(module);
    }

    pub fn is_loaded(&self) -> bool {
        self.module.is_some()
    }

    /// Run one transcode through the module.
    ///
    /// When no module is installed the call is silently skipped and `None`
    /// is returned; callers must not treat that as an error. The scratch
    /// region is released on every path, including module-reported failure.
    pub fn transcode(&mut self, input: &[u8], quality: u8) -> Option<Transcoded> {
        let module = match self.module.as_deref_mut() {
            Some(module) => module,
            None => {
                debug!("transcode skipped: codec module not loaded");
                return None;
            }
        };

        let len = input.len();
        let offset = match module.alloc(len) {
            Some(offset) => offset,
            None => {
                warn!("codec module out of scratch space ({} bytes)", len);
                return None;
            }
        };
        if offset + len > module.memory().len() {
            warn!("codec module returned a scratch region out of bounds");
            module.free(offset);
            return None;
        }

        module.memory_mut()[offset..offset + len].copy_from_slice(input);
        let size = module.transcode(offset, len, quality);
        let bytes = module.memory()[offset..offset + len].to_vec();
        module.free(offset);

        debug!("transcoded {} bytes at q{} -> {} bytes", len, quality, size);
        Some(Transcoded { bytes, size })
    }
}

#[derive(Debug, Clone, Copy)]
struct Block {
    offset: usize,
    len: usize,
    in_use: bool,
}

/// In-process codec module: JPEG re-encode at a requested quality over a
/// first-fit byte arena.
#[derive(Default)]
pub struct JpegCodec {
    memory: Vec<u8>,
    blocks: Vec<Block>,
}

impl JpegCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CodecModule for JpegCodec {
    fn alloc(&mut self, len: usize) -> Option<usize> {
        for i in 0..self.blocks.len() {
            let block = self.blocks[i];
            if !block.in_use && block.len >= len {
                if block.len > len {
                    self.blocks.insert(
                        i + 1,
                        Block {
                            offset: block.offset + len,
                            len: block.len - len,
                            in_use: false,
                        },
                    );
                }
                self.blocks[i].len = len;
                self.blocks[i].in_use = true;
                return Some(block.offset);
            }
        }
        let offset = self.memory.len();
        self.memory.resize(offset + len, 0);
        self.blocks.push(Block {
            offset,
            len,
            in_use: true,
        });
        Some(offset)
    }

    fn free(&mut self, offset: usize) {
        let Some(i) = self
            .blocks
            .iter()
            .position(|b| b.in_use && b.offset == offset)
        else {
            warn!("free of unknown codec scratch offset {}", offset);
            return;
        };
        self.blocks[i].in_use = false;
        // Merge with free neighbors to keep the arena from fragmenting.
        if i + 1 < self.blocks.len() && !self.blocks[i + 1].in_use {
            self.blocks[i].len += self.blocks[i + 1].len;
            self.blocks.remove(i + 1);
        }
        if i > 0 && !self.blocks[i - 1].in_use {
            self.blocks[i - 1].len += self.blocks[i].len;
            self.blocks.remove(i);
        }
    }

    fn memory(&self) -> &[u8] {
        &self.memory
    }

    fn memory_mut(&mut self) -> &mut [u8] {
        &mut self.memory
    }

    fn transcode(&mut self, offset: usize, len: usize, quality: u8) -> usize {
        let window = &self.memory[offset..offset + len];
        let img = match image::load_from_memory(window) {
            Ok(img) => img,
            Err(err) => {
                warn!("transcode input did not decode: {}", err);
                return 0;
            }
        };
        let rgb = img.to_rgb8();
        let mut out = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
        if let Err(err) = encoder.write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            ColorType::Rgb8,
        ) {
            warn!("re-encode at q{} failed: {}", quality, err);
            return 0;
        }
        let copied = out.len().min(len);
        self.memory[offset..offset + copied].copy_from_slice(&out[..copied]);
        out.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Journal {
        allocs: Vec<usize>,
        frees: Vec<usize>,
        transcodes: Vec<(usize, usize, u8)>,
    }

    struct StubModule {
        memory: Vec<u8>,
        journal: Rc<RefCell<Journal>>,
        report: usize,
    }

    impl StubModule {
        fn new(journal: Rc<RefCell<Journal>>, report: usize) -> Self {
            Self {
                memory: vec![0; 64],
                journal,
                report,
            }
        }
    }

    impl CodecModule for StubModule {
        fn alloc(&mut self, len: usize) -> Option<usize> {
            self.journal.borrow_mut().allocs.push(len);
            (len <= self.memory.len()).then_some(0)
        }

        fn free(&mut self, offset: usize) {
            self.journal.borrow_mut().frees.push(offset);
        }

        fn memory(&self) -> &[u8] {
            &self.memory
        }

        fn memory_mut(&mut self) -> &mut [u8] {
            &mut self.memory
        }

        fn transcode(&mut self, offset: usize, len: usize, quality: u8) -> usize {
            self.journal
                .borrow_mut()
                .transcodes
                .push((offset, len, quality));
            for b in &mut self.memory[offset..offset + len.min(self.report)] {
                *b = 0xAB;
            }
            self.report
        }
    }

    #[test]
    fn missing_module_is_a_silent_skip() {
        let mut bridge = CodecBridge::new();
        assert!(!bridge.is_loaded());
        assert!(bridge.transcode(b"anything", 10).is_none());
    }

    #[test]
    fn bridge_marshals_and_releases_scratch() {
        let journal = Rc::new(RefCell::new(Journal::default()));
        let mut bridge = CodecBridge::new();
        bridge.install(Box::new(StubModule::new(journal.clone(), 3)));

        let out = bridge.transcode(&[1, 2, 3, 4, 5], 42).unwrap();
        assert_eq!(out.size, 3);
        assert_eq!(out.bytes.len(), 5);
        assert_eq!(&out.bytes[..3], &[0xAB, 0xAB, 0xAB]);
        // Tail of the window is whatever the module left behind.
        assert_eq!(&out.bytes[3..], &[4, 5]);

        let journal = journal.borrow();
        assert_eq!(journal.allocs, vec![5]);
        assert_eq!(journal.transcodes, vec![(0, 5, 42)]);
        assert_eq!(journal.frees, vec![0]);
    }

    #[test]
    fn scratch_is_released_when_the_module_reports_failure() {
        let journal = Rc::new(RefCell::new(Journal::default()));
        let mut bridge = CodecBridge::new();
        bridge.install(Box::new(StubModule::new(journal.clone(), 0)));

        let out = bridge.transcode(&[9; 8], 5).unwrap();
        assert_eq!(out.size, 0);
        assert_eq!(journal.borrow().frees.len(), 1);
    }

    #[test]
    fn size_label_has_two_decimals() {
        assert_eq!(size_kb_label(512), "0.50");
        assert_eq!(size_kb_label(0), "0.00");
        assert_eq!(size_kb_label(131_072), "128.00");
    }

    #[test]
    fn arena_reuses_and_merges_freed_blocks() {
        let mut codec = JpegCodec::new();
        let a = codec.alloc(16).unwrap();
        let b = codec.alloc(16).unwrap();
        assert_ne!(a, b);
        codec.free(a);
        codec.free(b);
        // Both regions merged, so a larger request fits without growing.
        let before = codec.memory().len();
        let c = codec.alloc(32).unwrap();
        assert_eq!(c, a);
        assert_eq!(codec.memory().len(), before);
    }

    #[test]
    fn arena_splits_oversized_free_blocks() {
        let mut codec = JpegCodec::new();
        let a = codec.alloc(32).unwrap();
        codec.free(a);
        let b = codec.alloc(8).unwrap();
        let c = codec.alloc(8).unwrap();
        assert_eq!(b, a);
        assert_eq!(c, a + 8);
    }

    fn sample_jpeg() -> Vec<u8> {
        let img = image::RgbImage::from_fn(32, 24, |x, y| {
            image::Rgb([(x * 8) as u8, (y * 10) as u8, 128])
        });
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, 90)
            .write_image(img.as_raw(), 32, 24, ColorType::Rgb8)
            .unwrap();
        out
    }

    #[test]
    fn jpeg_codec_rewrites_the_window_in_place() {
        let mut bridge = CodecBridge::new();
        bridge.install(Box::new(JpegCodec::new()));

        let input = sample_jpeg();
        let out = bridge.transcode(&input, 10).unwrap();
        assert!(out.size > 0);
        // The window now starts with a fresh JPEG stream.
        assert_eq!(&out.bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&out.bytes[..out.size.min(out.bytes.len())])
            .expect("transcoded window must decode");
        assert_eq!((decoded.width(), decoded.height()), (32, 24));
    }

    #[test]
    fn jpeg_codec_reports_zero_for_undecodable_input() {
        let mut bridge = CodecBridge::new();
        bridge.install(Box::new(JpegCodec::new()));
        let out = bridge.transcode(&[0u8; 32], 10).unwrap();
        assert_eq!(out.size, 0);
    }
}
