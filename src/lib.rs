//! Interactive before/after image comparison.
//!
//! Two overlapping layers (the original image and a JPEG re-encode at a
//! selectable quality) are clipped by a split line that chases the pointer
//! with a damped animation. The numeric core ([`widget`], [`animate`],
//! [`input`]) writes all of its display effects through the [`render`]
//! boundary, so it runs and tests without a window; [`gpu`], [`ui`] and
//! [`app`] wire that core to a winit/wgpu frontend.

pub mod animate;
pub mod app;
pub mod codec;
pub mod gpu;
pub mod image_loader;
pub mod input;
pub mod layer;
pub mod render;
pub mod ui;
pub mod widget;
