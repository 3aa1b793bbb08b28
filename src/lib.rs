#![forbid(unsafe_code)]

//! Palette-indexed software framebuffer with GPU presentation.
//!
//! A CPU-side buffer of 8-bit palette indices is mutated by a per-frame
//! draw callback, uploaded as a single-channel texture, and resolved to
//! color on the GPU through a 16x16 palette lookup texture.

pub mod draw;
pub mod driver;
pub mod error;
pub mod framebuffer;
pub mod palette;
pub mod present;
#[cfg(feature = "gpu")]
pub mod present_wgpu;
pub mod renderer;

pub use draw::DrawContext;
pub use driver::{FrameDriver, ManualDriver};
pub use error::{RetrofbError, RetrofbResult};
pub use framebuffer::Framebuffer;
pub use palette::{PALETTE_GRID, PALETTE_SIZE, Palette, Rgba8};
pub use present::Presenter;
#[cfg(feature = "gpu")]
pub use present_wgpu::WgpuPresenter;
pub use renderer::{DEFAULT_SCALE, PaletteLoad, Renderer, RendererOptions};
