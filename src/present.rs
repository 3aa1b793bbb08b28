use crate::{error::RetrofbResult, framebuffer::Framebuffer, palette::Palette};

/// Seam between the CPU-side model and the GPU sync layer.
///
/// A presenter owns every GPU resource (index texture, palette texture,
/// pipeline, vertex buffer) and presents the framebuffer/palette pair as a
/// single shaded quad. Draw primitives never see these resources.
pub trait Presenter {
    /// Uploads both textures and issues the full-screen quad draw. Called
    /// unconditionally once per frame; implementations may add dirty
    /// tracking as long as observable output is unchanged.
    fn present(&mut self, fb: &Framebuffer, palette: &Palette) -> RetrofbResult<()>;

    /// Adjusts the presentation target for a new logical size and display
    /// scale. Framebuffer contents are never resampled; nearest-neighbor
    /// sampling at present time does the pixel scaling.
    fn resize(&mut self, width: u32, height: u32, scale: f64) -> RetrofbResult<()>;
}
