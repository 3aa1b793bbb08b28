use crate::error::{RetrofbError, RetrofbResult};

pub const PALETTE_SIZE: usize = 256;
pub const PALETTE_GRID: u32 = 16;

/// Straight (non-premultiplied) RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }
}

/// Fixed 256-entry RGBA lookup table, logically a 16x16 grid: framebuffer
/// value `i` maps to row `i / 16`, column `i % 16`. The presenter uploads
/// it unconditionally each frame, so replacements need no change tracking.
#[derive(Clone, Debug)]
pub struct Palette {
    entries: [Rgba8; PALETTE_SIZE],
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            entries: [Rgba8::transparent(); PALETTE_SIZE],
        }
    }
}

impl Palette {
    pub fn from_colors(colors: &[Rgba8]) -> RetrofbResult<Self> {
        let mut palette = Self::default();
        palette.fill_from(colors)?;
        Ok(palette)
    }

    /// Decodes an image and samples it as a 16x16 grid (cell centers,
    /// nearest), producing the 256 entries in row-major order.
    pub fn from_image_bytes(bytes: &[u8]) -> RetrofbResult<Self> {
        let dyn_img = image::load_from_memory(bytes)
            .map_err(|e| RetrofbError::asset_load(format!("decode palette image: {e}")))?;
        let rgba = dyn_img.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(RetrofbError::asset_load("palette image is empty"));
        }

        let mut palette = Self::default();
        for row in 0..PALETTE_GRID {
            for col in 0..PALETTE_GRID {
                // Center of grid cell (col, row), floored to a source texel.
                let sx = ((2 * col + 1) * width / (2 * PALETTE_GRID)).min(width - 1);
                let sy = ((2 * row + 1) * height / (2 * PALETTE_GRID)).min(height - 1);
                let px = rgba.get_pixel(sx, sy).0;
                palette.entries[(row * PALETTE_GRID + col) as usize] =
                    Rgba8::new(px[0], px[1], px[2], px[3]);
            }
        }
        Ok(palette)
    }

    /// Replaces the table with `colors`, zero-padding the unsupplied tail.
    /// More than 256 colors is a validation error.
    pub fn set_colors(&mut self, colors: &[Rgba8]) -> RetrofbResult<()> {
        self.fill_from(colors)
    }

    fn fill_from(&mut self, colors: &[Rgba8]) -> RetrofbResult<()> {
        if colors.len() > PALETTE_SIZE {
            return Err(RetrofbError::validation(format!(
                "palette accepts at most {PALETTE_SIZE} colors, got {}",
                colors.len()
            )));
        }
        self.entries = [Rgba8::transparent(); PALETTE_SIZE];
        self.entries[..colors.len()].copy_from_slice(colors);
        Ok(())
    }

    pub fn entries(&self) -> &[Rgba8; PALETTE_SIZE] {
        &self.entries
    }

    /// CPU-side definition of the index lookup the fragment stage performs:
    /// entry at row `index / 16`, column `index % 16`. The shader must agree
    /// bit-exactly.
    pub fn resolve(&self, index: u8) -> Rgba8 {
        self.entries[index as usize]
    }

    pub fn as_rgba_bytes(&self) -> [u8; PALETTE_SIZE * 4] {
        let mut out = [0u8; PALETTE_SIZE * 4];
        for (i, c) in self.entries.iter().enumerate() {
            out[i * 4] = c.r;
            out[i * 4 + 1] = c.g;
            out[i * 4 + 2] = c.b;
            out[i * 4 + 3] = c.a;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn short_input_pads_with_transparent_black() {
        let colors = [
            Rgba8::new(255, 0, 0, 255),
            Rgba8::new(0, 255, 0, 255),
            Rgba8::new(0, 0, 255, 255),
        ];
        let palette = Palette::from_colors(&colors).unwrap();
        assert_eq!(palette.entries()[..3], colors);
        assert!(
            palette.entries()[3..]
                .iter()
                .all(|&c| c == Rgba8::transparent())
        );
    }

    #[test]
    fn oversized_input_is_rejected() {
        let colors = vec![Rgba8::transparent(); PALETTE_SIZE + 1];
        assert!(Palette::from_colors(&colors).is_err());
    }

    #[test]
    fn resolve_uses_row_major_grid() {
        let mut colors = vec![Rgba8::transparent(); PALETTE_SIZE];
        // Entry 0x2B sits at row 2, column 11.
        colors[0x2B] = Rgba8::new(1, 2, 3, 4);
        let palette = Palette::from_colors(&colors).unwrap();
        assert_eq!(palette.resolve(0x2B), Rgba8::new(1, 2, 3, 4));
        let grid_index = (0x2B / 16) * 16 + (0x2B % 16);
        assert_eq!(palette.entries()[grid_index], Rgba8::new(1, 2, 3, 4));
    }

    #[test]
    fn set_colors_replaces_the_whole_table() {
        let mut palette = Palette::from_colors(&[Rgba8::new(1, 1, 1, 1); 4]).unwrap();
        palette.set_colors(&[Rgba8::new(9, 9, 9, 9)]).unwrap();
        assert_eq!(palette.resolve(0), Rgba8::new(9, 9, 9, 9));
        assert_eq!(palette.resolve(1), Rgba8::transparent());
        assert_eq!(palette.resolve(3), Rgba8::transparent());
    }

    #[test]
    fn from_image_bytes_samples_sixteen_square_exactly() {
        let mut img = image::RgbaImage::new(16, 16);
        for y in 0..16 {
            for x in 0..16 {
                img.put_pixel(x, y, image::Rgba([x as u8, y as u8, 0, 255]));
            }
        }
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();

        let palette = Palette::from_image_bytes(&buf).unwrap();
        for i in 0..PALETTE_SIZE {
            let (col, row) = (i as u8 % 16, i as u8 / 16);
            assert_eq!(palette.entries()[i], Rgba8::new(col, row, 0, 255));
        }
    }

    #[test]
    fn from_image_bytes_rejects_garbage() {
        let err = Palette::from_image_bytes(b"not an image").unwrap_err();
        assert!(err.to_string().contains("asset load error:"));
    }
}
