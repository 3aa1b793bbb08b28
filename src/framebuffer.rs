use crate::error::{RetrofbError, RetrofbResult};

/// CPU-resident array of per-pixel palette indices, one byte per pixel,
/// row-major (`index = x + y * width`).
#[derive(Clone, Debug)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    epoch: u64, // bumped on every reallocation
}

impl Framebuffer {
    pub fn new(width: u32, height: u32) -> RetrofbResult<Self> {
        if width == 0 || height == 0 {
            return Err(RetrofbError::validation(
                "framebuffer dimensions must be > 0",
            ));
        }
        Ok(Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
            epoch: 0,
        })
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

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Reallocation epoch. The presenter re-creates the index texture
    /// whenever this moves.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Reallocates to `width * height` zeroed bytes and bumps the epoch,
    /// invalidating any GPU-side copy.
    pub fn resize(&mut self, width: u32, height: u32) -> RetrofbResult<()> {
        if width == 0 || height == 0 {
            return Err(RetrofbError::validation(
                "framebuffer dimensions must be > 0",
            ));
        }
        self.width = width;
        self.height = height;
        self.pixels = vec![0; width as usize * height as usize];
        self.epoch += 1;
        Ok(())
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as u64) < u64::from(self.width) && (y as u64) < u64::from(self.height)
    }

    /// Raw index value at `(x, y)`.
    ///
    /// Out-of-range reads are a contract violation and panic; callers are
    /// expected to stay inside `width x height`.
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.pixels[x as usize + y as usize * self.width as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, index: u8) {
        self.pixels[x as usize + y as usize * self.width as usize] = index;
    }

    pub fn fill(&mut self, index: u8) {
        self.pixels.fill(index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_zeroed() {
        let fb = Framebuffer::new(4, 3).unwrap();
        assert_eq!(fb.pixels().len(), 12);
        assert!(fb.pixels().iter().all(|&p| p == 0));
    }

    #[test]
    fn zero_dimension_is_rejected() {
        assert!(Framebuffer::new(0, 3).is_err());
        assert!(Framebuffer::new(3, 0).is_err());
        let mut fb = Framebuffer::new(2, 2).unwrap();
        assert!(fb.resize(0, 1).is_err());
    }

    #[test]
    fn indexing_is_row_major() {
        let mut fb = Framebuffer::new(3, 2).unwrap();
        fb.set(2, 1, 7);
        assert_eq!(fb.pixels()[2 + 3], 7);
        assert_eq!(fb.get(2, 1), 7);
    }

    #[test]
    fn resize_zeroes_and_bumps_epoch() {
        let mut fb = Framebuffer::new(2, 2).unwrap();
        fb.set(1, 1, 9);
        let before = fb.epoch();
        fb.resize(5, 4).unwrap();
        assert_eq!(fb.epoch(), before + 1);
        assert_eq!(fb.pixels().len(), 20);
        assert!(fb.pixels().iter().all(|&p| p == 0));
    }
}
