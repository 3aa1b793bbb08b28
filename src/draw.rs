use rand::Rng;

use crate::framebuffer::Framebuffer;

/// Drawing capability handed to the per-frame draw callback. Coordinate,
/// radius and index parameters are rounded (not truncated) before use.
pub struct DrawContext<'a> {
    fb: &'a mut Framebuffer,
    pause_requested: bool,
}

impl<'a> DrawContext<'a> {
    pub fn new(fb: &'a mut Framebuffer) -> Self {
        Self {
            fb,
            pause_requested: false,
        }
    }

    pub fn width(&self) -> u32 {
        self.fb.width()
    }

    pub fn height(&self) -> u32 {
        self.fb.height()
    }

    pub fn pause(&mut self) {
        self.pause_requested = true;
    }

    pub fn pause_requested(&self) -> bool {
        self.pause_requested
    }

    pub fn clear(&mut self, index: f64) {
        self.fb.fill(round_index(index));
    }

    /// Uniform noise over the inclusive range `[round(min), round(max)]`.
    pub fn noise(&mut self, min: f64, max: f64) {
        let mut lo = round_index(min);
        let mut hi = round_index(max);
        if lo > hi {
            std::mem::swap(&mut lo, &mut hi);
        }
        let mut rng = rand::rng();
        for px in self.fb.pixels_mut() {
            *px = rng.random_range(lo..=hi);
        }
    }

    pub fn noise_of(&mut self, candidates: &[u8]) {
        if candidates.is_empty() {
            return;
        }
        let mut rng = rand::rng();
        for px in self.fb.pixels_mut() {
            *px = candidates[rng.random_range(0..candidates.len())];
        }
    }

    /// Writes `round(index)` at the rounded coordinates. Out-of-range
    /// coordinates are a no-op and return `false`.
    ///
    /// The bound is strictly exclusive on the right/bottom edge
    /// (`x >= width` rejects); see DESIGN.md for the boundary decision.
    pub fn set_pixel(&mut self, x: f64, y: f64, index: f64) -> bool {
        let (xi, yi) = (x.round() as i64, y.round() as i64);
        if !self.fb.contains(xi, yi) {
            return false;
        }
        self.fb.set(xi as u32, yi as u32, round_index(index));
        true
    }

    /// Raw index value at the rounded coordinates.
    ///
    /// Out-of-range reads are a contract violation and panic.
    pub fn get_pixel(&self, x: f64, y: f64) -> u8 {
        self.fb.get(x.round() as u32, y.round() as u32)
    }

    /// Midpoint circle outline. Points outside the framebuffer are dropped
    /// by `set_pixel`.
    pub fn circle(&mut self, cx: f64, cy: f64, radius: f64, index: f64) {
        let cx = cx.round();
        let cy = cy.round();
        let index = f64::from(round_index(index));

        let mut x = radius.round() as i64;
        let mut y = 0i64;
        let mut decision = 1 - x;

        while x >= y {
            let (xf, yf) = (x as f64, y as f64);
            self.set_pixel(cx + xf, cy + yf, index);
            self.set_pixel(cx - xf, cy + yf, index);
            self.set_pixel(cx + xf, cy - yf, index);
            self.set_pixel(cx - xf, cy - yf, index);
            self.set_pixel(cx + yf, cy + xf, index);
            self.set_pixel(cx - yf, cy + xf, index);
            self.set_pixel(cx + yf, cy - xf, index);
            self.set_pixel(cx - yf, cy - xf, index);

            y += 1;
            if decision < 0 {
                decision += 2 * y + 1;
            } else {
                x -= 1;
                decision += 2 * (y - x + 1);
            }
        }
    }
}

fn round_index(index: f64) -> u8 {
    index.round().clamp(0.0, 255.0) as u8
}
