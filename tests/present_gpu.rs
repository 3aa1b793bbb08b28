#[cfg(feature = "gpu")]
mod gpu {
    use retrofb::{Framebuffer, Palette, Presenter as _, RetrofbError, Rgba8, WgpuPresenter};

    fn offscreen(width: u32, height: u32, scale: f64) -> Option<WgpuPresenter> {
        match WgpuPresenter::offscreen(width, height, scale) {
            Ok(p) => Some(p),
            Err(RetrofbError::Gpu(msg)) if msg.contains("no gpu adapter") => {
                eprintln!("skipping: {msg}");
                None
            }
            Err(e) => panic!("presenter construction failed: {e}"),
        }
    }

    fn pixel(rgba: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * width + x) * 4) as usize;
        [rgba[i], rgba[i + 1], rgba[i + 2], rgba[i + 3]]
    }

    #[test]
    fn index_to_color_lookup_is_bit_exact() {
        let Some(mut presenter) = offscreen(16, 16, 1.0) else {
            return;
        };

        // Every index 0..=255 in a 16x16 buffer, distinctive palette.
        let colors: Vec<Rgba8> = (0..=255u16)
            .map(|i| Rgba8::new(i as u8, 255 - i as u8, (i as u8) ^ 0xA5, 255))
            .collect();
        let palette = Palette::from_colors(&colors).unwrap();
        let mut fb = Framebuffer::new(16, 16).unwrap();
        for y in 0..16u32 {
            for x in 0..16u32 {
                fb.set(x, y, (y * 16 + x) as u8);
            }
        }

        presenter.present(&fb, &palette).unwrap();
        let rgba = presenter.read_rgba().unwrap();

        for y in 0..16u32 {
            for x in 0..16u32 {
                let index = (y * 16 + x) as u8;
                let expect = palette.resolve(index);
                assert_eq!(
                    pixel(&rgba, 16, x, y),
                    [expect.r, expect.g, expect.b, expect.a],
                    "index {index} at ({x},{y})"
                );
            }
        }
    }

    #[test]
    fn default_framebuffer_resolves_to_entry_zero() {
        let Some(mut presenter) = offscreen(4, 4, 1.0) else {
            return;
        };

        let palette = Palette::from_colors(&[
            Rgba8::new(255, 0, 0, 255),
            Rgba8::new(0, 255, 0, 255),
        ])
        .unwrap();
        let mut fb = Framebuffer::new(4, 4).unwrap();
        fb.set(0, 0, 1);

        presenter.present(&fb, &palette).unwrap();
        let rgba = presenter.read_rgba().unwrap();

        assert_eq!(pixel(&rgba, 4, 0, 0), [0, 255, 0, 255]);
        for y in 0..4u32 {
            for x in 0..4u32 {
                if (x, y) == (0, 0) {
                    continue;
                }
                assert_eq!(pixel(&rgba, 4, x, y), [255, 0, 0, 255], "at ({x},{y})");
            }
        }
    }

    #[test]
    fn integer_scale_replicates_pixels_without_resampling() {
        let Some(mut presenter) = offscreen(2, 2, 2.0) else {
            return;
        };

        let palette = Palette::from_colors(&[
            Rgba8::new(10, 20, 30, 255),
            Rgba8::new(200, 100, 50, 255),
        ])
        .unwrap();
        let mut fb = Framebuffer::new(2, 2).unwrap();
        fb.set(1, 0, 1);

        presenter.present(&fb, &palette).unwrap();
        let rgba = presenter.read_rgba().unwrap();

        // Output is 4x4; each source pixel covers a 2x2 block.
        for y in 0..4u32 {
            for x in 0..4u32 {
                let src = fb.get(x / 2, y / 2);
                let expect = palette.resolve(src);
                assert_eq!(
                    pixel(&rgba, 4, x, y),
                    [expect.r, expect.g, expect.b, expect.a],
                    "at ({x},{y})"
                );
            }
        }
    }

    #[test]
    fn framebuffer_resize_recreates_the_index_texture() {
        let Some(mut presenter) = offscreen(4, 4, 1.0) else {
            return;
        };

        let palette = Palette::from_colors(&[
            Rgba8::new(1, 2, 3, 255),
            Rgba8::new(40, 50, 60, 255),
        ])
        .unwrap();
        let mut fb = Framebuffer::new(4, 4).unwrap();
        presenter.present(&fb, &palette).unwrap();

        fb.resize(8, 2).unwrap();
        fb.set(7, 1, 1);
        presenter.resize(8, 2, 1.0).unwrap();
        presenter.present(&fb, &palette).unwrap();

        let rgba = presenter.read_rgba().unwrap();
        assert_eq!(rgba.len(), 8 * 2 * 4);
        assert_eq!(pixel(&rgba, 8, 7, 1), [40, 50, 60, 255]);
        assert_eq!(pixel(&rgba, 8, 0, 0), [1, 2, 3, 255]);
    }
}
