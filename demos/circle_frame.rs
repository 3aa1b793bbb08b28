//! Renders one frame offscreen (concentric circles over noise, resolved
//! through a black-to-amber palette) and writes it to `circle_frame.png`.
//!
//! Run with: `cargo run --example circle_frame --features gpu`

use retrofb::{DrawContext, Framebuffer, Palette, Presenter as _, Rgba8, WgpuPresenter};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let (width, height) = (128u32, 128u32);
    let scale = 3.0;

    // 256-step ramp from black through amber.
    let colors: Vec<Rgba8> = (0..=255u16)
        .map(|i| {
            let v = i as u8;
            Rgba8::new(v, (u32::from(i) * 180 / 255) as u8, v / 6, 255)
        })
        .collect();
    let palette = Palette::from_colors(&colors)?;

    let mut fb = Framebuffer::new(width, height)?;
    {
        let mut ctx = DrawContext::new(&mut fb);
        ctx.noise(0.0, 40.0);
        let (cx, cy) = (f64::from(width) / 2.0, f64::from(height) / 2.0);
        for r in (6..60).step_by(9) {
            ctx.circle(cx, cy, f64::from(r), 255.0 - f64::from(r) * 2.0);
        }
    }

    let mut presenter = WgpuPresenter::offscreen(width, height, scale)?;
    presenter.present(&fb, &palette)?;
    let rgba = presenter.read_rgba()?;

    let out_w = (f64::from(width) * scale) as u32;
    let out_h = (f64::from(height) * scale) as u32;
    let img = image::RgbaImage::from_raw(out_w, out_h, rgba)
        .ok_or_else(|| anyhow::anyhow!("readback size mismatch"))?;
    img.save("circle_frame.png")?;
    println!("wrote circle_frame.png ({out_w}x{out_h})");
    Ok(())
}
