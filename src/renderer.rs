use std::{
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError, mpsc},
};

use crate::{
    draw::DrawContext,
    driver::FrameDriver,
    error::{RetrofbError, RetrofbResult},
    framebuffer::Framebuffer,
    palette::{Palette, Rgba8},
    present::Presenter,
};

pub const DEFAULT_SCALE: f64 = 3.0;

#[derive(Clone, Debug)]
pub struct RendererOptions {
    pub width: u32,
    pub height: u32,
    pub scale: f64,
    pub palette: Option<Vec<Rgba8>>,
}

impl RendererOptions {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            scale: DEFAULT_SCALE,
            palette: None,
        }
    }

    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn palette(mut self, colors: Vec<Rgba8>) -> Self {
        self.palette = Some(colors);
        self
    }
}

type DrawFn = dyn FnMut(&mut DrawContext<'_>) -> RetrofbResult<()>;

/// Handle to an in-flight palette image load. Loads are never cancelled.
pub struct PaletteLoad {
    rx: mpsc::Receiver<RetrofbResult<()>>,
}

impl PaletteLoad {
    /// Non-blocking check; `None` while the load is still in flight.
    pub fn poll(&self) -> Option<RetrofbResult<()>> {
        self.rx.try_recv().ok()
    }

    pub fn wait(self) -> RetrofbResult<()> {
        self.rx
            .recv()
            .map_err(|_| RetrofbError::asset_load("palette loader thread terminated"))?
    }
}

/// Ties the framebuffer, palette, draw callback and presenter together
/// into the per-frame loop.
pub struct Renderer {
    fb: Framebuffer,
    palette: Palette,
    presenter: Box<dyn Presenter>,
    draw: Box<DrawFn>,
    scale: f64,
    running: bool,
    pending_palette: Arc<Mutex<Option<Palette>>>,
}

impl Renderer {
    pub fn new(
        options: RendererOptions,
        mut presenter: Box<dyn Presenter>,
        draw: impl FnMut(&mut DrawContext<'_>) -> RetrofbResult<()> + 'static,
    ) -> RetrofbResult<Self> {
        if !(options.scale > 0.0) {
            return Err(RetrofbError::validation("scale must be > 0"));
        }
        let fb = Framebuffer::new(options.width, options.height)?;
        let palette = match &options.palette {
            Some(colors) => Palette::from_colors(colors)?,
            None => Palette::default(),
        };
        // The presenter may have been built at a different size/scale;
        // bring it in line with the options before the first frame.
        presenter.resize(options.width, options.height, options.scale)?;
        Ok(Self {
            fb,
            palette,
            presenter,
            draw: Box::new(draw),
            scale: options.scale,
            running: false,
            pending_palette: Arc::new(Mutex::new(None)),
        })
    }

    pub fn width(&self) -> u32 {
        self.fb.width()
    }

    pub fn height(&self) -> u32 {
        self.fb.height()
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn set_palette(&mut self, colors: &[Rgba8]) -> RetrofbResult<()> {
        self.palette.set_colors(colors)
    }

    /// Reallocates the framebuffer (contents reset to 0) and adjusts the
    /// presentation target. Framebuffer contents are never resampled.
    pub fn resize(&mut self, width: u32, height: u32, scale: f64) -> RetrofbResult<()> {
        if !(scale > 0.0) {
            return Err(RetrofbError::validation("scale must be > 0"));
        }
        self.fb.resize(width, height)?;
        self.scale = scale;
        self.presenter.resize(width, height, scale)
    }

    /// Runs the frame loop on `driver`. A no-op while already running, so
    /// no duplicate loops are spawned. A draw callback error stops the
    /// loop and propagates to the caller.
    pub fn start(&mut self, driver: &mut dyn FrameDriver) -> RetrofbResult<()> {
        if self.running {
            return Ok(());
        }
        self.running = true;
        let result = driver.run(&mut || self.frame());
        self.running = false;
        result
    }

    /// Stops scheduling further frames. Idempotent; a frame already
    /// dispatched still completes.
    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Produces one frame; returns whether the loop should keep running.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn frame(&mut self) -> RetrofbResult<bool> {
        self.apply_pending_palette();

        let mut ctx = DrawContext::new(&mut self.fb);
        (self.draw)(&mut ctx)?;
        if ctx.pause_requested() {
            self.running = false;
        }

        self.presenter.present(&self.fb, &self.palette)?;
        Ok(self.running)
    }

    /// Decodes an image on a background thread. On success the palette is
    /// replaced in full at the top of the next frame, so no partial
    /// palette is ever visible; on failure the renderer keeps the last
    /// valid palette and the handle carries the error to the caller.
    pub fn load_palette_from_image(&self, path: impl Into<PathBuf>) -> PaletteLoad {
        let path = path.into();
        let slot = Arc::clone(&self.pending_palette);
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || {
            let result = std::fs::read(&path)
                .map_err(|e| {
                    RetrofbError::asset_load(format!("read {}: {e}", path.display()))
                })
                .and_then(|bytes| Palette::from_image_bytes(&bytes));

            let outcome = match result {
                Ok(palette) => {
                    let mut pending = slot.lock().unwrap_or_else(PoisonError::into_inner);
                    *pending = Some(palette);
                    Ok(())
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "palette load failed, keeping last palette");
                    Err(e)
                }
            };
            let _ = tx.send(outcome);
        });

        PaletteLoad { rx }
    }

    fn apply_pending_palette(&mut self) {
        let mut pending = self
            .pending_palette
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(palette) = pending.take() {
            self.palette = palette;
        }
    }
}
