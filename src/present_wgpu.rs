use crate::{
    error::{RetrofbError, RetrofbResult},
    framebuffer::Framebuffer,
    palette::{PALETTE_GRID, Palette},
    present::Presenter,
};

const SHADER: &str = r#"
struct VsIn {
  @location(0) pos: vec2<f32>,
  @location(1) uv: vec2<f32>,
};

struct VsOut {
  @builtin(position) pos: vec4<f32>,
  @location(0) uv: vec2<f32>,
};

@vertex
fn vs(in: VsIn) -> VsOut {
  var o: VsOut;
  o.pos = vec4<f32>(in.pos, 0.0, 1.0);
  o.uv = in.uv;
  return o;
}

@group(0) @binding(0) var t_screen: texture_2d<f32>;
@group(0) @binding(1) var s_screen: sampler;
@group(0) @binding(2) var t_palette: texture_2d<f32>;
@group(0) @binding(3) var s_palette: sampler;

@fragment
fn fs(in: VsOut) -> @location(0) vec4<f32> {
  // The screen texture holds raw palette indices in its single channel.
  // The +0.5 guards against unorm quantization landing just below the
  // integer before the floor.
  let index = floor(textureSample(t_screen, s_screen, in.uv).r * 255.0 + 0.5);
  let col = index % 16.0;
  let row = floor(index / 16.0);
  return textureSample(t_palette, s_palette, vec2<f32>(col, row) / 15.0);
}
"#;

// Full-viewport two-triangle strip, position then UV, matching the
// [-1,1]^2 quad with UVs in [0,1]^2 (v grows downward).
const QUAD_VERTICES: [f32; 16] = [
    -1.0, 1.0, 0.0, 0.0, //
    1.0, 1.0, 1.0, 0.0, //
    -1.0, -1.0, 0.0, 1.0, //
    1.0, -1.0, 1.0, 1.0, //
];

struct ScreenTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
    epoch: u64,
}

enum Target {
    Surface {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    Offscreen {
        texture: wgpu::Texture,
        view: wgpu::TextureView,
        width: u32,
        height: u32,
    },
}

/// GPU sync layer on wgpu: owns every GPU resource and presents the
/// framebuffer/palette pair as a single palette-resolved quad.
pub struct WgpuPresenter {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    quad: wgpu::Buffer,
    palette_texture: wgpu::Texture,
    palette_view: wgpu::TextureView,
    screen: Option<ScreenTexture>,
    target: Target,
    scale: f64,
}

impl WgpuPresenter {
    /// Presents into a window surface at `width * scale` by
    /// `height * scale` physical pixels.
    pub fn for_surface(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        scale: f64,
    ) -> RetrofbResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(target)
            .map_err(|e| RetrofbError::gpu(format!("wgpu create_surface failed: {e:?}")))?;
        let (adapter, device, queue) = request_device(&instance, Some(&surface))?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .unwrap_or(caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: scaled_extent(width, scale),
            height: scaled_extent(height, scale),
            present_mode: wgpu::PresentMode::AutoVsync,
            desired_maximum_frame_latency: 2,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        Self::with_target(device, queue, format, Target::Surface { surface, config }, scale)
    }

    /// Presents into an offscreen texture readable via [`read_rgba`].
    /// Intended for tests and headless rendering.
    ///
    /// [`read_rgba`]: WgpuPresenter::read_rgba
    pub fn offscreen(width: u32, height: u32, scale: f64) -> RetrofbResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let (_, device, queue) = request_device(&instance, None)?;
        let format = wgpu::TextureFormat::Rgba8Unorm;
        let target = offscreen_target(
            &device,
            scaled_extent(width, scale),
            scaled_extent(height, scale),
            format,
        );
        Self::with_target(device, queue, format, target, scale)
    }

    fn with_target(
        device: wgpu::Device,
        queue: wgpu::Queue,
        format: wgpu::TextureFormat,
        target: Target,
        scale: f64,
    ) -> RetrofbResult<Self> {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("retrofb_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let quad = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("retrofb_quad"),
            size: (QUAD_VERTICES.len() * 4) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut quad_bytes = [0u8; QUAD_VERTICES.len() * 4];
        for (i, v) in QUAD_VERTICES.iter().enumerate() {
            quad_bytes[i * 4..i * 4 + 4].copy_from_slice(&v.to_le_bytes());
        }
        queue.write_buffer(&quad, 0, &quad_bytes);

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("retrofb_bgl"),
                entries: &[
                    texture_entry(0),
                    sampler_entry(1),
                    texture_entry(2),
                    sampler_entry(3),
                ],
            });

        // Fail construction outright on shader or pipeline errors; a
        // half-initialized presenter is useless to the caller.
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("retrofb_shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER.into()),
        });
        if let Some(e) = pollster::block_on(device.pop_error_scope()) {
            return Err(RetrofbError::shader_compile(format!("{e}")));
        }

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("retrofb_pl"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("retrofb_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: 16,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &[
                        wgpu::VertexAttribute {
                            format: wgpu::VertexFormat::Float32x2,
                            offset: 0,
                            shader_location: 0,
                        },
                        wgpu::VertexAttribute {
                            format: wgpu::VertexFormat::Float32x2,
                            offset: 8,
                            shader_location: 1,
                        },
                    ],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });
        if let Some(e) = pollster::block_on(device.pop_error_scope()) {
            return Err(RetrofbError::shader_link(format!("{e}")));
        }

        let palette_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("retrofb_palette"),
            size: wgpu::Extent3d {
                width: PALETTE_GRID,
                height: PALETTE_GRID,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let palette_view = palette_texture.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
            sampler,
            quad,
            palette_texture,
            palette_view,
            screen: None,
            target,
            scale,
        })
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    fn ensure_screen_texture(&mut self, fb: &Framebuffer) {
        let stale = self
            .screen
            .as_ref()
            .map(|s| s.width != fb.width() || s.height != fb.height() || s.epoch != fb.epoch())
            .unwrap_or(true);
        if !stale {
            return;
        }

        tracing::debug!(
            width = fb.width(),
            height = fb.height(),
            epoch = fb.epoch(),
            "re-creating index texture"
        );
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("retrofb_screen"),
            size: wgpu::Extent3d {
                width: fb.width(),
                height: fb.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.screen = Some(ScreenTexture {
            texture,
            view,
            width: fb.width(),
            height: fb.height(),
            epoch: fb.epoch(),
        });
    }

    fn upload(&mut self, fb: &Framebuffer, palette: &Palette) -> RetrofbResult<()> {
        self.ensure_screen_texture(fb);
        let screen = self
            .screen
            .as_ref()
            .ok_or_else(|| RetrofbError::gpu("index texture not initialized"))?;

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &screen.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            fb.pixels(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(fb.width()),
                rows_per_image: Some(fb.height()),
            },
            wgpu::Extent3d {
                width: fb.width(),
                height: fb.height(),
                depth_or_array_layers: 1,
            },
        );

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.palette_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &palette.as_rgba_bytes(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(PALETTE_GRID * 4),
                rows_per_image: Some(PALETTE_GRID),
            },
            wgpu::Extent3d {
                width: PALETTE_GRID,
                height: PALETTE_GRID,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn draw_into(&self, view: &wgpu::TextureView) -> RetrofbResult<()> {
        let screen = self
            .screen
            .as_ref()
            .ok_or_else(|| RetrofbError::gpu("index texture not initialized"))?;
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("retrofb_bg"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&screen.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&self.palette_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("retrofb_encoder"),
            });
        {
            let mut rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("retrofb_rp"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rp.set_pipeline(&self.pipeline);
            rp.set_bind_group(0, &bind_group, &[]);
            rp.set_vertex_buffer(0, self.quad.slice(..));
            rp.draw(0..4, 0..1);
        }
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    /// Reads the presented frame back as tightly packed RGBA rows. Only
    /// available on offscreen targets.
    pub fn read_rgba(&self) -> RetrofbResult<Vec<u8>> {
        let Target::Offscreen {
            texture,
            width,
            height,
            ..
        } = &self.target
        else {
            return Err(RetrofbError::gpu("readback requires an offscreen target"));
        };

        let bytes_per_row = align_to(width * 4, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("retrofb_readback"),
            size: u64::from(bytes_per_row) * u64::from(*height),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("retrofb_readback_encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(*height),
                },
            },
            wgpu::Extent3d {
                width: *width,
                height: *height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));

        let buffer_slice = readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| RetrofbError::gpu(format!("wgpu poll failed: {e:?}")))?;
        rx.recv()
            .map_err(|_| RetrofbError::gpu("readback channel closed"))?
            .map_err(|e| RetrofbError::gpu(format!("readback map failed: {e:?}")))?;

        let mapped = buffer_slice.get_mapped_range();
        let row_bytes = *width as usize * 4;
        let mut out = Vec::with_capacity(row_bytes * *height as usize);
        for row in 0..*height as usize {
            let start = row * bytes_per_row as usize;
            out.extend_from_slice(&mapped[start..start + row_bytes]);
        }
        drop(mapped);
        readback.unmap();
        Ok(out)
    }
}

impl Presenter for WgpuPresenter {
    fn present(&mut self, fb: &Framebuffer, palette: &Palette) -> RetrofbResult<()> {
        self.upload(fb, palette)?;
        match &self.target {
            Target::Surface { surface, .. } => {
                let frame = surface
                    .get_current_texture()
                    .map_err(|e| RetrofbError::gpu(format!("surface frame unavailable: {e:?}")))?;
                let view = frame
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                self.draw_into(&view)?;
                frame.present();
            }
            Target::Offscreen { view, .. } => self.draw_into(view)?,
        }
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32, scale: f64) -> RetrofbResult<()> {
        self.scale = scale;
        let (pw, ph) = (scaled_extent(width, scale), scaled_extent(height, scale));
        match &mut self.target {
            Target::Surface { surface, config } => {
                config.width = pw;
                config.height = ph;
                surface.configure(&self.device, config);
            }
            Target::Offscreen { texture, .. } => {
                let format = texture.format();
                self.target = offscreen_target(&self.device, pw, ph, format);
            }
        }
        Ok(())
    }
}

fn request_device(
    instance: &wgpu::Instance,
    compatible_surface: Option<&wgpu::Surface<'_>>,
) -> RetrofbResult<(wgpu::Adapter, wgpu::Device, wgpu::Queue)> {
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface,
        force_fallback_adapter: false,
    }))
    .map_err(|e| match e {
        wgpu::RequestAdapterError::NotFound { .. } => RetrofbError::gpu("no gpu adapter available"),
        other => RetrofbError::gpu(format!("wgpu request_adapter failed: {other:?}")),
    })?;

    let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
        label: None,
        required_features: wgpu::Features::empty(),
        required_limits: wgpu::Limits::default(),
        experimental_features: wgpu::ExperimentalFeatures::default(),
        memory_hints: wgpu::MemoryHints::Performance,
        trace: wgpu::Trace::Off,
    }))
    .map_err(|e| RetrofbError::gpu(format!("wgpu request_device failed: {e:?}")))?;

    Ok((adapter, device, queue))
}

fn offscreen_target(device: &wgpu::Device, width: u32, height: u32, format: wgpu::TextureFormat) -> Target {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("retrofb_offscreen"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    Target::Offscreen {
        texture,
        view,
        width,
        height,
    }
}

fn scaled_extent(logical: u32, scale: f64) -> u32 {
    ((f64::from(logical) * scale).floor() as u32).max(1)
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

fn align_to(value: u32, alignment: u32) -> u32 {
    let mask = alignment - 1;
    (value + mask) & !mask
}
