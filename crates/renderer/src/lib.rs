//! Renderer: wgpu device + surface, shader program, mesh and texture
//! resources, per-frame uniform upload and draw.
//! wgpu = 26.x, winit = 0.30.x

pub mod error;
pub mod mesh;
pub mod shader;
pub mod texture;
pub mod uniforms;

use std::{path::PathBuf, sync::Arc};

use asset::{DecodedImage, MeshStreams};
use corelib::{
    features::{NORMAL_MAP_SAMPLER, PipelineFeatures},
    transform::TransformState,
};
use glam::Vec3;
use wgpu::{
    CommandEncoderDescriptor, DepthBiasState, DepthStencilState, DeviceDescriptor, Extent3d,
    Features, Instance, InstanceDescriptor, Limits, LoadOp, Operations, PowerPreference,
    PresentMode, Queue, RenderPassColorAttachment, RenderPassDescriptor, RenderPipeline,
    RenderPipelineDescriptor, StoreOp, Surface, SurfaceConfiguration, SurfaceError,
    TextureDescriptor, TextureDimension, TextureFormat, TextureUsages, TextureView,
    TextureViewDescriptor,
};
use winit::{dpi::PhysicalSize, window::Window};

pub use error::{RenderError, RenderResult};
pub use mesh::GpuMesh;
pub use shader::{
    CompiledProgram, ShaderError, ShaderFailurePolicy, ShaderProgram, ShaderProgramBuilder,
    ShaderSources, UniformLocation,
};
pub use texture::{GpuTexture, TextureProfile};
pub use uniforms::{ProgramBindings, UniformBuffers};

const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

/// Everything the renderer needs to know up front.
#[derive(Clone, Debug)]
pub struct RendererConfig {
    pub backends: wgpu::Backends,
    pub features: PipelineFeatures,
    pub shader_dir: Option<PathBuf>,
    pub shader_policy: ShaderFailurePolicy,
    pub texture_profile: TextureProfile,
    pub clear_color: wgpu::Color,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            features: PipelineFeatures::default(),
            shader_dir: None,
            shader_policy: ShaderFailurePolicy::default(),
            texture_profile: TextureProfile::default(),
            clear_color: wgpu::Color {
                r: 0.0,
                g: 0.0,
                b: 0.4,
                a: 1.0,
            },
        }
    }
}

/// GPU state for one window.
///
/// Fields are declared in reverse acquisition order so that dropping the
/// renderer (normally or while unwinding a failed setup) releases the
/// pipeline first and the surface last.
pub struct Renderer {
    pipeline: Option<RenderPipeline>,
    bindings: Option<ProgramBindings>,
    uniforms: Option<UniformBuffers>,
    mesh: GpuMesh,
    textures: Vec<GpuTexture>,
    program: Option<ShaderProgram>,
    depth_view: TextureView,
    surface_config: SurfaceConfiguration,
    queue: Queue,
    device: wgpu::Device,
    surface: Surface<'static>,

    clear_color: wgpu::Color,
    width: u32,
    height: u32,
}

impl Renderer {
    /// Create the device, surface and every resource the pipeline needs.
    ///
    /// `images` are consumed in sampler order of the selected shader
    /// variant (diffuse first, then the normal map).
    pub async fn new(
        window: Arc<Window>,
        config: &RendererConfig,
        mesh: &MeshStreams,
        images: Vec<DecodedImage>,
    ) -> RenderResult<Self> {
        let PhysicalSize { width, height } = window.inner_size();
        let width = width.max(1);
        let height = height.max(1);
        let variant = config.features.variant();

        // Instance & surface
        let instance = Instance::new(&InstanceDescriptor {
            backends: config.backends,
            ..Default::default()
        });
        let surface: Surface<'static> = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        log::info!("Using adapter: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(&DeviceDescriptor {
                label: Some("Meshview Device"),
                required_features: Features::empty(),
                required_limits: Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: Default::default(),
                trace: Default::default(),
            })
            .await?;

        // Surface format (prefer sRGB)
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or(RenderError::NoSurfaceFormat)?;

        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: PresentMode::AutoVsync,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);
        let depth_view = create_depth_view(&device, &surface_config);

        // ==== Program ====
        let sources = ShaderSources::load(config.shader_dir.as_deref(), variant)?;
        let program = match build_program(&device, sources).await {
            Ok(program) => Some(program),
            Err(err) => match config.shader_policy {
                ShaderFailurePolicy::FailFast => return Err(err.into()),
                ShaderFailurePolicy::WarnAndContinue => {
                    log::error!("{err}");
                    log::warn!("Continuing without a shader program; the mesh will not be drawn");
                    None
                }
            },
        };

        // ==== Textures ====
        let sampler_names = variant.sampler_names();
        if images.len() != sampler_names.len() {
            return Err(RenderError::TextureCount {
                expected: sampler_names.len(),
                actual: images.len(),
            });
        }
        let mut textures = Vec::with_capacity(images.len());
        for (name, image) in sampler_names.iter().zip(images) {
            let format = if *name == NORMAL_MAP_SAMPLER {
                texture::DATA_FORMAT
            } else {
                texture::COLOR_FORMAT
            };
            textures.push(GpuTexture::upload(
                &device,
                &queue,
                image,
                config.texture_profile,
                format,
                name,
            )?);
        }

        // ==== Geometry ====
        let mesh = GpuMesh::upload(&device, mesh)?;

        // ==== Uniforms, bindings, pipeline ====
        let (uniforms, bindings, pipeline) = match &program {
            Some(program) => {
                mesh.check_inputs(program.vertex_inputs())?;
                let uniforms = UniformBuffers::new(&device, program);
                let named: Vec<(&str, &GpuTexture)> = textures
                    .iter()
                    .map(|t| (t.label(), t))
                    .collect();
                let bindings = ProgramBindings::new(&device, program, &uniforms, &named)?;
                let pipeline = create_pipeline(&device, program, &mesh, surface_format);
                (Some(uniforms), Some(bindings), Some(pipeline))
            }
            None => (None, None, None),
        };

        log::info!(
            "Renderer ready: {width}x{height}, {surface_format:?}, variant {variant:?}, {:?}",
            config.features
        );

        Ok(Self {
            pipeline,
            bindings,
            uniforms,
            mesh,
            textures,
            program,
            depth_view,
            surface_config,
            queue,
            device,
            surface,
            clear_color: config.clear_color,
            width,
            height,
        })
    }

    /// Diagnostics gathered while building the program, if it exists.
    pub fn shader_diagnostics(&self) -> &[String] {
        self.program
            .as_ref()
            .map(|program| program.diagnostics())
            .unwrap_or_default()
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Resize: reconfigure surface & recreate depth view.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.surface_config.width = self.width;
        self.surface_config.height = self.height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_view = create_depth_view(&self.device, &self.surface_config);
    }

    /// Upload this frame's uniforms, then clear, draw and present.
    pub fn render(
        &mut self,
        transform: &TransformState,
        light_position: Vec3,
    ) -> Result<(), SurfaceError> {
        if let Some(uniforms) = &self.uniforms {
            uniforms.set_mat4(&self.queue, uniforms::UNIFORM_MVP, &transform.mvp());
            uniforms.set_mat4(&self.queue, uniforms::UNIFORM_MODEL, &transform.model);
            uniforms.set_mat4(&self.queue, uniforms::UNIFORM_VIEW, &transform.view);
            uniforms.set_vec3(
                &self.queue,
                uniforms::UNIFORM_LIGHT_POSITION,
                light_position,
            );
        }

        let frame = self.surface.get_current_texture()?;
        let view = frame.texture.create_view(&Default::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("MainEncoder"),
            });

        {
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("MainPass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(self.clear_color),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if let (Some(pipeline), Some(bindings)) = (&self.pipeline, &self.bindings) {
                rpass.set_pipeline(pipeline);
                bindings.bind(&mut rpass);
                self.mesh.bind(&mut rpass);
                self.mesh.draw(&mut rpass);
            }
        }

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    pub fn is_surface_lost(err: &SurfaceError) -> bool {
        matches!(err, SurfaceError::Lost | SurfaceError::Outdated)
    }

    pub fn recreate_surface(&mut self) {
        self.resize(self.width, self.height);
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        log::info!("Releasing GPU resources");
        // Textures were acquired in order; release them newest first.
        self.textures.reverse();
    }
}

/// Compile, link and upload a program.
async fn build_program(
    device: &wgpu::Device,
    sources: ShaderSources,
) -> Result<ShaderProgram, ShaderError> {
    ShaderProgramBuilder::new(sources)
        .compile()?
        .create(device)
        .await
}

fn create_pipeline(
    device: &wgpu::Device,
    program: &ShaderProgram,
    mesh: &GpuMesh,
    surface_format: TextureFormat,
) -> RenderPipeline {
    let buffers = mesh.vertex_layouts();
    let targets = [Some(wgpu::ColorTargetState {
        format: surface_format,
        blend: Some(wgpu::BlendState::REPLACE),
        write_mask: wgpu::ColorWrites::ALL,
    })];
    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some(program.label()),
        layout: Some(program.pipeline_layout()),
        vertex: program.vertex_state(&buffers),
        fragment: Some(program.fragment_state(&targets)),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

/// Create a depth texture view matching the surface config.
fn create_depth_view(device: &wgpu::Device, sc: &SurfaceConfiguration) -> TextureView {
    let tex = device.create_texture(&TextureDescriptor {
        label: Some("DepthTex"),
        size: Extent3d {
            width: sc.width.max(1),
            height: sc.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    tex.create_view(&TextureViewDescriptor::default())
}
