//! wgpu implementation of the renderer backend

use std::borrow::Cow;
use std::sync::Arc;

use smallvec::SmallVec;
use wgpu::util::DeviceExt;
use winit::window::Window;

use super::backend::{DrawParams, RenderBackend, RenderError, SceneKind};
use super::geometry;
use super::resource::{GpuSlot, HandleTable};
use super::shader_cache::{
    ProgramId, ShaderCache, ShaderCompiler, ShaderError, ShaderStage, UniformLocation,
    VertexLayout,
};
use super::wgsl::{self, UniformDecls};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Uniform names the demo scenes feed
mod uniform {
    pub const TRANSFORM: &str = "u_transform";
    pub const INV_VIEW_PROJ: &str = "u_inv_view_proj";
    pub const TIME: &str = "u_time";
    pub const RESOLUTION: &str = "u_resolution";
    pub const CAMERA_POS: &str = "u_camera_pos";
}

// ============================================================================
// Programs
// ============================================================================

/// A compiled, unlinked stage
pub struct CompiledStage {
    module: wgpu::ShaderModule,
    uniforms: UniformDecls,
}

#[derive(Debug, Clone)]
struct ProgramUniform {
    name: String,
    binding: u32,
    size: u64,
}

struct Program {
    name: String,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: Option<wgpu::BindGroupLayout>,
    uniforms: Vec<ProgramUniform>,
}

static POS2_COLOR3_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x3];
static POS3_COLOR3_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];
static POS2_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

fn vertex_buffer_layout(layout: VertexLayout) -> wgpu::VertexBufferLayout<'static> {
    let (floats, attributes): (u64, &'static [wgpu::VertexAttribute]) = match layout {
        VertexLayout::Pos2Color3 => (5, &POS2_COLOR3_ATTRIBUTES),
        VertexLayout::Pos3Color3 => (6, &POS3_COLOR3_ATTRIBUTES),
        VertexLayout::Pos2 => (2, &POS2_ATTRIBUTES),
    };

    wgpu::VertexBufferLayout {
        array_stride: floats * std::mem::size_of::<f32>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes,
    }
}

/// Compiles WGSL against the current device.
///
/// Validation errors are captured with an error scope so a broken shader
/// becomes a [`ShaderError`] instead of an uncaptured device error.
struct WgpuCompiler<'a> {
    device: &'a wgpu::Device,
    format: wgpu::TextureFormat,
    programs: &'a mut HandleTable<Program>,
}

impl WgpuCompiler<'_> {
    fn capture<T>(&self, f: impl FnOnce(&wgpu::Device) -> T) -> Result<T, String> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f(self.device);
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(error) => Err(error.to_string()),
            None => Ok(value),
        }
    }
}

impl ShaderCompiler for WgpuCompiler<'_> {
    type Stage = CompiledStage;

    fn compile_stage(&mut self, stage: ShaderStage, source: &str) -> Result<CompiledStage, ShaderError> {
        let uniforms = wgsl::reflect_uniforms(source)
            .map_err(|message| ShaderError::Compile { stage, message })?;

        let label = format!("{stage} shader");
        let module = self
            .capture(|device| {
                device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(label.as_str()),
                    source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source)),
                })
            })
            .map_err(|message| ShaderError::Compile { stage, message })?;

        Ok(CompiledStage { module, uniforms })
    }

    fn link(
        &mut self,
        name: &str,
        vertex: CompiledStage,
        fragment: CompiledStage,
        layout: VertexLayout,
    ) -> Result<ProgramId, ShaderError> {
        let uniforms: Vec<ProgramUniform> = wgsl::merge(vertex.uniforms, &fragment.uniforms)
            .into_iter()
            .map(|decl| ProgramUniform {
                name: decl.name,
                binding: decl.binding,
                size: decl.size,
            })
            .collect();

        let entries: Vec<wgpu::BindGroupLayoutEntry> = uniforms
            .iter()
            .map(|u| wgpu::BindGroupLayoutEntry {
                binding: u.binding,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            })
            .collect();

        let fullscreen = layout == VertexLayout::Pos2;
        let format = self.format;

        let (pipeline, bind_group_layout) = self
            .capture(|device| {
                let bind_group_layout = (!entries.is_empty()).then(|| {
                    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                        label: Some(name),
                        entries: &entries,
                    })
                });
                let layouts: Vec<&wgpu::BindGroupLayout> = bind_group_layout.iter().collect();

                let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some(name),
                    bind_group_layouts: &layouts,
                    push_constant_ranges: &[],
                });

                let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(name),
                    layout: Some(&pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: &vertex.module,
                        entry_point: Some("vs_main"),
                        buffers: &[vertex_buffer_layout(layout)],
                        compilation_options: Default::default(),
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &fragment.module,
                        entry_point: Some("fs_main"),
                        targets: &[Some(wgpu::ColorTargetState {
                            format,
                            blend: Some(wgpu::BlendState::REPLACE),
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                        compilation_options: Default::default(),
                    }),
                    primitive: wgpu::PrimitiveState {
                        topology: wgpu::PrimitiveTopology::TriangleList,
                        front_face: wgpu::FrontFace::Ccw,
                        cull_mode: None,
                        ..Default::default()
                    },
                    depth_stencil: Some(wgpu::DepthStencilState {
                        format: DEPTH_FORMAT,
                        depth_write_enabled: !fullscreen,
                        depth_compare: if fullscreen {
                            wgpu::CompareFunction::Always
                        } else {
                            wgpu::CompareFunction::Less
                        },
                        stencil: wgpu::StencilState::default(),
                        bias: wgpu::DepthBiasState::default(),
                    }),
                    multisample: wgpu::MultisampleState::default(),
                    multiview: None,
                    cache: None,
                });

                (pipeline, bind_group_layout)
            })
            .map_err(ShaderError::Link)?;

        let handle = self.programs.insert(Program {
            name: name.to_owned(),
            pipeline,
            bind_group_layout,
            uniforms,
        });
        Ok(ProgramId::new(handle))
    }

    fn delete_program(&mut self, id: ProgramId) {
        if let Some(program) = self.programs.remove(id.raw()) {
            log::debug!("Deleted shader program '{}'", program.name);
        }
    }

    fn uniform_location(&self, id: ProgramId, name: &str) -> Option<UniformLocation> {
        self.programs
            .get(id.raw())?
            .uniforms
            .iter()
            .find(|u| u.name == name)
            .map(|u| UniformLocation(u.binding))
    }
}

// ============================================================================
// Scene resources
// ============================================================================

/// Uniform locations a scene writes each frame; `None` means the program
/// does not declare it and the update is skipped.
#[derive(Debug, Default, Clone, Copy)]
struct SceneUniforms {
    transform: Option<UniformLocation>,
    inv_view_proj: Option<UniformLocation>,
    time: Option<UniformLocation>,
    resolution: Option<UniformLocation>,
    camera_pos: Option<UniformLocation>,
}

fn float_bytes(values: &[f32]) -> Vec<u8> {
    bytemuck::cast_slice(values).to_vec()
}

/// Bytes destined for one uniform binding
#[derive(Debug, Clone, PartialEq)]
struct UniformWrite {
    location: UniformLocation,
    bytes: Vec<u8>,
}

impl SceneUniforms {
    /// Writes for the uniforms this scene resolved. Absent locations are
    /// skipped.
    fn writes(&self, params: &DrawParams) -> SmallVec<[UniformWrite; 5]> {
        let values: [(Option<UniformLocation>, Vec<u8>); 5] = [
            (
                self.transform,
                float_bytes(&params.model_view_projection().to_cols_array()),
            ),
            (
                self.inv_view_proj,
                float_bytes(&params.view_projection.inverse().to_cols_array()),
            ),
            (self.time, float_bytes(&[params.time])),
            (
                self.resolution,
                float_bytes(&[params.viewport.0 as f32, params.viewport.1 as f32]),
            ),
            (
                self.camera_pos,
                float_bytes(&params.camera_position.extend(0.0).to_array()),
            ),
        ];

        values
            .into_iter()
            .filter_map(|(location, bytes)| Some(UniformWrite { location: location?, bytes }))
            .collect()
    }
}

struct UniformBuffer {
    location: UniformLocation,
    buffer: GpuSlot<wgpu::Buffer>,
}

struct SceneResources {
    kind: SceneKind,
    program: ProgramId,
    vertex_buffer: GpuSlot<wgpu::Buffer>,
    index_buffer: GpuSlot<wgpu::Buffer>,
    uniform_buffers: Vec<UniformBuffer>,
    bind_group: GpuSlot<wgpu::BindGroup>,
    element_count: u32,
    uniforms: SceneUniforms,
}

impl SceneResources {
    fn upload(
        device: &wgpu::Device,
        kind: SceneKind,
        program_id: ProgramId,
        program: &Program,
        uniforms: SceneUniforms,
    ) -> Self {
        let (vertices, indices, element_count): (&[u8], Option<&[u8]>, u32) = match kind {
            SceneKind::Triangle => (
                bytemuck::cast_slice(&geometry::TRIANGLE_VERTICES),
                None,
                geometry::TRIANGLE_VERTICES.len() as u32,
            ),
            SceneKind::Cube => (
                bytemuck::cast_slice(&geometry::CUBE_VERTICES),
                Some(bytemuck::cast_slice(&geometry::CUBE_INDICES)),
                geometry::CUBE_INDICES.len() as u32,
            ),
            SceneKind::Raymarch => (
                bytemuck::cast_slice(&geometry::FULLSCREEN_TRIANGLE),
                None,
                geometry::FULLSCREEN_TRIANGLE.len() as u32,
            ),
        };

        let mut vertex_buffer = GpuSlot::empty("vertex buffer");
        vertex_buffer.set(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Scene Vertex Buffer"),
            contents: vertices,
            usage: wgpu::BufferUsages::VERTEX,
        }));

        let mut index_buffer = GpuSlot::empty("index buffer");
        if let Some(indices) = indices {
            index_buffer.set(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Scene Index Buffer"),
                contents: indices,
                usage: wgpu::BufferUsages::INDEX,
            }));
        }

        let buffers: Vec<(UniformLocation, wgpu::Buffer)> = program
            .uniforms
            .iter()
            .map(|u| {
                let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(u.name.as_str()),
                    size: u.size,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                (UniformLocation(u.binding), buffer)
            })
            .collect();

        let mut bind_group = GpuSlot::empty("bind group");
        if let Some(layout) = &program.bind_group_layout {
            let entries: Vec<wgpu::BindGroupEntry> = buffers
                .iter()
                .map(|(location, buffer)| wgpu::BindGroupEntry {
                    binding: location.0,
                    resource: buffer.as_entire_binding(),
                })
                .collect();
            bind_group.set(device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Scene Bind Group"),
                layout,
                entries: &entries,
            }));
        }

        let uniform_buffers = buffers
            .into_iter()
            .map(|(location, buffer)| {
                let mut slot = GpuSlot::empty("uniform buffer");
                slot.set(buffer);
                UniformBuffer {
                    location,
                    buffer: slot,
                }
            })
            .collect();

        Self {
            kind,
            program: program_id,
            vertex_buffer,
            index_buffer,
            uniform_buffers,
            bind_group,
            element_count,
            uniforms,
        }
    }

    fn write_uniforms(&self, queue: &wgpu::Queue, params: &DrawParams) {
        for write in self.uniforms.writes(params) {
            if let Some(buffer) = self
                .uniform_buffers
                .iter()
                .find(|u| u.location == write.location)
                .and_then(|u| u.buffer.get())
            {
                queue.write_buffer(buffer, 0, &write.bytes);
            }
        }
    }

    fn record(&self, pass: &mut wgpu::RenderPass<'_>, pipeline: &wgpu::RenderPipeline) {
        let Some(vertices) = self.vertex_buffer.get() else {
            return;
        };

        pass.set_pipeline(pipeline);
        if let Some(bind_group) = self.bind_group.get() {
            pass.set_bind_group(0, bind_group, &[]);
        }
        pass.set_vertex_buffer(0, vertices.slice(..));

        match self.index_buffer.get() {
            Some(indices) => {
                pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..self.element_count, 0, 0..1);
            }
            None => pass.draw(0..self.element_count, 0..1),
        }
    }

    fn release(&mut self) {
        self.bind_group.release();
        for uniform in &mut self.uniform_buffers {
            uniform.buffer.release();
        }
        self.index_buffer.release();
        self.vertex_buffer.release();
        self.element_count = 0;
    }
}

// ============================================================================
// Context
// ============================================================================

/// Surface and device for one window. Field order is drop order: the
/// surface goes before the window it was created from.
struct GpuContext {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth_view: wgpu::TextureView,
    window: Arc<Window>,
}

impl GpuContext {
    async fn new(window: Arc<Window>, width: u32, height: u32, vsync: bool) -> Result<Self, RenderError> {
        let (width, height) = (width.max(1), height.max(1));

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(Arc::clone(&window))
            .map_err(|e| RenderError::Surface(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::Adapter)?;

        log::info!("Using GPU: {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Blackhole Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| RenderError::Device(e.to_string()))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| RenderError::Surface("surface reports no formats".into()))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: if vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_view = create_depth_view(&device, width, height);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            depth_view,
            window,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_depth_view(&self.device, width, height);
    }
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });

    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

/// Acquire a frame, reconfiguring and retrying once if the surface was lost
/// or went stale.
fn acquire_with_retry<T>(
    mut acquire: impl FnMut() -> Result<T, wgpu::SurfaceError>,
    reconfigure: impl FnOnce(),
) -> Option<T> {
    let error = match acquire() {
        Ok(frame) => return Some(frame),
        Err(e @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
            log::debug!("Surface {e:?}, reconfiguring");
            reconfigure();
            match acquire() {
                Ok(frame) => return Some(frame),
                Err(e) => e,
            }
        }
        Err(e) => e,
    };
    log::error!("Surface error: {error:?}");
    None
}

// ============================================================================
// Backend
// ============================================================================

/// Renderer backend drawing through wgpu into a winit window.
pub struct WgpuBackend {
    vsync: bool,
    context: Option<GpuContext>,
    programs: HandleTable<Program>,
    scene: Option<SceneResources>,
}

impl WgpuBackend {
    /// Create a backend with no context yet
    pub fn new(vsync: bool) -> Self {
        Self {
            vsync,
            context: None,
            programs: HandleTable::new(),
            scene: None,
        }
    }

    /// The window the context draws into, if any
    pub fn window(&self) -> Option<&Arc<Window>> {
        self.context.as_ref().map(|ctx| &ctx.window)
    }
}

impl RenderBackend for WgpuBackend {
    type Window = Arc<Window>;

    fn create_context(&mut self, window: Arc<Window>, width: u32, height: u32) -> Result<(), RenderError> {
        if self.context.is_some() {
            return Ok(());
        }
        let context = pollster::block_on(GpuContext::new(window, width, height, self.vsync))?;
        self.context = Some(context);
        Ok(())
    }

    fn has_context(&self) -> bool {
        self.context.is_some()
    }

    fn init(&mut self, kind: SceneKind, shaders: &mut ShaderCache) -> Result<(), RenderError> {
        self.shutdown();

        let ctx = self.context.as_ref().ok_or(RenderError::NoContext)?;
        let (name, stages) = geometry::program_for(kind);
        let mut compiler = WgpuCompiler {
            device: &ctx.device,
            format: ctx.config.format,
            programs: &mut self.programs,
        };

        let program_id = shaders.get(&mut compiler, name, move || Ok(stages)).id();
        if !program_id.is_valid() {
            log::error!("Scene {kind:?} has no usable program '{name}'; frames will only clear");
            return Ok(());
        }

        let locate = |uniform: &str| {
            let location = compiler.uniform_location(program_id, uniform);
            if location.is_none() {
                log::warn!("Uniform '{uniform}' not found in program '{name}'");
            }
            location
        };
        let uniforms = match kind {
            SceneKind::Triangle | SceneKind::Cube => SceneUniforms {
                transform: locate(uniform::TRANSFORM),
                ..Default::default()
            },
            SceneKind::Raymarch => SceneUniforms {
                inv_view_proj: locate(uniform::INV_VIEW_PROJ),
                time: locate(uniform::TIME),
                resolution: locate(uniform::RESOLUTION),
                camera_pos: locate(uniform::CAMERA_POS),
                ..Default::default()
            },
        };

        let Some(program) = compiler.programs.get(program_id.raw()) else {
            log::error!("Program '{name}' is cached but not resident; frames will only clear");
            return Ok(());
        };
        let scene = SceneResources::upload(&ctx.device, kind, program_id, program, uniforms);

        log::info!("Initialized {kind:?} scene");
        self.scene = Some(scene);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if let Some(ctx) = self.context.as_mut() {
            ctx.resize(width, height);
            log::debug!("Resized surface to {width}x{height}");
        }
    }

    fn draw(&mut self, params: &DrawParams) {
        let Some(ctx) = self.context.as_ref() else {
            return;
        };

        let Some(output) = acquire_with_retry(
            || ctx.surface.get_current_texture(),
            || ctx.surface.configure(&ctx.device, &ctx.config),
        ) else {
            return;
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        let drawable = self
            .scene
            .as_ref()
            .filter(|_| params.draw_scene)
            .and_then(|scene| Some((scene, self.programs.get(scene.program.raw())?)));

        if let Some((scene, _)) = drawable {
            scene.write_uniforms(&ctx.queue, params);
        }

        {
            let [r, g, b, a] = params.clear_color;
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Frame Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &ctx.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some((scene, program)) = drawable {
                scene.record(&mut pass, &program.pipeline);
            }
        }

        ctx.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }

    fn shutdown(&mut self) {
        if let Some(mut scene) = self.scene.take() {
            scene.release();
            log::info!("Released {:?} scene resources", scene.kind);
        }
    }

    fn shutdown_shaders(&mut self, shaders: &mut ShaderCache) {
        match self.context.as_ref() {
            Some(ctx) => {
                let mut compiler = WgpuCompiler {
                    device: &ctx.device,
                    format: ctx.config.format,
                    programs: &mut self.programs,
                };
                shaders.shutdown(&mut compiler);
            }
            None => shaders.clear(),
        }
        self.programs.clear();
    }

    fn release_context(&mut self) {
        if let Some(ctx) = self.context.take() {
            drop(ctx);
            log::info!("Released GPU context and window");
        }
    }
}
