use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result};

use crate::coords::PixelRect;

use super::driver::check_upload;
use super::{
    AttributeFormat, BlendMode, BufferId, GpuDriver, GpuError, ProgramDesc, ProgramId, ScalarKind,
    TextureId, Topology, UniformKind, UniformValue,
};

/// Initialization parameters for the headless wgpu driver.
///
/// Keep this structure stable and minimal. Add configuration flags only when a
/// concrete platform or backend requirement exists.
#[derive(Debug, Clone)]
pub struct WgpuDriverInit {
    /// Size of the offscreen color target in physical pixels.
    pub width: u32,
    pub height: u32,

    /// Format of the color target. Mask tiles are always `Rgba8Unorm`.
    pub target_format: wgpu::TextureFormat,

    /// Upper bound for the reported maximum texture dimension.
    ///
    /// `None` reports the adapter limit unchanged.
    pub max_texture_dimension: Option<u32>,

    pub power_preference: wgpu::PowerPreference,
}

impl Default for WgpuDriverInit {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            target_format: wgpu::TextureFormat::Rgba8Unorm,
            max_texture_dimension: None,
            power_preference: wgpu::PowerPreference::HighPerformance,
        }
    }
}

struct UniformSlot {
    kind: UniformKind,
    offset: u64,
}

struct WgpuProgram {
    label: String,
    module: wgpu::ShaderModule,
    vertex_entry: String,
    fragment_entry: String,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    /// `(name, location, format)` in declaration order; vertex buffer slot = index.
    attributes: Vec<(String, u32, AttributeFormat)>,
    uniforms: HashMap<String, UniformSlot>,
    uniform_data: Vec<u8>,
    uniform_buffer: Option<wgpu::Buffer>,
    texture_slots: u32,
    pipelines: HashMap<(BlendMode, Topology), wgpu::RenderPipeline>,
}

struct WgpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

struct WgpuBuffer {
    buffer: Option<wgpu::Buffer>,
    capacity: u64,
}

#[derive(Default)]
struct DrawState {
    program: Option<ProgramId>,
    textures: BTreeMap<u32, TextureId>,
    attributes: HashMap<u32, BufferId>,
    blend: BlendMode,
}

/// [`GpuDriver`] backed by wgpu, rendering into an offscreen target.
///
/// Every `draw_arrays` records and submits its own render pass. The target
/// is cleared once per [`begin_frame`](Self::begin_frame).
pub struct WgpuDriver {
    device: wgpu::Device,
    queue: wgpu::Queue,

    target: wgpu::Texture,
    target_view: wgpu::TextureView,
    target_format: wgpu::TextureFormat,

    sampler: wgpu::Sampler,
    max_texture_dimension: u32,

    next_id: u32,
    programs: HashMap<ProgramId, WgpuProgram>,
    textures: HashMap<TextureId, WgpuTexture>,
    buffers: HashMap<BufferId, WgpuBuffer>,

    state: DrawState,
    pending_clear: Option<wgpu::Color>,
}

impl WgpuDriver {
    /// Creates a driver without a window surface. Blocks on adapter/device acquisition.
    pub fn new_headless(init: WgpuDriverInit) -> Result<Self> {
        pollster::block_on(Self::new_headless_async(init))
    }

    pub async fn new_headless_async(init: WgpuDriverInit) -> Result<Self> {
        anyhow::ensure!(init.width > 0 && init.height > 0, "render target has zero size");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let limits = adapter.limits();
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("mosaic-engine device"),
                required_features: wgpu::Features::empty(),
                required_limits: limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let max_texture_dimension = init
            .max_texture_dimension
            .map_or(limits.max_texture_dimension_2d, |cap| cap.min(limits.max_texture_dimension_2d))
            .max(1);

        let (target, target_view) =
            create_target(&device, init.width, init.height, init.target_format);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("mosaic tile sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        log::debug!(
            "wgpu driver ready: {:?}, max texture {max_texture_dimension}",
            adapter.get_info().backend
        );

        Ok(Self {
            device,
            queue,
            target,
            target_view,
            target_format: init.target_format,
            sampler,
            max_texture_dimension,
            next_id: 1,
            programs: HashMap::new(),
            textures: HashMap::new(),
            buffers: HashMap::new(),
            state: DrawState::default(),
            pending_clear: None,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Offscreen color target that draws land in.
    pub fn target(&self) -> &wgpu::Texture {
        &self.target
    }

    pub fn target_view(&self) -> &wgpu::TextureView {
        &self.target_view
    }

    /// Reallocates the color target. Pipelines stay valid since the format is unchanged.
    pub fn resize_target(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let (target, view) = create_target(&self.device, width, height, self.target_format);
        self.target = target;
        self.target_view = view;
    }

    /// Requests a clear of the target before the next draw.
    pub fn begin_frame(&mut self, clear: wgpu::Color) {
        self.pending_clear = Some(clear);
    }

    fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn bind_attribute_impl(
        &mut self,
        name: &str,
        buffer: BufferId,
        format: AttributeFormat,
        integer: bool,
    ) -> Result<(), GpuError> {
        if !self.buffers.contains_key(&buffer) {
            return Err(GpuError::UnknownBuffer(buffer));
        }
        let id = self.state.program.ok_or(GpuError::NoProgramBound)?;
        let program = self.programs.get(&id).ok_or(GpuError::UnknownProgram(id))?;
        let (_, location, declared) = program
            .attributes
            .iter()
            .find(|(n, _, _)| n == name)
            .ok_or_else(|| GpuError::UnknownAttribute(name.to_string()))?;
        if declared.scalar.is_integral() != integer || *declared != format {
            return Err(GpuError::AttributePathMismatch { name: name.to_string(), integer });
        }
        self.state.attributes.insert(*location, buffer);
        Ok(())
    }
}

impl GpuDriver for WgpuDriver {
    fn max_texture_dimension(&self) -> u32 {
        self.max_texture_dimension
    }

    fn create_program(&mut self, desc: &ProgramDesc<'_>) -> Result<ProgramId, GpuError> {
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(desc.label),
            source: wgpu::ShaderSource::Wgsl(desc.wgsl.into()),
        });

        // Uniform block packed with WGSL alignment rules, in declaration order.
        let mut uniforms = HashMap::new();
        let mut cursor = 0u64;
        for u in desc.uniforms {
            let (align, size) = u.kind.layout();
            let offset = cursor.next_multiple_of(align);
            uniforms.insert(u.name.to_string(), UniformSlot { kind: u.kind, offset });
            cursor = offset + size;
        }
        let uniform_size = cursor.next_multiple_of(16);

        let mut entries = Vec::new();
        if uniform_size > 0 {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            });
        }
        for slot in 0..desc.texture_slots {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: 1 + 2 * slot,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: 2 + 2 * slot,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            });
        }

        let bind_group_layout = self.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(desc.label),
            entries: &entries,
        });
        let pipeline_layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(desc.label),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let uniform_buffer = (uniform_size > 0).then(|| {
            self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(desc.label),
                size: uniform_size,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });

        let program = ProgramId(self.alloc_id());
        self.programs.insert(
            program,
            WgpuProgram {
                label: desc.label.to_string(),
                module,
                vertex_entry: desc.vertex_entry.to_string(),
                fragment_entry: desc.fragment_entry.to_string(),
                bind_group_layout,
                pipeline_layout,
                attributes: desc
                    .attributes
                    .iter()
                    .map(|a| (a.name.to_string(), a.location, a.format))
                    .collect(),
                uniforms,
                uniform_data: vec![0; uniform_size as usize],
                uniform_buffer,
                texture_slots: desc.texture_slots,
                pipelines: HashMap::new(),
            },
        );
        Ok(program)
    }

    fn delete_program(&mut self, program: ProgramId) {
        if self.programs.remove(&program).is_some() && self.state.program == Some(program) {
            self.state.program = None;
        }
    }

    fn create_texture(&mut self, width: u32, height: u32) -> Result<TextureId, GpuError> {
        let max = self.max_texture_dimension;
        if width > max || height > max {
            return Err(GpuError::TextureTooLarge { width, height, max });
        }
        let id = TextureId(self.alloc_id());
        self.textures.insert(id, create_tile_texture(&self.device, width, height));
        Ok(id)
    }

    fn resize_texture(&mut self, texture: TextureId, width: u32, height: u32) -> Result<(), GpuError> {
        let max = self.max_texture_dimension;
        if width > max || height > max {
            return Err(GpuError::TextureTooLarge { width, height, max });
        }
        let slot = self.textures.get_mut(&texture).ok_or(GpuError::UnknownTexture(texture))?;
        *slot = create_tile_texture(&self.device, width, height);
        Ok(())
    }

    fn upload_texture(&mut self, texture: TextureId, region: PixelRect, rgba: &[u8]) -> Result<(), GpuError> {
        let tex = self.textures.get(&texture).ok_or(GpuError::UnknownTexture(texture))?;
        check_upload(region, tex.width, tex.height, rgba)?;
        if region.is_empty() {
            return Ok(());
        }
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &tex.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x: region.x, y: region.y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(region.width * 4),
                rows_per_image: Some(region.height),
            },
            wgpu::Extent3d {
                width: region.width,
                height: region.height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn delete_texture(&mut self, texture: TextureId) {
        if let Some(tex) = self.textures.remove(&texture) {
            tex.texture.destroy();
            self.state.textures.retain(|_, t| *t != texture);
        }
    }

    fn create_buffer(&mut self) -> Result<BufferId, GpuError> {
        let id = BufferId(self.alloc_id());
        self.buffers.insert(id, WgpuBuffer { buffer: None, capacity: 0 });
        Ok(id)
    }

    fn buffer_data(&mut self, buffer: BufferId, bytes: &[u8]) -> Result<(), GpuError> {
        let slot = self.buffers.get_mut(&buffer).ok_or(GpuError::UnknownBuffer(buffer))?;
        let capacity = (bytes.len() as u64).max(wgpu::COPY_BUFFER_ALIGNMENT).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);

        let gpu_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("mosaic vertex buffer"),
            size: capacity,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        if !bytes.is_empty() {
            if bytes.len() as u64 % wgpu::COPY_BUFFER_ALIGNMENT == 0 {
                self.queue.write_buffer(&gpu_buffer, 0, bytes);
            } else {
                let mut padded = bytes.to_vec();
                padded.resize(capacity as usize, 0);
                self.queue.write_buffer(&gpu_buffer, 0, &padded);
            }
        }
        if let Some(old) = slot.buffer.replace(gpu_buffer) {
            old.destroy();
        }
        slot.capacity = capacity;
        Ok(())
    }

    fn buffer_sub_data(&mut self, buffer: BufferId, offset: u64, bytes: &[u8]) -> Result<(), GpuError> {
        let slot = self.buffers.get(&buffer).ok_or(GpuError::UnknownBuffer(buffer))?;
        let len = bytes.len();
        if offset + len as u64 > slot.capacity {
            return Err(GpuError::BufferOverrun { offset, len, capacity: slot.capacity });
        }
        if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0 || len as u64 % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            return Err(GpuError::Misaligned { offset, len });
        }
        if let (Some(gpu_buffer), false) = (slot.buffer.as_ref(), bytes.is_empty()) {
            self.queue.write_buffer(gpu_buffer, offset, bytes);
        }
        Ok(())
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if let Some(slot) = self.buffers.remove(&buffer) {
            if let Some(b) = slot.buffer {
                b.destroy();
            }
            self.state.attributes.retain(|_, b| *b != buffer);
        }
    }

    fn use_program(&mut self, program: ProgramId) -> Result<(), GpuError> {
        if !self.programs.contains_key(&program) {
            return Err(GpuError::UnknownProgram(program));
        }
        if self.state.program != Some(program) {
            self.state.program = Some(program);
            self.state.attributes.clear();
            self.state.textures.clear();
        }
        Ok(())
    }

    fn bind_texture(&mut self, slot: u32, texture: TextureId) -> Result<(), GpuError> {
        if !self.textures.contains_key(&texture) {
            return Err(GpuError::UnknownTexture(texture));
        }
        self.state.textures.insert(slot, texture);
        Ok(())
    }

    fn bind_attribute(&mut self, name: &str, buffer: BufferId, format: AttributeFormat) -> Result<(), GpuError> {
        self.bind_attribute_impl(name, buffer, format, false)
    }

    fn bind_int_attribute(&mut self, name: &str, buffer: BufferId, format: AttributeFormat) -> Result<(), GpuError> {
        self.bind_attribute_impl(name, buffer, format, true)
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) -> Result<(), GpuError> {
        let id = self.state.program.ok_or(GpuError::NoProgramBound)?;
        let program = self.programs.get_mut(&id).ok_or(GpuError::UnknownProgram(id))?;
        let slot = program
            .uniforms
            .get(name)
            .ok_or_else(|| GpuError::UnknownUniform(name.to_string()))?;
        if slot.kind != value.kind() {
            return Err(GpuError::UniformKindMismatch(name.to_string()));
        }
        let bytes = value.bytes();
        let start = slot.offset as usize;
        program.uniform_data[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        self.state.blend = mode;
    }

    fn draw_arrays(&mut self, topology: Topology, first: u32, count: u32) -> Result<(), GpuError> {
        let id = self.state.program.ok_or(GpuError::NoProgramBound)?;
        let Self {
            device,
            queue,
            target_view,
            target_format,
            sampler,
            programs,
            textures,
            buffers,
            state,
            pending_clear,
            ..
        } = self;
        let program = programs.get_mut(&id).ok_or(GpuError::UnknownProgram(id))?;

        // Resolve every binding before touching the encoder.
        let mut vertex_buffers = Vec::with_capacity(program.attributes.len());
        for (name, location, _) in &program.attributes {
            let buffer_id = state
                .attributes
                .get(location)
                .ok_or_else(|| GpuError::AttributeUnbound(name.clone()))?;
            let buffer = buffers.get(buffer_id).ok_or(GpuError::UnknownBuffer(*buffer_id))?;
            match buffer.buffer.as_ref() {
                Some(b) => vertex_buffers.push(b),
                None => return Err(GpuError::AttributeUnbound(name.clone())),
            }
        }
        let mut texture_views = Vec::with_capacity(program.texture_slots as usize);
        for slot in 0..program.texture_slots {
            let tex_id = state.textures.get(&slot).ok_or(GpuError::TextureSlotUnbound(slot))?;
            let tex = textures.get(tex_id).ok_or(GpuError::UnknownTexture(*tex_id))?;
            texture_views.push(&tex.view);
        }

        if count == 0 {
            return Ok(());
        }

        let key = (state.blend, topology);
        if !program.pipelines.contains_key(&key) {
            let pipeline = build_pipeline(device, program, *target_format, state.blend, topology);
            program.pipelines.insert(key, pipeline);
        }
        let Some(pipeline) = program.pipelines.get(&key) else {
            return Ok(());
        };

        if let Some(ubo) = program.uniform_buffer.as_ref() {
            queue.write_buffer(ubo, 0, &program.uniform_data);
        }

        let mut entries = Vec::new();
        if let Some(ubo) = program.uniform_buffer.as_ref() {
            entries.push(wgpu::BindGroupEntry { binding: 0, resource: ubo.as_entire_binding() });
        }
        for (slot, view) in texture_views.iter().enumerate() {
            let slot = slot as u32;
            entries.push(wgpu::BindGroupEntry {
                binding: 1 + 2 * slot,
                resource: wgpu::BindingResource::TextureView(view),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: 2 + 2 * slot,
                resource: wgpu::BindingResource::Sampler(&*sampler),
            });
        }
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&program.label),
            layout: &program.bind_group_layout,
            entries: &entries,
        });

        let load = match pending_clear.take() {
            Some(color) => wgpu::LoadOp::Clear(color),
            None => wgpu::LoadOp::Load,
        };

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("mosaic draw encoder"),
        });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("mosaic draw pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &*target_view,
                    resolve_target: None,
                    ops: wgpu::Operations { load, store: wgpu::StoreOp::Store },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(0, &bind_group, &[]);
            for (slot, buffer) in vertex_buffers.iter().enumerate() {
                rpass.set_vertex_buffer(slot as u32, buffer.slice(..));
            }
            rpass.draw(first..first + count, 0..1);
        }
        queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}

fn create_target(
    device: &wgpu::Device,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("mosaic render target"),
        size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

fn create_tile_texture(device: &wgpu::Device, width: u32, height: u32) -> WgpuTexture {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("mosaic tile"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    WgpuTexture { texture, view, width, height }
}

fn vertex_format(format: AttributeFormat) -> wgpu::VertexFormat {
    use wgpu::VertexFormat as F;
    match (format.scalar, format.components) {
        (ScalarKind::Float, 1) => F::Float32,
        (ScalarKind::Float, 2) => F::Float32x2,
        (ScalarKind::Float, 3) => F::Float32x3,
        (ScalarKind::Float, _) => F::Float32x4,
        (ScalarKind::Uint, 1) => F::Uint32,
        (ScalarKind::Uint, 2) => F::Uint32x2,
        (ScalarKind::Uint, 3) => F::Uint32x3,
        (ScalarKind::Uint, _) => F::Uint32x4,
        (ScalarKind::Sint, 1) => F::Sint32,
        (ScalarKind::Sint, 2) => F::Sint32x2,
        (ScalarKind::Sint, 3) => F::Sint32x3,
        (ScalarKind::Sint, _) => F::Sint32x4,
    }
}

fn build_pipeline(
    device: &wgpu::Device,
    program: &WgpuProgram,
    format: wgpu::TextureFormat,
    blend: BlendMode,
    topology: Topology,
) -> wgpu::RenderPipeline {
    // One attribute per vertex buffer, mirroring the per-name binding model.
    let attrs: Vec<[wgpu::VertexAttribute; 1]> = program
        .attributes
        .iter()
        .map(|(_, location, f)| {
            [wgpu::VertexAttribute { format: vertex_format(*f), offset: 0, shader_location: *location }]
        })
        .collect();
    let layouts: Vec<wgpu::VertexBufferLayout<'_>> = program
        .attributes
        .iter()
        .zip(attrs.iter())
        .map(|((_, _, f), a)| wgpu::VertexBufferLayout {
            array_stride: f.byte_size(),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: a,
        })
        .collect();

    let blend = match blend {
        BlendMode::Replace => None,
        BlendMode::Alpha => Some(wgpu::BlendState::ALPHA_BLENDING),
    };
    let topology = match topology {
        Topology::Triangles => wgpu::PrimitiveTopology::TriangleList,
        Topology::Lines => wgpu::PrimitiveTopology::LineList,
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&program.label),
        layout: Some(&program.pipeline_layout),
        vertex: wgpu::VertexState {
            module: &program.module,
            entry_point: Some(&program.vertex_entry),
            compilation_options: Default::default(),
            buffers: &layouts,
        },
        fragment: Some(wgpu::FragmentState {
            module: &program.module,
            entry_point: Some(&program.fragment_entry),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}
