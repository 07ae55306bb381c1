//! Render pipeline compilation. Clipping is an axis-aligned scissor rect
//! (spec §3 `clipping`), so a single always-pass pipeline is all any shader
//! needs — no stencil push/pop pass pair.

use crate::vertex::QuadVertex;
use wgpu::{BindGroup, BindGroupLayout, Device, RenderPipeline};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CanvasUniforms {
    pub canvas_size: [f32; 2],
    pub _padding: [f32; 2],
}

impl CanvasUniforms {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            canvas_size: [width, height],
            _padding: [0.0, 0.0],
        }
    }
}

pub fn create_uniform_bind_group_layout(device: &Device) -> BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("scenecore-uniform-bgl"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

pub fn create_texture_bind_group_layout(device: &Device) -> BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("scenecore-texture-bgl"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

/// Compiles the quad pipeline, binding the canvas-size uniform at group 0
/// and the texture/sampler pair at group 1.
pub fn create_quad_pipeline(
    device: &Device,
    surface_format: wgpu::TextureFormat,
) -> (CanvasUniforms, BindGroupLayout, BindGroupLayout, RenderPipeline) {
    let uniform_bgl = create_uniform_bind_group_layout(device);
    let texture_bgl = create_texture_bind_group_layout(device);

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("scenecore-quad-shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shaders/quad.wgsl").into()),
    });

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("scenecore-quad-pipeline-layout"),
        bind_group_layouts: &[&uniform_bgl, &texture_bgl],
        push_constant_ranges: &[],
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("scenecore-quad-pipeline"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[QuadVertex::layout()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    (
        CanvasUniforms::new(0.0, 0.0),
        uniform_bgl,
        texture_bgl,
        pipeline,
    )
}

pub fn create_uniform_bind_group(
    device: &Device,
    layout: &BindGroupLayout,
    uniforms: CanvasUniforms,
) -> BindGroup {
    use wgpu::util::DeviceExt;
    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("scenecore-canvas-uniform-buffer"),
        contents: bytemuck::cast_slice(&[uniforms]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("scenecore-canvas-uniform-bg"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
    })
}
