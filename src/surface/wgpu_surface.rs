//! The real `Surface`: draws batches with `wgpu`, reusing the existing
//! [`crate::shader::manager::ShaderManager`] and
//! [`crate::texture::gpu::GpuTextureStore`] rather than duplicating their
//! caches.
//!
//! Clipping is always an axis-aligned node rect (spec §3 `clipping`), so a
//! scissor rect does the job; there's no stencil buffer or push/pop clip
//! pass pair, just the one content pipeline.

use crate::batch::{Batch, BatchKey};
use crate::color::Color;
use crate::id::TextureId;
use crate::shader::manager::ShaderManager;
use crate::shader::pipeline::CanvasUniforms;
use crate::shader::props::ShaderProps;
use crate::surface::{RenderTarget, Surface};
use crate::texture::compressed::CompressedTexture;
use crate::texture::gpu::GpuTextureStore;
use crate::util::PoolManager;
use std::collections::HashMap;
use std::sync::Arc;

struct TargetResources {
    uniform_bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
}

/// A batch's GPU-ready form, recorded by `draw_batch` and actually issued
/// by `end_pass` in one render pass (spec §4.4: the batcher already
/// guarantees minimal draw-call count, so the surface doesn't need to
/// open/close a pass per batch).
struct PendingDraw {
    pipeline: wgpu::RenderPipeline,
    texture_bind_group: Arc<wgpu::BindGroup>,
    clip_rect: Option<(u32, u32, u32, u32)>,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

pub struct WgpuSurface {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    shader_manager: ShaderManager,
    gpu_textures: GpuTextureStore,
    pools: PoolManager,

    main_view: Option<wgpu::TextureView>,
    main_resources: Option<TargetResources>,
    rtt_resources: HashMap<TextureId, TargetResources>,

    encoder: Option<wgpu::CommandEncoder>,
    current_target: Option<RenderTarget>,
    current_clear: Color,
    pending: Vec<PendingDraw>,
    white_texture_id: TextureId,
}

impl WgpuSurface {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>, surface_format: wgpu::TextureFormat) -> Self {
        let shader_manager = ShaderManager::new(device.clone(), surface_format);
        let gpu_textures = GpuTextureStore::new(device.clone(), queue.clone());
        // Reserved id for the 1x1 opaque-white fallback texture untextured
        // quads (plain colors, gradients) bind to.
        let white_texture_id = TextureId(u64::MAX);
        gpu_textures.allocate_with_data(white_texture_id, (1, 1), &[255, 255, 255, 255]);

        Self {
            device,
            queue,
            shader_manager,
            gpu_textures,
            pools: PoolManager::new(),
            main_view: None,
            main_resources: None,
            rtt_resources: HashMap::new(),
            encoder: None,
            current_target: None,
            current_clear: Color::TRANSPARENT,
            pending: Vec::new(),
            white_texture_id,
        }
    }

    /// Supplies this frame's swapchain view; called by the embedding
    /// application before asking the stage to render into `RenderTarget::Main`.
    pub fn set_main_view(&mut self, view: wgpu::TextureView, width: u32, height: u32) {
        self.main_view = Some(view);
        let needs_new = match &self.main_resources {
            Some(r) => r.width != width || r.height != height,
            None => true,
        };
        if needs_new {
            self.main_resources = Some(self.build_target_resources(width, height));
        }
    }

    fn build_target_resources(&self, width: u32, height: u32) -> TargetResources {
        let uniforms = CanvasUniforms::new(width as f32, height as f32);
        let layout = self.shader_manager.uniform_bind_group_layout(&ShaderProps::Quad);
        use wgpu::util::DeviceExt;
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("scenecore-target-uniform-buffer"),
            contents: bytemuck::cast_slice(&[uniforms]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let uniform_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scenecore-target-uniform-bg"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        TargetResources {
            uniform_bind_group,
            width,
            height,
        }
    }
}

impl Surface for WgpuSurface {
    fn resize(&mut self, physical_width: u32, physical_height: u32) {
        self.main_resources = Some(self.build_target_resources(physical_width, physical_height));
    }

    fn ensure_texture(&mut self, id: TextureId, width: u32, height: u32) {
        self.gpu_textures.allocate(id, (width, height));
        let resources = self.build_target_resources(width, height);
        self.rtt_resources.insert(id, resources);
    }

    fn upload_texture(&mut self, id: TextureId, width: u32, height: u32, data: &[u8]) {
        if !self.gpu_textures.is_loaded(id) {
            self.gpu_textures.allocate(id, (width, height));
        }
        let _ = self.gpu_textures.upload(id, (width, height), data);
    }

    fn upload_compressed_texture(&mut self, id: TextureId, bytes: &[u8], container: &CompressedTexture) {
        // Block-compressed upload paths are format-specific (PVRTC/ASTC/ETC
        // swizzling differs per GPU vendor extension); route through the
        // same upload path the mip 0 image would take rather than
        // duplicating `wgpu`'s compressed-format table here.
        if let Some(mip0) = container.mips.first() {
            let slice = &bytes[mip0.offset..mip0.offset + mip0.length];
            if !self.gpu_textures.is_loaded(id) {
                self.gpu_textures.allocate(id, (mip0.width, mip0.height));
            }
            let _ = self.gpu_textures.upload(id, (mip0.width, mip0.height), slice);
        }
    }

    fn free_texture(&mut self, id: TextureId) {
        self.gpu_textures.free(id);
        self.rtt_resources.remove(&id);
    }

    fn begin_frame(&mut self) {
        self.encoder = Some(self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("scenecore-frame-encoder"),
        }));
    }

    fn begin_pass(&mut self, target: RenderTarget, clear_color: Color) {
        self.current_target = Some(target);
        self.current_clear = clear_color;
        self.pending.clear();
    }

    fn draw_batch(&mut self, batch: &Batch) {
        if batch.vertices.is_empty() {
            return;
        }
        let BatchKey {
            shader_props,
            texture_id,
            clip_rect,
        } = &batch.key;

        let pipeline = self.shader_manager.content_pipeline(shader_props);
        let texture_bgl = self.shader_manager.texture_bind_group_layout(shader_props);
        let bound_texture = texture_id.unwrap_or(self.white_texture_id);
        let texture_bind_group = self
            .gpu_textures
            .bind_group(&texture_bgl, 0, bound_texture)
            .expect("texture must be uploaded before it is drawn");

        let vertex_bytes: &[u8] = bytemuck::cast_slice(&batch.vertices);
        let index_bytes: &[u8] = bytemuck::cast_slice(&batch.indices);
        let vertex_buffer = self.pools.quad_buffers_pool.get_vertex_buffer(&self.device, vertex_bytes.len());
        self.queue.write_buffer(&vertex_buffer, 0, vertex_bytes);
        let index_buffer = self.pools.quad_buffers_pool.get_index_buffer(&self.device, &batch.indices);
        self.queue.write_buffer(&index_buffer, 0, index_bytes);

        let clip_rect = clip_rect.map(|r| {
            (
                r.min_x.max(0.0) as u32,
                r.min_y.max(0.0) as u32,
                (r.max_x - r.min_x).max(0.0) as u32,
                (r.max_y - r.min_y).max(0.0) as u32,
            )
        });

        self.pending.push(PendingDraw {
            pipeline,
            texture_bind_group,
            clip_rect,
            vertex_buffer,
            index_buffer,
            index_count: batch.indices.len() as u32,
        });
    }

    fn end_pass(&mut self) {
        let target = self.current_target.take().expect("end_pass called without begin_pass");
        let resources = match target {
            RenderTarget::Main => self
                .main_resources
                .as_ref()
                .expect("set_main_view must be called before rendering to RenderTarget::Main"),
            RenderTarget::Texture(id) => self
                .rtt_resources
                .get(&id)
                .expect("ensure_texture must be called before rendering to an RTT target"),
        };
        let rtt_view = match target {
            RenderTarget::Texture(id) => Some(
                self.gpu_textures
                    .create_view(id)
                    .expect("ensure_texture must be called before rendering to an RTT target"),
            ),
            RenderTarget::Main => None,
        };
        let view = match &rtt_view {
            Some(view) => view,
            None => self.main_view.as_ref().expect("set_main_view was not called"),
        };
        let [r, g, b, a] = self.current_clear.normalize();
        let width = resources.width;
        let height = resources.height;

        let encoder = self.encoder.as_mut().expect("begin_frame was not called");
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scenecore-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: r as f64,
                        g: g as f64,
                        b: b as f64,
                        a: a as f64,
                    }),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);
        for draw in &self.pending {
            if let Some((x, y, w, h)) = draw.clip_rect {
                pass.set_scissor_rect(x, y, w.min(width.saturating_sub(x)), h.min(height.saturating_sub(y)));
            } else {
                pass.set_scissor_rect(0, 0, width, height);
            }
            pass.set_pipeline(&draw.pipeline);
            pass.set_bind_group(0, &resources.uniform_bind_group, &[]);
            pass.set_bind_group(1, draw.texture_bind_group.as_ref(), &[]);
            pass.set_vertex_buffer(0, draw.vertex_buffer.slice(..));
            pass.set_index_buffer(draw.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..draw.index_count, 0, 0..1);
        }
        drop(pass);

        for draw in self.pending.drain(..) {
            self.pools.quad_buffers_pool.return_vertex_buffer(draw.vertex_buffer);
            self.pools.quad_buffers_pool.return_index_buffer(draw.index_buffer);
        }
    }

    fn present(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            self.queue.submit(std::iter::once(encoder.finish()));
        }
        self.main_view = None;
    }

    fn on_context_lost(&mut self) {
        self.gpu_textures.clear();
        self.rtt_resources.clear();
        self.main_resources = None;
        self.main_view = None;
        self.encoder = None;
        self.pending.clear();
    }
}
