//! Small color-normalization and GPU buffer-pooling helpers shared across
//! the renderer.

use wgpu::util::DeviceExt;

pub fn normalize_rgba_color(color: &[u8; 4]) -> [f32; 4] {
    [
        color[0] as f32 / 255.0,
        color[1] as f32 / 255.0,
        color[2] as f32 / 255.0,
        color[3] as f32 / 255.0,
    ]
}

/// Reuses same-sized GPU vertex/index buffers across frames instead of
/// allocating fresh ones every time the batcher writes its per-batch slabs
/// (spec §4.4: a batch is flushed by "uploading the vertex slab" every
/// frame, so the allocator churn would otherwise scale with batch count).
pub(crate) struct QuadBuffersPool {
    vertex_buffers: Vec<wgpu::Buffer>,
    index_buffers: Vec<wgpu::Buffer>,
}

impl QuadBuffersPool {
    pub(crate) fn new() -> Self {
        Self {
            vertex_buffers: Vec::new(),
            index_buffers: Vec::new(),
        }
    }

    pub(crate) fn get_vertex_buffer(&mut self, device: &wgpu::Device, size: usize) -> wgpu::Buffer {
        if let Some(buffer) = self.vertex_buffers.pop() {
            buffer
        } else {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("quad-batch-vertex-buffer"),
                size: size as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        }
    }

    pub(crate) fn get_index_buffer(&mut self, device: &wgpu::Device, indices: &[u32]) -> wgpu::Buffer {
        if let Some(buffer) = self.index_buffers.pop() {
            buffer
        } else {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("quad-batch-index-buffer"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            })
        }
    }

    pub(crate) fn return_vertex_buffer(&mut self, buffer: wgpu::Buffer) {
        self.vertex_buffers.push(buffer);
    }

    pub(crate) fn return_index_buffer(&mut self, buffer: wgpu::Buffer) {
        self.index_buffers.push(buffer);
    }
}

pub(crate) struct PoolManager {
    pub(crate) quad_buffers_pool: QuadBuffersPool,
}

impl PoolManager {
    pub(crate) fn new() -> Self {
        Self {
            quad_buffers_pool: QuadBuffersPool::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_rgba_color_divides_each_channel_by_255() {
        assert_eq!(normalize_rgba_color(&[0, 128, 255, 255]), [0.0, 128.0 / 255.0, 1.0, 1.0]);
    }
}
