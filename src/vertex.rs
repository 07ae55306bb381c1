//! GPU vertex layouts shared by the quad batcher and the SDF text renderer.

use bytemuck::{Pod, Zeroable};

/// One corner of a batched quad.
///
/// Positions are already in normalized device coordinates by the time they
/// reach this struct — the batcher folds the world matrix and the
/// logical-to-NDC projection together on the CPU, the same way the
/// reference renderer's vertex-buffer builders do for image quads.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    /// Premultiplied RGBA in `0.0..=1.0`.
    pub color: [f32; 4],
    /// Index into the batch's bound texture array. Ignored by shaders that
    /// don't declare `supports_indexed_textures`.
    pub tex_index: u32,
}

impl QuadVertex {
    pub const ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x2,
        1 => Float32x2,
        2 => Float32x4,
        3 => Uint32,
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Vertex used by the offscreen RTT composite / effect fullscreen passes.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct TexturedVertex {
    pub position: [f32; 2],
    pub tex_coords: [f32; 2],
}

impl TexturedVertex {
    pub const ATTRS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Appends one quad (4 vertices, 6 indices) to the given slabs, the base
/// unit the batcher operates on (spec §4.4).
pub fn push_quad(
    vertices: &mut Vec<QuadVertex>,
    indices: &mut Vec<u32>,
    corners: [QuadVertex; 4],
) {
    let base = vertices.len() as u32;
    vertices.extend_from_slice(&corners);
    indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(p: [f32; 2]) -> QuadVertex {
        QuadVertex {
            position: p,
            uv: [0.0, 0.0],
            color: [1.0, 1.0, 1.0, 1.0],
            tex_index: 0,
        }
    }

    #[test]
    fn push_quad_appends_four_vertices_and_six_indices() {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        push_quad(
            &mut vertices,
            &mut indices,
            [
                v([0.0, 0.0]),
                v([1.0, 0.0]),
                v([1.0, 1.0]),
                v([0.0, 1.0]),
            ],
        );
        assert_eq!(vertices.len(), 4);
        assert_eq!(indices, vec![0, 1, 2, 0, 2, 3]);

        push_quad(
            &mut vertices,
            &mut indices,
            [
                v([2.0, 0.0]),
                v([3.0, 0.0]),
                v([3.0, 1.0]),
                v([2.0, 1.0]),
            ],
        );
        assert_eq!(vertices.len(), 8);
        assert_eq!(&indices[6..], &[4, 5, 6, 4, 6, 7]);
    }
}
