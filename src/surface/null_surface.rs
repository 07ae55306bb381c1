//! Headless `Surface` used by property tests that exercise the frame
//! pipeline without a GPU device: every call is recorded but nothing is
//! actually rendered.

use crate::batch::Batch;
use crate::color::Color;
use crate::id::TextureId;
use crate::surface::{RenderTarget, Surface};
use crate::texture::compressed::CompressedTexture;
use std::collections::HashSet;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NullSurfaceStats {
    pub draw_calls: u64,
    pub texture_uploads: u64,
    pub presents: u64,
    pub context_losses: u64,
}

/// Records what the frame pipeline asked it to do instead of talking to a
/// GPU, so a test can assert on call counts and draw order without
/// standing up a real adapter.
#[derive(Default)]
pub struct NullSurface {
    resident_textures: HashSet<TextureId>,
    current_target: Option<RenderTarget>,
    stats: NullSurfaceStats,
}

impl NullSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> NullSurfaceStats {
        self.stats
    }

    pub fn is_resident(&self, id: TextureId) -> bool {
        self.resident_textures.contains(&id)
    }
}

impl Surface for NullSurface {
    fn resize(&mut self, _physical_width: u32, _physical_height: u32) {}

    fn ensure_texture(&mut self, id: TextureId, _width: u32, _height: u32) {
        self.resident_textures.insert(id);
    }

    fn upload_texture(&mut self, id: TextureId, _width: u32, _height: u32, _data: &[u8]) {
        self.resident_textures.insert(id);
        self.stats.texture_uploads += 1;
    }

    fn upload_compressed_texture(
        &mut self,
        id: TextureId,
        _bytes: &[u8],
        _container: &CompressedTexture,
    ) {
        self.resident_textures.insert(id);
        self.stats.texture_uploads += 1;
    }

    fn free_texture(&mut self, id: TextureId) {
        self.resident_textures.remove(&id);
    }

    fn begin_frame(&mut self) {}

    fn begin_pass(&mut self, target: RenderTarget, _clear_color: Color) {
        self.current_target = Some(target);
    }

    fn draw_batch(&mut self, batch: &Batch) {
        if !batch.vertices.is_empty() {
            self.stats.draw_calls += 1;
        }
    }

    fn end_pass(&mut self) {
        self.current_target = None;
    }

    fn present(&mut self) {
        self.stats.presents += 1;
    }

    fn on_context_lost(&mut self) {
        self.resident_textures.clear();
        self.stats.context_losses += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchKey;
    use crate::shader::props::ShaderProps;

    fn empty_batch() -> Batch {
        Batch {
            key: BatchKey {
                shader_props: ShaderProps::Quad,
                texture_id: None,
                clip_rect: None,
            },
            vertices: vec![],
            indices: vec![],
        }
    }

    #[test]
    fn draw_batch_with_no_vertices_does_not_count_as_a_draw_call() {
        let mut surface = NullSurface::new();
        surface.begin_frame();
        surface.begin_pass(RenderTarget::Main, Color::TRANSPARENT);
        surface.draw_batch(&empty_batch());
        surface.end_pass();
        surface.present();
        assert_eq!(surface.stats().draw_calls, 0);
        assert_eq!(surface.stats().presents, 1);
    }

    #[test]
    fn context_loss_clears_resident_textures() {
        let mut surface = NullSurface::new();
        surface.ensure_texture(TextureId(1), 4, 4);
        assert!(surface.is_resident(TextureId(1)));
        surface.on_context_lost();
        assert!(!surface.is_resident(TextureId(1)));
    }
}
