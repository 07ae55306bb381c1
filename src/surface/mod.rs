//! The abstract GPU surface seam (spec §6 "Surface abstraction"): the rest
//! of the core (the frame pipeline, the texture/shader managers) only ever
//! drives a [`Surface`], never `wgpu` directly, so a headless
//! [`null_surface::NullSurface`] can stand in for a real
//! [`wgpu_surface::WgpuSurface`] in property tests that have no GPU device.

pub mod null_surface;
pub mod wgpu_surface;

pub use null_surface::NullSurface;
pub use wgpu_surface::WgpuSurface;

use crate::batch::Batch;
use crate::color::Color;
use crate::id::TextureId;
use crate::texture::compressed::CompressedTexture;

/// Which render target a pass draws into: the swapchain/window surface, or
/// one node's offscreen texture (spec §4.3 "RTT sub-passes").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    Main,
    Texture(TextureId),
}

/// The surface's entire contract with the rest of the core. A `Surface`
/// owns device/queue-equivalent state and is driven once per frame: one
/// `begin_frame`, any number of render-target passes, one `present`.
pub trait Surface {
    fn resize(&mut self, physical_width: u32, physical_height: u32);

    /// Allocates (or reallocates) backing storage for `id` at the given
    /// pixel size. Uploads happen separately via `upload_texture`.
    fn ensure_texture(&mut self, id: TextureId, width: u32, height: u32);

    /// Uploads premultiplied RGBA8 bytes into an already-`ensure_texture`d
    /// slot (spec §4.2, §6).
    fn upload_texture(&mut self, id: TextureId, width: u32, height: u32, data: &[u8]);

    /// Uploads a parsed compressed container's mip chain directly from the
    /// original file bytes, skipping the CPU RGBA8 path (spec §6
    /// `compressedUploadTexture`).
    fn upload_compressed_texture(&mut self, id: TextureId, bytes: &[u8], container: &CompressedTexture);

    fn free_texture(&mut self, id: TextureId);

    fn begin_frame(&mut self);

    /// Starts a pass rendering into `target`, clearing it to `clear_color`.
    fn begin_pass(&mut self, target: RenderTarget, clear_color: Color);

    /// Draws one batch (the unit the quad batcher produces) into the pass
    /// started by the last `begin_pass`.
    fn draw_batch(&mut self, batch: &Batch);

    fn end_pass(&mut self);

    /// Submits all passes recorded since `begin_frame` and presents the
    /// main target, if it was drawn to.
    fn present(&mut self);

    /// Drops every GPU resource without tearing down the `Surface` itself;
    /// the caller re-creates the device/queue and calls this before
    /// re-uploading everything (spec §7 context loss).
    fn on_context_lost(&mut self);
}
