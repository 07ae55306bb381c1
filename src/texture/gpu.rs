//! GPU-side texture storage: allocation, upload and bind-group caching.
//! Adapted from the reference texture manager's `Arc<RwLock<HashMap<_>>>`
//! storage and sampler setup.

use crate::id::TextureId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Debug)]
pub enum GpuTextureError {
    NotFound(TextureId),
}

pub struct GpuTextureStore {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    sampler: Arc<wgpu::Sampler>,
    textures: RwLock<HashMap<TextureId, wgpu::Texture>>,
    /// Cached bind groups keyed by `(texture, bind group layout epoch)` so
    /// the batcher can reuse one across frames until the layout changes.
    bind_group_cache: RwLock<HashMap<(TextureId, u64), Arc<wgpu::BindGroup>>>,
}

impl GpuTextureStore {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        Self {
            device,
            queue,
            sampler: Arc::new(sampler),
            textures: RwLock::new(HashMap::new()),
            bind_group_cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn allocate(&self, id: TextureId, dimensions: (u32, u32)) {
        self.bind_group_cache
            .write()
            .unwrap()
            .retain(|(cached_id, _), _| *cached_id != id);

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("scenecore-texture"),
            size: wgpu::Extent3d {
                width: dimensions.0,
                height: dimensions.1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.textures.write().unwrap().insert(id, texture);
    }

    pub fn allocate_with_data(&self, id: TextureId, dimensions: (u32, u32), data: &[u8]) {
        self.allocate(id, dimensions);
        self.upload(id, dimensions, data).expect("just allocated");
    }

    /// Expects premultiplied-alpha RGBA8 bytes, matching the world-color
    /// cascade's own premultiplication (spec §4.1.c) — unpremultiplied
    /// source data produces dark fringing at partially transparent edges.
    pub fn upload(
        &self,
        id: TextureId,
        dimensions: (u32, u32),
        data: &[u8],
    ) -> Result<(), GpuTextureError> {
        let textures = self.textures.read().unwrap();
        let texture = textures.get(&id).ok_or(GpuTextureError::NotFound(id))?;
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * dimensions.0),
                rows_per_image: Some(dimensions.1),
            },
            wgpu::Extent3d {
                width: dimensions.0,
                height: dimensions.1,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    pub fn free(&self, id: TextureId) {
        self.textures.write().unwrap().remove(&id);
        self.bind_group_cache
            .write()
            .unwrap()
            .retain(|(cached_id, _), _| *cached_id != id);
    }

    pub fn is_loaded(&self, id: TextureId) -> bool {
        self.textures.read().unwrap().contains_key(&id)
    }

    /// A fresh view of `id`'s backing texture, used by RTT sub-passes that
    /// need to render directly into a node's own texture rather than
    /// sampling it.
    pub fn create_view(&self, id: TextureId) -> Result<wgpu::TextureView, GpuTextureError> {
        let textures = self.textures.read().unwrap();
        let texture = textures.get(&id).ok_or(GpuTextureError::NotFound(id))?;
        Ok(texture.create_view(&wgpu::TextureViewDescriptor::default()))
    }

    pub fn bind_group(
        &self,
        layout: &wgpu::BindGroupLayout,
        layout_epoch: u64,
        id: TextureId,
    ) -> Result<Arc<wgpu::BindGroup>, GpuTextureError> {
        if let Some(bg) = self
            .bind_group_cache
            .read()
            .unwrap()
            .get(&(id, layout_epoch))
            .cloned()
        {
            return Ok(bg);
        }

        let textures = self.textures.read().unwrap();
        let texture = textures.get(&id).ok_or(GpuTextureError::NotFound(id))?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = Arc::new(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scenecore-texture-bind-group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        }));
        self.bind_group_cache
            .write()
            .unwrap()
            .insert((id, layout_epoch), bind_group.clone());
        Ok(bind_group)
    }

    /// Drops every GPU resource, used on context loss (spec §6): the
    /// device/queue/sampler are being replaced wholesale by the caller.
    pub fn clear(&self) {
        self.textures.write().unwrap().clear();
        self.bind_group_cache.write().unwrap().clear();
    }
}
