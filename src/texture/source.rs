//! Texture source kinds and the cache key derived from each (spec §4.2).

use crate::error::TextureLoadErrorKind;

/// What a texture is decoded from. The cache key function below is what
/// makes the manager content-addressed: two nodes requesting the same
/// `TextureSource` share one GPU allocation.
#[derive(Debug, Clone, PartialEq)]
pub enum TextureSource {
    /// Solid color swatch, keyed by its packed RGBA value.
    Color(u32),
    /// Encoded image bytes (PNG/JPEG/etc, sniffed by the `image` crate),
    /// keyed by a hash of the bytes.
    Image { bytes_hash: u64 },
    /// Procedural noise texture of the given dimensions and seed.
    Noise { width: u32, height: u32, seed: u64 },
    /// A sub-rectangle of an already-loaded texture.
    SubTexture {
        parent_key: String,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    /// The output of an RTT sub-pass rooted at the given node tag.
    RenderTexture { owner_tag: String },
    /// A compressed container (KTX/PVR/ASTC), keyed by a hash of the bytes.
    Compressed { bytes_hash: u64, container: String },
}

impl TextureSource {
    /// Content-address this source: identical sources across nodes collapse
    /// to the same cache entry (spec §4.2 "content-addressed cache").
    pub fn cache_key(&self) -> String {
        match self {
            TextureSource::Color(packed) => format!("color:{packed:08x}"),
            TextureSource::Image { bytes_hash } => format!("image:{bytes_hash:016x}"),
            TextureSource::Noise { width, height, seed } => {
                format!("noise:{width}x{height}:{seed:016x}")
            }
            TextureSource::SubTexture {
                parent_key,
                x,
                y,
                width,
                height,
            } => format!("sub:{parent_key}:{x},{y},{width}x{height}"),
            TextureSource::RenderTexture { owner_tag } => format!("rtt:{owner_tag}"),
            TextureSource::Compressed {
                bytes_hash,
                container,
            } => format!("compressed:{container}:{bytes_hash:016x}"),
        }
    }
}

/// Lifecycle of one cache entry, independent of how many nodes reference it
/// (spec §4.2's `Initial -> Loading -> Loaded|Failed -> Freed` state machine).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureState {
    Initial,
    Loading,
    Loaded,
    Failed,
    Freed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadFailure {
    pub kind: TextureLoadErrorKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_color_source_produces_same_key() {
        let a = TextureSource::Color(0xff0000ff);
        let b = TextureSource::Color(0xff0000ff);
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn different_images_produce_different_keys() {
        let a = TextureSource::Image { bytes_hash: 1 };
        let b = TextureSource::Image { bytes_hash: 2 };
        assert_ne!(a.cache_key(), b.cache_key());
    }
}
