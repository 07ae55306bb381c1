//! Texture subsystem: content-addressed source cache, GPU storage, and the
//! background decode pool (spec §4.2, §5, §6).

pub mod compressed;
pub mod gpu;
pub mod manager;
pub mod source;
pub mod worker;

pub use gpu::GpuTextureStore;
pub use manager::{RequestOutcome, TextureManager};
pub use source::{TextureSource, TextureState};
