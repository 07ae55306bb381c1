//! Shader/program management: interning compiled pipelines by their static
//! shape and caching per-instance uniform bundles (spec §4.4, design notes §9).

pub mod manager;
pub mod pipeline;
pub mod props;

pub use manager::ShaderManager;
pub use props::ShaderProps;
