//! Crate-wide error type (spec §7).

use thiserror::Error;

/// Errors surfaced by the core. Recoverable kinds (texture/shader failures)
/// are also reported as events on the owning node/source per spec §7's
/// propagation policy; this type is what bubbles out of fallible calls that
/// fail synchronously (tree mutation, registry lookups, config validation).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("operation would create an invalid tree: {0}")]
    InvalidTree(String),

    #[error("unknown texture kind: {0}")]
    UnknownTextureKind(String),

    #[error("unknown shader: {0}")]
    UnknownShader(String),

    #[error("unknown font: {0}")]
    UnknownFont(String),

    #[error("texture load failed ({kind:?}): {message}")]
    TextureLoad {
        kind: TextureLoadErrorKind,
        message: String,
    },

    #[error("GPU allocation failed for texture {texture_id} after retry")]
    GpuAllocFailed { texture_id: u64 },

    #[error("shader compile failed: {0}")]
    ShaderCompileFailed(String),

    #[error("shader link failed: {0}")]
    ShaderLinkFailed(String),

    #[error("animation targets a destroyed node")]
    AnimationOnDestroyed,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureLoadErrorKind {
    Network,
    Decode,
    Format,
    Dimensions,
}

pub type CoreResult<T> = Result<T, CoreError>;
