//! # scenecore
//!
//! A retained-mode 2D scene-graph renderer core for GPU-accelerated user
//! interfaces on resource-constrained devices (embedded set-top boxes,
//! smart TVs). Applications build a tree of [`Node`]s with colors,
//! textures, shaders, text, clipping, transforms and alpha; the [`Stage`]
//! drives a per-frame pipeline that steps animations, recomputes world
//! state, and hands a batched stream of textured quads to a [`Surface`].
//!
//! ## Core subsystems
//!
//! - **Scene graph** ([`scene`]) — the node tree and its dirty/update
//!   cascade (world transform, alpha, color, clipping, render bounds).
//! - **Texture manager** ([`texture`]) — a content-addressed, reference
//!   counted texture cache that enforces a GPU byte budget.
//! - **Quad batcher** ([`batch`]) — turns a frame's visible nodes into the
//!   minimum number of draw calls.
//! - **Animation engine** ([`animation`]) — time-stepped easing/interpolation
//!   of node properties, ticked off the same clock as rendering.
//!
//! ## Getting started
//!
//! ```no_run
//! use scenecore::{Color, Settings, Stage, TextureOptions, TextureSource};
//! use scenecore::surface::NullSurface;
//! use scenecore::texture::worker::ThreadPoolDecoder;
//!
//! let settings = Settings::builder()
//!     .app_width(1920)
//!     .app_height(1080)
//!     .build()
//!     .expect("valid settings");
//!
//! let mut stage = Stage::new(settings, NullSurface::new(), Box::new(ThreadPoolDecoder::new(2)))
//!     .expect("valid settings");
//!
//! let root = stage.root();
//! let node = stage.create_node(root).expect("root always exists");
//! {
//!     let n = stage.node_mut(node).unwrap();
//!     n.width = 200.0;
//!     n.height = 200.0;
//!     n.set_color(Color::rgb(0, 128, 255));
//! }
//! stage
//!     .set_texture(node, TextureSource::Color(0x0080ffff), TextureOptions::default())
//!     .unwrap();
//!
//! let report = stage.tick(16.0);
//! assert!(report.drew);
//! ```

pub mod animation;
pub mod batch;
pub mod color;
pub mod config;
pub mod debug_tools;
pub mod error;
pub mod frame;
pub mod id;
pub mod scene;
pub mod shader;
pub mod stage;
pub mod stroke;
pub mod surface;
pub mod text;
pub mod texture;
mod util;
pub mod vertex;

pub use color::Color;
pub use config::{BoundsMargin, Settings, SettingsBuilder, TextureMemorySettings};
pub use error::{CoreError, CoreResult, TextureLoadErrorKind};
pub use id::{AnimationId, FontId, ShaderId, TextureId};
pub use scene::{AutosizeMode, BoundsState, Node, NodeId, ResizeMode, TextureOptions, TextureRef};
pub use stage::{Stage, TickReport};
pub use stroke::Stroke;
pub use surface::Surface;
pub use texture::{TextureSource, TextureState};
