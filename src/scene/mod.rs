//! The node tree and the per-frame update that derives world state from it
//! (spec §3, §4.1): an [`arena::Arena`] owning every [`node::Node`], the
//! small [`dirty::DirtyBits`] set every setter touches, the enumerated
//! [`events::NodeEvent`]s a node can emit, 2×3 [`transform::Mat2x3`] math,
//! and [`cascade`], the dirty-cascade walk itself.

pub mod arena;
pub mod cascade;
pub mod dirty;
pub mod events;
pub mod node;
pub mod transform;

pub use arena::Arena;
pub use cascade::{update_cascade, BoundsTransition, CascadeOutcome, VisibleNode};
pub use dirty::DirtyBits;
pub use events::{EventKind, EventEmitter, NodeEvent, Listener};
pub use node::{
    AutosizeMode, BoundsState, Node, NodeId, ResizeMode, ShaderRef, TextureOptions, TextureRef,
    WorldRect, WorldState,
};
pub use transform::Mat2x3;
