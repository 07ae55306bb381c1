//! The node type — the sole scene-graph entity (spec §3).

use crate::color::Color;
use crate::id::{ShaderId, TextureId};
use crate::scene::dirty::DirtyBits;
use crate::scene::events::EventEmitter;
use crate::scene::transform::Mat2x3;
use crate::shader::props::ShaderProps;
use slotmap::new_key_type;

new_key_type! {
    /// Arena key for a node. Stale keys (a destroyed node's old id) are
    /// rejected by the slotmap itself rather than aliasing a reused slot,
    /// which is what lets `destroy()` during traversal stay safe.
    pub struct NodeId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeMode {
    Cover,
    Contain,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureOptions {
    pub flip_x: bool,
    pub flip_y: bool,
    pub preload: bool,
    pub resize_mode: ResizeMode,
    /// Normalized clip point used by `resize_mode` to pick which part of an
    /// oversized source is kept (spec §3).
    pub clip_point: (f32, f32),
}

impl Default for TextureOptions {
    fn default() -> Self {
        Self {
            flip_x: false,
            flip_y: false,
            preload: false,
            resize_mode: ResizeMode::Cover,
            clip_point: (0.5, 0.5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureRef {
    pub texture_id: TextureId,
    pub options: TextureOptions,
}

#[derive(Debug, Clone)]
pub struct ShaderRef {
    pub shader_id: ShaderId,
    pub props: ShaderProps,
}

/// Resolved once per node's lifetime the first time autosize is enabled
/// (design notes §9: the source's single flag hides two behaviors).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutosizeMode {
    #[default]
    None,
    ToTexture,
    ToChildren,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundsState {
    #[default]
    OutOfBounds,
    InBounds,
    InViewport,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WorldRect {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl WorldRect {
    pub fn is_empty(&self) -> bool {
        self.max_x <= self.min_x || self.max_y <= self.min_y
    }

    pub fn intersect(&self, other: &WorldRect) -> WorldRect {
        WorldRect {
            min_x: self.min_x.max(other.min_x),
            min_y: self.min_y.max(other.min_y),
            max_x: self.max_x.min(other.max_x),
            max_y: self.max_y.min(other.max_y),
        }
    }

    pub fn intersects(&self, other: &WorldRect) -> bool {
        !self.intersect(other).is_empty()
    }

    pub fn area(&self) -> f32 {
        if self.is_empty() {
            0.0
        } else {
            (self.max_x - self.min_x) * (self.max_y - self.min_y)
        }
    }
}

/// Derived state rebuilt by the dirty cascade (spec §3 "Derived world state").
#[derive(Debug, Clone, Default)]
pub struct WorldState {
    pub matrix: Mat2x3,
    pub alpha: f32,
    /// Premultiplied RGBA per corner: tl, tr, bl, br.
    pub colors: [[f32; 4]; 4],
    pub clip_rect: WorldRect,
    pub clip_valid: bool,
    pub render_bounds: WorldRect,
    pub bounds_state: BoundsState,
}

impl Default for Mat2x3 {
    fn default() -> Self {
        Mat2x3::IDENTITY
    }
}

/// The sole scene-graph entity (spec §3).
pub struct Node {
    pub id: NodeId,
    pub tag: Option<String>,

    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,

    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub rotation: f32,
    pub pivot_x: f32,
    pub pivot_y: f32,
    pub mount_x: f32,
    pub mount_y: f32,

    pub color_tl: Color,
    pub color_tr: Color,
    pub color_bl: Color,
    pub color_br: Color,
    pub alpha: f32,

    pub texture: Option<TextureRef>,
    pub shader: Option<ShaderRef>,

    pub clipping: bool,
    pub z_index: f32,
    pub z_index_locked: bool,
    pub rtt: bool,
    pub autosize: bool,
    pub autosize_mode: AutosizeMode,

    pub dirty: DirtyBits,
    pub world: WorldState,

    pub(crate) events: EventEmitter,
    pub(crate) destroyed: bool,
}

impl Node {
    pub(crate) fn new(id: NodeId) -> Self {
        Self {
            id,
            tag: None,
            parent: None,
            children: Vec::new(),
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
            pivot_x: 0.5,
            pivot_y: 0.5,
            mount_x: 0.0,
            mount_y: 0.0,
            color_tl: Color::WHITE,
            color_tr: Color::WHITE,
            color_bl: Color::WHITE,
            color_br: Color::WHITE,
            alpha: 1.0,
            texture: None,
            shader: None,
            clipping: false,
            z_index: 0.0,
            z_index_locked: false,
            rtt: false,
            autosize: false,
            autosize_mode: AutosizeMode::None,
            dirty: DirtyBits::default(),
            world: WorldState {
                alpha: 1.0,
                ..Default::default()
            },
            events: EventEmitter::new(),
            destroyed: false,
        }
    }

    /// Sets all four corners to the same color in one call (spec §3).
    pub fn set_color(&mut self, color: Color) {
        if self.color_tl == color
            && self.color_tr == color
            && self.color_bl == color
            && self.color_br == color
        {
            return;
        }
        self.color_tl = color;
        self.color_tr = color;
        self.color_bl = color;
        self.color_br = color;
        self.dirty |= DirtyBits::WORLD_COLOR;
    }

    /// Coerces a malformed zIndex (non-finite) to 0, per spec §4.1 failure
    /// semantics.
    pub fn set_z_index(&mut self, value: f32) {
        let coerced = if value.is_finite() { value } else { 0.0 };
        if self.z_index == coerced {
            return;
        }
        self.z_index = coerced;
        self.dirty |= DirtyBits::ZINDEX;
    }

    pub fn events_mut(&mut self) -> &mut EventEmitter {
        &mut self.events
    }
}
