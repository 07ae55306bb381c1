//! Border stroke properties, consumed by the rounded-rect/border shader
//! prop (spec §4.4 design notes: borders are shader-emulated, not
//! path-rasterized).
//!
//! # Examples
//!
//! ```
//! use scenecore::Color;
//! use scenecore::Stroke;
//!
//! let red_stroke = Stroke::new(2.0, Color::rgb(255, 0, 0));
//! let transparent_stroke = Stroke::default();
//!
//! assert!(!red_stroke.is_empty());
//! assert!(transparent_stroke.is_empty());
//! ```
use crate::Color;

/// A uniform-width border drawn around a node's quad.
#[derive(Clone, Debug, Copy, PartialEq, Default)]
pub struct Stroke {
    /// Width in logical pixels.
    pub width: f32,
    pub color: Color,
}

impl Stroke {
    /// `color` accepts `Color::TRANSPARENT` for a no-op border.
    #[inline]
    pub fn new(width: impl Into<f32>, color: impl Into<Color>) -> Self {
        Self {
            width: width.into(),
            color: color.into(),
        }
    }

    /// A stroke is empty if it has no width or is fully transparent — the
    /// batcher skips emitting border geometry for these.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.color == Color::TRANSPARENT
    }
}
