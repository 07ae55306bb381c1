//! Per-node shader properties (design notes §9: `ShaderProps` is a tagged
//! bundle, not a free-form uniform blob, so the batcher can decide
//! `can_batch` without inspecting shader internals).

use crate::color::Color;
use crate::stroke::Stroke;

/// Which built-in shader program a node is bound to, plus its static and
/// per-instance properties. Static props (the ones baked into the pipeline
/// variant, e.g. `RoundedRect`'s corner count) participate in the shader
/// cache key; per-instance props (uniform values) do not.
#[derive(Debug, Clone, PartialEq)]
pub enum ShaderProps {
    /// Plain textured/colored quad — the default when a node has no
    /// explicit shader.
    Quad,
    RoundedRect {
        radius_tl: f32,
        radius_tr: f32,
        radius_bl: f32,
        radius_br: f32,
        border: Stroke,
    },
    /// Linear gradient between two colors along an angle in radians.
    LinearGradient { from: Color, to: Color, angle: f32 },
    /// Soft drop shadow behind the quad.
    BoxShadow {
        color: Color,
        offset_x: f32,
        offset_y: f32,
        blur_radius: f32,
        spread: f32,
    },
    /// An externally registered custom shader, referenced by name.
    Custom { name: String, uniforms: Vec<f32> },
}

impl Default for ShaderProps {
    fn default() -> Self {
        ShaderProps::Quad
    }
}

impl ShaderProps {
    /// The part of the key that selects a pipeline variant: two nodes with
    /// the same static key can share a compiled pipeline and be batched
    /// together even if their per-instance uniforms differ.
    pub fn static_key(&self) -> String {
        match self {
            ShaderProps::Quad => "quad".to_string(),
            ShaderProps::RoundedRect { .. } => "rounded_rect".to_string(),
            ShaderProps::LinearGradient { .. } => "linear_gradient".to_string(),
            ShaderProps::BoxShadow { .. } => "box_shadow".to_string(),
            ShaderProps::Custom { name, .. } => format!("custom:{name}"),
        }
    }

    /// Two nodes with the same static key and equal per-instance
    /// properties can be merged into one batch (spec §4.4).
    pub fn can_batch_with(&self, other: &ShaderProps) -> bool {
        self.static_key() == other.static_key() && self == other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_and_rounded_rect_have_distinct_static_keys() {
        let quad = ShaderProps::Quad;
        let rr = ShaderProps::RoundedRect {
            radius_tl: 4.0,
            radius_tr: 4.0,
            radius_bl: 4.0,
            radius_br: 4.0,
            border: Stroke::default(),
        };
        assert_ne!(quad.static_key(), rr.static_key());
        assert!(!quad.can_batch_with(&rr));
    }

    #[test]
    fn identical_props_can_batch() {
        let a = ShaderProps::LinearGradient {
            from: Color::BLACK,
            to: Color::WHITE,
            angle: 0.0,
        };
        let b = a.clone();
        assert!(a.can_batch_with(&b));
    }

    #[test]
    fn differing_uniforms_cannot_batch() {
        let a = ShaderProps::LinearGradient {
            from: Color::BLACK,
            to: Color::WHITE,
            angle: 0.0,
        };
        let b = ShaderProps::LinearGradient {
            from: Color::BLACK,
            to: Color::WHITE,
            angle: 1.0,
        };
        assert!(!a.can_batch_with(&b));
    }
}
