//! 2×3 affine matrix math for the world-transform cascade (spec §4.1.a).

/// Row-major 2×3 affine transform: `p' = (a*x + c*y + tx, b*x + d*y + ty)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat2x3 {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Mat2x3 {
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    pub fn translation(x: f32, y: f32) -> Self {
        Self {
            tx: x,
            ty: y,
            ..Self::IDENTITY
        }
    }

    pub fn rotation(radians: f32) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            tx: 0.0,
            ty: 0.0,
        }
    }

    pub fn scaling(sx: f32, sy: f32) -> Self {
        Self {
            a: sx,
            b: 0.0,
            c: 0.0,
            d: sy,
            tx: 0.0,
            ty: 0.0,
        }
    }

    /// `self ∘ other`: applies `other` first, then `self`.
    pub fn multiply(&self, other: &Mat2x3) -> Mat2x3 {
        Mat2x3 {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            tx: self.a * other.tx + self.c * other.ty + self.tx,
            ty: self.b * other.tx + self.d * other.ty + self.ty,
        }
    }

    pub fn apply_to_point(&self, p: (f32, f32)) -> (f32, f32) {
        (
            self.a * p.0 + self.c * p.1 + self.tx,
            self.b * p.0 + self.d * p.1 + self.ty,
        )
    }

    /// The local transform derived from a node's (mount, pivot, scale,
    /// rotation, position, size) per spec §4.1.a's exact decomposition:
    ///
    /// `translate(x−mountX·w, y−mountY·h) · translate(pivotX·w, pivotY·h) ·
    /// rotate · scale · translate(−pivotX·w, −pivotY·h)`
    #[allow(clippy::too_many_arguments)]
    pub fn from_node_props(
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        pivot_x: f32,
        pivot_y: f32,
        mount_x: f32,
        mount_y: f32,
        scale_x: f32,
        scale_y: f32,
        rotation: f32,
    ) -> Mat2x3 {
        let pivot_abs = (pivot_x * width, pivot_y * height);
        let anchor_translate = Mat2x3::translation(x - mount_x * width, y - mount_y * height);
        let pivot_forward = Mat2x3::translation(pivot_abs.0, pivot_abs.1);
        let rotate = Mat2x3::rotation(rotation);
        let scale = Mat2x3::scaling(scale_x, scale_y);
        let pivot_back = Mat2x3::translation(-pivot_abs.0, -pivot_abs.1);

        anchor_translate
            .multiply(&pivot_forward)
            .multiply(&rotate)
            .multiply(&scale)
            .multiply(&pivot_back)
    }

    /// Axis-aligned bounding box of `(0,0)-(w,h)` transformed through this
    /// matrix, used for both clip-rect and render-bounds computation.
    pub fn transform_rect_aabb(&self, width: f32, height: f32) -> (f32, f32, f32, f32) {
        let corners = [
            self.apply_to_point((0.0, 0.0)),
            self.apply_to_point((width, 0.0)),
            self.apply_to_point((width, height)),
            self.apply_to_point((0.0, height)),
        ];
        let min_x = corners.iter().map(|p| p.0).fold(f32::INFINITY, f32::min);
        let max_x = corners
            .iter()
            .map(|p| p.0)
            .fold(f32::NEG_INFINITY, f32::max);
        let min_y = corners.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
        let max_y = corners
            .iter()
            .map(|p| p.1)
            .fold(f32::NEG_INFINITY, f32::max);
        (min_x, min_y, max_x, max_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_leaves_points_unchanged() {
        assert_eq!(Mat2x3::IDENTITY.apply_to_point((3.0, 4.0)), (3.0, 4.0));
    }

    #[test]
    fn translation_moves_point() {
        let m = Mat2x3::translation(10.0, -5.0);
        assert_eq!(m.apply_to_point((1.0, 1.0)), (11.0, -4.0));
    }

    #[test]
    fn multiply_applies_right_operand_first() {
        let translate = Mat2x3::translation(10.0, 0.0);
        let scale = Mat2x3::scaling(2.0, 2.0);
        // scale first, then translate: (1,1) -> (2,2) -> (12,2)
        let m = translate.multiply(&scale);
        assert_eq!(m.apply_to_point((1.0, 1.0)), (12.0, 2.0));
    }

    #[test]
    fn rotation_quarter_turn_maps_x_axis_to_y_axis() {
        let m = Mat2x3::rotation(std::f32::consts::FRAC_PI_2);
        let (x, y) = m.apply_to_point((1.0, 0.0));
        assert!((x - 0.0).abs() < 1e-5);
        assert!((y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn from_node_props_with_no_rotation_or_scale_places_by_mount() {
        // A 100x50 node at (10, 20) with mount at its top-left stays put.
        let m = Mat2x3::from_node_props(10.0, 20.0, 100.0, 50.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0);
        assert_eq!(m.apply_to_point((0.0, 0.0)), (10.0, 20.0));
        assert_eq!(m.apply_to_point((100.0, 50.0)), (110.0, 70.0));
    }

    #[test]
    fn mount_center_shifts_origin_by_half_size() {
        let m = Mat2x3::from_node_props(10.0, 20.0, 100.0, 50.0, 0.0, 0.0, 0.5, 0.5, 1.0, 1.0, 0.0);
        // mountX/Y = 0.5 means (x,y) is the node's center.
        assert_eq!(m.apply_to_point((0.0, 0.0)), (10.0 - 50.0, 20.0 - 25.0));
    }

    #[test]
    fn transform_rect_aabb_of_identity_rect() {
        let aabb = Mat2x3::translation(10.0, 10.0).transform_rect_aabb(20.0, 30.0);
        assert_eq!(aabb, (10.0, 10.0, 30.0, 40.0));
    }
}
