//! The dirty cascade: one depth-first walk of the tree that rebuilds every
//! node's derived world state from its local properties and its parent's
//! already-rebuilt state (spec §4.1).
//!
//! Quantities are only recomputed when the node's own dirty bits, or a bit
//! forced down from an ancestor that just recomputed the same quantity,
//! say they must be. An unchanged tree therefore walks every node (the
//! traversal itself is O(n)) but recomputes nothing, which is what lets two
//! back-to-back frames with no property changes produce identical output
//! (spec §8 property 4).

use crate::config::BoundsMargin;
use crate::scene::arena::Arena;
use crate::scene::dirty::DirtyBits;
use crate::scene::node::{BoundsState, NodeId, WorldRect};
use crate::scene::transform::Mat2x3;
use std::collections::HashMap;

/// One node queued for the batcher, carrying the effective zIndex it was
/// sorted by (spec §4.1 step 2: a `zIndexLocked` ancestor overrides a
/// descendant's own zIndex for sorting purposes only).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleNode {
    pub node_id: NodeId,
    pub effective_z_index: f32,
    /// Traversal order, used as the stable tiebreaker for equal z (spec §4.4
    /// input: "stable for equal keys by traversal order").
    pub traversal_order: u32,
}

/// A `bounds_state` transition recorded during this cascade, used by the
/// caller to emit the corresponding node event and adjust the owning
/// texture's active-owner count (spec §4.1 step 1.e).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundsTransition {
    pub node_id: NodeId,
    pub from: BoundsState,
    pub to: BoundsState,
}

#[derive(Debug, Default)]
pub struct CascadeOutcome {
    pub visible: Vec<VisibleNode>,
    pub bounds_transitions: Vec<BoundsTransition>,
    /// True if anything in the tree actually changed this frame; the frame
    /// pipeline's idle check is keyed off this (spec §4.3 step 4).
    pub any_dirty: bool,
}

/// Ancestor state threaded down the walk; this is the "parent's
/// already-rebuilt state" every node recomputes against.
#[derive(Debug, Clone, Copy)]
struct ParentCtx {
    matrix: Mat2x3,
    alpha: f32,
    clip_rect: WorldRect,
    clip_valid: bool,
    /// The zIndex descendants must sort by when some ancestor has
    /// `z_index_locked` set, per spec §4.1 step 2.
    lock_z: Option<f32>,
    /// Which quantities were actually recomputed for *this* parent this
    /// frame; a child forces its own recompute of the corresponding
    /// quantity whenever the parent's counterpart changed.
    recomputed: DirtyBits,
}

impl ParentCtx {
    /// The implicit ancestor of the root node: unit transform, full alpha,
    /// and an unbounded clip rect (the root itself clips only if its own
    /// `clipping` flag is set).
    fn implicit_root() -> Self {
        Self {
            matrix: Mat2x3::IDENTITY,
            alpha: 1.0,
            clip_rect: WorldRect {
                min_x: f32::NEG_INFINITY,
                min_y: f32::NEG_INFINITY,
                max_x: f32::INFINITY,
                max_y: f32::INFINITY,
            },
            clip_valid: true,
            lock_z: None,
            recomputed: DirtyBits::all(),
        }
    }
}

/// Runs one dirty cascade over the whole tree rooted at `arena.root`.
///
/// `viewport` is the main render-target rect in world units (usually
/// `(0,0)-(app_width,app_height)`); `bounds_margin` expands it into the
/// outer "inBounds" rect used for render-bounds classification.
pub fn update_cascade(
    arena: &mut Arena,
    viewport: WorldRect,
    bounds_margin: BoundsMargin,
) -> CascadeOutcome {
    let outer = WorldRect {
        min_x: viewport.min_x - bounds_margin.left,
        min_y: viewport.min_y - bounds_margin.top,
        max_x: viewport.max_x + bounds_margin.right,
        max_y: viewport.max_y + bounds_margin.bottom,
    };

    let mut order: Vec<NodeId> = Vec::with_capacity(arena.node_count());
    arena.traverse_preorder(arena.root, |id| order.push(id));

    let mut ctx_by_node: HashMap<NodeId, ParentCtx> = HashMap::with_capacity(order.len());
    let mut outcome = CascadeOutcome::default();

    for (i, &id) in order.iter().enumerate() {
        let parent_id = arena.get(id).and_then(|n| n.parent);
        let parent_ctx = match parent_id {
            Some(pid) => ctx_by_node
                .get(&pid)
                .copied()
                .unwrap_or_else(ParentCtx::implicit_root),
            None => ParentCtx::implicit_root(),
        };

        let Some(node) = arena.get(id) else { continue };
        let own_dirty = node.dirty;
        let any_node_dirty = !own_dirty.is_empty();
        if any_node_dirty {
            outcome.any_dirty = true;
        }

        let transform_forced = own_dirty.contains(DirtyBits::TRANSFORM)
            || parent_ctx.recomputed.contains(DirtyBits::TRANSFORM);
        let alpha_forced = own_dirty.contains(DirtyBits::WORLD_ALPHA)
            || parent_ctx.recomputed.contains(DirtyBits::WORLD_ALPHA);
        let color_forced = own_dirty.contains(DirtyBits::WORLD_COLOR) || alpha_forced;
        let clip_forced = own_dirty.contains(DirtyBits::CLIPPING)
            || parent_ctx.recomputed.contains(DirtyBits::CLIPPING)
            || transform_forced;
        let bounds_forced = own_dirty.contains(DirtyBits::RENDER_BOUNDS) || transform_forced;

        let mut recomputed = DirtyBits::empty();

        let matrix = if transform_forced {
            recomputed |= DirtyBits::TRANSFORM;
            let local = Mat2x3::from_node_props(
                node.x,
                node.y,
                node.width,
                node.height,
                node.pivot_x,
                node.pivot_y,
                node.mount_x,
                node.mount_y,
                node.scale_x,
                node.scale_y,
                node.rotation,
            );
            parent_ctx.matrix.multiply(&local)
        } else {
            node.world.matrix
        };

        let alpha = if alpha_forced {
            recomputed |= DirtyBits::WORLD_ALPHA;
            (parent_ctx.alpha * node.alpha).clamp(0.0, 1.0)
        } else {
            node.world.alpha
        };

        let colors = if color_forced {
            recomputed |= DirtyBits::WORLD_COLOR;
            [
                node.color_tl.premultiplied_by(alpha),
                node.color_tr.premultiplied_by(alpha),
                node.color_bl.premultiplied_by(alpha),
                node.color_br.premultiplied_by(alpha),
            ]
        } else {
            node.world.colors
        };

        let (clip_rect, clip_valid) = if clip_forced {
            recomputed |= DirtyBits::CLIPPING;
            let (min_x, min_y, max_x, max_y) = matrix.transform_rect_aabb(node.width, node.height);
            let own_rect = WorldRect {
                min_x,
                min_y,
                max_x,
                max_y,
            };
            let bound_rect = if node.clipping {
                own_rect.intersect(&parent_ctx.clip_rect)
            } else {
                parent_ctx.clip_rect
            };
            (bound_rect, parent_ctx.clip_valid && !bound_rect.is_empty())
        } else {
            (node.world.clip_rect, node.world.clip_valid)
        };

        let (render_bounds, bounds_state) = if bounds_forced {
            recomputed |= DirtyBits::RENDER_BOUNDS;
            let (min_x, min_y, max_x, max_y) = matrix.transform_rect_aabb(node.width, node.height);
            let bounds = WorldRect {
                min_x,
                min_y,
                max_x,
                max_y,
            };
            let state = classify_bounds(&bounds, &viewport, &outer);
            (bounds, state)
        } else {
            (node.world.render_bounds, node.world.bounds_state)
        };

        let lock_z = if node.z_index_locked {
            Some(node.z_index)
        } else {
            parent_ctx.lock_z
        };
        let effective_z = lock_z.unwrap_or(node.z_index);

        let old_bounds_state = node.world.bounds_state;
        let include_in_visible = alpha > 0.0 && clip_valid && bounds_state != BoundsState::OutOfBounds;

        drop(node);
        let Some(node) = arena.get_mut(id) else { continue };
        node.world.matrix = matrix;
        node.world.alpha = alpha;
        node.world.colors = colors;
        node.world.clip_rect = clip_rect;
        node.world.clip_valid = clip_valid;
        node.world.render_bounds = render_bounds;
        node.world.bounds_state = bounds_state;
        node.dirty = DirtyBits::empty();

        if bounds_state != old_bounds_state {
            outcome.any_dirty = true;
            outcome.bounds_transitions.push(BoundsTransition {
                node_id: id,
                from: old_bounds_state,
                to: bounds_state,
            });
        }

        if include_in_visible {
            outcome.visible.push(VisibleNode {
                node_id: id,
                effective_z_index: effective_z,
                traversal_order: i as u32,
            });
        }

        ctx_by_node.insert(
            id,
            ParentCtx {
                matrix,
                alpha,
                clip_rect,
                clip_valid,
                lock_z,
                recomputed,
            },
        );
    }

    outcome
        .visible
        .sort_by(|a, b| {
            a.effective_z_index
                .partial_cmp(&b.effective_z_index)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.traversal_order.cmp(&b.traversal_order))
        });

    outcome
}

fn classify_bounds(render_bounds: &WorldRect, viewport: &WorldRect, outer: &WorldRect) -> BoundsState {
    if render_bounds.intersects(viewport) {
        BoundsState::InViewport
    } else if render_bounds.intersects(outer) {
        BoundsState::InBounds
    } else {
        BoundsState::OutOfBounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;

    fn viewport() -> WorldRect {
        WorldRect {
            min_x: 0.0,
            min_y: 0.0,
            max_x: 1920.0,
            max_y: 1080.0,
        }
    }

    #[test]
    fn scenario_a_dirty_cascade_and_alpha() {
        // Root 1920x1080 opaque. Child A at (100,100) 200x200 alpha=0.5.
        // Grandchild B at (10,10) 50x50 alpha=0.5 within A.
        let mut arena = Arena::new();
        let root = arena.root;
        {
            let r = arena.get_mut(root).unwrap();
            r.width = 1920.0;
            r.height = 1080.0;
            r.mount_x = 0.0;
            r.mount_y = 0.0;
        }
        let a = arena.create_node(root).unwrap();
        {
            let n = arena.get_mut(a).unwrap();
            n.x = 100.0;
            n.y = 100.0;
            n.width = 200.0;
            n.height = 200.0;
            n.mount_x = 0.0;
            n.mount_y = 0.0;
            n.alpha = 0.5;
        }
        let b = arena.create_node(a).unwrap();
        {
            let n = arena.get_mut(b).unwrap();
            n.x = 10.0;
            n.y = 10.0;
            n.width = 50.0;
            n.height = 50.0;
            n.mount_x = 0.0;
            n.mount_y = 0.0;
            n.alpha = 0.5;
            n.set_color(Color::rgba(40, 80, 120, 255));
        }

        let outcome = update_cascade(&mut arena, viewport(), BoundsMargin::uniform(100.0));
        assert!(outcome.any_dirty);

        let node_b = arena.get(b).unwrap();
        assert!((node_b.world.alpha - 0.25).abs() < 1e-6);
        let (min_x, min_y, max_x, max_y) = (
            node_b.world.render_bounds.min_x,
            node_b.world.render_bounds.min_y,
            node_b.world.render_bounds.max_x,
            node_b.world.render_bounds.max_y,
        );
        assert!((min_x - 110.0).abs() < 1e-3);
        assert!((min_y - 110.0).abs() < 1e-3);
        assert!((max_x - 160.0).abs() < 1e-3);
        assert!((max_y - 160.0).abs() < 1e-3);

        let expected_a = 255.0 / 255.0 * 0.25;
        assert!((node_b.world.colors[0][3] - expected_a).abs() < 1e-5);
    }

    #[test]
    fn scenario_b_zindex_with_locked_parent() {
        // Parent P zIndex=2, zIndexLocked=true, child C1 zIndex=5.
        // Sibling S (outside P) zIndex=3. Draw order: P, C1 (both eff z=2),
        // then S (eff z=3) - C1 stays below S despite 5 > 3.
        let mut arena = Arena::new();
        let root = arena.root;
        let p = arena.create_node(root).unwrap();
        {
            let n = arena.get_mut(p).unwrap();
            n.width = 10.0;
            n.height = 10.0;
            n.set_z_index(2.0);
            n.z_index_locked = true;
        }
        let c1 = arena.create_node(p).unwrap();
        {
            let n = arena.get_mut(c1).unwrap();
            n.width = 10.0;
            n.height = 10.0;
            n.set_z_index(5.0);
        }
        let s = arena.create_node(root).unwrap();
        {
            let n = arena.get_mut(s).unwrap();
            n.width = 10.0;
            n.height = 10.0;
            n.set_z_index(3.0);
        }

        let outcome = update_cascade(&mut arena, viewport(), BoundsMargin::uniform(100.0));
        let order: Vec<NodeId> = outcome.visible.iter().map(|v| v.node_id).collect();

        let pos_p = order.iter().position(|&id| id == p).unwrap();
        let pos_c1 = order.iter().position(|&id| id == c1).unwrap();
        let pos_s = order.iter().position(|&id| id == s).unwrap();

        assert!(pos_p < pos_s);
        assert!(pos_c1 < pos_s);

        let z_c1 = outcome
            .visible
            .iter()
            .find(|v| v.node_id == c1)
            .unwrap()
            .effective_z_index;
        assert_eq!(z_c1, 2.0);
    }

    #[test]
    fn second_frame_with_no_changes_is_a_no_op() {
        let mut arena = Arena::new();
        {
            let r = arena.get_mut(arena.root).unwrap();
            r.width = 100.0;
            r.height = 100.0;
        }
        let _ = update_cascade(&mut arena, viewport(), BoundsMargin::uniform(100.0));
        let outcome = update_cascade(&mut arena, viewport(), BoundsMargin::uniform(100.0));
        assert!(!outcome.any_dirty);
        assert!(outcome.bounds_transitions.is_empty());
    }

    #[test]
    fn empty_clip_intersection_prunes_node_from_visible_list() {
        let mut arena = Arena::new();
        let root = arena.root;
        {
            let r = arena.get_mut(root).unwrap();
            r.width = 100.0;
            r.height = 100.0;
            r.clipping = true;
        }
        let child = arena.create_node(root).unwrap();
        {
            // Entirely outside the root's own rect -> empty intersection.
            let n = arena.get_mut(child).unwrap();
            n.x = 500.0;
            n.y = 500.0;
            n.width = 10.0;
            n.height = 10.0;
        }
        let outcome = update_cascade(&mut arena, viewport(), BoundsMargin::uniform(100.0));
        assert!(!outcome.visible.iter().any(|v| v.node_id == child));
    }
}
