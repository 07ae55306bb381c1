//! The batching algorithm itself: walk the z-ordered visible list and
//! merge adjacent quads that share a pipeline, texture and clip rect into
//! one draw call, flushing a new batch whenever any of those change
//! (spec §4.4).

use crate::id::TextureId;
use crate::scene::arena::Arena;
use crate::scene::cascade::VisibleNode;
use crate::scene::node::{Node, WorldRect};
use crate::shader::props::ShaderProps;
use crate::vertex::{push_quad, QuadVertex};

/// The subset of a node's render state that determines which batch it can
/// join. Two consecutive nodes merge only when every field here is
/// draw-call-compatible.
#[derive(Debug, Clone)]
pub struct BatchKey {
    pub shader_props: ShaderProps,
    pub texture_id: Option<TextureId>,
    pub clip_rect: Option<WorldRect>,
}

impl BatchKey {
    fn for_node(node: &Node) -> Self {
        Self {
            shader_props: node
                .shader
                .as_ref()
                .map(|s| s.props.clone())
                .unwrap_or(ShaderProps::Quad),
            texture_id: node.texture.as_ref().map(|t| t.texture_id),
            clip_rect: node.world.clip_valid.then_some(node.world.clip_rect),
        }
    }

    /// Whether a node carrying `other` can be appended to a batch already
    /// keyed by `self` without starting a new one.
    fn can_merge(&self, other: &BatchKey) -> bool {
        self.texture_id == other.texture_id
            && self.clip_rect == other.clip_rect
            && self.shader_props.can_batch_with(&other.shader_props)
    }
}

pub struct Batch {
    pub key: BatchKey,
    pub vertices: Vec<QuadVertex>,
    pub indices: Vec<u32>,
}

/// Builds the corner vertices for one node's quad in its already-computed
/// world space, honoring a flipped texture's UV orientation.
fn quad_corners(node: &Node) -> [QuadVertex; 4] {
    let m = &node.world.matrix;
    let (w, h) = (node.width, node.height);
    let local = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];
    let positions = local.map(|p| m.apply_to_point(p));
    let colors = node.world.colors;

    let (flip_x, flip_y) = node
        .texture
        .as_ref()
        .map(|t| (t.options.flip_x, t.options.flip_y))
        .unwrap_or((false, false));
    let uvs = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)].map(|(u, v)| {
        (
            if flip_x { 1.0 - u } else { u },
            if flip_y { 1.0 - v } else { v },
        )
    });

    [0, 1, 2, 3].map(|i| QuadVertex {
        position: [positions[i].0, positions[i].1],
        uv: [uvs[i].0, uvs[i].1],
        color: colors[i],
        tex_index: 0,
    })
}

/// Builds the batch list for one render target's worth of visible nodes.
/// The frame pipeline calls this once for the main pass and once per RTT
/// sub-pass, each time with only the nodes that belong to that target
/// (spec §4.3 step 3 / §4.4).
pub fn build_batches(arena: &Arena, visible: &[VisibleNode]) -> Vec<Batch> {
    let mut batches: Vec<Batch> = Vec::new();

    for v in visible {
        let Some(node) = arena.get(v.node_id) else {
            continue;
        };
        if node.world.render_bounds.is_empty() {
            continue;
        }

        let key = BatchKey::for_node(node);
        let corners = quad_corners(node);

        let merge = batches.last().map(|b| b.key.can_merge(&key)).unwrap_or(false);
        if merge {
            let batch = batches.last_mut().expect("checked above");
            push_quad(&mut batch.vertices, &mut batch.indices, corners);
        } else {
            let mut batch = Batch {
                key,
                vertices: Vec::new(),
                indices: Vec::new(),
            };
            push_quad(&mut batch.vertices, &mut batch.indices, corners);
            batches.push(batch);
        }
    }

    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::TextureId;
    use crate::scene::node::{TextureOptions, TextureRef};

    fn visible(id: crate::scene::node::NodeId, order: u32) -> VisibleNode {
        VisibleNode {
            node_id: id,
            effective_z_index: 0.0,
            traversal_order: order,
        }
    }

    fn give_size(arena: &mut Arena, id: crate::scene::node::NodeId, w: f32, h: f32) {
        let node = arena.get_mut(id).unwrap();
        node.width = w;
        node.height = h;
        node.world.render_bounds = WorldRect {
            min_x: 0.0,
            min_y: 0.0,
            max_x: w,
            max_y: h,
        };
        node.world.colors = [[1.0, 1.0, 1.0, 1.0]; 4];
    }

    #[test]
    fn same_texture_and_clip_merge_into_one_batch() {
        let mut arena = Arena::new();
        let a = arena.create_node(arena.root).unwrap();
        let b = arena.create_node(arena.root).unwrap();
        give_size(&mut arena, a, 10.0, 10.0);
        give_size(&mut arena, b, 10.0, 10.0);

        let tex = TextureRef {
            texture_id: TextureId(1),
            options: TextureOptions::default(),
        };
        arena.get_mut(a).unwrap().texture = Some(tex.clone());
        arena.get_mut(b).unwrap().texture = Some(tex);

        let visible_list = vec![visible(a, 0), visible(b, 1)];
        let batches = build_batches(&arena, &visible_list);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].vertices.len(), 8);
        assert_eq!(batches[0].indices.len(), 12);
    }

    #[test]
    fn differing_texture_splits_into_two_batches() {
        let mut arena = Arena::new();
        let a = arena.create_node(arena.root).unwrap();
        let b = arena.create_node(arena.root).unwrap();
        give_size(&mut arena, a, 10.0, 10.0);
        give_size(&mut arena, b, 10.0, 10.0);

        arena.get_mut(a).unwrap().texture = Some(TextureRef {
            texture_id: TextureId(1),
            options: TextureOptions::default(),
        });
        arena.get_mut(b).unwrap().texture = Some(TextureRef {
            texture_id: TextureId(2),
            options: TextureOptions::default(),
        });

        let visible_list = vec![visible(a, 0), visible(b, 1)];
        let batches = build_batches(&arena, &visible_list);
        assert_eq!(batches.len(), 2);
    }

    #[test]
    fn empty_render_bounds_is_skipped() {
        let mut arena = Arena::new();
        let a = arena.create_node(arena.root).unwrap();
        // world.render_bounds defaults to an empty rect.
        let visible_list = vec![visible(a, 0)];
        let batches = build_batches(&arena, &visible_list);
        assert!(batches.is_empty());
    }

    #[test]
    fn differing_clip_rect_splits_batches() {
        let mut arena = Arena::new();
        let a = arena.create_node(arena.root).unwrap();
        let b = arena.create_node(arena.root).unwrap();
        give_size(&mut arena, a, 10.0, 10.0);
        give_size(&mut arena, b, 10.0, 10.0);
        arena.get_mut(a).unwrap().world.clip_valid = true;
        arena.get_mut(a).unwrap().world.clip_rect = WorldRect {
            min_x: 0.0,
            min_y: 0.0,
            max_x: 5.0,
            max_y: 5.0,
        };
        arena.get_mut(b).unwrap().world.clip_valid = false;

        let visible_list = vec![visible(a, 0), visible(b, 1)];
        let batches = build_batches(&arena, &visible_list);
        assert_eq!(batches.len(), 2);
    }
}
