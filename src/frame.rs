//! The per-frame sequence (spec §4.3): advance running animations, run the
//! dirty cascade, decide whether the frame is idle, then hand the visible
//! list to the batcher and the batches to a [`crate::surface::Surface`].
//!
//! This module owns the ordering; it does not own a `Surface` or an
//! `Arena` itself — [`crate::stage::Stage`] wires those together every
//! tick, which is what lets a headless `NullSurface` drive the exact same
//! sequence in a test.

use crate::animation::controller::{AnimatableProperty, PropertyValue};
use crate::animation::engine::AnimationEngine;
use crate::config::BoundsMargin;
use crate::id::AnimationId;
use crate::scene::arena::Arena;
use crate::scene::cascade::{update_cascade, CascadeOutcome};
use crate::scene::dirty::DirtyBits;
use crate::scene::node::{Node, WorldRect};

/// Assigns one animated value onto its node's local property, marking the
/// dirty bits the cascade needs to recompute from it (spec §4.3 step 2).
pub fn apply_property(node: &mut Node, property: AnimatableProperty, value: PropertyValue) {
    match (property, value) {
        (AnimatableProperty::X, PropertyValue::Number(v)) => {
            node.x = v;
            node.dirty |= DirtyBits::TRANSFORM;
        }
        (AnimatableProperty::Y, PropertyValue::Number(v)) => {
            node.y = v;
            node.dirty |= DirtyBits::TRANSFORM;
        }
        (AnimatableProperty::Width, PropertyValue::Number(v)) => {
            node.width = v;
            node.dirty |= DirtyBits::TRANSFORM | DirtyBits::RENDER_BOUNDS;
        }
        (AnimatableProperty::Height, PropertyValue::Number(v)) => {
            node.height = v;
            node.dirty |= DirtyBits::TRANSFORM | DirtyBits::RENDER_BOUNDS;
        }
        (AnimatableProperty::ScaleX, PropertyValue::Number(v)) => {
            node.scale_x = v;
            node.dirty |= DirtyBits::TRANSFORM;
        }
        (AnimatableProperty::ScaleY, PropertyValue::Number(v)) => {
            node.scale_y = v;
            node.dirty |= DirtyBits::TRANSFORM;
        }
        (AnimatableProperty::Rotation, PropertyValue::Number(v)) => {
            node.rotation = v;
            node.dirty |= DirtyBits::TRANSFORM;
        }
        (AnimatableProperty::Alpha, PropertyValue::Number(v)) => {
            node.alpha = v;
            node.dirty |= DirtyBits::WORLD_ALPHA;
        }
        (AnimatableProperty::ZIndex, PropertyValue::Number(v)) => node.set_z_index(v),
        (AnimatableProperty::Color, PropertyValue::Color(c)) => node.set_color(c),
        _ => {
            log::warn!("animated value type did not match its target property, ignoring");
        }
    }
}

/// What one `step` produced, for the caller to act on: draw (or skip) the
/// frame, and emit `animationFinished` for whichever ids are listed.
pub struct StepOutcome {
    pub cascade: CascadeOutcome,
    pub finished_animations: Vec<AnimationId>,
}

impl StepOutcome {
    /// A frame can be skipped entirely — no draw calls at all — when
    /// nothing changed and no animation produced a value this tick (spec
    /// §8 property 4).
    pub fn is_idle(&self) -> bool {
        !self.cascade.any_dirty && self.finished_animations.is_empty()
    }
}

/// Drives the scene's animated properties and its dirty cascade from one
/// shared clock. Owns nothing about the GPU — drawing is the caller's job
/// once it has a [`StepOutcome`]'s visible list.
#[derive(Default)]
pub struct FramePipeline {
    animations: AnimationEngine,
    accumulated_ms: f64,
}

impl FramePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn animations(&self) -> &AnimationEngine {
        &self.animations
    }

    pub fn animations_mut(&mut self) -> &mut AnimationEngine {
        &mut self.animations
    }

    /// Self-paced timing for hosts with no native frame callback: feeds
    /// `elapsed_ms` of real time into an accumulator and reports whether at
    /// least one `target_frame_time_ms` tick's worth has built up (spec §6
    /// `target_frame_time_ms`, design notes §9 "drives its own timer").
    pub fn should_tick(&mut self, elapsed_ms: f64, target_frame_time_ms: u32) -> bool {
        self.accumulated_ms += elapsed_ms;
        let target = target_frame_time_ms.max(1) as f64;
        if self.accumulated_ms + 1e-6 >= target {
            self.accumulated_ms -= target;
            true
        } else {
            false
        }
    }

    /// Runs the animation-step and dirty-cascade portion of one frame
    /// (spec §4.3 steps 1-2): advances every running animation by `dt_ms`,
    /// applies the resulting values onto their nodes, then walks the tree.
    pub fn step(
        &mut self,
        dt_ms: f64,
        arena: &mut Arena,
        viewport: WorldRect,
        bounds_margin: BoundsMargin,
    ) -> StepOutcome {
        let (applied, finished) = self.animations.tick(dt_ms);
        for values in applied {
            if let Some(node) = arena.get_mut(values.node) {
                for (property, value) in values.values {
                    apply_property(node, property, value);
                }
            }
        }

        let cascade = update_cascade(arena, viewport, bounds_margin);
        StepOutcome {
            cascade,
            finished_animations: finished.into_iter().map(|f| f.id).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::controller::{AnimationSettings, AnimationTarget};
    use crate::scene::node::WorldRect;

    fn full_viewport() -> WorldRect {
        WorldRect {
            min_x: 0.0,
            min_y: 0.0,
            max_x: 1920.0,
            max_y: 1080.0,
        }
    }

    #[test]
    fn animated_x_moves_the_node_and_cascade_picks_it_up() {
        let mut arena = Arena::new();
        let child = arena.create_node(arena.root).unwrap();
        arena.get_mut(child).unwrap().width = 10.0;
        arena.get_mut(child).unwrap().height = 10.0;

        let mut pipeline = FramePipeline::new();
        pipeline.animations_mut().start(
            child,
            vec![AnimationTarget {
                property: AnimatableProperty::X,
                to: PropertyValue::Number(100.0),
            }],
            AnimationSettings {
                duration_ms: 1000.0,
                ..Default::default()
            },
            |_| PropertyValue::Number(0.0),
        );

        let outcome = pipeline.step(500.0, &mut arena, full_viewport(), BoundsMargin::default());
        assert!(outcome.cascade.any_dirty);
        assert_eq!(arena.get(child).unwrap().x, 50.0);
        assert!(!outcome.is_idle());
    }

    #[test]
    fn a_tree_with_no_changes_and_no_animations_is_idle() {
        let mut arena = Arena::new();
        let mut pipeline = FramePipeline::new();
        // First step always dirties everything (nothing has been computed yet).
        pipeline.step(16.0, &mut arena, full_viewport(), BoundsMargin::default());
        let outcome = pipeline.step(16.0, &mut arena, full_viewport(), BoundsMargin::default());
        assert!(outcome.is_idle());
    }

    #[test]
    fn should_tick_accumulates_and_consumes_target_time() {
        let mut pipeline = FramePipeline::new();
        assert!(!pipeline.should_tick(10.0, 16));
        assert!(pipeline.should_tick(10.0, 16));
    }
}
