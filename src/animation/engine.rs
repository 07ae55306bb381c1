//! Scene-wide animation scheduler: owns every running [`AnimationController`]
//! and advances them all from the one frame-tick clock (spec §4.3 step 2,
//! §4.6).

use crate::animation::controller::{
    AnimatableProperty, AnimationController, AnimationSettings, AnimationState, AnimationTarget,
    PropertyValue, StopMethod, Tick,
};
use crate::id::AnimationId;
use crate::scene::node::NodeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

struct RunningAnimation {
    node: NodeId,
    controller: AnimationController,
}

/// Property values produced by one controller's tick, to be assigned onto
/// its target node (which marks the node dirty through its normal setters).
pub struct AppliedValues {
    pub node: NodeId,
    pub values: Vec<(AnimatableProperty, PropertyValue)>,
}

pub struct FinishedAnimation {
    pub id: AnimationId,
    pub node: NodeId,
}

pub struct AnimationEngine {
    next_id: AtomicU64,
    running: HashMap<AnimationId, RunningAnimation>,
}

impl AnimationEngine {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            running: HashMap::new(),
        }
    }

    /// Starts a new controller for `targets` on `node`, capturing each
    /// target's current value via `current` (spec §4.6 "on start, capture
    /// each target property's current value as the from-value").
    pub fn start(
        &mut self,
        node: NodeId,
        targets: Vec<AnimationTarget>,
        settings: AnimationSettings,
        current: impl Fn(AnimatableProperty) -> PropertyValue,
    ) -> AnimationId {
        let id = AnimationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let controller = AnimationController::start(targets, settings, current);
        self.running.insert(id, RunningAnimation { node, controller });
        id
    }

    pub fn pause(&mut self, id: AnimationId) {
        if let Some(running) = self.running.get_mut(&id) {
            running.controller.pause();
        }
    }

    pub fn resume(&mut self, id: AnimationId) {
        if let Some(running) = self.running.get_mut(&id) {
            running.controller.resume();
        }
    }

    pub fn is_running(&self, id: AnimationId) -> bool {
        self.running
            .get(&id)
            .map(|r| r.controller.state() == AnimationState::Running)
            .unwrap_or(false)
    }

    /// Explicit `stop()` call (spec §4.6). `Reverse` keeps the controller
    /// alive to play its closing segment on subsequent ticks; `Reset` and
    /// `False` finish it immediately and remove it. Returns the owning node
    /// alongside the values so the caller can apply them without a second
    /// lookup.
    pub fn stop(
        &mut self,
        id: AnimationId,
        method: StopMethod,
    ) -> Option<(NodeId, Vec<(AnimatableProperty, PropertyValue)>)> {
        let running = self.running.get_mut(&id)?;
        let node = running.node;
        match running.controller.stop(method) {
            Tick::Finished(values) => {
                self.running.remove(&id);
                Some((node, values))
            }
            Tick::Values(values) => Some((node, values)),
            Tick::Unchanged => None,
        }
    }

    /// Cancels every animation targeting `node` without emitting
    /// `finished` (spec §4.6: "animating on a destroyed node cancels
    /// silently"), called from [`crate::scene::arena::Arena::destroy`].
    pub fn cancel_for_node(&mut self, node: NodeId) {
        self.running.retain(|_, running| running.node != node);
    }

    /// Advances every running controller by `dt_ms`, returning the values
    /// to assign this frame (applied before the dirty cascade, per spec
    /// §4.3's ordering guarantee) and the ids that finished so the caller
    /// can emit `animationFinished`.
    pub fn tick(&mut self, dt_ms: f64) -> (Vec<AppliedValues>, Vec<FinishedAnimation>) {
        let mut applied = Vec::new();
        let mut finished = Vec::new();
        let mut done_ids = Vec::new();

        for (&id, running) in self.running.iter_mut() {
            match running.controller.tick(dt_ms) {
                Tick::Values(values) => {
                    if !values.is_empty() {
                        applied.push(AppliedValues {
                            node: running.node,
                            values,
                        });
                    }
                }
                Tick::Finished(values) => {
                    if !values.is_empty() {
                        applied.push(AppliedValues {
                            node: running.node,
                            values,
                        });
                    }
                    finished.push(FinishedAnimation {
                        id,
                        node: running.node,
                    });
                    done_ids.push(id);
                }
                Tick::Unchanged => {}
            }
        }

        for id in done_ids {
            self.running.remove(&id);
        }

        (applied, finished)
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }
}

impl Default for AnimationEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_node() -> NodeId {
        slotmap::SlotMap::<NodeId, ()>::with_key().insert(())
    }

    fn x_target(to: f32) -> AnimationTarget {
        AnimationTarget {
            property: AnimatableProperty::X,
            to: PropertyValue::Number(to),
        }
    }

    #[test]
    fn tick_applies_values_to_the_right_node() {
        let mut engine = AnimationEngine::new();
        let node = dummy_node();
        let id = engine.start(
            node,
            vec![x_target(100.0)],
            AnimationSettings {
                duration_ms: 1000.0,
                ..Default::default()
            },
            |_| PropertyValue::Number(0.0),
        );
        assert!(engine.is_running(id));

        let (applied, finished) = engine.tick(500.0);
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].node, node);
        assert!(finished.is_empty());
        assert_eq!(engine.running_count(), 1);
    }

    #[test]
    fn finishing_removes_the_controller_and_reports_it() {
        let mut engine = AnimationEngine::new();
        let node = dummy_node();
        let id = engine.start(
            node,
            vec![x_target(100.0)],
            AnimationSettings {
                duration_ms: 1000.0,
                ..Default::default()
            },
            |_| PropertyValue::Number(0.0),
        );
        let (_, finished) = engine.tick(2000.0);
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].id, id);
        assert_eq!(engine.running_count(), 0);
    }

    #[test]
    fn cancel_for_node_drops_its_animations_silently() {
        let mut engine = AnimationEngine::new();
        let node = dummy_node();
        engine.start(
            node,
            vec![x_target(100.0)],
            AnimationSettings::default(),
            |_| PropertyValue::Number(0.0),
        );
        assert_eq!(engine.running_count(), 1);
        engine.cancel_for_node(node);
        assert_eq!(engine.running_count(), 0);
    }

    #[test]
    fn stop_reset_removes_and_returns_from_values() {
        let mut engine = AnimationEngine::new();
        let node = dummy_node();
        let id = engine.start(
            node,
            vec![x_target(100.0)],
            AnimationSettings {
                duration_ms: 1000.0,
                ..Default::default()
            },
            |_| PropertyValue::Number(0.0),
        );
        engine.tick(400.0);
        let (stopped_node, values) = engine.stop(id, StopMethod::Reset).unwrap();
        assert_eq!(stopped_node, node);
        assert_eq!(values[0].1, PropertyValue::Number(0.0));
        assert_eq!(engine.running_count(), 0);
    }
}
