//! Per-animation state machine (spec §4.6).

use crate::animation::easing::Easing;
use crate::color::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopMethod {
    Reset,
    Reverse,
    False,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimatableProperty {
    X,
    Y,
    Width,
    Height,
    ScaleX,
    ScaleY,
    Rotation,
    Alpha,
    ZIndex,
    /// Fans out to all four corners, mirroring `Node::set_color`.
    Color,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropertyValue {
    Number(f32),
    Color(Color),
}

impl PropertyValue {
    /// `Color` interpolates per-channel in premultiplied float space and
    /// converts back (spec §4.6); numbers interpolate linearly.
    fn lerp(from: PropertyValue, to: PropertyValue, t: f32) -> Option<PropertyValue> {
        match (from, to) {
            (PropertyValue::Number(a), PropertyValue::Number(b)) => {
                Some(PropertyValue::Number(a + (b - a) * t))
            }
            (PropertyValue::Color(a), PropertyValue::Color(b)) => {
                Some(PropertyValue::Color(Color::lerp(a, b, t)))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnimationTarget {
    pub property: AnimatableProperty,
    pub to: PropertyValue,
}

#[derive(Debug, Clone)]
pub struct AnimationSettings {
    pub duration_ms: f64,
    pub delay_ms: f64,
    pub easing: Easing,
    pub repeat: u32,
    pub loop_forever: bool,
    pub stop_method: StopMethod,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            duration_ms: 1000.0,
            delay_ms: 0.0,
            easing: Easing::Linear,
            repeat: 0,
            loop_forever: false,
            stop_method: StopMethod::False,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationState {
    Running,
    Paused,
    Finished,
}

struct ResolvedTarget {
    property: AnimatableProperty,
    from: PropertyValue,
    to: PropertyValue,
}

/// Drives one `animate()` call's targets through their from→to
/// interpolation, handling delay, easing, repeat, loop, pause/resume and
/// the three stop methods.
pub struct AnimationController {
    settings: AnimationSettings,
    targets: Vec<ResolvedTarget>,
    state: AnimationState,
    elapsed_ms: f64,
    repeat_remaining: u32,
    /// True while a `loop_forever` animation is running its reversed
    /// (ping-pong) half — `stop_method == Reverse` toggles from/to each
    /// iteration rather than restarting in the same direction.
    reversed_iteration: bool,
    /// Set by an explicit `stop(Reverse)` call: the controller is playing
    /// a closing segment back to the original from-values and must finish
    /// (not repeat/loop) when it completes.
    closing: bool,
}

pub enum Tick {
    Values(Vec<(AnimatableProperty, PropertyValue)>),
    Finished(Vec<(AnimatableProperty, PropertyValue)>),
    Unchanged,
}

impl AnimationController {
    /// Captures each target's current value as its from-value, reading it
    /// via `current`.
    pub fn start(
        targets: Vec<AnimationTarget>,
        settings: AnimationSettings,
        current: impl Fn(AnimatableProperty) -> PropertyValue,
    ) -> Self {
        let repeat_remaining = settings.repeat;
        let resolved = targets
            .into_iter()
            .map(|t| ResolvedTarget {
                from: current(t.property),
                property: t.property,
                to: t.to,
            })
            .collect();
        Self {
            settings,
            targets: resolved,
            state: AnimationState::Running,
            elapsed_ms: 0.0,
            repeat_remaining,
            reversed_iteration: false,
            closing: false,
        }
    }

    pub fn state(&self) -> AnimationState {
        self.state
    }

    pub fn pause(&mut self) {
        if self.state == AnimationState::Running {
            self.state = AnimationState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == AnimationState::Paused {
            self.state = AnimationState::Running;
        }
    }

    /// Advances the clock by `delta_ms` and returns the values to apply
    /// this frame, if any changed.
    pub fn tick(&mut self, delta_ms: f64) -> Tick {
        if self.state != AnimationState::Running {
            return Tick::Unchanged;
        }
        self.elapsed_ms += delta_ms;

        let t = ((self.elapsed_ms - self.settings.delay_ms) / self.settings.duration_ms)
            .clamp(0.0, 1.0) as f32;
        if self.elapsed_ms < self.settings.delay_ms {
            return Tick::Unchanged;
        }
        let progress = self.settings.easing.apply(t);
        let values: Vec<(AnimatableProperty, PropertyValue)> = self
            .targets
            .iter()
            .filter_map(|target| {
                PropertyValue::lerp(target.from, target.to, progress)
                    .map(|v| (target.property, v))
            })
            .collect();

        if t >= 1.0 {
            self.on_segment_complete();
            if self.state == AnimationState::Finished {
                return Tick::Finished(values);
            }
        }
        Tick::Values(values)
    }

    fn on_segment_complete(&mut self) {
        if self.closing {
            self.state = AnimationState::Finished;
            return;
        }
        if self.repeat_remaining > 0 {
            self.repeat_remaining -= 1;
            self.elapsed_ms = 0.0;
            return;
        }
        if self.settings.loop_forever {
            if self.settings.stop_method == StopMethod::Reverse {
                self.swap_from_to();
                self.reversed_iteration = !self.reversed_iteration;
            }
            self.elapsed_ms = 0.0;
            return;
        }
        self.state = AnimationState::Finished;
    }

    fn swap_from_to(&mut self) {
        for target in &mut self.targets {
            std::mem::swap(&mut target.from, &mut target.to);
        }
    }

    /// Explicit `stop()` call (spec §4.6). `Reset` restores the captured
    /// from-values immediately; `Reverse` plays a closing segment back to
    /// them over the remaining portion of the current duration; `False`
    /// freezes at the current value.
    pub fn stop(&mut self, method: StopMethod) -> Tick {
        match method {
            StopMethod::False => {
                self.state = AnimationState::Finished;
                Tick::Finished(self.current_values())
            }
            StopMethod::Reset => {
                self.state = AnimationState::Finished;
                let values: Vec<_> = self
                    .targets
                    .iter()
                    .map(|t| (t.property, t.from))
                    .collect();
                Tick::Finished(values)
            }
            StopMethod::Reverse => {
                let t = ((self.elapsed_ms - self.settings.delay_ms) / self.settings.duration_ms)
                    .clamp(0.0, 1.0) as f32;
                let progress = self.settings.easing.apply(t);
                let remaining_ms = (self.settings.duration_ms - self.elapsed_ms).max(1.0);

                for target in &mut self.targets {
                    if let Some(current) = PropertyValue::lerp(target.from, target.to, progress) {
                        let original_from = target.from;
                        target.from = current;
                        target.to = original_from;
                    }
                }
                self.settings.duration_ms = remaining_ms;
                self.settings.delay_ms = 0.0;
                self.elapsed_ms = 0.0;
                self.closing = true;
                self.state = AnimationState::Running;
                Tick::Values(self.current_values())
            }
        }
    }

    fn current_values(&self) -> Vec<(AnimatableProperty, PropertyValue)> {
        let t = ((self.elapsed_ms - self.settings.delay_ms) / self.settings.duration_ms)
            .clamp(0.0, 1.0) as f32;
        let progress = self.settings.easing.apply(t);
        self.targets
            .iter()
            .filter_map(|target| {
                PropertyValue::lerp(target.from, target.to, progress)
                    .map(|v| (target.property, v))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x_target(to: f32) -> AnimationTarget {
        AnimationTarget {
            property: AnimatableProperty::X,
            to: PropertyValue::Number(to),
        }
    }

    #[test]
    fn tick_interpolates_linearly_at_half_duration() {
        let mut controller = AnimationController::start(
            vec![x_target(100.0)],
            AnimationSettings {
                duration_ms: 1000.0,
                ..Default::default()
            },
            |_| PropertyValue::Number(0.0),
        );
        match controller.tick(500.0) {
            Tick::Values(values) => {
                assert_eq!(values[0].1, PropertyValue::Number(50.0));
            }
            _ => panic!("expected in-flight values"),
        }
    }

    #[test]
    fn tick_past_duration_finishes_at_target_value() {
        let mut controller = AnimationController::start(
            vec![x_target(100.0)],
            AnimationSettings {
                duration_ms: 1000.0,
                ..Default::default()
            },
            |_| PropertyValue::Number(0.0),
        );
        match controller.tick(1500.0) {
            Tick::Finished(values) => {
                assert_eq!(values[0].1, PropertyValue::Number(100.0));
            }
            _ => panic!("expected finished"),
        }
        assert_eq!(controller.state(), AnimationState::Finished);
    }

    #[test]
    fn scenario_e_reverse_stop_returns_toward_origin() {
        let mut controller = AnimationController::start(
            vec![x_target(100.0)],
            AnimationSettings {
                duration_ms: 1000.0,
                ..Default::default()
            },
            |_| PropertyValue::Number(0.0),
        );
        controller.tick(400.0);
        let at_stop = controller.stop(StopMethod::Reverse);
        let x_at_stop = match at_stop {
            Tick::Values(values) => values[0].1,
            _ => panic!("expected in-flight reverse segment"),
        };
        assert_eq!(x_at_stop, PropertyValue::Number(40.0));

        let finished = controller.tick(600.0);
        match finished {
            Tick::Finished(values) => {
                assert!(matches!(values[0].1, PropertyValue::Number(n) if (n - 0.0).abs() < 1e-3));
            }
            _ => panic!("expected finished"),
        }
    }

    #[test]
    fn paused_controller_does_not_advance() {
        let mut controller = AnimationController::start(
            vec![x_target(100.0)],
            AnimationSettings {
                duration_ms: 1000.0,
                ..Default::default()
            },
            |_| PropertyValue::Number(0.0),
        );
        controller.pause();
        assert!(matches!(controller.tick(500.0), Tick::Unchanged));
        controller.resume();
        match controller.tick(1000.0) {
            Tick::Finished(_) => {}
            _ => panic!("expected finished after resume"),
        }
    }

    #[test]
    fn repeat_restarts_from_same_from_value() {
        let mut controller = AnimationController::start(
            vec![x_target(100.0)],
            AnimationSettings {
                duration_ms: 1000.0,
                repeat: 2,
                ..Default::default()
            },
            |_| PropertyValue::Number(0.0),
        );
        controller.tick(1000.0);
        assert_eq!(controller.state(), AnimationState::Running);
        match controller.tick(500.0) {
            Tick::Values(values) => assert_eq!(values[0].1, PropertyValue::Number(50.0)),
            _ => panic!("expected second iteration in flight"),
        }
    }
}
