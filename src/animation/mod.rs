//! Time-stepped property animation (spec §4.6): [`controller::AnimationController`]
//! drives one `animate()` call's targets through their easing curve;
//! [`engine::AnimationEngine`] is the scene-wide scheduler that owns every
//! running controller and is ticked once per frame off the same clock as
//! the rest of the frame pipeline (spec §4.3).

pub mod controller;
pub mod easing;
pub mod engine;

pub use controller::{
    AnimatableProperty, AnimationController, AnimationSettings, AnimationState, AnimationTarget,
    PropertyValue, StopMethod, Tick,
};
pub use easing::Easing;
pub use engine::AnimationEngine;
