//! Context spy: an optional diagnostic wrapper around [`crate::surface::Surface`]
//! calls, toggled by [`crate::config::Settings::enable_context_spy`] (spec §6).
//!
//! Rather than forwarding every call through dynamic dispatch unconditionally,
//! the spy is a thin counter + logger that the frame pipeline consults only
//! when enabled, matching the reference renderer's `performance_measurement`
//! feature-gated instrumentation in spirit.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct ContextSpy {
    draw_calls: AtomicU64,
    texture_uploads: AtomicU64,
    program_switches: AtomicU64,
    enabled: bool,
}

impl ContextSpy {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Default::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn record_draw_call(&self, batch_index: usize, index_count: u32) {
        if !self.enabled {
            return;
        }
        self.draw_calls.fetch_add(1, Ordering::Relaxed);
        log::debug!("context-spy: draw batch {batch_index} ({index_count} indices)");
    }

    pub fn record_texture_upload(&self, texture_id: u64, bytes: usize) {
        if !self.enabled {
            return;
        }
        self.texture_uploads.fetch_add(1, Ordering::Relaxed);
        log::debug!("context-spy: upload texture {texture_id} ({bytes} bytes)");
    }

    pub fn record_program_switch(&self, shader_id: u64) {
        if !self.enabled {
            return;
        }
        self.program_switches.fetch_add(1, Ordering::Relaxed);
        log::debug!("context-spy: switch to shader program {shader_id}");
    }

    pub fn reset_frame_counters(&self) {
        self.draw_calls.store(0, Ordering::Relaxed);
        self.texture_uploads.store(0, Ordering::Relaxed);
        self.program_switches.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ContextSpySnapshot {
        ContextSpySnapshot {
            draw_calls: self.draw_calls.load(Ordering::Relaxed),
            texture_uploads: self.texture_uploads.load(Ordering::Relaxed),
            program_switches: self.program_switches.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextSpySnapshot {
    pub draw_calls: u64,
    pub texture_uploads: u64,
    pub program_switches: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_spy_does_not_count() {
        let spy = ContextSpy::new(false);
        spy.record_draw_call(0, 6);
        assert_eq!(spy.snapshot().draw_calls, 0);
    }

    #[test]
    fn enabled_spy_counts_and_resets() {
        let spy = ContextSpy::new(true);
        spy.record_draw_call(0, 6);
        spy.record_draw_call(1, 6);
        spy.record_texture_upload(7, 1024);
        let snap = spy.snapshot();
        assert_eq!(snap.draw_calls, 2);
        assert_eq!(snap.texture_uploads, 1);

        spy.reset_frame_counters();
        assert_eq!(spy.snapshot().draw_calls, 0);
    }
}
