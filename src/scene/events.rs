//! Enumerated event kinds and a small per-node listener vector, replacing
//! the string-keyed event emitter the design notes call out (spec §9).

use crate::error::TextureLoadErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Loaded,
    Failed,
    Freed,
    InViewport,
    InBounds,
    OutOfBounds,
    BeforeDestroy,
}

#[derive(Debug, Clone)]
pub enum NodeEvent {
    Loaded { width: u32, height: u32 },
    Failed { kind: TextureLoadErrorKind },
    Freed,
    InViewport,
    InBounds,
    OutOfBounds,
    BeforeDestroy,
}

impl NodeEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            NodeEvent::Loaded { .. } => EventKind::Loaded,
            NodeEvent::Failed { .. } => EventKind::Failed,
            NodeEvent::Freed => EventKind::Freed,
            NodeEvent::InViewport => EventKind::InViewport,
            NodeEvent::InBounds => EventKind::InBounds,
            NodeEvent::OutOfBounds => EventKind::OutOfBounds,
            NodeEvent::BeforeDestroy => EventKind::BeforeDestroy,
        }
    }
}

pub type Listener = Box<dyn FnMut(&NodeEvent) + Send>;

#[derive(Default)]
pub struct EventEmitter {
    next_id: u64,
    listeners: Vec<(u64, EventKind, Listener)>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&mut self, kind: EventKind, listener: Listener) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners.push((id, kind, listener));
        id
    }

    pub fn off(&mut self, listener_id: u64) {
        self.listeners.retain(|(id, _, _)| *id != listener_id);
    }

    pub fn emit(&mut self, event: &NodeEvent) {
        let kind = event.kind();
        for (_, listener_kind, callback) in self.listeners.iter_mut() {
            if *listener_kind == kind {
                callback(event);
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn emit_only_calls_matching_kind() {
        let mut emitter = EventEmitter::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        emitter.on(
            EventKind::Loaded,
            Box::new(move |_| {
                count_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );
        emitter.emit(&NodeEvent::OutOfBounds);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        emitter.emit(&NodeEvent::Loaded {
            width: 1,
            height: 1,
        });
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn off_removes_listener() {
        let mut emitter = EventEmitter::new();
        let id = emitter.on(EventKind::Freed, Box::new(|_| {}));
        assert_eq!(emitter.listener_count(), 1);
        emitter.off(id);
        assert_eq!(emitter.listener_count(), 0);
    }
}
