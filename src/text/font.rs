//! Font registry: tracks loaded faces, normalized metrics, and the nodes
//! waiting on a not-yet-loaded font (spec §4.5 failure semantics).

use crate::id::FontId;
use crate::scene::node::NodeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Normalized font metrics, used to turn `fontSize` into pixel line
/// height: `(ascender - descender + lineGap) / unitsPerEm`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    pub ascender: f32,
    pub descender: f32,
    pub line_gap: f32,
    pub units_per_em: f32,
}

impl FontMetrics {
    /// Per-em normalized line height; multiply by `fontSize` to get pixels.
    pub fn normalized_line_height(&self) -> f32 {
        (self.ascender - self.descender + self.line_gap) / self.units_per_em
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontState {
    Loading,
    Loaded,
    Failed,
}

struct FontEntry {
    state: FontState,
    metrics: Option<FontMetrics>,
    waiters: Vec<NodeId>,
}

/// Registers font faces by family name and tracks which nodes are waiting
/// for a face that hasn't finished loading yet: when `mark_loaded` fires,
/// every waiter is returned so the caller can mark it dirty for re-layout
/// (spec §4.5: "the node is marked dirty to force re-layout").
pub struct FontHandler {
    next_id: AtomicU64,
    by_name: HashMap<String, FontId>,
    entries: HashMap<FontId, FontEntry>,
}

impl FontHandler {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            by_name: HashMap::new(),
            entries: HashMap::new(),
        }
    }

    pub fn register(&mut self, family: &str) -> FontId {
        if let Some(&id) = self.by_name.get(family) {
            return id;
        }
        let id = FontId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.by_name.insert(family.to_string(), id);
        self.entries.insert(
            id,
            FontEntry {
                state: FontState::Loading,
                metrics: None,
                waiters: Vec::new(),
            },
        );
        id
    }

    pub fn lookup(&self, family: &str) -> Option<FontId> {
        self.by_name.get(family).copied()
    }

    pub fn state(&self, id: FontId) -> Option<FontState> {
        self.entries.get(&id).map(|e| e.state)
    }

    pub fn metrics(&self, id: FontId) -> Option<FontMetrics> {
        self.entries.get(&id).and_then(|e| e.metrics)
    }

    /// Registers `node` as waiting for `id` to finish loading. No-op if
    /// already loaded — the caller should just lay out immediately in
    /// that case.
    pub fn add_waiter(&mut self, id: FontId, node: NodeId) {
        if let Some(entry) = self.entries.get_mut(&id) {
            if entry.state == FontState::Loading {
                entry.waiters.push(node);
            }
        }
    }

    /// Marks the font loaded and returns the waiters to be dirtied.
    pub fn mark_loaded(&mut self, id: FontId, metrics: FontMetrics) -> Vec<NodeId> {
        let Some(entry) = self.entries.get_mut(&id) else {
            return Vec::new();
        };
        entry.state = FontState::Loaded;
        entry.metrics = Some(metrics);
        std::mem::take(&mut entry.waiters)
    }

    pub fn mark_failed(&mut self, id: FontId) -> Vec<NodeId> {
        let Some(entry) = self.entries.get_mut(&id) else {
            return Vec::new();
        };
        entry.state = FontState::Failed;
        std::mem::take(&mut entry.waiters)
    }
}

impl Default for FontHandler {
    fn default() -> Self {
        Self::new()
    }
}
