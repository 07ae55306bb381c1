//! Content-addressed texture cache with refcounting and GPU byte-budget
//! eviction (spec §4.2).

use crate::config::TextureMemorySettings;
use crate::error::{CoreError, CoreResult, TextureLoadErrorKind};
use crate::id::TextureId;
use crate::texture::source::{TextureSource, TextureState};
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

struct Entry {
    source: TextureSource,
    state: TextureState,
    byte_size: u64,
    /// Raw "has a reference" count: one per node whose `texture` field
    /// currently points at this entry, regardless of whether that node is
    /// actually being rendered.
    ref_count: u32,
    /// "Is actively rendered" count: one per node currently in
    /// `inViewport ∪ inBounds` that renders this entry, driven exclusively
    /// by render-bounds transitions (spec §4.1 step 1.e), never by
    /// `request`/`release`. This, not `ref_count`, is what the zero-ref
    /// eviction set tracks (spec §4.2's "decoupling of 'has a reference'
    /// from 'is actively rendered'").
    owner_count: u32,
}

/// Owns the identity/lifecycle side of texture management: which
/// `TextureId` a given `TextureSource` maps to, how many nodes reference
/// it, and which zero-ref entries are eligible for eviction when the GPU
/// byte budget is exceeded. Actual GPU upload lives in [`crate::texture::gpu`].
pub struct TextureManager {
    settings: TextureMemorySettings,
    next_id: AtomicU64,
    key_cache: HashMap<String, TextureId>,
    entries: HashMap<TextureId, Entry>,
    /// Ordered by recency of last-released-to-zero; front = least recently
    /// used, the spec's eviction order ("evicts the least-recently-used
    /// zero-ref entries first").
    zero_ref_lru: LruCache<TextureId, ()>,
    total_bytes: u64,
}

pub enum RequestOutcome {
    /// A cache hit: an existing entry's refcount was bumped.
    Existing(TextureId),
    /// A brand new entry was created in `Initial` state and needs loading.
    New(TextureId),
}

impl TextureManager {
    pub fn new(settings: TextureMemorySettings) -> Self {
        Self {
            settings,
            next_id: AtomicU64::new(0),
            key_cache: HashMap::new(),
            entries: HashMap::new(),
            zero_ref_lru: LruCache::new(NonZeroUsize::new(usize::MAX).unwrap()),
            total_bytes: 0,
        }
    }

    /// Looks up or creates an entry for `source`, incrementing its raw
    /// attach refcount. The caller owns exactly one reference per call and
    /// must eventually call [`TextureManager::release`]. This has no
    /// effect on the zero-ref eviction set — see [`TextureManager::set_renderable_owner`].
    pub fn request(&mut self, source: TextureSource) -> RequestOutcome {
        let key = source.cache_key();
        if let Some(&id) = self.key_cache.get(&key) {
            let entry = self.entries.get_mut(&id).expect("key_cache/entries desync");
            entry.ref_count += 1;
            return RequestOutcome::Existing(id);
        }

        let id = TextureId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.insert(
            id,
            Entry {
                source,
                state: TextureState::Initial,
                byte_size: 0,
                ref_count: 1,
                owner_count: 0,
            },
        );
        self.key_cache.insert(key, id);
        RequestOutcome::New(id)
    }

    pub fn mark_loading(&mut self, id: TextureId) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.state = TextureState::Loading;
        }
    }

    /// Records a completed upload and reserves `byte_size` against the
    /// budget, evicting zero-ref entries if needed (spec §4.2). Returns the
    /// ids evicted to make room.
    pub fn mark_loaded(&mut self, id: TextureId, byte_size: u64) -> Vec<TextureId> {
        let evicted = self.ensure_budget(byte_size);
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.state = TextureState::Loaded;
            entry.byte_size = byte_size;
            self.total_bytes += byte_size;
        }
        evicted
    }

    pub fn mark_failed(&mut self, id: TextureId, _kind: TextureLoadErrorKind) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.state = TextureState::Failed;
        }
    }

    pub fn state(&self, id: TextureId) -> Option<TextureState> {
        self.entries.get(&id).map(|e| e.state)
    }

    pub fn source(&self, id: TextureId) -> Option<&TextureSource> {
        self.entries.get(&id).map(|e| &e.source)
    }

    /// Drops one raw attach reference. Does not by itself affect the
    /// zero-ref eviction set; a node dropping its own reference is expected
    /// to also call [`TextureManager::set_renderable_owner`]`(id, false)`
    /// first if it was actively rendering the texture.
    pub fn release(&mut self, id: TextureId) {
        let Some(entry) = self.entries.get_mut(&id) else {
            return;
        };
        if entry.ref_count == 0 {
            return;
        }
        entry.ref_count -= 1;
    }

    pub fn ref_count(&self, id: TextureId) -> u32 {
        self.entries.get(&id).map(|e| e.ref_count).unwrap_or(0)
    }

    /// Adjusts the renderable-owner count for `id`, independent of the raw
    /// attach count `request`/`release` track (spec §4.2, glossary "owner
    /// count"). Driven by a node's render-bounds transitioning to/from
    /// `outOfBounds` (spec §4.1 step 1.e) — that transition, not a node
    /// merely holding a reference, is what puts an entry in the zero-ref
    /// set eligible for eviction.
    pub fn set_renderable_owner(&mut self, id: TextureId, active: bool) {
        let Some(entry) = self.entries.get_mut(&id) else {
            return;
        };
        if active {
            entry.owner_count += 1;
            if entry.owner_count == 1 {
                self.zero_ref_lru.pop(&id);
            }
        } else {
            if entry.owner_count == 0 {
                return;
            }
            entry.owner_count -= 1;
            if entry.owner_count == 0 {
                self.zero_ref_lru.put(id, ());
            }
        }
    }

    pub fn owner_count(&self, id: TextureId) -> u32 {
        self.entries.get(&id).map(|e| e.owner_count).unwrap_or(0)
    }

    /// Evicts least-recently-used zero-ref entries until `incoming_bytes`
    /// fits under `byte_threshold`, returning what was freed.
    fn ensure_budget(&mut self, incoming_bytes: u64) -> Vec<TextureId> {
        let mut evicted = Vec::new();
        while self.total_bytes + incoming_bytes > self.settings.byte_threshold {
            let Some((victim, _)) = self.zero_ref_lru.pop_lru() else {
                break;
            };
            if let Some(entry) = self.entries.remove(&victim) {
                self.total_bytes = self.total_bytes.saturating_sub(entry.byte_size);
                self.key_cache.retain(|_, id| *id != victim);
                evicted.push(victim);
            }
        }
        evicted
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn byte_threshold(&self) -> u64 {
        self.settings.byte_threshold
    }

    /// Forcibly frees `id` regardless of refcount, used when the GPU
    /// context is lost (spec §6 context-loss handling).
    pub fn force_free(&mut self, id: TextureId) -> CoreResult<()> {
        let entry = self
            .entries
            .remove(&id)
            .ok_or_else(|| CoreError::UnknownTextureKind(format!("{id}")))?;
        self.total_bytes = self.total_bytes.saturating_sub(entry.byte_size);
        self.key_cache.retain(|_, v| *v != id);
        self.zero_ref_lru.pop(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_with_budget(bytes: u64) -> TextureManager {
        TextureManager::new(TextureMemorySettings {
            byte_threshold: bytes,
            cleanup_interval_ms: 1000,
        })
    }

    #[test]
    fn requesting_same_source_twice_shares_one_id() {
        let mut mgr = manager_with_budget(1_000_000);
        let a = match mgr.request(TextureSource::Color(0xffffffff)) {
            RequestOutcome::New(id) => id,
            _ => panic!("expected new entry"),
        };
        let b = match mgr.request(TextureSource::Color(0xffffffff)) {
            RequestOutcome::Existing(id) => id,
            _ => panic!("expected cache hit"),
        };
        assert_eq!(a, b);
        assert_eq!(mgr.ref_count(a), 2);
    }

    #[test]
    fn releasing_the_attach_ref_alone_does_not_make_an_entry_evictable() {
        let mut mgr = manager_with_budget(1_000_000);
        let id = match mgr.request(TextureSource::Color(1)) {
            RequestOutcome::New(id) => id,
            _ => unreachable!(),
        };
        mgr.mark_loaded(id, 1000);
        mgr.set_renderable_owner(id, true);
        mgr.set_renderable_owner(id, false);
        mgr.release(id);
        assert_eq!(mgr.ref_count(id), 0);
        assert_eq!(mgr.owner_count(id), 0);
        assert_eq!(mgr.state(id), Some(TextureState::Loaded));
    }

    #[test]
    fn zero_owner_entry_is_not_freed_until_budget_pressure() {
        let mut mgr = manager_with_budget(1_000_000);
        let id = match mgr.request(TextureSource::Color(1)) {
            RequestOutcome::New(id) => id,
            _ => unreachable!(),
        };
        mgr.mark_loaded(id, 1000);
        mgr.set_renderable_owner(id, true);
        mgr.set_renderable_owner(id, false);
        assert_eq!(mgr.owner_count(id), 0);
        assert_eq!(mgr.state(id), Some(TextureState::Loaded));
    }

    #[test]
    fn exceeding_budget_evicts_least_recently_used_zero_owner_entries() {
        let mut mgr = manager_with_budget(1500);
        let a = match mgr.request(TextureSource::Color(1)) {
            RequestOutcome::New(id) => id,
            _ => unreachable!(),
        };
        mgr.mark_loaded(a, 1000);
        mgr.set_renderable_owner(a, true);
        mgr.set_renderable_owner(a, false);

        let b = match mgr.request(TextureSource::Color(2)) {
            RequestOutcome::New(id) => id,
            _ => unreachable!(),
        };
        let evicted = mgr.mark_loaded(b, 1000);
        assert_eq!(evicted, vec![a]);
        assert_eq!(mgr.state(a), None);
    }

    #[test]
    fn entries_with_live_owners_are_never_evicted() {
        let mut mgr = manager_with_budget(1500);
        let a = match mgr.request(TextureSource::Color(1)) {
            RequestOutcome::New(id) => id,
            _ => unreachable!(),
        };
        mgr.mark_loaded(a, 1000);
        mgr.set_renderable_owner(a, true);
        // a keeps its one live owner.
        let b = match mgr.request(TextureSource::Color(2)) {
            RequestOutcome::New(id) => id,
            _ => unreachable!(),
        };
        let evicted = mgr.mark_loaded(b, 1000);
        assert!(evicted.is_empty());
        assert_eq!(mgr.state(a), Some(TextureState::Loaded));
    }

    #[test]
    fn released_attach_ref_does_not_resurrect_eviction_eligibility() {
        let mut mgr = manager_with_budget(1500);
        let a = match mgr.request(TextureSource::Color(1)) {
            RequestOutcome::New(id) => id,
            _ => unreachable!(),
        };
        mgr.mark_loaded(a, 1000);
        mgr.set_renderable_owner(a, true);
        mgr.release(a);
        assert_eq!(mgr.ref_count(a), 0);

        let b = match mgr.request(TextureSource::Color(2)) {
            RequestOutcome::New(id) => id,
            _ => unreachable!(),
        };
        let evicted = mgr.mark_loaded(b, 1000);
        assert!(evicted.is_empty());
        assert_eq!(mgr.state(a), Some(TextureState::Loaded));
    }
}
