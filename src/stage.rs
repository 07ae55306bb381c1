//! The public scene API (spec §6, §9): a single [`Stage`] owns the node
//! arena, the texture/font registries, the animation/frame pipeline and a
//! [`Surface`], and exposes the operations an embedding application drives
//! every frame.

use crate::animation::controller::{AnimationSettings, AnimationTarget, PropertyValue, StopMethod};
use crate::animation::controller::AnimatableProperty;
use crate::color::Color;
use crate::config::Settings;
use crate::debug_tools::ContextSpy;
use crate::error::{CoreError, CoreResult, TextureLoadErrorKind};
use crate::frame::FramePipeline;
use crate::id::{AnimationId, FontId, TextureId};
use crate::scene::arena::Arena;
use crate::scene::events::NodeEvent;
use crate::scene::node::{BoundsState, Node, NodeId, ShaderRef, TextureOptions, TextureRef, WorldRect};
use crate::shader::props::ShaderProps;
use crate::surface::{RenderTarget, Surface};
use crate::text::font::{FontHandler, FontMetrics};
use crate::texture::compressed;
use crate::texture::manager::{RequestOutcome, TextureManager};
use crate::texture::source::TextureSource;
use crate::texture::worker::{DecodeRequest, Decoder, DecodeResult};
use std::collections::HashMap;
use std::sync::Arc;

/// What one [`Stage::tick`] did, for the embedding app to act on (draw
/// presentation, frame-time telemetry, etc).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub drew: bool,
    pub visible_count: usize,
    pub batch_count: usize,
}

/// The scene graph plus everything that renders it. Generic over the
/// `Surface` implementation so the exact same `Stage` logic runs against a
/// real `WgpuSurface` or a headless `NullSurface` (spec §6's surface
/// abstraction requirement).
pub struct Stage<S: Surface> {
    settings: Settings,
    arena: Arena,
    textures: TextureManager,
    fonts: FontHandler,
    frame: FramePipeline,
    surface: S,
    decoder: Box<dyn Decoder>,
    spy: ContextSpy,

    texture_waiters: HashMap<TextureId, Vec<NodeId>>,
    rtt_targets: HashMap<NodeId, TextureId>,
}

impl<S: Surface> Stage<S> {
    pub fn new(settings: Settings, surface: S, decoder: Box<dyn Decoder>) -> CoreResult<Self> {
        settings.validate()?;
        let spy = ContextSpy::new(settings.enable_context_spy);
        Ok(Self {
            textures: TextureManager::new(settings.texture_memory),
            fonts: FontHandler::new(),
            frame: FramePipeline::new(),
            arena: Arena::new(),
            surface,
            decoder,
            spy,
            settings,
            texture_waiters: HashMap::new(),
            rtt_targets: HashMap::new(),
        })
    }

    pub fn root(&self) -> NodeId {
        self.arena.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.arena.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.arena.get_mut(id)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn create_node(&mut self, parent: NodeId) -> CoreResult<NodeId> {
        self.arena.create_node(parent)
    }

    pub fn reparent(&mut self, node: NodeId, new_parent: NodeId) -> CoreResult<()> {
        self.arena.reparent(node, new_parent)
    }

    /// Destroys `node` and its subtree, cancelling any running animation on
    /// each destroyed node and releasing its texture reference (spec §4.1,
    /// §4.6 "animating on a destroyed node cancels silently").
    pub fn destroy_node(&mut self, node: NodeId) {
        let mut texture_refs: Vec<(TextureId, bool)> = Vec::new();
        {
            let arena = &self.arena;
            arena.traverse_preorder(node, |id| {
                if let Some(n) = arena.get(id) {
                    if let Some(tex) = n.texture {
                        let was_owner = n.world.bounds_state != BoundsState::OutOfBounds;
                        texture_refs.push((tex.texture_id, was_owner));
                    }
                }
            });
        }

        let destroyed = self.arena.destroy(node);
        for id in destroyed {
            self.frame.animations_mut().cancel_for_node(id);
            self.texture_waiters.retain(|_, waiters| {
                waiters.retain(|w| *w != id);
                !waiters.is_empty()
            });
        }

        for (tex_id, was_owner) in texture_refs {
            if was_owner {
                self.textures.set_renderable_owner(tex_id, false);
            }
            self.textures.release(tex_id);
        }
    }

    fn viewport(&self) -> WorldRect {
        WorldRect {
            min_x: 0.0,
            min_y: 0.0,
            max_x: self.settings.app_width as f32,
            max_y: self.settings.app_height as f32,
        }
    }

    // ---- Textures -------------------------------------------------------

    /// Requests `source` for `node`, assigning it once loaded (immediately,
    /// for sources that need no decode). Returns the shared `TextureId`.
    pub fn set_texture(
        &mut self,
        node: NodeId,
        source: TextureSource,
        options: TextureOptions,
    ) -> CoreResult<TextureId> {
        let Some(existing) = self.arena.get(node) else {
            return Err(CoreError::InvalidTree("node does not exist".into()));
        };
        let is_owner = existing.world.bounds_state != BoundsState::OutOfBounds;
        let previous = existing.texture;

        let outcome = self.textures.request(source.clone());
        let id = match outcome {
            RequestOutcome::Existing(id) => id,
            RequestOutcome::New(id) => {
                self.load_new_source(id, &source);
                id
            }
        };

        if let Some(prev) = previous {
            if prev.texture_id != id {
                if is_owner {
                    self.textures.set_renderable_owner(prev.texture_id, false);
                }
                self.textures.release(prev.texture_id);
                if is_owner {
                    self.textures.set_renderable_owner(id, true);
                }
            }
        } else if is_owner {
            self.textures.set_renderable_owner(id, true);
        }

        if self.textures.state(id) != Some(crate::texture::source::TextureState::Loaded) {
            self.texture_waiters.entry(id).or_default().push(node);
        }

        if let Some(n) = self.arena.get_mut(node) {
            n.texture = Some(TextureRef {
                texture_id: id,
                options,
            });
            n.dirty |= crate::scene::dirty::DirtyBits::RENDER_BOUNDS;
        }
        Ok(id)
    }

    /// Synchronous sources upload immediately; `Image`/`Compressed` go
    /// through the background decoder (spec §4.2, §5).
    fn load_new_source(&mut self, id: TextureId, source: &TextureSource) {
        match source {
            TextureSource::Color(packed) => {
                let bytes = packed.to_be_bytes();
                self.surface.ensure_texture(id, 1, 1);
                self.surface.upload_texture(id, 1, 1, &bytes);
                let evicted = self.textures.mark_loaded(id, 4);
                self.free_evicted(evicted);
            }
            TextureSource::Noise { width, height, seed } => {
                let pixels = generate_noise(*width, *height, *seed);
                self.surface.ensure_texture(id, *width, *height);
                self.surface.upload_texture(id, *width, *height, &pixels);
                let evicted = self.textures.mark_loaded(id, pixels.len() as u64);
                self.free_evicted(evicted);
            }
            TextureSource::RenderTexture { .. } => {
                // Allocated lazily in `sync_rtt_targets` once the owning
                // node's pixel size is known.
                self.textures.mark_loading(id);
            }
            TextureSource::SubTexture { .. } => {
                // A sub-rect of an already-resident texture needs no GPU
                // work of its own; the batcher samples the parent texture
                // with adjusted UVs. Tracked here purely for refcounting.
                self.textures.mark_loading(id);
                let evicted = self.textures.mark_loaded(id, 0);
                self.free_evicted(evicted);
            }
            TextureSource::Image { .. } | TextureSource::Compressed { .. } => {
                self.textures.mark_loading(id);
            }
        }
    }

    /// Submits raw encoded bytes for async decode; call once per distinct
    /// image payload right after `set_texture` returns a `New` id in
    /// `Loading` state.
    pub fn submit_image_bytes(&self, id: TextureId, bytes: Arc<[u8]>, premultiply: bool) {
        self.decoder.submit(DecodeRequest {
            texture_id: id,
            bytes,
            premultiply,
            crop: None,
        });
    }

    pub fn release_texture(&mut self, id: TextureId) {
        self.textures.release(id);
    }

    /// Current lifecycle state of a cached texture entry, `None` once it
    /// has been evicted or force-freed.
    pub fn texture_state(&self, id: TextureId) -> Option<crate::texture::source::TextureState> {
        self.textures.state(id)
    }

    /// Drains the decoder, uploads finished bitmaps, and notifies every
    /// node waiting on each id (spec §4.5-style waiter bookkeeping, mirrored
    /// from [`crate::text::font::FontHandler`]).
    fn poll_textures(&mut self) {
        for result in self.decoder.poll() {
            match result {
                Ok(bitmap) => {
                    self.surface
                        .ensure_texture(bitmap.texture_id, bitmap.width, bitmap.height);
                    self.surface.upload_texture(
                        bitmap.texture_id,
                        bitmap.width,
                        bitmap.height,
                        &bitmap.rgba,
                    );
                    let byte_size = bitmap.rgba.len() as u64;
                    let evicted = self.textures.mark_loaded(bitmap.texture_id, byte_size);
                    self.free_evicted(evicted);
                    self.notify_waiters(
                        bitmap.texture_id,
                        NodeEvent::Loaded {
                            width: bitmap.width,
                            height: bitmap.height,
                        },
                    );
                }
                Err(failure) => {
                    self.textures.mark_failed(failure.texture_id, failure.kind);
                    self.notify_waiters(failure.texture_id, NodeEvent::Failed { kind: failure.kind });
                }
            }
        }
    }

    fn notify_waiters(&mut self, id: TextureId, event: NodeEvent) {
        let Some(waiters) = self.texture_waiters.remove(&id) else {
            return;
        };
        for node_id in waiters {
            if let Some(node) = self.arena.get_mut(node_id) {
                node.events_mut().emit(&event);
            }
        }
    }

    fn free_evicted(&mut self, evicted: Vec<TextureId>) {
        for id in evicted {
            self.surface.free_texture(id);
        }
    }

    /// Parses and uploads a compressed container directly (spec §6
    /// `compressedUploadTexture`), bypassing the RGBA8 decode path.
    pub fn set_compressed_texture(
        &mut self,
        node: NodeId,
        bytes: Arc<[u8]>,
        options: TextureOptions,
    ) -> CoreResult<TextureId> {
        let container = compressed::parse(&bytes)?;
        let hash = content_hash(&bytes);
        let id = self.set_texture(
            node,
            TextureSource::Compressed {
                bytes_hash: hash,
                container: container.format.name().to_string(),
            },
            options,
        )?;
        self.surface.upload_compressed_texture(id, &bytes, &container);
        let evicted = self.textures.mark_loaded(id, container.total_bytes);
        self.free_evicted(evicted);
        Ok(id)
    }

    // ---- Fonts ------------------------------------------------------------

    pub fn register_font(&mut self, family: &str) -> FontId {
        self.fonts.register(family)
    }

    pub fn mark_font_loaded(&mut self, id: FontId, metrics: FontMetrics) {
        for node_id in self.fonts.mark_loaded(id, metrics) {
            if let Some(node) = self.arena.get_mut(node_id) {
                node.dirty |= crate::scene::dirty::DirtyBits::RENDER_BOUNDS;
            }
        }
    }

    pub fn mark_font_failed(&mut self, id: FontId) {
        for node_id in self.fonts.mark_failed(id) {
            if let Some(node) = self.arena.get_mut(node_id) {
                node.events_mut().emit(&NodeEvent::Failed {
                    kind: TextureLoadErrorKind::Decode,
                });
            }
        }
    }

    // ---- Shaders ------------------------------------------------------------

    pub fn set_shader(&mut self, node: NodeId, shader_id: crate::id::ShaderId, props: ShaderProps) {
        if let Some(n) = self.arena.get_mut(node) {
            n.shader = Some(ShaderRef { shader_id, props });
        }
    }

    // ---- Animation ----------------------------------------------------------

    /// Starts an animation, capturing each target's current value straight
    /// from the node (spec §4.6).
    pub fn animate(
        &mut self,
        node: NodeId,
        targets: Vec<AnimationTarget>,
        settings: AnimationSettings,
    ) -> CoreResult<AnimationId> {
        let Some(current) = self.arena.get(node) else {
            return Err(CoreError::AnimationOnDestroyed);
        };
        let snapshot = current_values(current);
        Ok(self
            .frame
            .animations_mut()
            .start(node, targets, settings, move |p| snapshot(p)))
    }

    pub fn stop_animation(&mut self, id: AnimationId, method: StopMethod) {
        if let Some((node_id, values)) = self.frame.animations_mut().stop(id, method) {
            if let Some(node) = self.arena.get_mut(node_id) {
                for (property, value) in values {
                    crate::frame::apply_property(node, property, value);
                }
            }
        }
    }

    pub fn pause_animation(&mut self, id: AnimationId) {
        self.frame.animations_mut().pause(id);
    }

    pub fn resume_animation(&mut self, id: AnimationId) {
        self.frame.animations_mut().resume(id);
    }

    // ---- Frame pipeline -----------------------------------------------------

    /// Runs one full frame: animation step, dirty cascade, texture decode
    /// polling, RTT sub-passes, main pass (spec §4.3). Returns without
    /// drawing at all if the frame was idle (spec §8 property 4).
    pub fn tick(&mut self, dt_ms: f64) -> TickReport {
        self.poll_textures();
        let bounds_margin = self.settings.bounds_margin;
        let outcome = self.frame.step(dt_ms, &mut self.arena, self.viewport(), bounds_margin);

        for transition in &outcome.cascade.bounds_transitions {
            let event = match transition.to {
                BoundsState::InViewport => NodeEvent::InViewport,
                BoundsState::InBounds => NodeEvent::InBounds,
                BoundsState::OutOfBounds => NodeEvent::OutOfBounds,
            };
            let texture_id = self
                .arena
                .get(transition.node_id)
                .and_then(|n| n.texture)
                .map(|t| t.texture_id);
            if let Some(tex_id) = texture_id {
                if transition.to == BoundsState::OutOfBounds {
                    self.textures.set_renderable_owner(tex_id, false);
                } else if transition.from == BoundsState::OutOfBounds {
                    self.textures.set_renderable_owner(tex_id, true);
                }
            }
            if let Some(node) = self.arena.get_mut(transition.node_id) {
                node.events_mut().emit(&event);
            }
        }

        if outcome.is_idle() {
            return TickReport::default();
        }

        self.sync_rtt_targets(&outcome.cascade.visible);
        let groups = self.partition_by_render_target(&outcome.cascade.visible);

        self.surface.begin_frame();
        let mut batch_count = 0;

        // Innermost RTT targets first so a parent's compositing pass can
        // sample an already-up-to-date child texture (spec §4.3 step 3).
        let mut ordered_targets: Vec<RenderTarget> = groups.keys().copied().collect();
        ordered_targets.sort_by_key(|t| match t {
            RenderTarget::Main => i32::MAX,
            RenderTarget::Texture(_) => 0,
        });

        for target in ordered_targets {
            let Some(visible) = groups.get(&target) else {
                continue;
            };
            let batches = crate::batch::build_batches(&self.arena, visible);
            batch_count += batches.len();
            self.surface.begin_pass(target, self.settings.clear_color);
            for batch in &batches {
                self.surface.draw_batch(batch);
                self.spy.record_draw_call(batch_count, batch.indices.len() as u32);
            }
            self.surface.end_pass();
        }
        self.surface.present();

        TickReport {
            drew: true,
            visible_count: outcome.cascade.visible.len(),
            batch_count,
        }
    }

    /// Ensures every `rtt` node has a backing surface texture sized to its
    /// current pixel dimensions, and points its own `texture` field at that
    /// output so the rest of the tree composites it like any other textured
    /// quad (spec §4.3's "RTT sub-pass" step).
    fn sync_rtt_targets(&mut self, visible: &[crate::scene::cascade::VisibleNode]) {
        for v in visible {
            let Some(node) = self.arena.get(v.node_id) else {
                continue;
            };
            if !node.rtt {
                continue;
            }
            let (w, h) = (node.width.max(1.0) as u32, node.height.max(1.0) as u32);
            let tex_id = *self.rtt_targets.entry(v.node_id).or_insert_with(|| {
                let outcome = self
                    .textures
                    .request(TextureSource::RenderTexture {
                        owner_tag: format!("{:?}", v.node_id),
                    });
                match outcome {
                    RequestOutcome::New(id) => {
                        self.textures.mark_loading(id);
                        id
                    }
                    RequestOutcome::Existing(id) => id,
                }
            });
            self.surface.ensure_texture(tex_id, w, h);
            if let Some(node) = self.arena.get_mut(v.node_id) {
                node.texture = Some(TextureRef {
                    texture_id: tex_id,
                    options: TextureOptions::default(),
                });
            }
        }
    }

    /// Groups this frame's visible nodes by which render target they
    /// belong to: a node's nearest `rtt` ancestor, or `Main` if none.
    fn partition_by_render_target(
        &self,
        visible: &[crate::scene::cascade::VisibleNode],
    ) -> HashMap<RenderTarget, Vec<crate::scene::cascade::VisibleNode>> {
        let mut groups: HashMap<RenderTarget, Vec<crate::scene::cascade::VisibleNode>> = HashMap::new();
        for &v in visible {
            let target = self.nearest_render_target(v.node_id);
            groups.entry(target).or_default().push(v);
        }
        groups
    }

    fn nearest_render_target(&self, node_id: NodeId) -> RenderTarget {
        let mut current = self.arena.get(node_id).and_then(|n| n.parent);
        while let Some(id) = current {
            let Some(node) = self.arena.get(id) else {
                break;
            };
            if node.rtt {
                if let Some(&tex) = self.rtt_targets.get(&id) {
                    return RenderTarget::Texture(tex);
                }
            }
            current = node.parent;
        }
        RenderTarget::Main
    }

    // ---- Context loss ---------------------------------------------------

    /// Drops every GPU resource and re-marks every resident texture as
    /// needing reload; the caller is expected to re-submit the original
    /// source bytes for anything still referenced (spec §7).
    pub fn on_context_lost(&mut self) {
        self.surface.on_context_lost();
        self.rtt_targets.clear();
        log::warn!("GPU context lost; all textures must be reloaded");
    }

    pub fn on_context_restored(&mut self) {
        for node_id in self.all_node_ids() {
            if let Some(node) = self.arena.get_mut(node_id) {
                node.dirty = crate::scene::dirty::DirtyBits::all();
            }
        }
    }

    fn all_node_ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::new();
        self.arena.traverse_preorder(self.arena.root, |id| ids.push(id));
        ids
    }
}

/// Snapshots a node's current local value for each animatable property, so
/// `AnimationController::start` can capture a from-value without holding a
/// borrow of the arena across the animation's lifetime.
fn current_values(node: &Node) -> impl Fn(AnimatableProperty) -> PropertyValue {
    let x = node.x;
    let y = node.y;
    let width = node.width;
    let height = node.height;
    let scale_x = node.scale_x;
    let scale_y = node.scale_y;
    let rotation = node.rotation;
    let alpha = node.alpha;
    let z_index = node.z_index;
    let color = node.color_tl;
    move |property| match property {
        AnimatableProperty::X => PropertyValue::Number(x),
        AnimatableProperty::Y => PropertyValue::Number(y),
        AnimatableProperty::Width => PropertyValue::Number(width),
        AnimatableProperty::Height => PropertyValue::Number(height),
        AnimatableProperty::ScaleX => PropertyValue::Number(scale_x),
        AnimatableProperty::ScaleY => PropertyValue::Number(scale_y),
        AnimatableProperty::Rotation => PropertyValue::Number(rotation),
        AnimatableProperty::Alpha => PropertyValue::Number(alpha),
        AnimatableProperty::ZIndex => PropertyValue::Number(z_index),
        AnimatableProperty::Color => PropertyValue::Color(color),
    }
}

fn content_hash(bytes: &[u8]) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = ahash::AHasher::default();
    bytes.hash(&mut hasher);
    hasher.finish()
}

fn generate_noise(width: u32, height: u32, seed: u64) -> Vec<u8> {
    let mut state = seed.wrapping_mul(0x9E3779B97F4A7C15).wrapping_add(1);
    let mut out = Vec::with_capacity((width * height * 4) as usize);
    for _ in 0..(width * height) {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let v = (state & 0xff) as u8;
        out.extend_from_slice(&[v, v, v, 255]);
    }
    out
}
