use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::render::PipelineKey;

use super::encoder::{encode, BindState};
use super::plan::DrawPlan;
use super::{Primitive, PrimitiveId};

/// Cache slot: one primitive drawn with one set of bind groups.
type SlotId = (PrimitiveId, u64);

/// Mutable state a recorded bundle depends on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct BundleKey {
    version: u64,
    pipeline: PipelineKey,
}

impl BundleKey {
    fn of(primitive: &Primitive, state: &BindState<'_>) -> Self {
        Self {
            version: primitive.version(),
            pipeline: state.pipeline_key,
        }
    }
}

fn slot_id(primitive: &Primitive, state: &BindState<'_>) -> SlotId {
    (primitive.id(), state.binding)
}

#[derive(Debug)]
struct Slot<T> {
    key: BundleKey,
    value: T,
    last_used: u64,
}

/// Per-primitive storage with frame-based usage tracking.
#[derive(Debug)]
struct Slots<T> {
    entries: HashMap<SlotId, Slot<T>>,
    frame: u64,
}

impl<T> Default for Slots<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            frame: 0,
        }
    }
}

impl<T> Slots<T> {
    /// Returns the value when its key still matches, marking it used this frame.
    fn lookup(&mut self, id: SlotId, key: &BundleKey) -> Option<&T> {
        let frame = self.frame;
        let slot = self.entries.get_mut(&id).filter(|s| s.key == *key)?;
        slot.last_used = frame;
        Some(&slot.value)
    }

    fn insert(&mut self, id: SlotId, key: BundleKey, value: T) -> &T {
        let slot = Slot {
            key,
            value,
            last_used: self.frame,
        };
        match self.entries.entry(id) {
            Entry::Occupied(mut o) => {
                o.insert(slot);
                &o.into_mut().value
            }
            Entry::Vacant(v) => &v.insert(slot).value,
        }
    }

    /// Drops every slot of `primitive`; returns how many.
    fn remove_primitive(&mut self, primitive: PrimitiveId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(p, _), _| *p != primitive);
        before - self.entries.len()
    }

    /// Drops entries not used since the previous call; returns how many.
    fn begin_frame(&mut self) -> usize {
        let before = self.entries.len();
        let current = self.frame;
        self.entries.retain(|_, s| s.last_used >= current);
        self.frame += 1;
        before - self.entries.len()
    }
}

/// Cached bind state per primitive, recorded as wgpu render bundles.
///
/// A bundle captures pipeline, bind groups, vertex/index buffers and the draw
/// call, so replaying it skips re-specifying buffer bindings. This plays the
/// role a vertex-array object plays under OpenGL. Bundles are kept per
/// primitive and binding, and re-recorded when the primitive's version or the
/// pipeline key changes.
#[derive(Default)]
pub struct BindCache {
    slots: Slots<wgpu::RenderBundle>,
}

impl BindCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh bundle for `primitive` drawn with `state`, if one is cached.
    pub(super) fn lookup(
        &mut self,
        primitive: &Primitive,
        state: &BindState<'_>,
    ) -> Option<&wgpu::RenderBundle> {
        self.slots
            .lookup(slot_id(primitive, state), &BundleKey::of(primitive, state))
    }

    /// Records a bundle for `plan` and stores it, replacing any stale one.
    pub(super) fn record(
        &mut self,
        device: &wgpu::Device,
        state: &BindState<'_>,
        primitive: &Primitive,
        plan: &DrawPlan,
    ) -> &wgpu::RenderBundle {
        let key = BundleKey::of(primitive, state);
        let color_formats = [Some(key.pipeline.color_format)];

        let mut enc = device.create_render_bundle_encoder(&wgpu::RenderBundleEncoderDescriptor {
            label: Some("lumen primitive bundle"),
            color_formats: &color_formats,
            depth_stencil: key.pipeline.depth_format.map(|format| {
                wgpu::RenderBundleDepthStencil {
                    format,
                    depth_read_only: false,
                    stencil_read_only: true,
                }
            }),
            sample_count: 1,
            ..Default::default()
        });
        encode(&mut enc, state, primitive, plan);
        let bundle = enc.finish(&wgpu::RenderBundleDescriptor {
            label: Some(primitive.label()),
        });

        log::trace!("recorded bind bundle for `{}` (v{})", primitive.label(), key.version);
        self.slots.insert(slot_id(primitive, state), key, bundle)
    }

    /// Starts a frame, evicting bundles that went unused during the last one.
    pub fn begin_frame(&mut self) -> usize {
        self.slots.begin_frame()
    }

    /// Drops every bundle recorded for `id`; returns how many.
    pub fn evict(&mut self, id: PrimitiveId) -> usize {
        self.slots.remove_primitive(id)
    }

    pub fn clear(&mut self) {
        self.slots.entries.clear();
    }

    pub fn contains(&self, id: PrimitiveId) -> bool {
        self.slots.entries.keys().any(|(p, _)| *p == id)
    }

    pub fn len(&self) -> usize {
        self.slots.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.entries.is_empty()
    }
}
