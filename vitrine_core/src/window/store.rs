// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays window storage with stacking order, grabs and lifetime
//! refs.

use alloc::rc::Rc;
use alloc::vec::Vec;

use bitflags::bitflags;
use kurbo::Rect;
use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use super::id::{INVALID, WindowId};
use super::lifetime::{DeletedRef, RefCounts, VisibilityReasons, VisibleRef};
use crate::dirty;
use crate::effect::{EffectId, GrabRole};
use crate::region::Region;

bitflags! {
    /// Window state reported by the window-management layer.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct WindowFlags: u16 {
        /// Explicitly hidden.
        const HIDDEN = 1 << 0;
        /// Minimized.
        const MINIMIZED = 1 << 1;
        /// Not on the current virtual desktop.
        const OFF_DESKTOP = 1 << 2;
        /// Painted above all normal windows (on-screen displays, notifications).
        const ELEVATED = 1 << 3;
        /// Short-lived popup such as a menu or tooltip.
        const POPUP = 1 << 4;
        /// Client-side opaque; no blending needed at full opacity.
        const OPAQUE = 1 << 5;
        /// Closed. Set by [`WindowStore::close_window`], never by callers.
        const CLOSED = 1 << 15;
    }
}

/// Struct-of-arrays storage for all windows, open and remnant.
///
/// Windows are addressed by [`WindowId`] handles. Closed windows stay in
/// their slot (and in the stacking order) until
/// [`reap_remnants`](Self::reap_remnants) finds no [`DeletedRef`] holding
/// them.
#[derive(Debug)]
pub struct WindowStore {
    // -- Properties --
    pub(crate) geometry: Vec<Rect>,
    pub(crate) painted_geometry: Vec<Rect>,
    pub(crate) opacity: Vec<f64>,
    pub(crate) flags: Vec<WindowFlags>,
    pub(crate) transient_for: Vec<u32>,
    pub(crate) grabs: Vec<[Option<EffectId>; GrabRole::COUNT]>,
    pub(crate) damage: Vec<Region>,
    pub(crate) refs: Vec<Rc<RefCounts>>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) live: Vec<bool>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Stacking, bottom to top --
    pub(crate) stacking: Vec<u32>,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,

    // -- Lifecycle tracking --
    pub(crate) pending_added: Vec<u32>,
    pub(crate) pending_closed: Vec<u32>,
    pub(crate) pending_removed: Vec<(WindowId, Rect)>,
}

impl Default for WindowStore {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            geometry: Vec::new(),
            painted_geometry: Vec::new(),
            opacity: Vec::new(),
            flags: Vec::new(),
            transient_for: Vec::new(),
            grabs: Vec::new(),
            damage: Vec::new(),
            refs: Vec::new(),
            generation: Vec::new(),
            live: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            stacking: Vec::new(),
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            pending_added: Vec::new(),
            pending_closed: Vec::new(),
            pending_removed: Vec::new(),
        }
    }

    // -- Lifecycle --

    /// Adds a mapped window on top of the normal stacking order.
    pub fn create_window(&mut self, geometry: Rect) -> WindowId {
        let geometry = geometry.abs();
        let idx = if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.generation[i] += 1;
            self.geometry[i] = geometry;
            self.painted_geometry[i] = geometry;
            self.opacity[i] = 1.0;
            self.flags[i] = WindowFlags::empty();
            self.transient_for[i] = INVALID;
            self.grabs[i] = [None; GrabRole::COUNT];
            self.damage[i].clear();
            self.refs[i] = Rc::new(RefCounts::default());
            self.live[i] = true;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.geometry.push(geometry);
            self.painted_geometry.push(geometry);
            self.opacity.push(1.0);
            self.flags.push(WindowFlags::empty());
            self.transient_for.push(INVALID);
            self.grabs.push([None; GrabRole::COUNT]);
            self.damage.push(Region::new());
            self.refs.push(Rc::new(RefCounts::default()));
            self.generation.push(0);
            self.live.push(true);
            idx
        };

        self.stacking.push(idx);
        self.pending_added.push(idx);
        self.dirty.mark(idx, dirty::STACKING);

        WindowId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Marks a window closed. It becomes a remnant that effects may keep
    /// painting through a [`DeletedRef`].
    ///
    /// Closing an already closed window does nothing.
    pub fn close_window(&mut self, id: WindowId) {
        self.validate(id);
        let i = id.idx as usize;
        if self.flags[i].contains(WindowFlags::CLOSED) {
            return;
        }
        self.flags[i].insert(WindowFlags::CLOSED);
        self.pending_closed.push(id.idx);
        self.dirty.mark(id.idx, dirty::STACKING);
    }

    /// Removes every closed window that no [`DeletedRef`] keeps alive.
    ///
    /// Returns the handles of the removed windows; they are stale afterwards.
    pub fn reap_remnants(&mut self) -> Vec<WindowId> {
        let mut reaped = Vec::new();
        for idx in 0..self.len {
            let i = idx as usize;
            if self.live[i]
                && self.flags[i].contains(WindowFlags::CLOSED)
                && self.refs[i].deleted() == 0
            {
                let id = WindowId {
                    idx,
                    generation: self.generation[i],
                };
                self.remove_slot(idx);
                reaped.push(id);
            }
        }
        if !reaped.is_empty() {
            tracing::trace!(count = reaped.len(), "reaped window remnants");
        }
        reaped
    }

    /// Returns whether the handle refers to a window still in the store
    /// (open or remnant).
    #[must_use]
    pub fn is_alive(&self, id: WindowId) -> bool {
        id.idx < self.len
            && self.live[id.idx as usize]
            && self.generation[id.idx as usize] == id.generation
    }

    /// Returns whether the window has been closed.
    #[must_use]
    pub fn is_closed(&self, id: WindowId) -> bool {
        self.validate(id);
        self.flags[id.idx as usize].contains(WindowFlags::CLOSED)
    }

    /// Returns the number of windows in the store, remnants included.
    #[must_use]
    pub fn window_count(&self) -> usize {
        self.stacking.len()
    }

    // -- Stacking --

    /// Returns all windows bottom to top in painting order.
    ///
    /// Elevated windows follow every normal window, keeping their relative
    /// order.
    #[must_use]
    pub fn stacking_order(&self) -> Vec<WindowId> {
        let handle = |&idx: &u32| WindowId {
            idx,
            generation: self.generation[idx as usize],
        };
        let elevated = |idx: &&u32| self.flags[**idx as usize].contains(WindowFlags::ELEVATED);
        self.stacking
            .iter()
            .filter(|idx| !elevated(idx))
            .chain(self.stacking.iter().filter(&elevated))
            .map(handle)
            .collect()
    }

    /// Moves a window to the top of the stacking order.
    pub fn raise(&mut self, id: WindowId) {
        self.validate(id);
        self.stacking.retain(|&i| i != id.idx);
        self.stacking.push(id.idx);
        self.dirty.mark(id.idx, dirty::STACKING);
    }

    /// Moves a window to the bottom of the stacking order.
    pub fn lower(&mut self, id: WindowId) {
        self.validate(id);
        self.stacking.retain(|&i| i != id.idx);
        self.stacking.insert(0, id.idx);
        self.dirty.mark(id.idx, dirty::STACKING);
    }

    // -- Properties --

    /// Returns the window's frame geometry in global coordinates.
    #[must_use]
    pub fn geometry(&self, id: WindowId) -> Rect {
        self.validate(id);
        self.geometry[id.idx as usize]
    }

    /// Moves or resizes a window.
    ///
    /// Marks GEOMETRY with eager propagation, so transients of this window
    /// are damaged too.
    pub fn set_geometry(&mut self, id: WindowId, geometry: Rect) {
        self.validate(id);
        self.geometry[id.idx as usize] = geometry.abs();
        self.dirty.mark_with(id.idx, dirty::GEOMETRY, &EagerPolicy);
    }

    /// Returns the window's base opacity in `0.0..=1.0`.
    #[must_use]
    pub fn opacity(&self, id: WindowId) -> f64 {
        self.validate(id);
        self.opacity[id.idx as usize]
    }

    /// Sets the window's base opacity, clamped to `0.0..=1.0`.
    pub fn set_opacity(&mut self, id: WindowId, opacity: f64) {
        self.validate(id);
        self.opacity[id.idx as usize] = opacity.clamp(0.0, 1.0);
        self.dirty.mark(id.idx, dirty::OPACITY);
    }

    /// Returns the window's state flags.
    #[must_use]
    pub fn flags(&self, id: WindowId) -> WindowFlags {
        self.validate(id);
        self.flags[id.idx as usize]
    }

    /// Replaces the window's state flags. [`WindowFlags::CLOSED`] is
    /// preserved and cannot be set or cleared here.
    pub fn set_flags(&mut self, id: WindowId, flags: WindowFlags) {
        self.validate(id);
        let i = id.idx as usize;
        let closed = self.flags[i] & WindowFlags::CLOSED;
        self.flags[i] = (flags - WindowFlags::CLOSED) | closed;
        self.dirty.mark(id.idx, dirty::STACKING);
    }

    /// Returns the window this one is transient for, if any.
    #[must_use]
    pub fn transient_for(&self, id: WindowId) -> Option<WindowId> {
        self.validate(id);
        let p = self.transient_for[id.idx as usize];
        (p != INVALID && self.live[p as usize]).then(|| WindowId {
            idx: p,
            generation: self.generation[p as usize],
        })
    }

    /// Sets or clears the window this one is transient for.
    ///
    /// A transient's GEOMETRY channel depends on its parent's. A parent
    /// assignment that would form a cycle is ignored.
    pub fn set_transient_for(&mut self, id: WindowId, parent: Option<WindowId>) {
        self.validate(id);
        let c = id.idx;
        let old = self.transient_for[c as usize];
        if old != INVALID {
            self.dirty.remove_dependency(c, old, dirty::GEOMETRY);
            self.transient_for[c as usize] = INVALID;
        }
        if let Some(parent) = parent {
            self.validate(parent);
            if self.is_transient_ancestor(c, parent.idx) {
                tracing::warn!(window = ?id, ?parent, "ignoring cyclic transient relation");
                return;
            }
            let _ = self.dirty.add_dependency(c, parent.idx, dirty::GEOMETRY);
            self.transient_for[c as usize] = parent.idx;
        }
    }

    /// Returns `true` if `start` is `from` or lies on the transient chain
    /// above `from`.
    fn is_transient_ancestor(&self, start: u32, from: u32) -> bool {
        let mut cur = from;
        // The chain is acyclic, so it is at most `len` long.
        for _ in 0..=self.len {
            if cur == start {
                return true;
            }
            if cur == INVALID {
                return false;
            }
            cur = self.transient_for[cur as usize];
        }
        true
    }

    /// Reports client damage in global coordinates.
    ///
    /// An empty region damages the whole window.
    pub fn add_damage(&mut self, id: WindowId, region: &Region) {
        self.validate(id);
        let i = id.idx as usize;
        if region.is_empty() {
            self.damage[i].add_rect(self.geometry[i]);
        } else {
            self.damage[i].union_with(region);
        }
        self.dirty.mark(id.idx, dirty::CONTENT);
    }

    // -- Grab roles --

    /// Returns the effect currently owning `role` on the window.
    #[must_use]
    pub fn grab(&self, id: WindowId, role: GrabRole) -> Option<EffectId> {
        self.validate(id);
        self.grabs[id.idx as usize][role.index()]
    }

    /// Claims `role` for `effect`. Returns `false` if another effect already
    /// owns it; the existing claim is kept.
    pub fn try_grab(&mut self, id: WindowId, role: GrabRole, effect: EffectId) -> bool {
        self.validate(id);
        let slot = &mut self.grabs[id.idx as usize][role.index()];
        match slot {
            Some(owner) => *owner == effect,
            None => {
                *slot = Some(effect);
                true
            }
        }
    }

    /// Releases `role` if `effect` owns it.
    pub fn release_grab(&mut self, id: WindowId, role: GrabRole, effect: EffectId) {
        self.validate(id);
        let slot = &mut self.grabs[id.idx as usize][role.index()];
        if *slot == Some(effect) {
            *slot = None;
        }
    }

    /// Releases every grab held by `effect` (used when it is unloaded).
    pub fn release_grabs_of(&mut self, effect: EffectId) {
        for roles in &mut self.grabs {
            for slot in roles.iter_mut() {
                if *slot == Some(effect) {
                    *slot = None;
                }
            }
        }
    }

    // -- Lifetime refs --

    /// Takes a ref that keeps the window's remnant alive after close.
    #[must_use]
    pub fn deleted_ref(&self, id: WindowId) -> DeletedRef {
        self.validate(id);
        DeletedRef::new(id, Rc::clone(&self.refs[id.idx as usize]))
    }

    /// Takes a ref that forces the window visible for `reasons`.
    #[must_use]
    pub fn visible_ref(&self, id: WindowId, reasons: VisibilityReasons) -> VisibleRef {
        self.validate(id);
        VisibleRef::new(id, reasons, Rc::clone(&self.refs[id.idx as usize]))
    }

    /// Returns the number of live [`DeletedRef`]s for the window.
    #[must_use]
    pub fn deleted_ref_count(&self, id: WindowId) -> u32 {
        self.validate(id);
        self.refs[id.idx as usize].deleted()
    }

    /// Returns the reasons for which the window is currently forced visible.
    #[must_use]
    pub fn forced_visible(&self, id: WindowId) -> VisibilityReasons {
        self.validate(id);
        self.refs[id.idx as usize].forced_reasons()
    }

    /// Returns why the window would not be painted, after subtracting every
    /// reason overridden by a [`VisibleRef`]. Empty means it is painted.
    #[must_use]
    pub fn paint_disabled(&self, id: WindowId) -> VisibilityReasons {
        self.validate(id);
        let i = id.idx as usize;
        let flags = self.flags[i];
        let mut reasons = VisibilityReasons::empty();
        reasons.set(VisibilityReasons::HIDDEN, flags.contains(WindowFlags::HIDDEN));
        reasons.set(VisibilityReasons::DELETED, flags.contains(WindowFlags::CLOSED));
        reasons.set(
            VisibilityReasons::DESKTOP,
            flags.contains(WindowFlags::OFF_DESKTOP),
        );
        reasons.set(
            VisibilityReasons::MINIMIZED,
            flags.contains(WindowFlags::MINIMIZED),
        );
        reasons - self.refs[i].forced_reasons()
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: WindowId) {
        assert!(
            self.is_alive(id),
            "stale WindowId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    pub(crate) fn handle(&self, idx: u32) -> WindowId {
        WindowId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    fn remove_slot(&mut self, idx: u32) {
        let i = idx as usize;
        let id = self.handle(idx);
        self.pending_removed.push((id, self.painted_geometry[i]));
        self.stacking.retain(|&s| s != idx);
        // Orphan any transients of this window.
        for t in &mut self.transient_for {
            if *t == idx {
                *t = INVALID;
            }
        }
        self.dirty.remove_key(idx);
        self.damage[i].clear();
        self.transient_for[i] = INVALID;
        self.live[i] = false;
        self.generation[i] += 1;
        self.free_list.push(idx);
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Rect {
        Rect::new(x, y, x + w, y + h)
    }

    #[test]
    fn create_and_reap_without_refs() {
        let mut store = WindowStore::new();
        let w = store.create_window(rect(0.0, 0.0, 100.0, 100.0));
        assert!(store.is_alive(w));
        store.close_window(w);
        assert!(store.is_alive(w), "closed window stays as a remnant until reaped");
        assert_eq!(store.reap_remnants(), vec![w]);
        assert!(!store.is_alive(w));
    }

    #[test]
    fn deleted_ref_defers_reaping() {
        let mut store = WindowStore::new();
        let w = store.create_window(rect(0.0, 0.0, 10.0, 10.0));
        let keep = store.deleted_ref(w);
        store.close_window(w);
        assert!(store.reap_remnants().is_empty());
        assert!(store.is_alive(w));
        drop(keep);
        assert_eq!(store.reap_remnants(), vec![w]);
    }

    #[test]
    fn ref_count_round_trip() {
        let mut store = WindowStore::new();
        let w = store.create_window(rect(0.0, 0.0, 10.0, 10.0));
        let before = store.deleted_ref_count(w);
        let refs: Vec<_> = (0..8).map(|_| store.deleted_ref(w)).collect();
        let copies: Vec<_> = refs.clone();
        assert_eq!(store.deleted_ref_count(w), before + 16);
        drop(copies);
        drop(refs);
        assert_eq!(store.deleted_ref_count(w), before);
    }

    #[test]
    fn generation_prevents_stale_access() {
        let mut store = WindowStore::new();
        let a = store.create_window(rect(0.0, 0.0, 1.0, 1.0));
        store.close_window(a);
        let _ = store.reap_remnants();
        let b = store.create_window(rect(0.0, 0.0, 1.0, 1.0));
        assert_eq!(a.index(), b.index());
        assert!(!store.is_alive(a));
        assert!(store.is_alive(b));
    }

    #[test]
    fn refs_do_not_leak_into_reused_slot() {
        let mut store = WindowStore::new();
        let a = store.create_window(rect(0.0, 0.0, 1.0, 1.0));
        let vis = store.visible_ref(a, VisibilityReasons::MINIMIZED);
        store.close_window(a);
        let _ = store.reap_remnants();
        let b = store.create_window(rect(0.0, 0.0, 1.0, 1.0));
        assert!(store.forced_visible(b).is_empty());
        drop(vis);
    }

    #[test]
    #[should_panic(expected = "stale WindowId")]
    fn reaped_handle_panics() {
        let mut store = WindowStore::new();
        let w = store.create_window(rect(0.0, 0.0, 1.0, 1.0));
        store.close_window(w);
        let _ = store.reap_remnants();
        let _ = store.geometry(w);
    }

    #[test]
    fn elevated_windows_paint_last() {
        let mut store = WindowStore::new();
        let osd = store.create_window(rect(0.0, 0.0, 1.0, 1.0));
        let a = store.create_window(rect(0.0, 0.0, 1.0, 1.0));
        let b = store.create_window(rect(0.0, 0.0, 1.0, 1.0));
        store.set_flags(osd, WindowFlags::ELEVATED);
        assert_eq!(store.stacking_order(), vec![a, b, osd]);
        store.raise(a);
        assert_eq!(store.stacking_order(), vec![b, a, osd]);
        store.lower(a);
        assert_eq!(store.stacking_order(), vec![a, b, osd]);
    }

    #[test]
    fn first_grab_wins() {
        let mut store = WindowStore::new();
        let w = store.create_window(rect(0.0, 0.0, 1.0, 1.0));
        assert!(store.try_grab(w, GrabRole::WindowClosed, EffectId(1)));
        assert!(!store.try_grab(w, GrabRole::WindowClosed, EffectId(2)));
        assert!(store.try_grab(w, GrabRole::WindowClosed, EffectId(1)), "re-claim by owner succeeds");
        assert_eq!(store.grab(w, GrabRole::WindowClosed), Some(EffectId(1)));
        assert_eq!(store.grab(w, GrabRole::WindowAdded), None);
        store.release_grabs_of(EffectId(1));
        assert_eq!(store.grab(w, GrabRole::WindowClosed), None);
    }

    #[test]
    fn paint_disabled_respects_visible_refs() {
        let mut store = WindowStore::new();
        let w = store.create_window(rect(0.0, 0.0, 1.0, 1.0));
        store.set_flags(w, WindowFlags::MINIMIZED | WindowFlags::OFF_DESKTOP);
        assert_eq!(
            store.paint_disabled(w),
            VisibilityReasons::MINIMIZED | VisibilityReasons::DESKTOP
        );
        let vis = store.visible_ref(w, VisibilityReasons::MINIMIZED);
        assert_eq!(store.paint_disabled(w), VisibilityReasons::DESKTOP);
        drop(vis);
        store.close_window(w);
        assert!(store.paint_disabled(w).contains(VisibilityReasons::DELETED));
    }

    #[test]
    fn set_flags_cannot_reopen() {
        let mut store = WindowStore::new();
        let w = store.create_window(rect(0.0, 0.0, 1.0, 1.0));
        store.close_window(w);
        store.set_flags(w, WindowFlags::empty());
        assert!(store.is_closed(w));
    }

    #[test]
    fn cyclic_transient_is_ignored() {
        let mut store = WindowStore::new();
        let a = store.create_window(rect(0.0, 0.0, 1.0, 1.0));
        let b = store.create_window(rect(0.0, 0.0, 1.0, 1.0));
        store.set_transient_for(b, Some(a));
        store.set_transient_for(a, Some(b));
        assert_eq!(store.transient_for(b), Some(a));
        assert_eq!(store.transient_for(a), None);
    }
}
