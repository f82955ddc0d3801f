// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-frame change collection.
//!
//! Collection drains each dirty channel once and converts the result into a
//! damage region in global coordinates:
//!
//! 1. **GEOMETRY**: the area the window covered when last collected plus
//!    the area it covers now (a move damages both the vacated and the newly
//!    covered pixels). Transients arrive here through their dependency edge.
//! 2. **CONTENT**: the client damage accumulated by
//!    [`add_damage`](super::WindowStore::add_damage).
//! 3. **OPACITY** / **STACKING**: the whole window.
//! 4. Windows removed by [`reap_remnants`](super::WindowStore::reap_remnants)
//!    since the last collection damage the area they last covered.

use alloc::vec::Vec;

use super::id::WindowId;
use super::store::WindowStore;
use crate::dirty;
use crate::region::Region;

/// The changes produced by one [`WindowStore::collect_changes`] call.
#[derive(Clone, Debug, Default)]
pub struct WindowChanges {
    /// Windows created since the last collection.
    pub added: Vec<WindowId>,
    /// Windows closed since the last collection (now remnants).
    pub closed: Vec<WindowId>,
    /// Remnants removed since the last collection. These handles are stale.
    pub removed: Vec<WindowId>,
    /// Windows whose geometry changed, directly or through a transient parent.
    pub geometry: Vec<WindowId>,
    /// Windows with new client content.
    pub content: Vec<WindowId>,
    /// Windows whose opacity changed.
    pub opacity: Vec<WindowId>,
    /// Whether the stacking order or any window's state flags changed.
    pub stacking_changed: bool,
    /// Union of every area that needs repainting.
    pub damage: Region,
}

impl WindowChanges {
    /// Clears all change lists.
    pub fn clear(&mut self) {
        self.added.clear();
        self.closed.clear();
        self.removed.clear();
        self.geometry.clear();
        self.content.clear();
        self.opacity.clear();
        self.stacking_changed = false;
        self.damage.clear();
    }

    /// Returns `true` if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.closed.is_empty()
            && self.removed.is_empty()
            && self.damage.is_empty()
            && !self.stacking_changed
    }
}

impl WindowStore {
    /// Drains all dirty channels and returns what changed.
    pub fn collect_changes(&mut self) -> WindowChanges {
        let mut changes = WindowChanges::default();
        self.collect_changes_into(&mut changes);
        changes
    }

    /// Like [`collect_changes`](Self::collect_changes), but reuses a
    /// caller-provided buffer.
    pub fn collect_changes_into(&mut self, changes: &mut WindowChanges) {
        changes.clear();

        for idx in core::mem::take(&mut self.pending_added) {
            if self.live[idx as usize] {
                changes.added.push(self.handle(idx));
            }
        }
        for idx in core::mem::take(&mut self.pending_closed) {
            if self.live[idx as usize] {
                changes.closed.push(self.handle(idx));
            }
        }
        for (id, rect) in self.pending_removed.drain(..) {
            changes.removed.push(id);
            changes.damage.add_rect(rect);
        }

        let moved = self.drain_live(dirty::GEOMETRY);
        for &idx in &moved {
            let i = idx as usize;
            changes.damage.add_rect(self.painted_geometry[i]);
            changes.damage.add_rect(self.geometry[i]);
            self.painted_geometry[i] = self.geometry[i];
            changes.geometry.push(self.handle(idx));
        }

        for idx in self.drain_live(dirty::CONTENT) {
            let damage = core::mem::take(&mut self.damage[idx as usize]);
            changes.damage.union_with(&damage);
            changes.content.push(self.handle(idx));
        }

        for idx in self.drain_live(dirty::OPACITY) {
            changes.damage.add_rect(self.geometry[idx as usize]);
            changes.opacity.push(self.handle(idx));
        }

        let restacked = self.drain_live(dirty::STACKING);
        changes.stacking_changed = !restacked.is_empty();
        for idx in restacked {
            changes.damage.add_rect(self.geometry[idx as usize]);
        }
    }

    fn drain_live(&mut self, channel: understory_dirty::Channel) -> Vec<u32> {
        let mut out: Vec<u32> = self
            .dirty
            .drain(channel)
            .affected()
            .deterministic()
            .run()
            .collect();
        out.retain(|&idx| idx < self.len && self.live[idx as usize]);
        out
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Rect;

    use super::*;
    use crate::window::WindowFlags;

    #[test]
    fn move_damages_old_and_new_area() {
        let mut store = WindowStore::new();
        let w = store.create_window(Rect::new(0.0, 0.0, 10.0, 10.0));
        let _ = store.collect_changes();

        store.set_geometry(w, Rect::new(100.0, 0.0, 110.0, 10.0));
        let changes = store.collect_changes();
        assert_eq!(changes.geometry, alloc::vec![w]);
        assert_eq!(
            changes.damage,
            Region::from_rects([
                Rect::new(0.0, 0.0, 10.0, 10.0),
                Rect::new(100.0, 0.0, 110.0, 10.0)
            ])
        );

        let again = store.collect_changes();
        assert!(again.is_empty(), "nothing left after draining");
    }

    #[test]
    fn moving_parent_damages_transient() {
        let mut store = WindowStore::new();
        let parent = store.create_window(Rect::new(0.0, 0.0, 100.0, 100.0));
        let popup = store.create_window(Rect::new(10.0, 10.0, 30.0, 30.0));
        store.set_transient_for(popup, Some(parent));
        let _ = store.collect_changes();

        store.set_geometry(parent, Rect::new(0.0, 0.0, 100.0, 100.0));
        let changes = store.collect_changes();
        assert!(changes.geometry.contains(&parent));
        assert!(changes.geometry.contains(&popup), "transient follows its parent");
    }

    #[test]
    fn content_damage_is_accumulated_and_consumed() {
        let mut store = WindowStore::new();
        let w = store.create_window(Rect::new(0.0, 0.0, 100.0, 100.0));
        let _ = store.collect_changes();

        store.add_damage(w, &Region::from_rect(Rect::new(0.0, 0.0, 5.0, 5.0)));
        store.add_damage(w, &Region::from_rect(Rect::new(50.0, 50.0, 60.0, 60.0)));
        let changes = store.collect_changes();
        assert_eq!(changes.content, alloc::vec![w]);
        assert_eq!(changes.damage.area(), 25.0 + 100.0);
    }

    #[test]
    fn lifecycle_is_reported_once() {
        let mut store = WindowStore::new();
        let w = store.create_window(Rect::new(0.0, 0.0, 10.0, 10.0));
        let first = store.collect_changes();
        assert_eq!(first.added, alloc::vec![w]);
        assert!(first.stacking_changed);

        store.close_window(w);
        let closed = store.collect_changes();
        assert_eq!(closed.closed, alloc::vec![w]);

        let _ = store.reap_remnants();
        let removed = store.collect_changes();
        assert_eq!(removed.removed, alloc::vec![w]);
        assert_eq!(removed.damage, Region::from_rect(Rect::new(0.0, 0.0, 10.0, 10.0)));
    }

    #[test]
    fn flag_change_marks_stacking() {
        let mut store = WindowStore::new();
        let w = store.create_window(Rect::new(0.0, 0.0, 10.0, 10.0));
        let _ = store.collect_changes();
        store.set_flags(w, WindowFlags::MINIMIZED);
        assert!(store.collect_changes().stacking_changed);
    }
}
