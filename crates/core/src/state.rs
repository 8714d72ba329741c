//! Per-screen tiling state.
//!
//! `TilingState` is a pure data record with invariant-preserving mutators:
//! the ordered window list, the floating exclusion set, the focused window
//! and the master/stack tunables for one screen. It contains no layout
//! logic; algorithms read it, the engine mutates it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{Rect, WindowId};

/// Upper bound for the master area window count.
pub const MAX_MASTER_COUNT: usize = 10;

/// Lower bound for the master/stack split ratio.
pub const MIN_SPLIT_RATIO: f64 = 0.1;

/// Upper bound for the master/stack split ratio.
pub const MAX_SPLIT_RATIO: f64 = 0.9;

/// Tolerance below which two split ratios are considered equal, so that
/// slider input does not generate a change for every sub-pixel wiggle.
pub const RATIO_EPSILON: f64 = 1e-4;

/// Mutable tiling record for a single screen.
///
/// Invariants upheld by every mutator:
/// - `window_order` contains no duplicates
/// - `floating` is a subset of `window_order`
/// - `focused` is `None` or a member of `window_order`
/// - `master_count` stays in `[1, MAX_MASTER_COUNT]`
/// - `split_ratio` stays in `[MIN_SPLIT_RATIO, MAX_SPLIT_RATIO]`
#[derive(Debug, Clone)]
pub struct TilingState {
    screen_id: String,
    window_order: Vec<WindowId>,
    floating: HashSet<WindowId>,
    focused: Option<WindowId>,
    master_count: usize,
    split_ratio: f64,
    last_geometry: Vec<Rect>,
}

/// Serializable snapshot of a `TilingState`.
///
/// Restoring validates that `floating` and `focused` refer to members of
/// `window_order`; invalid entries are discarded rather than failing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub screen_id: String,
    pub window_order: Vec<WindowId>,
    pub floating: Vec<WindowId>,
    pub focused: Option<WindowId>,
    pub master_count: usize,
    pub split_ratio: f64,
}

impl TilingState {
    /// Create an empty state for a screen.
    pub fn new(screen_id: impl Into<String>) -> Self {
        Self {
            screen_id: screen_id.into(),
            window_order: Vec::new(),
            floating: HashSet::new(),
            focused: None,
            master_count: 1,
            split_ratio: 0.55,
            last_geometry: Vec::new(),
        }
    }

    pub fn screen_id(&self) -> &str {
        &self.screen_id
    }

    /// Full tracked window order, floating windows included.
    pub fn window_order(&self) -> &[WindowId] {
        &self.window_order
    }

    /// The tiled subsequence: tracked windows that are not floating,
    /// in order. This is the sequence zones are computed for.
    pub fn tiled_windows(&self) -> Vec<WindowId> {
        self.window_order
            .iter()
            .filter(|id| !self.floating.contains(*id))
            .cloned()
            .collect()
    }

    pub fn window_count(&self) -> usize {
        self.window_order.len()
    }

    pub fn tiled_window_count(&self) -> usize {
        self.window_order
            .iter()
            .filter(|id| !self.floating.contains(*id))
            .count()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.window_order.iter().any(|w| w == id)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.window_order.iter().position(|w| w == id)
    }

    pub fn is_floating(&self, id: &str) -> bool {
        self.floating.contains(id)
    }

    pub fn focused(&self) -> Option<&WindowId> {
        self.focused.as_ref()
    }

    pub fn master_count(&self) -> usize {
        self.master_count
    }

    pub fn split_ratio(&self) -> f64 {
        self.split_ratio
    }

    /// Rectangles stored by the last successful recompute, aligned by index
    /// with the tiled subsequence at that time. Empty when stale.
    pub fn last_geometry(&self) -> &[Rect] {
        &self.last_geometry
    }

    /// Add a window at `position` (clamped to the valid range).
    ///
    /// Fails without mutation if `id` is empty or already tracked.
    pub fn add_window(&mut self, id: impl Into<WindowId>, position: Option<usize>) -> bool {
        let id = id.into();
        if id.is_empty() || self.contains(&id) {
            return false;
        }
        let pos = position
            .unwrap_or(self.window_order.len())
            .min(self.window_order.len());
        self.window_order.insert(pos, id);
        true
    }

    /// Insert a window immediately after the focused window, or at the end
    /// when there is no focus (or the focus is no longer tracked).
    pub fn insert_after_focused(&mut self, id: impl Into<WindowId>) -> bool {
        let pos = self
            .focused
            .as_ref()
            .and_then(|f| self.index_of(f))
            .map(|i| i + 1);
        self.add_window(id, pos)
    }

    /// Remove a window from the order and the floating set, clearing focus
    /// if it pointed at the window.
    pub fn remove_window(&mut self, id: &str) -> bool {
        let Some(pos) = self.index_of(id) else {
            return false;
        };
        self.window_order.remove(pos);
        self.floating.remove(id);
        if self.focused.as_deref() == Some(id) {
            self.focused = None;
        }
        true
    }

    /// Move a window from one position to another. Bounds-checked; equal
    /// indices are a successful no-op.
    pub fn move_window(&mut self, from: usize, to: usize) -> bool {
        let len = self.window_order.len();
        if from >= len || to >= len {
            return false;
        }
        if from != to {
            let id = self.window_order.remove(from);
            self.window_order.insert(to, id);
        }
        true
    }

    /// Swap the windows at two positions. Bounds-checked; equal indices are
    /// a successful no-op.
    pub fn swap_windows(&mut self, i: usize, j: usize) -> bool {
        let len = self.window_order.len();
        if i >= len || j >= len {
            return false;
        }
        self.window_order.swap(i, j);
        true
    }

    /// Swap two windows by id. Both must be tracked on this screen.
    pub fn swap_ids(&mut self, a: &str, b: &str) -> bool {
        match (self.index_of(a), self.index_of(b)) {
            (Some(i), Some(j)) => self.swap_windows(i, j),
            _ => false,
        }
    }

    /// Rotate the tiled subsequence by one position, leaving floating
    /// windows anchored where they are. Returns false for fewer than two
    /// tiled windows.
    pub fn rotate(&mut self, clockwise: bool) -> bool {
        let tiled_indices: Vec<usize> = self
            .window_order
            .iter()
            .enumerate()
            .filter(|(_, id)| !self.floating.contains(*id))
            .map(|(i, _)| i)
            .collect();
        if tiled_indices.len() < 2 {
            return false;
        }
        let mut tiled: Vec<WindowId> = tiled_indices
            .iter()
            .map(|&i| self.window_order[i].clone())
            .collect();
        if clockwise {
            tiled.rotate_right(1);
        } else {
            tiled.rotate_left(1);
        }
        for (slot, id) in tiled_indices.into_iter().zip(tiled) {
            self.window_order[slot] = id;
        }
        true
    }

    /// Set the master window count, clamped to
    /// `[1, min(MAX_MASTER_COUNT, tiled_window_count)]`.
    /// Returns whether the stored value changed.
    pub fn set_master_count(&mut self, n: usize) -> bool {
        let ceiling = MAX_MASTER_COUNT.min(self.tiled_window_count().max(1));
        let clamped = n.clamp(1, ceiling);
        if clamped == self.master_count {
            return false;
        }
        self.master_count = clamped;
        true
    }

    /// Set the split ratio, clamped to the allowed range. Returns whether
    /// the stored value changed (compared with `RATIO_EPSILON` tolerance).
    pub fn set_split_ratio(&mut self, ratio: f64) -> bool {
        let clamped = ratio.clamp(MIN_SPLIT_RATIO, MAX_SPLIT_RATIO);
        if (clamped - self.split_ratio).abs() < RATIO_EPSILON {
            return false;
        }
        self.split_ratio = clamped;
        true
    }

    /// Mark a tracked window floating or tiled. Only valid for tracked
    /// windows; returns whether anything changed.
    pub fn set_floating(&mut self, id: &str, floating: bool) -> bool {
        if !self.contains(id) {
            return false;
        }
        if floating {
            self.floating.insert(id.to_string())
        } else {
            self.floating.remove(id)
        }
    }

    /// Set the focused window. `None` clears focus; a window id must be
    /// tracked. Returns whether the focus changed.
    pub fn set_focused(&mut self, id: Option<&str>) -> bool {
        let new = match id {
            Some(w) if self.contains(w) => Some(w.to_string()),
            Some(_) => return false,
            None => None,
        };
        if new == self.focused {
            return false;
        }
        self.focused = new;
        true
    }

    /// Store the zone rectangles produced by a successful recompute.
    ///
    /// The caller has verified `rects.len() == tiled_window_count()`.
    pub fn store_geometry(&mut self, rects: Vec<Rect>) {
        self.last_geometry = rects;
    }

    /// Discard stale geometry (e.g. after the tiled set changed without a
    /// successful recompute).
    pub fn clear_geometry(&mut self) {
        self.last_geometry.clear();
    }

    /// Snapshot the restorable parts of the state. Geometry is excluded:
    /// it is recomputed, never persisted.
    pub fn snapshot(&self) -> StateSnapshot {
        let mut floating: Vec<WindowId> = self.floating.iter().cloned().collect();
        floating.sort();
        StateSnapshot {
            screen_id: self.screen_id.clone(),
            window_order: self.window_order.clone(),
            floating,
            focused: self.focused.clone(),
            master_count: self.master_count,
            split_ratio: self.split_ratio,
        }
    }

    /// Rebuild a state from a snapshot, discarding floating/focused entries
    /// that are not members of the restored window order and de-duplicating
    /// the order itself.
    pub fn from_snapshot(snapshot: StateSnapshot) -> Self {
        let mut state = Self::new(snapshot.screen_id);
        for id in snapshot.window_order {
            state.add_window(id, None);
        }
        for id in snapshot.floating {
            state.set_floating(&id, true);
        }
        state.set_focused(snapshot.focused.as_deref());
        state.set_master_count(snapshot.master_count);
        state.set_split_ratio(snapshot.split_ratio);
        state
    }
}
