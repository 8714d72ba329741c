//! Engine-wide tiling configuration.
//!
//! A single `AutotileConfig` is owned by the engine. Values are clamped on
//! assignment and every setter reports whether the stored value actually
//! changed, so callers can suppress redundant retiles.

use serde::{Deserialize, Serialize};

use crate::state::{MAX_MASTER_COUNT, MAX_SPLIT_RATIO, MIN_SPLIT_RATIO, RATIO_EPSILON};

/// Largest accepted gap value in pixels.
pub const MAX_GAP: i32 = 200;

/// Where newly tracked windows are inserted into the window order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertPosition {
    /// Append at the end of the order.
    #[default]
    End,
    /// Insert immediately after the focused window.
    AfterFocused,
    /// Insert at position 0, making the new window a master.
    AsMaster,
}

/// Current algorithm choice and tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutotileConfig {
    pub algorithm_id: String,
    pub split_ratio: f64,
    pub master_count: usize,
    pub inner_gap: i32,
    pub outer_gap: i32,
    pub insert_position: InsertPosition,
    pub focus_follows_mouse: bool,
    pub focus_new_windows: bool,
    pub monocle_hide_others: bool,
    pub monocle_show_tabs: bool,
    pub smart_gaps: bool,
    pub respect_minimum_size: bool,
}

impl Default for AutotileConfig {
    fn default() -> Self {
        Self {
            algorithm_id: crate::algorithms::DEFAULT_ALGORITHM.to_string(),
            split_ratio: 0.55,
            master_count: 1,
            inner_gap: 8,
            outer_gap: 8,
            insert_position: InsertPosition::default(),
            focus_follows_mouse: false,
            focus_new_windows: true,
            monocle_hide_others: false,
            monocle_show_tabs: false,
            smart_gaps: true,
            respect_minimum_size: true,
        }
    }
}

impl AutotileConfig {
    /// Set the algorithm id. The caller validates the id against the
    /// registry; this only records it.
    pub fn set_algorithm_id(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if id == self.algorithm_id {
            return false;
        }
        self.algorithm_id = id;
        true
    }

    /// Set the split ratio, clamped to the allowed range, with epsilon
    /// comparison against the stored value.
    pub fn set_split_ratio(&mut self, ratio: f64) -> bool {
        let clamped = ratio.clamp(MIN_SPLIT_RATIO, MAX_SPLIT_RATIO);
        if (clamped - self.split_ratio).abs() < RATIO_EPSILON {
            return false;
        }
        self.split_ratio = clamped;
        true
    }

    /// Set the master count, clamped to `[1, MAX_MASTER_COUNT]`.
    pub fn set_master_count(&mut self, n: usize) -> bool {
        let clamped = n.clamp(1, MAX_MASTER_COUNT);
        if clamped == self.master_count {
            return false;
        }
        self.master_count = clamped;
        true
    }

    /// Set the inner gap in pixels, clamped to `[0, MAX_GAP]`.
    pub fn set_inner_gap(&mut self, gap: i32) -> bool {
        let clamped = gap.clamp(0, MAX_GAP);
        if clamped == self.inner_gap {
            return false;
        }
        self.inner_gap = clamped;
        true
    }

    /// Set the outer gap in pixels, clamped to `[0, MAX_GAP]`.
    pub fn set_outer_gap(&mut self, gap: i32) -> bool {
        let clamped = gap.clamp(0, MAX_GAP);
        if clamped == self.outer_gap {
            return false;
        }
        self.outer_gap = clamped;
        true
    }

    pub fn set_insert_position(&mut self, pos: InsertPosition) -> bool {
        if pos == self.insert_position {
            return false;
        }
        self.insert_position = pos;
        true
    }
}
