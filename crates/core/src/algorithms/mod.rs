//! Layout algorithm strategies.
//!
//! Each algorithm consumes a window count, a screen rectangle and a
//! read-only view of the screen's `TilingState`, and produces exactly one
//! zone rectangle per window. Algorithms may keep internal layout state
//! (the BSP tree does) and are therefore dispatched through `&mut self`,
//! but they never mutate the `TilingState` passed to them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::state::TilingState;
use crate::Rect;

mod bsp;
mod columns;
mod master_stack;
mod monocle;
pub mod sizing;

pub use bsp::BspAlgorithm;
pub use columns::ThreeColumnAlgorithm;
pub use master_stack::MasterStackAlgorithm;
pub use monocle::MonocleAlgorithm;

/// Registry id of the algorithm used when nothing else is configured.
pub const DEFAULT_ALGORITHM: &str = "master_stack";

/// Per-window minimum size hint in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinSize {
    pub width: i32,
    pub height: i32,
}

/// Input bundle for a zone computation.
pub struct LayoutParams<'a> {
    /// Number of zones to produce (the tiled window count).
    pub window_count: usize,
    /// Available screen area in absolute coordinates.
    pub screen: Rect,
    /// Read-only view of the screen's state (master count, split ratio).
    pub state: &'a TilingState,
    /// Gap between adjacent zones in pixels.
    pub inner_gap: i32,
    /// Gap between zones and the screen edge in pixels.
    pub outer_gap: i32,
    /// Minimum sizes aligned with the tiled window order, when the engine
    /// is asked to respect them.
    pub min_sizes: Option<&'a [MinSize]>,
}

/// A tiling layout strategy.
///
/// Postcondition for `calculate_zones`: the output length equals
/// `params.window_count` exactly. Zero windows produce an empty output; a
/// single window gets the screen inset by the outer gap.
///
/// Implementations holding internal layout state are not safe for
/// concurrent invocation on the same instance; the engine only ever calls
/// them from its single event loop.
pub trait TilingAlgorithm: Send {
    /// Stable identifier used in configuration and over IPC.
    fn id(&self) -> &'static str;

    /// Human-readable name for selector UIs.
    fn display_name(&self) -> &'static str;

    /// Compute one zone per window.
    fn calculate_zones(&mut self, params: &LayoutParams) -> Vec<Rect>;

    /// Whether the master count tunable affects this algorithm.
    fn supports_master_count(&self) -> bool {
        false
    }

    /// Whether the split ratio tunable affects this algorithm.
    fn supports_split_ratio(&self) -> bool {
        false
    }

    /// The ratio a selector UI should preset when switching here.
    fn default_split_ratio(&self) -> f64 {
        0.5
    }

    /// Fewest windows for which this layout is meaningful.
    fn minimum_windows(&self) -> usize {
        0
    }

    /// Zone index of the primary ("master") area, if the algorithm has one.
    fn master_zone_index(&self) -> Option<usize> {
        None
    }

    /// Drop any retained layout topology (e.g. when a screen is disabled).
    fn reset(&mut self) {}
}

/// Name → algorithm lookup with a designated default.
pub struct AlgorithmRegistry {
    algorithms: HashMap<String, Box<dyn TilingAlgorithm>>,
}

impl AlgorithmRegistry {
    /// Empty registry. Most callers want [`AlgorithmRegistry::with_builtins`].
    pub fn new() -> Self {
        Self {
            algorithms: HashMap::new(),
        }
    }

    /// Registry pre-populated with every built-in algorithm.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(MasterStackAlgorithm::default()));
        registry.register(Box::new(BspAlgorithm::default()));
        registry.register(Box::new(MonocleAlgorithm));
        registry.register(Box::new(ThreeColumnAlgorithm));
        registry
    }

    pub fn register(&mut self, algorithm: Box<dyn TilingAlgorithm>) {
        self.algorithms
            .insert(algorithm.id().to_string(), algorithm);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.algorithms.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&dyn TilingAlgorithm> {
        self.algorithms.get(id).map(|a| a.as_ref())
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut dyn TilingAlgorithm> {
        match self.algorithms.get_mut(id) {
            Some(a) => Some(a.as_mut()),
            None => None,
        }
    }

    /// Map an id to itself when registered, or to the default otherwise.
    pub fn resolve<'a>(&self, id: &'a str) -> &'a str {
        if self.contains(id) {
            id
        } else {
            DEFAULT_ALGORITHM
        }
    }

    /// Registered ids, sorted for stable display.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.algorithms.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Reset retained topology in every registered algorithm.
    pub fn reset_all(&mut self) {
        for algorithm in self.algorithms.values_mut() {
            algorithm.reset();
        }
    }
}

impl Default for AlgorithmRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
