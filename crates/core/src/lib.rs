//! Autotile Core
//!
//! Platform-agnostic automatic tiling model.
//!
//! This crate implements the per-screen tiling state, the layout algorithm
//! strategies that turn a window count and screen rectangle into concrete
//! zones, and the configuration value object. It performs no I/O and owns no
//! window handles beyond opaque string identifiers; orchestration lives in
//! the daemon.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod algorithms;
pub mod config;
pub mod state;

pub use algorithms::{AlgorithmRegistry, LayoutParams, MinSize, TilingAlgorithm, DEFAULT_ALGORITHM};
pub use config::{AutotileConfig, InsertPosition};
pub use state::{StateSnapshot, TilingState};

/// Unique identifier for a window.
///
/// Opaque and stable for the lifetime of the window; supplied by whatever
/// feeds window lifecycle events into the engine.
pub type WindowId = String;

/// Errors that can occur during layout computation.
///
/// Nothing here is fatal: the engine logs these and leaves the previous
/// geometry in place rather than applying an inconsistent layout.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("No algorithm registered under id '{0}'")]
    UnknownAlgorithm(String),

    #[error("Algorithm '{0}' produced {1} zones for {2} windows")]
    ZoneCountMismatch(String, usize, usize),
}

/// A rectangle in absolute screen coordinates (pixels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    /// Create a new rectangle.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Get the right edge x-coordinate.
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Get the bottom edge y-coordinate.
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Check if this rectangle intersects with another.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }

    /// Inset the rectangle by `margin` pixels on every side.
    ///
    /// Width and height never go below zero.
    pub fn shrunk(&self, margin: i32) -> Rect {
        Rect {
            x: self.x + margin,
            y: self.y + margin,
            width: (self.width - 2 * margin).max(0),
            height: (self.height - 2 * margin).max(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_edges() {
        let r = Rect::new(10, 20, 100, 50);
        assert_eq!(r.right(), 110);
        assert_eq!(r.bottom(), 70);
    }

    #[test]
    fn test_rect_intersects() {
        let r1 = Rect::new(0, 0, 100, 100);
        let r2 = Rect::new(50, 50, 100, 100);
        let r3 = Rect::new(200, 200, 50, 50);

        assert!(r1.intersects(&r2));
        assert!(r2.intersects(&r1));
        assert!(!r1.intersects(&r3));
        assert!(!r3.intersects(&r1));
    }

    #[test]
    fn test_rect_shrunk() {
        let r = Rect::new(0, 0, 100, 100);
        assert_eq!(r.shrunk(10), Rect::new(10, 10, 80, 80));
        // Over-shrinking clamps to zero size instead of going negative
        let tiny = r.shrunk(60);
        assert_eq!(tiny.width, 0);
        assert_eq!(tiny.height, 0);
    }

    #[test]
    fn test_rect_serde_roundtrip() {
        let r = Rect::new(-5, 3, 640, 480);
        let json = serde_json::to_string(&r).unwrap();
        let back: Rect = serde_json::from_str(&json).unwrap();
        assert_eq!(r, back);
    }
}
