//! Binary-space-partition layout.
//!
//! The screen is split recursively, alternating vertical and horizontal
//! cuts by depth; the in-order leaves of the tree map 1:1 to windows. The
//! tree is retained across calls: growing to one more window splits the
//! last leaf, shrinking collapses it, so existing windows keep their
//! positions instead of the whole layout reshuffling on every change.

use super::sizing::distribute_evenly;
use super::{LayoutParams, TilingAlgorithm};
use crate::Rect;

#[derive(Debug, Clone)]
enum Node {
    Leaf,
    Split { first: Box<Node>, second: Box<Node> },
}

impl Node {
    fn leaf_count(&self) -> usize {
        match self {
            Node::Leaf => 1,
            Node::Split { first, second } => first.leaf_count() + second.leaf_count(),
        }
    }

    /// Split the last (rightmost) leaf into a pair.
    fn grow(&mut self) {
        match self {
            Node::Leaf => {
                *self = Node::Split {
                    first: Box::new(Node::Leaf),
                    second: Box::new(Node::Leaf),
                };
            }
            Node::Split { second, .. } => second.grow(),
        }
    }

    /// Collapse the parent of the last leaf back into a single leaf.
    /// Returns true if this node itself became the collapsed leaf.
    fn shrink(&mut self) -> bool {
        match self {
            Node::Leaf => false,
            Node::Split { second, .. } if !matches!(second.as_ref(), Node::Leaf) => {
                second.shrink()
            }
            Node::Split { .. } => {
                // This split's last leaf goes away; the first subtree
                // takes over its position.
                let Node::Split { first, .. } = std::mem::replace(self, Node::Leaf) else {
                    unreachable!();
                };
                *self = *first;
                true
            }
        }
    }

    /// Assign `area` to this subtree's leaves, in order.
    fn assign(&self, area: Rect, depth: usize, ratio: f64, inner_gap: i32, out: &mut Vec<Rect>) {
        match self {
            Node::Leaf => out.push(area),
            Node::Split { first, second } => {
                // Depth 0 honors the configured ratio, deeper splits halve.
                let r = if depth == 0 { ratio } else { 0.5 };
                let vertical_cut = depth % 2 == 0;
                let (a, b) = if vertical_cut {
                    let usable = area.width - inner_gap;
                    let first_w = (f64::from(usable) * r).round() as i32;
                    (
                        Rect::new(area.x, area.y, first_w, area.height),
                        Rect::new(
                            area.x + first_w + inner_gap,
                            area.y,
                            usable - first_w,
                            area.height,
                        ),
                    )
                } else {
                    let usable = area.height - inner_gap;
                    let first_h = distribute_evenly(usable, 2)[0];
                    (
                        Rect::new(area.x, area.y, area.width, first_h),
                        Rect::new(
                            area.x,
                            area.y + first_h + inner_gap,
                            area.width,
                            usable - first_h,
                        ),
                    )
                };
                first.assign(a, depth + 1, ratio, inner_gap, out);
                second.assign(b, depth + 1, ratio, inner_gap, out);
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct BspAlgorithm {
    root: Option<Node>,
}

impl BspAlgorithm {
    /// Grow or shrink the retained tree until it has `target` leaves.
    fn sync_tree(&mut self, target: usize) {
        if target == 0 {
            self.root = None;
            return;
        }
        let root = self.root.get_or_insert(Node::Leaf);
        while root.leaf_count() < target {
            root.grow();
        }
        while root.leaf_count() > target {
            root.shrink();
        }
    }
}

impl TilingAlgorithm for BspAlgorithm {
    fn id(&self) -> &'static str {
        "bsp"
    }

    fn display_name(&self) -> &'static str {
        "Binary partition"
    }

    fn supports_split_ratio(&self) -> bool {
        true
    }

    fn calculate_zones(&mut self, params: &LayoutParams) -> Vec<Rect> {
        let count = params.window_count;
        self.sync_tree(count);
        let Some(root) = &self.root else {
            return Vec::new();
        };
        let area = params.screen.shrunk(params.outer_gap);
        let mut zones = Vec::with_capacity(count);
        root.assign(
            area,
            0,
            params.state.split_ratio(),
            params.inner_gap,
            &mut zones,
        );
        zones
    }

    fn reset(&mut self) {
        self.root = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TilingState;

    fn run(algo: &mut BspAlgorithm, count: usize, screen: Rect, gap: i32) -> Vec<Rect> {
        let mut state = TilingState::new("test");
        for i in 0..count {
            state.add_window(format!("w{i}"), None);
        }
        state.set_split_ratio(0.5);
        let params = LayoutParams {
            window_count: count,
            screen,
            state: &state,
            inner_gap: gap,
            outer_gap: 0,
            min_sizes: None,
        };
        algo.calculate_zones(&params)
    }

    #[test]
    fn test_two_windows_split_vertically() {
        let mut algo = BspAlgorithm::default();
        let zones = run(&mut algo, 2, Rect::new(0, 0, 1000, 800), 0);
        assert_eq!(zones[0], Rect::new(0, 0, 500, 800));
        assert_eq!(zones[1], Rect::new(500, 0, 500, 800));
    }

    #[test]
    fn test_third_window_splits_horizontally() {
        let mut algo = BspAlgorithm::default();
        run(&mut algo, 2, Rect::new(0, 0, 1000, 800), 0);
        let zones = run(&mut algo, 3, Rect::new(0, 0, 1000, 800), 0);
        // First window untouched, second half subdivided top/bottom
        assert_eq!(zones[0], Rect::new(0, 0, 500, 800));
        assert_eq!(zones[1], Rect::new(500, 0, 500, 400));
        assert_eq!(zones[2], Rect::new(500, 400, 500, 400));
    }

    #[test]
    fn test_incremental_add_preserves_existing_zones() {
        let mut algo = BspAlgorithm::default();
        let before = run(&mut algo, 3, Rect::new(0, 0, 1200, 800), 0);
        let after = run(&mut algo, 4, Rect::new(0, 0, 1200, 800), 0);
        // Zones before the split point are unchanged
        assert_eq!(before[0], after[0]);
        assert_eq!(before[1], after[1]);
    }

    #[test]
    fn test_shrink_restores_previous_shape() {
        let mut algo = BspAlgorithm::default();
        let two = run(&mut algo, 2, Rect::new(0, 0, 1000, 800), 0);
        run(&mut algo, 4, Rect::new(0, 0, 1000, 800), 0);
        let back = run(&mut algo, 2, Rect::new(0, 0, 1000, 800), 0);
        assert_eq!(two, back);
    }

    #[test]
    fn test_zones_do_not_overlap() {
        let mut algo = BspAlgorithm::default();
        let zones = run(&mut algo, 6, Rect::new(0, 0, 1920, 1080), 8);
        for (i, a) in zones.iter().enumerate() {
            for b in zones.iter().skip(i + 1) {
                assert!(!a.intersects(b), "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn test_reset_drops_tree() {
        let mut algo = BspAlgorithm::default();
        run(&mut algo, 4, Rect::new(0, 0, 1000, 800), 0);
        algo.reset();
        assert!(algo.root.is_none());
    }

    #[test]
    fn test_root_split_uses_ratio() {
        let mut algo = BspAlgorithm::default();
        let mut state = TilingState::new("test");
        state.add_window("a", None);
        state.add_window("b", None);
        state.set_split_ratio(0.7);
        let params = LayoutParams {
            window_count: 2,
            screen: Rect::new(0, 0, 1000, 800),
            state: &state,
            inner_gap: 0,
            outer_gap: 0,
            min_sizes: None,
        };
        let zones = algo.calculate_zones(&params);
        assert_eq!(zones[0].width, 700);
        assert_eq!(zones[1].width, 300);
    }
}
