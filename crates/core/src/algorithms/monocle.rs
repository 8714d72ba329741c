//! Monocle layout: every window gets the full screen area.
//!
//! Which single window is actually visible is the engine's call (it emits
//! a separate visibility notification when hide-others is enabled); the
//! layout itself just stacks identical full-size zones.

use super::{LayoutParams, TilingAlgorithm};
use crate::Rect;

#[derive(Debug)]
pub struct MonocleAlgorithm;

impl TilingAlgorithm for MonocleAlgorithm {
    fn id(&self) -> &'static str {
        "monocle"
    }

    fn display_name(&self) -> &'static str {
        "Monocle"
    }

    fn minimum_windows(&self) -> usize {
        1
    }

    fn calculate_zones(&mut self, params: &LayoutParams) -> Vec<Rect> {
        let area = params.screen.shrunk(params.outer_gap);
        vec![area; params.window_count]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TilingState;

    #[test]
    fn test_all_zones_identical() {
        let mut state = TilingState::new("test");
        for i in 0..4 {
            state.add_window(format!("w{i}"), None);
        }
        let params = LayoutParams {
            window_count: 4,
            screen: Rect::new(0, 0, 1920, 1080),
            state: &state,
            inner_gap: 6,
            outer_gap: 12,
            min_sizes: None,
        };
        let zones = MonocleAlgorithm.calculate_zones(&params);
        assert_eq!(zones.len(), 4);
        let expected = Rect::new(12, 12, 1896, 1056);
        assert!(zones.iter().all(|z| *z == expected));
    }

    #[test]
    fn test_zero_windows() {
        let state = TilingState::new("test");
        let params = LayoutParams {
            window_count: 0,
            screen: Rect::new(0, 0, 800, 600),
            state: &state,
            inner_gap: 0,
            outer_gap: 0,
            min_sizes: None,
        };
        assert!(MonocleAlgorithm.calculate_zones(&params).is_empty());
    }
}
