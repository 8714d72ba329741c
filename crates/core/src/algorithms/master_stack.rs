//! Master-stack layout.
//!
//! The first `master_count` windows occupy a column whose width is
//! `split_ratio` of the available area; the remaining windows stack evenly
//! in the remainder. With no stack windows (or no master windows) the
//! single column takes the full width.

use super::sizing::{min_heights, stack_heights};
use super::{LayoutParams, TilingAlgorithm};
use crate::Rect;

#[derive(Debug, Default)]
pub struct MasterStackAlgorithm;

impl MasterStackAlgorithm {
    /// Lay one column of `count` windows into `area`, appending to `zones`.
    fn fill_column(
        zones: &mut Vec<Rect>,
        area: Rect,
        count: usize,
        inner_gap: i32,
        mins: Option<&[i32]>,
    ) {
        let heights = stack_heights(area.height, count, inner_gap, mins);
        let mut y = area.y;
        for height in heights {
            zones.push(Rect::new(area.x, y, area.width, height));
            y += height + inner_gap;
        }
    }
}

impl TilingAlgorithm for MasterStackAlgorithm {
    fn id(&self) -> &'static str {
        "master_stack"
    }

    fn display_name(&self) -> &'static str {
        "Master and stack"
    }

    fn supports_master_count(&self) -> bool {
        true
    }

    fn supports_split_ratio(&self) -> bool {
        true
    }

    fn default_split_ratio(&self) -> f64 {
        0.55
    }

    fn master_zone_index(&self) -> Option<usize> {
        Some(0)
    }

    fn calculate_zones(&mut self, params: &LayoutParams) -> Vec<Rect> {
        let count = params.window_count;
        if count == 0 {
            return Vec::new();
        }
        let area = params.screen.shrunk(params.outer_gap);
        if count == 1 {
            return vec![area];
        }

        let masters = params.state.master_count().min(count);
        let stacked = count - masters;

        let all_mins = params.min_sizes.filter(|m| m.len() == count).map(min_heights);
        let master_mins = all_mins.as_deref().map(|m| &m[..masters]);
        let stack_mins = all_mins.as_deref().map(|m| &m[masters..]);

        let mut zones = Vec::with_capacity(count);
        if stacked == 0 {
            Self::fill_column(&mut zones, area, masters, params.inner_gap, master_mins);
            return zones;
        }

        let ratio = params.state.split_ratio();
        let usable_width = area.width - params.inner_gap;
        let master_width = (f64::from(usable_width) * ratio).round() as i32;
        let stack_width = usable_width - master_width;

        let master_area = Rect::new(area.x, area.y, master_width, area.height);
        let stack_area = Rect::new(
            area.x + master_width + params.inner_gap,
            area.y,
            stack_width,
            area.height,
        );

        Self::fill_column(&mut zones, master_area, masters, params.inner_gap, master_mins);
        Self::fill_column(&mut zones, stack_area, stacked, params.inner_gap, stack_mins);
        zones
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TilingState;

    fn state_with(count: usize, master_count: usize, ratio: f64) -> TilingState {
        let mut state = TilingState::new("test");
        for i in 0..count {
            state.add_window(format!("w{i}"), None);
        }
        state.set_master_count(master_count);
        state.set_split_ratio(ratio);
        state
    }

    fn params<'a>(state: &'a TilingState, count: usize, screen: Rect, gap: i32) -> LayoutParams<'a> {
        LayoutParams {
            window_count: count,
            screen,
            state,
            inner_gap: gap,
            outer_gap: gap,
            min_sizes: None,
        }
    }

    /// The canonical scenario: three windows, one master, ratio 0.6 on a
    /// 1000x1000 screen with no gaps.
    #[test]
    fn test_three_windows_master_and_two_stacked() {
        let state = state_with(3, 1, 0.6);
        let mut algo = MasterStackAlgorithm;
        let zones =
            algo.calculate_zones(&params(&state, 3, Rect::new(0, 0, 1000, 1000), 0));

        assert_eq!(
            zones,
            vec![
                Rect::new(0, 0, 600, 1000),
                Rect::new(600, 0, 400, 500),
                Rect::new(600, 500, 400, 500),
            ]
        );
    }

    #[test]
    fn test_two_masters() {
        let state = state_with(3, 2, 0.5);
        let mut algo = MasterStackAlgorithm;
        let zones =
            algo.calculate_zones(&params(&state, 3, Rect::new(0, 0, 1000, 1000), 0));
        // Masters stack vertically in the left half, one window on the right
        assert_eq!(zones[0], Rect::new(0, 0, 500, 500));
        assert_eq!(zones[1], Rect::new(0, 500, 500, 500));
        assert_eq!(zones[2], Rect::new(500, 0, 500, 1000));
    }

    #[test]
    fn test_all_masters_full_width() {
        let state = state_with(2, 2, 0.6);
        let mut algo = MasterStackAlgorithm;
        let zones =
            algo.calculate_zones(&params(&state, 2, Rect::new(0, 0, 1000, 1000), 0));
        assert_eq!(zones[0], Rect::new(0, 0, 1000, 500));
        assert_eq!(zones[1], Rect::new(0, 500, 1000, 500));
    }

    #[test]
    fn test_gaps_applied() {
        let state = state_with(2, 1, 0.5);
        let mut algo = MasterStackAlgorithm;
        let zones =
            algo.calculate_zones(&params(&state, 2, Rect::new(0, 0, 1000, 1000), 10));
        // Outer gap insets both zones; inner gap separates them
        assert_eq!(zones[0].x, 10);
        assert_eq!(zones[0].y, 10);
        assert_eq!(zones[0].height, 980);
        assert_eq!(zones[1].x, zones[0].right() + 10);
        assert_eq!(zones[1].right(), 990);
        assert!(!zones[0].intersects(&zones[1]));
    }

    #[test]
    fn test_no_vertical_drift() {
        // Heights must sum to the available span even when the division
        // leaves a remainder.
        let state = state_with(4, 1, 0.5);
        let mut algo = MasterStackAlgorithm;
        let zones =
            algo.calculate_zones(&params(&state, 4, Rect::new(0, 0, 999, 1000), 0));
        let stack: Vec<&Rect> = zones[1..].iter().collect();
        assert_eq!(stack.iter().map(|z| z.height).sum::<i32>(), 1000);
        assert_eq!(stack.last().unwrap().bottom(), 1000);
    }

    #[test]
    fn test_minimum_heights_respected_in_stack() {
        let state = state_with(3, 1, 0.5);
        let mins = [
            super::super::MinSize { width: 0, height: 0 },
            super::super::MinSize { width: 0, height: 700 },
            super::super::MinSize { width: 0, height: 100 },
        ];
        let mut algo = MasterStackAlgorithm;
        let p = LayoutParams {
            window_count: 3,
            screen: Rect::new(0, 0, 1000, 1000),
            state: &state,
            inner_gap: 0,
            outer_gap: 0,
            min_sizes: Some(&mins),
        };
        let zones = algo.calculate_zones(&p);
        assert!(zones[1].height >= 700);
        assert!(zones[2].height >= 100);
        assert_eq!(zones[1].height + zones[2].height, 1000);
    }
}
