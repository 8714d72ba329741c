//! Three-column layout.
//!
//! Windows are spread across up to three equal-width columns. Windows fill
//! the columns left to right, with the leftmost columns taking the extra
//! window when the count does not divide evenly. Zone order matches window
//! order, so the first window always lands in the first column.

use super::sizing::{distribute_evenly, stack_heights};
use super::{LayoutParams, TilingAlgorithm};
use crate::Rect;

const MAX_COLUMNS: usize = 3;

#[derive(Debug)]
pub struct ThreeColumnAlgorithm;

impl TilingAlgorithm for ThreeColumnAlgorithm {
    fn id(&self) -> &'static str {
        "three_column"
    }

    fn display_name(&self) -> &'static str {
        "Three Column"
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

        let cols = count.min(MAX_COLUMNS);
        let usable_width = area.width - params.inner_gap * (cols as i32 - 1);
        let widths = distribute_evenly(usable_width, cols);

        // Per-column window counts, leftmost columns absorb the remainder.
        let base = count / cols;
        let extra = count % cols;
        let mut zones = Vec::with_capacity(count);
        let mut window_index = 0;
        let mut x = area.x;
        for (col, &width) in widths.iter().enumerate() {
            let in_column = base + usize::from(col < extra);
            let mins: Option<Vec<i32>> = params.min_sizes.and_then(|m| {
                if m.len() == count {
                    Some(
                        m[window_index..window_index + in_column]
                            .iter()
                            .map(|s| s.height)
                            .collect(),
                    )
                } else {
                    None
                }
            });
            let heights = stack_heights(area.height, in_column, params.inner_gap, mins.as_deref());
            let mut y = area.y;
            for height in heights {
                zones.push(Rect::new(x, y, width, height));
                y += height + params.inner_gap;
            }
            window_index += in_column;
            x += width + params.inner_gap;
        }
        zones
    }
}
