//! Shared numeric policy for splitting pixel spans.
//!
//! All algorithms size zones through these helpers so that the parts of a
//! split always sum exactly to the input span: the even share is floored
//! and the remainder pixels go to the first parts. No drift, no overlap.

use super::MinSize;

/// Extra slack tolerated by the minimum-size post-pass, in pixels.
pub const MIN_SIZE_SLACK: i32 = 12;

/// Split `total` into `count` parts that sum exactly to `total`.
///
/// Each part gets the floored even share; the first `total % count` parts
/// get one extra pixel. `count == 0` yields an empty vector, a negative
/// total is treated as zero.
pub fn distribute_evenly(total: i32, count: usize) -> Vec<i32> {
    if count == 0 {
        return Vec::new();
    }
    let total = total.max(0);
    let count_i = count as i32;
    let share = total / count_i;
    let remainder = (total % count_i) as usize;
    (0..count)
        .map(|i| if i < remainder { share + 1 } else { share })
        .collect()
}

/// Split `total` into parts honoring per-part minimums.
///
/// When the minimums fit, every part gets its minimum plus an even share of
/// the surplus. When they do not, the space is distributed proportionally
/// to the requested minimum weight (equal weights when all minimums are
/// zero). Either way the parts sum exactly to `total`.
pub fn distribute_with_minimums(total: i32, minimums: &[i32]) -> Vec<i32> {
    let count = minimums.len();
    if count == 0 {
        return Vec::new();
    }
    let total = total.max(0);
    let required: i64 = minimums.iter().map(|&m| i64::from(m.max(0))).sum();

    if required <= i64::from(total) {
        let surplus = total - required as i32;
        let shares = distribute_evenly(surplus, count);
        return minimums
            .iter()
            .zip(shares)
            .map(|(&min, share)| min.max(0) + share)
            .collect();
    }

    // Overcommitted: scale proportionally to the requested weight.
    if required == 0 {
        return distribute_evenly(total, count);
    }
    let mut parts: Vec<i32> = minimums
        .iter()
        .map(|&min| ((i64::from(total) * i64::from(min.max(0))) / required) as i32)
        .collect();
    let assigned: i32 = parts.iter().sum();
    let mut leftover = total - assigned;
    for part in parts.iter_mut() {
        if leftover == 0 {
            break;
        }
        *part += 1;
        leftover -= 1;
    }
    parts
}

/// Heights for a vertical stack of `count` windows inside `span`, with
/// `inner_gap` between adjacent windows. Respects minimum heights from
/// `min_heights` when given.
pub fn stack_heights(span: i32, count: usize, inner_gap: i32, min_heights: Option<&[i32]>) -> Vec<i32> {
    if count == 0 {
        return Vec::new();
    }
    let usable = span - inner_gap * (count as i32 - 1);
    match min_heights {
        Some(mins) if mins.len() == count => distribute_with_minimums(usable, mins),
        _ => distribute_evenly(usable, count),
    }
}

/// Slice per-window minimum heights out of a `MinSize` run.
pub fn min_heights(min_sizes: &[MinSize]) -> Vec<i32> {
    min_sizes.iter().map(|m| m.height).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Partition completeness: parts always sum exactly to the total.
    #[test]
    fn test_distribute_evenly_sums_exactly() {
        for total in [0, 1, 7, 100, 999, 1080] {
            for count in 1..=7usize {
                let parts = distribute_evenly(total, count);
                assert_eq!(parts.len(), count);
                assert_eq!(parts.iter().sum::<i32>(), total, "{total}/{count}");
                // Parts differ by at most one pixel
                let min = parts.iter().min().unwrap();
                let max = parts.iter().max().unwrap();
                assert!(max - min <= 1);
            }
        }
    }

    #[test]
    fn test_distribute_evenly_edge_cases() {
        assert!(distribute_evenly(100, 0).is_empty());
        assert_eq!(distribute_evenly(-50, 3), vec![0, 0, 0]);
        assert_eq!(distribute_evenly(1000, 2), vec![500, 500]);
        assert_eq!(distribute_evenly(10, 3), vec![4, 3, 3]);
    }

    #[test]
    fn test_minimums_fit_even_surplus() {
        let parts = distribute_with_minimums(100, &[10, 20, 10]);
        assert_eq!(parts.iter().sum::<i32>(), 100);
        // 60 surplus split evenly
        assert_eq!(parts, vec![30, 40, 30]);
    }

    #[test]
    fn test_minimums_overcommitted_proportional() {
        let parts = distribute_with_minimums(100, &[100, 300]);
        assert_eq!(parts.iter().sum::<i32>(), 100);
        // 1:3 weight ratio preserved
        assert_eq!(parts, vec![25, 75]);
    }

    #[test]
    fn test_minimums_overcommitted_sums_exactly_with_rounding() {
        let parts = distribute_with_minimums(100, &[70, 70, 70]);
        assert_eq!(parts.iter().sum::<i32>(), 100);
        assert_eq!(parts.len(), 3);
    }

    #[test]
    fn test_minimums_all_zero() {
        assert_eq!(distribute_with_minimums(90, &[0, 0, 0]), vec![30, 30, 30]);
    }

    #[test]
    fn test_stack_heights_with_gap() {
        // 1000 span, 2 windows, no gap: an even split
        assert_eq!(stack_heights(1000, 2, 0, None), vec![500, 500]);
        // Gap is removed from the usable span first
        let heights = stack_heights(1000, 3, 10, None);
        assert_eq!(heights.iter().sum::<i32>(), 1000 - 20);
    }

    #[test]
    fn test_stack_heights_respects_minimums() {
        let heights = stack_heights(300, 2, 0, Some(&[200, 50]));
        assert_eq!(heights.iter().sum::<i32>(), 300);
        assert!(heights[0] >= 200);
        assert!(heights[1] >= 50);
    }
}
