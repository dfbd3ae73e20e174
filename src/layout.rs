pub const DEFAULT_SPLIT_RATIO: f64 = 0.4;
pub const MIN_SPLIT_RATIO: f64 = 0.2;
pub const MAX_SPLIT_RATIO: f64 = 0.8;
pub const MIN_TOP_PANE_HEIGHT: u16 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaneHeights {
    pub top: u16,
    pub bottom: u16,
}

/// `max(min_height, min(needed_rows, floor(available * max_ratio)))`, never
/// more than what is available.
pub fn top_pane_height(available: u16, needed_rows: usize, min_height: u16, max_ratio: f64) -> u16 {
    let cap = (f64::from(available) * max_ratio).floor().max(0.0) as u16;
    let needed = u16::try_from(needed_rows).unwrap_or(u16::MAX);
    needed.min(cap).max(min_height).min(available)
}

pub fn split_panes(available: u16, needed_rows: usize, min_height: u16, max_ratio: f64) -> PaneHeights {
    let top = top_pane_height(available, needed_rows, min_height, max_ratio);
    PaneHeights {
        top,
        bottom: available - top,
    }
}

pub fn max_scroll_offset(total_rows: usize, visible_height: usize) -> usize {
    total_rows.saturating_sub(visible_height)
}

pub fn clamp_offset(offset: usize, total_rows: usize, visible_height: usize) -> usize {
    offset.min(max_scroll_offset(total_rows, visible_height))
}

/// Applies a signed scroll delta and clamps into `[0, max_offset]`.
pub fn scroll_by(offset: usize, delta: isize, total_rows: usize, visible_height: usize) -> usize {
    let next = offset.saturating_add_signed(delta);
    clamp_offset(next, total_rows, visible_height)
}

/// Offset that keeps `selected` inside a window of `height` rows.
///
/// Scrolling up leaves one row of context above the selection.
pub fn keep_visible(selected: usize, offset: usize, height: usize) -> usize {
    if height == 0 {
        return offset;
    }
    if selected < offset {
        selected.saturating_sub(1)
    } else if selected >= offset + height {
        selected + 1 - height
    } else {
        offset
    }
}

pub fn clamp_ratio(ratio: f64) -> f64 {
    if ratio.is_nan() {
        return DEFAULT_SPLIT_RATIO;
    }
    ratio.clamp(MIN_SPLIT_RATIO, MAX_SPLIT_RATIO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_pane_grows_with_content_up_to_ratio() {
        assert_eq!(top_pane_height(50, 2, 4, 0.4), 4);
        assert_eq!(top_pane_height(50, 12, 4, 0.4), 12);
        assert_eq!(top_pane_height(50, 300, 4, 0.4), 20);
        assert_eq!(top_pane_height(3, 300, 4, 0.4), 3);
    }

    #[test]
    fn bottom_gets_remainder() {
        let h = split_panes(40, 100, 4, 0.4);
        assert_eq!(h, PaneHeights { top: 16, bottom: 24 });
    }

    #[test]
    fn visible_selection_does_not_scroll() {
        for offset in 0..5 {
            for height in 1..6 {
                for selected in offset..offset + height {
                    assert_eq!(keep_visible(selected, offset, height), offset);
                }
            }
        }
    }

    #[test]
    fn selection_above_scrolls_with_context() {
        assert_eq!(keep_visible(3, 10, 5), 2);
        assert_eq!(keep_visible(0, 10, 5), 0);
    }

    #[test]
    fn selection_below_becomes_last_row() {
        assert_eq!(keep_visible(15, 10, 5), 11);
        assert_eq!(keep_visible(14, 10, 5), 10);
    }

    #[test]
    fn offsets_clamp_into_range() {
        assert_eq!(max_scroll_offset(3, 10), 0);
        assert_eq!(clamp_offset(50, 30, 10), 20);
        assert_eq!(scroll_by(2, -5, 30, 10), 0);
        assert_eq!(scroll_by(18, 5, 30, 10), 20);
    }

    #[test]
    fn ratio_is_bounded() {
        assert_eq!(clamp_ratio(0.05), MIN_SPLIT_RATIO);
        assert_eq!(clamp_ratio(f64::NAN), DEFAULT_SPLIT_RATIO);
    }
}
