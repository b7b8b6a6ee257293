use ratatui::layout::{Constraint, Direction, Layout as RatatuiLayout, Rect};

/// Areas of the log viewer screen
pub struct ViewerAreas {
    pub header: Rect,
    pub stats: Option<Rect>,
    pub logs: Rect,
    pub status: Rect,
}

/// Layout helper for consistent screen layouts
pub struct Layout;

impl Layout {
    /// Header, optional stats bar, log pane and status bar, top to bottom
    pub fn log_viewer(area: Rect, show_stats: bool) -> ViewerAreas {
        let mut constraints = vec![Constraint::Length(3)];
        if show_stats {
            constraints.push(Constraint::Length(3));
        }
        constraints.push(Constraint::Min(1));
        constraints.push(Constraint::Length(1));

        let chunks = RatatuiLayout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        if show_stats {
            ViewerAreas {
                header: chunks[0],
                stats: Some(chunks[1]),
                logs: chunks[2],
                status: chunks[3],
            }
        } else {
            ViewerAreas {
                header: chunks[0],
                stats: None,
                logs: chunks[1],
                status: chunks[2],
            }
        }
    }

    /// Centered popup of at most `width` x `height`, leaving a margin
    pub fn popup(area: Rect, width: u16, height: u16) -> Rect {
        let width = width.min(area.width.saturating_sub(4));
        let height = height.min(area.height.saturating_sub(4));
        let x = area.x + area.width.saturating_sub(width) / 2;
        let y = area.y + area.height.saturating_sub(height) / 2;
        Rect::new(x, y, width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_viewer_without_stats() {
        let areas = Layout::log_viewer(Rect::new(0, 0, 80, 24), false);
        assert_eq!(areas.header.height, 3);
        assert!(areas.stats.is_none());
        assert_eq!(areas.logs.height, 20);
        assert_eq!(areas.status.y, 23);
    }

    #[test]
    fn test_log_viewer_with_stats() {
        let areas = Layout::log_viewer(Rect::new(0, 0, 80, 24), true);
        assert_eq!(areas.stats.map(|r| r.height), Some(3));
        assert_eq!(areas.logs.height, 17);
    }

    #[test]
    fn test_popup_is_centered_and_clamped() {
        let popup = Layout::popup(Rect::new(0, 0, 100, 40), 50, 20);
        assert_eq!(popup, Rect::new(25, 10, 50, 20));

        let small = Layout::popup(Rect::new(0, 0, 30, 10), 50, 20);
        assert_eq!(small.width, 26);
        assert_eq!(small.height, 6);
    }
}
