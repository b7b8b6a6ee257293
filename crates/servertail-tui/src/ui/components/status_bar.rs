use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Widget,
};
use unicode_width::UnicodeWidthStr;

use crate::ui::Theme;

/// Status bar: key hints on the left, stream summary on the right
pub struct StatusBar<'a> {
    hints: Vec<(&'a str, &'a str)>,
    right: Vec<Span<'a>>,
}

impl<'a> StatusBar<'a> {
    pub fn new() -> Self {
        Self {
            hints: Vec::new(),
            right: Vec::new(),
        }
    }

    /// Add keyboard hints as (key, description) pairs
    pub fn hints<I>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.hints = hints.into_iter().collect();
        self
    }

    /// Append a right-aligned segment
    pub fn right<S: Into<String>>(mut self, text: S, style: Style) -> Self {
        if !self.right.is_empty() {
            self.right.push(Span::styled(" ", Theme::status_bar()));
        }
        self.right.push(Span::styled(text.into(), style));
        self
    }
}

impl Default for StatusBar<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        buf.set_style(area, Theme::status_bar());

        let mut spans = Vec::new();
        for (i, (key, desc)) in self.hints.iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(" ", Theme::status_bar()));
            }
            spans.push(Span::styled(format!("[{key}]"), Theme::status_bar_key()));
            spans.push(Span::styled(desc.to_string(), Theme::status_bar()));
        }
        let left = Line::from(spans);
        let left_width = left.width() as u16;

        let right = Line::from(self.right);
        let right_width = right
            .spans
            .iter()
            .map(|s| UnicodeWidthStr::width(s.content.as_ref()) as u16)
            .sum::<u16>();

        // The right side wins when both do not fit
        let right_x = area.x + area.width.saturating_sub(right_width + 1);
        let left_room = right_x.saturating_sub(area.x + 2);
        buf.set_line(area.x + 1, area.y, &left, left_room.min(left_width));
        if right_width > 0 {
            buf.set_line(right_x, area.y, &right, right_width);
        }
    }
}

/// Hints shown while viewing a stream
pub fn log_viewer_hints() -> Vec<(&'static str, &'static str)> {
    vec![
        ("p", "Pause"),
        ("r", "Refresh"),
        ("n", "Noise"),
        ("c", "Clear"),
        ("Tab", "Stream"),
        ("?", "Help"),
        ("q", "Quit"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(buf: &Buffer) -> String {
        (0..buf.area.width)
            .map(|x| buf[(x, 0)].symbol().to_string())
            .collect()
    }

    #[test]
    fn test_renders_hints_and_right_text() {
        let area = Rect::new(0, 0, 60, 1);
        let mut buf = Buffer::empty(area);
        StatusBar::new()
            .hints([("p", "Pause")])
            .right("12/40 lines", Theme::status_bar())
            .render(area, &mut buf);

        let text = row(&buf);
        assert!(text.starts_with(" [p]Pause"));
        assert!(text.trim_end().ends_with("12/40 lines"));
    }

    #[test]
    fn test_right_text_survives_narrow_area() {
        let area = Rect::new(0, 0, 20, 1);
        let mut buf = Buffer::empty(area);
        StatusBar::new()
            .hints(log_viewer_hints())
            .right("PAUSED", Theme::paused())
            .render(area, &mut buf);

        assert!(row(&buf).contains("PAUSED"));
    }
}
