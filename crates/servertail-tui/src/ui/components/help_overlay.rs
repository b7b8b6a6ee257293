use ratatui::{
    Frame,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::ui::{Layout, Theme};

/// Key help grouped by what the keys act on
const SECTIONS: &[(&str, &[(&str, &str)])] = &[
    (
        "Stream",
        &[
            ("p", "Pause / resume reads"),
            ("r", "Read now (also while paused)"),
            ("n", "Toggle noise filter"),
            ("c", "Clear log file and buffer"),
            ("Tab", "Switch console / internal log"),
        ],
    ),
    (
        "Navigation",
        &[
            ("j/↓", "Scroll down"),
            ("k/↑", "Scroll up"),
            ("Ctrl+d", "Page down"),
            ("Ctrl+u", "Page up"),
            ("g", "Go to top"),
            ("G", "Go to bottom"),
            ("f", "Toggle follow mode"),
        ],
    ),
    (
        "Display",
        &[
            ("s", "Toggle stats bar"),
            ("Esc", "Dismiss message"),
            ("?", "Toggle this help"),
            ("q", "Quit"),
        ],
    ),
];

/// Help overlay showing keybindings
pub struct HelpOverlay;

impl HelpOverlay {
    pub fn render(frame: &mut Frame) {
        let lines = Self::lines();
        // Content plus borders
        let height = lines.len() as u16 + 2;
        let area = Layout::popup(frame.area(), 50, height);
        frame.render_widget(Clear, area);

        let help = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::title())
                .title(Span::styled(" Help ", Theme::title())),
        );
        frame.render_widget(help, area);
    }

    fn lines() -> Vec<Line<'static>> {
        let mut lines = vec![Line::from(Span::styled("Keybindings", Theme::text_highlight()))];
        for (title, keys) in SECTIONS {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(*title, Theme::help_section())));
            lines.extend(keys.iter().map(|(key, desc)| {
                Line::from(vec![
                    Span::styled(format!("  {key:>8}"), Theme::help_key()),
                    Span::styled(format!("  {desc}"), Theme::text()),
                ])
            }));
        }
        lines
    }
}
