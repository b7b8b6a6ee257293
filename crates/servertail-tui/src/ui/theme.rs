use ratatui::style::{Color, Modifier, Style};

use servertail_types::Severity;

/// Color theme for the application
pub struct Theme;

impl Theme {
    // Base colors
    pub const BG: Color = Color::Reset;
    pub const FG: Color = Color::White;
    pub const FG_DIM: Color = Color::DarkGray;

    // Accent colors
    pub const PRIMARY: Color = Color::Cyan;
    pub const HIGHLIGHT: Color = Color::Yellow;

    // Status colors
    pub const SUCCESS: Color = Color::Green;
    pub const WARNING: Color = Color::Yellow;
    pub const ERROR: Color = Color::Red;

    pub fn border() -> Style {
        Style::default().fg(Self::FG_DIM)
    }

    pub fn title() -> Style {
        Style::default()
            .fg(Self::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    pub fn text() -> Style {
        Style::default().fg(Self::FG)
    }

    pub fn text_dim() -> Style {
        Style::default().fg(Self::FG_DIM)
    }

    pub fn text_highlight() -> Style {
        Style::default()
            .fg(Self::HIGHLIGHT)
            .add_modifier(Modifier::BOLD)
    }

    // Stream state badges
    pub fn live() -> Style {
        Style::default()
            .fg(Self::BG)
            .bg(Self::SUCCESS)
            .add_modifier(Modifier::BOLD)
    }

    pub fn paused() -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(Self::WARNING)
            .add_modifier(Modifier::BOLD)
    }

    pub fn stale() -> Style {
        Style::default()
            .fg(Color::White)
            .bg(Self::ERROR)
            .add_modifier(Modifier::BOLD)
    }

    /// Severity tag in front of each line
    pub fn severity(severity: Severity) -> Style {
        Style::default()
            .fg(severity.color())
            .add_modifier(Modifier::BOLD)
    }

    /// Message body: only problems are colored
    pub fn message(severity: Severity) -> Style {
        match severity {
            Severity::Error => Style::default().fg(Self::ERROR),
            Severity::Warn => Style::default().fg(Self::WARNING),
            _ => Self::text(),
        }
    }

    // Status bar
    pub fn status_bar() -> Style {
        Style::default().fg(Self::FG_DIM).bg(Color::DarkGray)
    }

    pub fn status_bar_key() -> Style {
        Style::default()
            .fg(Self::HIGHLIGHT)
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD)
    }

    // Help overlay
    pub fn help_section() -> Style {
        Style::default().fg(Self::HIGHLIGHT)
    }

    pub fn help_key() -> Style {
        Style::default().fg(Self::SUCCESS)
    }

    pub fn error() -> Style {
        Style::default()
            .fg(Self::ERROR)
            .add_modifier(Modifier::BOLD)
    }
}
