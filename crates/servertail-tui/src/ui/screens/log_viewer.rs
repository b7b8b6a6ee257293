use chrono::{Local, Utc};
use ratatui::{
    Frame,
    layout::{Margin, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};
use unicode_width::UnicodeWidthChar;

use servertail_logs::StreamStatus;
use servertail_types::{SchedulerState, Severity};

use crate::app::{ActiveStream, AppState, Streams, ViewRow};
use crate::ui::components::{StatusBar, log_viewer_hints};
use crate::ui::{Layout, Theme};

/// Width of the category / target column
const LABEL_WIDTH: usize = 10;

/// Log viewer screen
pub struct LogViewerScreen;

impl LogViewerScreen {
    pub fn render(frame: &mut Frame, state: &mut AppState, streams: &Streams) {
        let areas = Layout::log_viewer(frame.area(), state.ui_state.stats_visible);
        let status = streams.status(state.active);

        Self::render_header(frame, areas.header, state.active, &status);
        if let Some(stats) = areas.stats {
            Self::render_stats_bar(frame, stats, state.active, streams);
        }
        Self::render_logs(frame, areas.logs, state, streams, &status);
        Self::render_status_bar(frame, areas.status, state, &status);
    }

    fn render_header(frame: &mut Frame, area: Rect, active: ActiveStream, status: &StreamStatus) {
        let mut spans = vec![
            Span::styled("servertail", Theme::title()),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled(active.label(), Theme::text_highlight()),
        ];

        if active == ActiveStream::Console {
            spans.push(Span::styled(" │ ", Theme::text_dim()));
            spans.push(Span::styled(
                status.info.path.display().to_string(),
                Theme::text(),
            ));
        }

        spans.push(Span::styled(" │ ", Theme::text_dim()));
        spans.push(state_badge(status));

        if !status.info.exists {
            spans.push(Span::styled(" waiting for file", Theme::text_highlight()));
        }
        if status.is_stale() {
            spans.push(Span::styled(" ", Theme::text()));
            spans.push(Span::styled(
                format!(" STALE ×{} ", status.consecutive_failures),
                Theme::stale(),
            ));
            if let Some(err) = &status.last_error {
                spans.push(Span::styled(format!(" {err}"), Theme::error()));
            }
        } else if let Some(at) = status.last_read_at {
            let age = (Utc::now() - at).num_seconds().max(0);
            spans.push(Span::styled(format!(" updated {age}s ago"), Theme::text_dim()));
        }

        let header = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border()),
        );
        frame.render_widget(header, area);
    }

    fn render_logs(
        frame: &mut Frame,
        area: Rect,
        state: &mut AppState,
        streams: &Streams,
        status: &StreamStatus,
    ) {
        let active = state.active;
        let filtered = status.state.filtered;
        let view = state.ui_state.filter_cache.refresh(streams, active, filtered);
        let visible = view.rows.len();
        let total = view.total;

        // Calculate visible area (accounting for border)
        let inner_height = area.height.saturating_sub(2) as usize;
        let max_scroll = visible.saturating_sub(inner_height);

        if state.ui_state.auto_scroll {
            state.ui_state.log_scroll = max_scroll;
        }
        state.ui_state.log_scroll = state.ui_state.log_scroll.min(max_scroll);

        // 2 for borders, 2 for scrollbar
        let inner_width = area.width.saturating_sub(4) as usize;
        let lines: Vec<Line> = state
            .ui_state
            .filter_cache
            .view
            .rows
            .iter()
            .skip(state.ui_state.log_scroll)
            .take(inner_height)
            .map(|row| format_row(row, inner_width))
            .collect();

        let title = if filtered && visible != total {
            format!(" Logs ({visible}/{total}, {} hidden) ", total - visible)
        } else {
            format!(" Logs ({total}) ")
        };

        let logs_widget = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border())
                .title(Span::styled(title, Theme::title())),
        );
        frame.render_widget(logs_widget, area);

        if visible > inner_height {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("▲"))
                .end_symbol(Some("▼"));
            let mut scrollbar_state = ScrollbarState::default()
                .content_length(max_scroll)
                .position(state.ui_state.log_scroll);

            frame.render_stateful_widget(
                scrollbar,
                area.inner(Margin {
                    vertical: 1,
                    horizontal: 0,
                }),
                &mut scrollbar_state,
            );
        }
    }

    fn render_stats_bar(frame: &mut Frame, area: Rect, active: ActiveStream, streams: &Streams) {
        let counts = streams.counts(active);

        let mut spans = vec![Span::styled(" ", Theme::text())];
        for severity in Severity::ALL {
            let count = counts.get(severity);
            if count == 0 && matches!(severity, Severity::Unknown | Severity::Debug) {
                continue;
            }
            spans.push(Span::styled(format!("{}:", severity.short()), Theme::severity(severity)));
            spans.push(Span::styled(format!("{count} "), Theme::text()));
        }
        spans.push(Span::styled("│ ", Theme::text_dim()));
        spans.push(Span::styled("Total:", Theme::text_dim()));
        spans.push(Span::styled(counts.total().to_string(), Theme::text()));

        let stats_widget = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border())
                .title(Span::styled(" Stats ", Theme::title())),
        );
        frame.render_widget(stats_widget, area);
    }

    fn render_status_bar(frame: &mut Frame, area: Rect, state: &AppState, status: &StreamStatus) {
        let view = &state.ui_state.filter_cache.view;

        let mut bar = StatusBar::new().hints(log_viewer_hints());
        if let Some(err) = &state.ui_state.error_message {
            bar = bar.right(err.clone(), Theme::error());
        }
        if status.pending > 0 {
            bar = bar.right(format!("{} queued", status.pending), Theme::status_bar_key());
        }
        bar = bar
            .right(
                if status.state.filtered { "filter:on" } else { "filter:off" },
                Theme::status_bar(),
            )
            .right(
                format!("{}/{} lines", view.rows.len(), view.total),
                Theme::status_bar(),
            )
            .right(
                if state.ui_state.auto_scroll { "▼" } else { " " },
                Theme::status_bar(),
            );

        frame.render_widget(bar, area);
    }
}

fn state_badge(status: &StreamStatus) -> Span<'static> {
    let state = status.scheduler_state();
    let style = match state {
        SchedulerState::Running => Theme::live(),
        SchedulerState::Paused => Theme::paused(),
    };
    Span::styled(format!(" {} ", state.label()), style)
}

/// `SEV label │ message`, with a local time column for internal records
fn format_row(row: &ViewRow, width: usize) -> Line<'static> {
    let severity = row.severity();
    let mut spans = Vec::with_capacity(5);
    let mut used = 0;

    if let Some(ts) = row.timestamp() {
        spans.push(Span::styled(
            format!("{} ", ts.with_timezone(&Local).format("%H:%M:%S")),
            Theme::text_dim(),
        ));
        used += 9;
    }

    spans.push(Span::styled(
        severity.short().to_string(),
        Theme::severity(severity),
    ));
    used += 3;

    let label = truncate_to_width(row.label(), LABEL_WIDTH);
    spans.push(Span::styled(
        format!(" {label:>LABEL_WIDTH$}"),
        Style::default().fg(Theme::PRIMARY).add_modifier(Modifier::DIM),
    ));
    used += LABEL_WIDTH + 1;

    spans.push(Span::styled(" │ ", Theme::text_dim()));
    used += 3;

    let message = truncate_to_width(row.message(), width.saturating_sub(used));
    spans.push(Span::styled(message, Theme::message(severity)));

    Line::from(spans)
}

/// Cut `text` to at most `max` terminal columns, marking the cut with `…`
fn truncate_to_width(text: &str, max: usize) -> String {
    let full: usize = text.chars().map(|c| c.width().unwrap_or(0)).sum();
    if full <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > max - 1 {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push('…');
    out
}
