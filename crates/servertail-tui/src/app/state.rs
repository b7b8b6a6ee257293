use super::streams::{ActiveStream, StreamView, Streams};

/// Rows per page for Ctrl+d / Ctrl+u
pub const PAGE_SIZE: usize = 20;

/// Cache for filtered log results to avoid re-filtering on every render
#[derive(Default)]
pub struct FilterCache {
    /// (stream, buffer generation, filter on) the view was built for
    key: Option<(ActiveStream, u64, bool)>,
    /// The cached view
    pub view: StreamView,
}

impl FilterCache {
    /// Check if cache needs to be rebuilt
    pub fn needs_refresh(&self, stream: ActiveStream, generation: u64, filtered: bool) -> bool {
        self.key != Some((stream, generation, filtered))
    }

    /// Rebuild from the streams when stale, then return the view
    pub fn refresh(&mut self, streams: &Streams, stream: ActiveStream, filtered: bool) -> &StreamView {
        let generation = streams.generation(stream);
        if self.needs_refresh(stream, generation, filtered) {
            self.view = streams.view(stream, filtered);
            self.key = Some((stream, generation, filtered));
        }
        &self.view
    }

    pub fn invalidate(&mut self) {
        self.key = None;
    }
}

/// UI-specific transient state
pub struct UiState {
    /// Is help overlay visible?
    pub help_visible: bool,

    /// Error message to display (if any)
    pub error_message: Option<String>,

    /// Scroll position in log viewer
    pub log_scroll: usize,

    /// Auto-scroll enabled (follow mode)?
    pub auto_scroll: bool,

    /// Show statistics panel?
    pub stats_visible: bool,

    /// Cache for filtered log results
    pub filter_cache: FilterCache,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            help_visible: false,
            error_message: None,
            log_scroll: 0,
            auto_scroll: true,
            stats_visible: false,
            filter_cache: FilterCache::default(),
        }
    }
}

/// Global application state
pub struct AppState {
    /// Stream currently on screen
    pub active: ActiveStream,

    /// UI state
    pub ui_state: UiState,

    /// Whether app should quit
    pub should_quit: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            active: ActiveStream::default(),
            ui_state: UiState::default(),
            should_quit: false,
        }
    }

    /// Show the other stream, following its tail
    pub fn switch_stream(&mut self) {
        self.active = self.active.next();
        self.ui_state.log_scroll = 0;
        self.ui_state.auto_scroll = true;
        self.ui_state.filter_cache.invalidate();
    }

    pub fn scroll_up(&mut self, n: usize) {
        self.ui_state.auto_scroll = false;
        self.ui_state.log_scroll = self.ui_state.log_scroll.saturating_sub(n);
    }

    pub fn scroll_down(&mut self, n: usize) {
        self.ui_state.auto_scroll = false;
        self.ui_state.log_scroll = self.ui_state.log_scroll.saturating_add(n);
    }

    pub fn scroll_to_top(&mut self) {
        self.ui_state.auto_scroll = false;
        self.ui_state.log_scroll = 0;
    }

    /// Jump to the end; the renderer clamps the position
    pub fn scroll_to_bottom(&mut self) {
        self.ui_state.auto_scroll = false;
        self.ui_state.log_scroll = usize::MAX;
    }

    pub fn toggle_auto_scroll(&mut self) {
        self.ui_state.auto_scroll = !self.ui_state.auto_scroll;
    }

    /// Drop the view state tied to buffer content
    pub fn reset_view(&mut self) {
        self.ui_state.log_scroll = 0;
        self.ui_state.auto_scroll = true;
        self.ui_state.filter_cache.invalidate();
    }

    /// Show an error message
    pub fn show_error(&mut self, msg: String) {
        self.ui_state.error_message = Some(msg);
    }

    /// Dismiss the error message
    pub fn dismiss_error(&mut self) {
        self.ui_state.error_message = None;
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
