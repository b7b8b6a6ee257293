/// All possible actions in the application (command pattern)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Quit,
    ToggleHelp,

    // Stream control
    TogglePause,
    ForceRefresh,
    ToggleNoiseFilter,
    ClearLogs,
    SwitchStream,

    // Log viewer
    ScrollUp(usize),
    ScrollDown(usize),
    ScrollToTop,
    ScrollToBottom,
    PageUp,
    PageDown,
    ToggleAutoScroll,
    ToggleStats,

    // Error handling
    ShowError(String),
    DismissError,
}
