use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::HashMap;

use crate::app::Action;
use crate::tui::Event;

/// A key combination
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeyBinding {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyBinding {
    pub fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::NONE,
        }
    }

    pub fn ctrl(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::CONTROL,
        }
    }

    pub fn shift(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::SHIFT,
        }
    }

    pub fn from_event(event: &KeyEvent) -> Self {
        Self {
            code: event.code,
            modifiers: event.modifiers,
        }
    }
}

/// Context for keybindings
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum KeyContext {
    Global,
    LogViewer,
    /// Help overlay is open
    Help,
}

/// Keybinding configuration
pub struct KeyBindings {
    bindings: HashMap<KeyContext, HashMap<KeyBinding, Action>>,
}

impl KeyBindings {
    pub fn new() -> Self {
        let mut bindings = HashMap::new();

        // Global bindings
        let mut global = HashMap::new();
        global.insert(KeyBinding::new(KeyCode::Char('?')), Action::ToggleHelp);
        global.insert(KeyBinding::ctrl(KeyCode::Char('c')), Action::Quit);
        global.insert(KeyBinding::new(KeyCode::Char('q')), Action::Quit);
        bindings.insert(KeyContext::Global, global);

        // Log viewer bindings - less-like navigation
        let mut log_viewer = HashMap::new();
        log_viewer.insert(KeyBinding::new(KeyCode::Char('j')), Action::ScrollDown(1));
        log_viewer.insert(KeyBinding::new(KeyCode::Down), Action::ScrollDown(1));
        log_viewer.insert(KeyBinding::new(KeyCode::Char('k')), Action::ScrollUp(1));
        log_viewer.insert(KeyBinding::new(KeyCode::Up), Action::ScrollUp(1));
        log_viewer.insert(KeyBinding::ctrl(KeyCode::Char('d')), Action::PageDown);
        log_viewer.insert(KeyBinding::ctrl(KeyCode::Char('u')), Action::PageUp);
        log_viewer.insert(KeyBinding::new(KeyCode::PageDown), Action::PageDown);
        log_viewer.insert(KeyBinding::new(KeyCode::PageUp), Action::PageUp);
        log_viewer.insert(KeyBinding::new(KeyCode::Char('g')), Action::ScrollToTop);
        log_viewer.insert(KeyBinding::shift(KeyCode::Char('G')), Action::ScrollToBottom);
        log_viewer.insert(KeyBinding::new(KeyCode::Home), Action::ScrollToTop);
        log_viewer.insert(KeyBinding::new(KeyCode::End), Action::ScrollToBottom);
        log_viewer.insert(KeyBinding::new(KeyCode::Char('f')), Action::ToggleAutoScroll);
        log_viewer.insert(KeyBinding::new(KeyCode::Char('s')), Action::ToggleStats);
        // Stream control
        log_viewer.insert(KeyBinding::new(KeyCode::Char('p')), Action::TogglePause);
        log_viewer.insert(KeyBinding::new(KeyCode::Char('r')), Action::ForceRefresh);
        log_viewer.insert(KeyBinding::new(KeyCode::Char('n')), Action::ToggleNoiseFilter);
        log_viewer.insert(KeyBinding::new(KeyCode::Char('c')), Action::ClearLogs);
        log_viewer.insert(KeyBinding::new(KeyCode::Tab), Action::SwitchStream);
        log_viewer.insert(KeyBinding::new(KeyCode::Esc), Action::DismissError);
        bindings.insert(KeyContext::LogViewer, log_viewer);

        let mut help = HashMap::new();
        help.insert(KeyBinding::new(KeyCode::Esc), Action::ToggleHelp);
        bindings.insert(KeyContext::Help, help);

        Self { bindings }
    }

    /// Look up action for key event in given context
    pub fn get_action(&self, context: KeyContext, key: &KeyEvent) -> Option<Action> {
        let binding = KeyBinding::from_event(key);

        if let Some(context_bindings) = self.bindings.get(&context)
            && let Some(action) = context_bindings.get(&binding)
        {
            return Some(action.clone());
        }

        // Fall back to global bindings
        self.bindings
            .get(&KeyContext::Global)?
            .get(&binding)
            .cloned()
    }

    /// Action for a terminal event. Keys resolve in the help context while
    /// the overlay is open; terminal errors become a visible message.
    pub fn action_for_event(&self, event: &Event, help_visible: bool) -> Option<Action> {
        match event {
            Event::Key(key) => {
                let context = if help_visible {
                    KeyContext::Help
                } else {
                    KeyContext::LogViewer
                };
                self.get_action(context, key)
            }
            Event::Error(message) => Some(Action::ShowError(message.clone())),
            Event::Tick | Event::Resize(_, _) => None,
        }
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_stream_control_keys() {
        let bindings = KeyBindings::new();
        let lookup = |c| bindings.get_action(KeyContext::LogViewer, &key(KeyCode::Char(c)));
        assert_eq!(lookup('p'), Some(Action::TogglePause));
        assert_eq!(lookup('r'), Some(Action::ForceRefresh));
        assert_eq!(lookup('n'), Some(Action::ToggleNoiseFilter));
        assert_eq!(lookup('c'), Some(Action::ClearLogs));
        assert_eq!(
            bindings.get_action(KeyContext::LogViewer, &key(KeyCode::Tab)),
            Some(Action::SwitchStream)
        );
    }

    #[test]
    fn test_global_fallback() {
        let bindings = KeyBindings::new();
        assert_eq!(
            bindings.get_action(KeyContext::LogViewer, &key(KeyCode::Char('q'))),
            Some(Action::Quit)
        );
        assert_eq!(
            bindings.get_action(KeyContext::Help, &key(KeyCode::Char('?'))),
            Some(Action::ToggleHelp)
        );
        assert_eq!(
            bindings.get_action(KeyContext::Help, &key(KeyCode::Char('p'))),
            None
        );
    }

    #[test]
    fn test_events_map_to_actions() {
        let bindings = KeyBindings::new();
        let esc = Event::Key(key(KeyCode::Esc));

        assert_eq!(
            bindings.action_for_event(&esc, false),
            Some(Action::DismissError)
        );
        assert_eq!(
            bindings.action_for_event(&esc, true),
            Some(Action::ToggleHelp)
        );
        assert_eq!(
            bindings.action_for_event(&Event::Error("tty gone".into()), false),
            Some(Action::ShowError("tty gone".into()))
        );
        assert_eq!(bindings.action_for_event(&Event::Tick, false), None);
        assert_eq!(bindings.action_for_event(&Event::Resize(80, 24), false), None);
    }

    #[test]
    fn test_modifiers_matter() {
        let bindings = KeyBindings::new();
        let ctrl_d = KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL);
        assert_eq!(
            bindings.get_action(KeyContext::LogViewer, &ctrl_d),
            Some(Action::PageDown)
        );
        let shift_g = KeyEvent::new(KeyCode::Char('G'), KeyModifiers::SHIFT);
        assert_eq!(
            bindings.get_action(KeyContext::LogViewer, &shift_g),
            Some(Action::ScrollToBottom)
        );
        assert_eq!(
            bindings.get_action(KeyContext::LogViewer, &key(KeyCode::Char('d'))),
            None
        );
    }
}
