use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Events that can occur in the dashboard TUI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardEvent {
    /// Quit the application
    Quit,
    /// Toggle help overlay
    ToggleHelp,
    /// Fetch every source now
    RefreshAll,
    /// No action
    None,
}

impl DashboardEvent {
    /// Map a key press. Raw mode swallows SIGINT, so Ctrl+C arrives here.
    pub fn from_key(key: KeyEvent) -> Self {
        if key.kind != KeyEventKind::Press {
            return DashboardEvent::None;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                DashboardEvent::Quit
            }
            KeyCode::Char('q') | KeyCode::Esc => DashboardEvent::Quit,
            KeyCode::Char('?') => DashboardEvent::ToggleHelp,
            KeyCode::Char('r') => DashboardEvent::RefreshAll,
            _ => DashboardEvent::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mapping() {
        let key = |code| KeyEvent::new(code, KeyModifiers::NONE);

        assert_eq!(DashboardEvent::from_key(key(KeyCode::Char('q'))), DashboardEvent::Quit);
        assert_eq!(DashboardEvent::from_key(key(KeyCode::Esc)), DashboardEvent::Quit);
        assert_eq!(
            DashboardEvent::from_key(key(KeyCode::Char('r'))),
            DashboardEvent::RefreshAll
        );
        assert_eq!(
            DashboardEvent::from_key(key(KeyCode::Char('?'))),
            DashboardEvent::ToggleHelp
        );
        assert_eq!(DashboardEvent::from_key(key(KeyCode::Char('c'))), DashboardEvent::None);
        assert_eq!(
            DashboardEvent::from_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            DashboardEvent::Quit
        );
    }

    #[test]
    fn test_release_events_ignored() {
        let mut key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        key.kind = KeyEventKind::Release;
        assert_eq!(DashboardEvent::from_key(key), DashboardEvent::None);
    }
}
