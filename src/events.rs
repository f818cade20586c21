use crossterm::event::{Event, KeyEvent, KeyEventKind};

/// TUI-specific events (keyboard, paste, resize, animation)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TuiEvent {
    /// Key press event
    Key(KeyEvent),

    /// Paste event
    Paste(String),

    /// Terminal resize
    Resize(u16, u16),

    /// Animation tick or conversation change; redraw only
    Draw,
}

impl TuiEvent {
    /// Map a terminal event, dropping the ones the UI does not use
    pub fn from_terminal(event: Event) -> Option<Self> {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => Some(TuiEvent::Key(key)),
            Event::Paste(text) => Some(TuiEvent::Paste(text)),
            Event::Resize(width, height) => Some(TuiEvent::Resize(width, height)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEventState, KeyModifiers};

    #[test]
    fn key_releases_are_dropped() {
        let release = KeyEvent {
            code: KeyCode::Char('a'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert_eq!(TuiEvent::from_terminal(Event::Key(release)), None);

        let press = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE);
        assert_eq!(
            TuiEvent::from_terminal(Event::Key(press)),
            Some(TuiEvent::Key(press))
        );
    }

    #[test]
    fn focus_events_are_ignored() {
        assert_eq!(TuiEvent::from_terminal(Event::FocusGained), None);
    }
}
