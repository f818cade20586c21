use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use std::time::{SystemTime, UNIX_EPOCH};

const FRAMES: [&str; 4] = ["●∙∙", "∙●∙", "∙∙●", "∙∙∙"];
const FRAME_MILLIS: u128 = 300;

/// Frame index derived from the wall clock so every redraw advances it
pub fn current_frame() -> usize {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    (millis / FRAME_MILLIS % FRAMES.len() as u128) as usize
}

/// Placeholder bot row shown while a reply is pending
pub struct TypingIndicator<'a> {
    assistant_name: &'a str,
    frame: usize,
}

impl<'a> TypingIndicator<'a> {
    pub fn new(assistant_name: &'a str, frame: usize) -> Self {
        Self {
            assistant_name,
            frame,
        }
    }

    pub fn lines(&self) -> Vec<Line<'static>> {
        let dots = FRAMES[self.frame % FRAMES.len()];
        vec![
            Line::from(vec![Span::styled(
                self.assistant_name.to_string(),
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )]),
            Line::from(vec![
                Span::raw("  "),
                Span::styled(dots, Style::default().fg(Color::Yellow)),
            ]),
        ]
    }
}
