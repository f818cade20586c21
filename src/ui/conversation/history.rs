//! Conversation history display component

use crate::conversation::{Message, Sender};
use crate::ui::conversation::typing::TypingIndicator;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Renders the message list, newest at the bottom
pub struct ConversationHistory<'a> {
    messages: &'a [Message],
    pending: bool,
    assistant_name: &'a str,
    typing_frame: usize,
}

impl<'a> ConversationHistory<'a> {
    pub fn new(messages: &'a [Message], pending: bool, assistant_name: &'a str) -> Self {
        Self {
            messages,
            pending,
            assistant_name,
            typing_frame: 0,
        }
    }

    /// Animation frame for the typing indicator
    pub fn typing_frame(mut self, frame: usize) -> Self {
        self.typing_frame = frame;
        self
    }

    /// Every line of the history at the given width, oldest first
    pub fn lines(&self, width: u16) -> Vec<Line<'static>> {
        let mut all_lines = Vec::new();
        for (index, message) in self.messages.iter().enumerate() {
            all_lines.extend(self.render_message(index + 1, message, width));
            // spacing between messages
            all_lines.push(Line::default());
        }

        if self.pending {
            all_lines.extend(
                TypingIndicator::new(self.assistant_name, self.typing_frame).lines(),
            );
        }

        all_lines
    }

    fn render_message(&self, number: usize, message: &Message, width: u16) -> Vec<Line<'static>> {
        let (label, label_style) = match message.sender() {
            Sender::User => ("You".to_string(), Style::default().fg(Color::Blue)),
            Sender::Bot => (self.assistant_name.to_string(), Style::default().fg(Color::Green)),
        };

        let timestamp = message
            .timestamp()
            .with_timezone(&chrono::Local)
            .format("%H:%M:%S")
            .to_string();

        let mut lines = vec![Line::from(vec![
            Span::styled(label, label_style.add_modifier(Modifier::BOLD)),
            Span::styled(
                format!("  #{number}  {timestamp}"),
                Style::default().fg(Color::DarkGray),
            ),
        ])];

        let body_style = content_style(message.sender());
        for content_line in wrap_text(message.display_text(), width.saturating_sub(2) as usize) {
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(content_line, body_style),
            ]));
        }

        lines
    }
}

impl Widget for ConversationHistory<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default().borders(Borders::ALL).title(" Conversation ");

        let inner_area = block.inner(area);
        block.render(area, buf);

        if self.messages.is_empty() && !self.pending {
            let welcome_lines = vec![
                Line::from(vec![Span::styled(
                    "Welcome to AgroMind AI!",
                    Style::default().fg(Color::Green),
                )]),
                Line::default(),
                Line::from(vec![Span::styled(
                    "Ask anything about crops, soil, livestock or farm practices.",
                    Style::default().fg(Color::Gray),
                )]),
                Line::default(),
                Line::from(vec![Span::styled(
                    "Press Enter to send, Shift+Enter for new line, /help for commands.",
                    Style::default().fg(Color::DarkGray),
                )]),
            ];

            for (i, line) in welcome_lines.iter().enumerate().take(inner_area.height as usize) {
                buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
            }
            return;
        }

        // Bottom-anchored: show the last lines that fit
        let all_lines = self.lines(inner_area.width);
        let height = inner_area.height as usize;
        let start = all_lines.len().saturating_sub(height);

        for (i, line) in all_lines[start..].iter().enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}

/// Get content style based on sender
fn content_style(sender: Sender) -> Style {
    match sender {
        Sender::User => Style::default().fg(Color::White),
        Sender::Bot => Style::default().fg(Color::Green),
    }
}

/// Wrap text to fit within the given number of terminal cells, keeping
/// explicit line breaks
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current_line = String::new();
        let mut current_width = 0;

        for word in paragraph.split_whitespace() {
            let word_width = word.width();
            if current_width > 0 && current_width + 1 + word_width > width {
                lines.push(std::mem::take(&mut current_line));
                current_width = 0;
            }
            if current_width > 0 {
                current_line.push(' ');
                current_width += 1;
            }

            // Hard-split words wider than the line
            for c in word.chars() {
                let char_width = c.width().unwrap_or(0);
                if current_width > 0 && current_width + char_width > width {
                    lines.push(std::mem::take(&mut current_line));
                    current_width = 0;
                }
                current_line.push(c);
                current_width += char_width;
            }
        }

        lines.push(current_line);
    }

    lines
}
