use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};
use unicode_width::UnicodeWidthStr;

pub const TITLE: &str = "AgroMind AI";
pub const SUBTITLE: &str = "Your Smart Assistant For Learning Agriculture";

/// Title bar with the model badge on the right
pub struct ChatHeader<'a> {
    model_label: &'a str,
}

impl<'a> ChatHeader<'a> {
    pub fn new(model_label: &'a str) -> Self {
        Self { model_label }
    }
}

impl Widget for ChatHeader<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let inner = block.inner(area);
        block.render(area, buf);
        if inner.height == 0 || inner.width == 0 {
            return;
        }

        let title = Line::from(vec![
            Span::styled(
                TITLE,
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("  {SUBTITLE}"), Style::default().fg(Color::Gray)),
        ]);
        buf.set_line(inner.x, inner.y, &title, inner.width);

        let badge = format!("● {}", self.model_label);
        let badge_width = badge.width() as u16;
        if inner.width > badge_width {
            let line = Line::from(vec![Span::styled(badge, Style::default().fg(Color::Green))]);
            buf.set_line(inner.x + inner.width - badge_width, inner.y, &line, badge_width);
        }
    }
}
