//! Input box: collects keystrokes and decides when a message is submitted

use crate::ui::conversation::commands::{command_entries, parse_slash_command, CommandEntry, ParsedCommand};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Widget},
};

/// Result returned when the user interacts with the conversation composer
#[derive(Debug, PartialEq)]
pub enum ConversationResult {
    /// Trimmed text to hand to the controller
    Submitted(String),
    Command(ParsedCommand),
    None,
}

/// Editable text with a cursor counted in chars
#[derive(Debug, Clone, Default)]
pub struct TextAreaState {
    pub content: String,
    pub cursor_position: usize,
}

impl TextAreaState {
    fn byte_index(&self) -> usize {
        self.content
            .char_indices()
            .nth(self.cursor_position)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }

    fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    fn insert_char(&mut self, c: char) {
        let at = self.byte_index();
        self.content.insert(at, c);
        self.cursor_position += 1;
    }

    fn insert_str(&mut self, text: &str) {
        let at = self.byte_index();
        self.content.insert_str(at, text);
        self.cursor_position += text.chars().count();
    }

    /// Delete character before cursor
    fn backspace(&mut self) -> bool {
        if self.cursor_position == 0 {
            return false;
        }
        self.cursor_position -= 1;
        let at = self.byte_index();
        self.content.remove(at);
        true
    }

    /// Delete character at cursor
    fn delete(&mut self) -> bool {
        if self.cursor_position >= self.char_count() {
            return false;
        }
        let at = self.byte_index();
        self.content.remove(at);
        true
    }

    fn clear(&mut self) {
        self.content.clear();
        self.cursor_position = 0;
    }
}

/// Conversation composer for user input
#[derive(Debug, Clone)]
pub struct ConversationComposer {
    state: TextAreaState,
    placeholder: String,
    has_focus: bool,
    command_entries: Vec<CommandEntry>,
    filtered_commands: Vec<CommandEntry>,
    show_command_palette: bool,
    selected_command: Option<usize>,
}

impl ConversationComposer {
    pub fn new(placeholder: String) -> Self {
        Self {
            state: TextAreaState::default(),
            placeholder,
            has_focus: true,
            command_entries: command_entries(),
            filtered_commands: Vec::new(),
            show_command_palette: false,
            selected_command: None,
        }
    }

    /// Handle key input. `pending` is the controller's flag; while it is set
    /// plain messages are held back, slash commands still run.
    pub fn handle_key(&mut self, key: KeyEvent, pending: bool) -> ConversationResult {
        if key.kind != KeyEventKind::Press {
            return ConversationResult::None;
        }

        match key.code {
            KeyCode::Enter => {
                if key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) {
                    self.state.insert_char('\n');
                } else if self.show_command_palette && self.apply_selected_command() {
                    return ConversationResult::None;
                } else {
                    return self.submit(pending);
                }
            }
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return self.submit(pending);
            }
            KeyCode::Up if self.show_command_palette => self.move_command_selection(-1),
            KeyCode::Down if self.show_command_palette => self.move_command_selection(1),
            KeyCode::Tab if self.show_command_palette => {
                self.apply_selected_command();
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.state.insert_char(c);
                self.sync_command_palette();
            }
            KeyCode::Backspace => {
                if self.state.backspace() {
                    self.sync_command_palette();
                }
            }
            KeyCode::Delete => {
                if self.state.delete() {
                    self.sync_command_palette();
                }
            }
            KeyCode::Left => {
                self.state.cursor_position = self.state.cursor_position.saturating_sub(1);
            }
            KeyCode::Right => {
                if self.state.cursor_position < self.state.char_count() {
                    self.state.cursor_position += 1;
                }
            }
            KeyCode::Home => {
                self.state.cursor_position = 0;
            }
            KeyCode::End => {
                self.state.cursor_position = self.state.char_count();
            }
            _ => {}
        }

        ConversationResult::None
    }

    /// Insert pasted text at the cursor
    pub fn paste(&mut self, text: &str) {
        let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
        self.state.insert_str(&normalized);
        self.sync_command_palette();
    }

    /// Apply the submit guard and clear the candidate text on success
    fn submit(&mut self, pending: bool) -> ConversationResult {
        let trimmed = self.state.content.trim();
        if trimmed.is_empty() {
            return ConversationResult::None;
        }

        if let Some(command) = parse_slash_command(trimmed) {
            self.state.clear();
            self.close_command_palette();
            return ConversationResult::Command(command);
        }

        if pending {
            return ConversationResult::None;
        }

        let text = trimmed.to_string();
        self.state.clear();
        self.close_command_palette();
        ConversationResult::Submitted(text)
    }

    fn sync_command_palette(&mut self) {
        let content = &self.state.content;
        let typing_command = content.starts_with('/') && !content.contains(char::is_whitespace);

        if typing_command {
            if !self.show_command_palette {
                self.show_command_palette = true;
                self.selected_command = Some(0);
            }
            self.refresh_command_palette();
        } else if self.show_command_palette {
            self.close_command_palette();
        }
    }

    fn close_command_palette(&mut self) {
        self.show_command_palette = false;
        self.filtered_commands.clear();
        self.selected_command = None;
    }

    fn refresh_command_palette(&mut self) {
        let query = self.state.content.trim_start_matches('/').to_lowercase();
        self.filtered_commands = self
            .command_entries
            .iter()
            .filter(|entry| query.is_empty() || entry.keyword.starts_with(&query))
            .copied()
            .collect();

        self.selected_command = if self.filtered_commands.is_empty() {
            None
        } else {
            let index = self.selected_command.unwrap_or(0);
            Some(index.min(self.filtered_commands.len() - 1))
        };
    }

    fn move_command_selection(&mut self, delta: isize) {
        if self.filtered_commands.is_empty() {
            self.selected_command = None;
            return;
        }

        let len = self.filtered_commands.len() as isize;
        let current = self.selected_command.unwrap_or(0) as isize;
        self.selected_command = Some((current + delta).rem_euclid(len) as usize);
    }

    fn apply_selected_command(&mut self) -> bool {
        let Some(entry) = self
            .selected_command
            .and_then(|index| self.filtered_commands.get(index).copied())
        else {
            return false;
        };

        self.state.content = format!("/{} ", entry.keyword);
        self.state.cursor_position = self.state.char_count();
        self.close_command_palette();
        true
    }

    /// Set focus state
    pub fn set_focus(&mut self, has_focus: bool) {
        self.has_focus = has_focus;
    }

    /// Get current content
    pub fn content(&self) -> &str {
        &self.state.content
    }

    pub fn is_palette_open(&self) -> bool {
        self.show_command_palette
    }

    /// Close the command palette, returning whether it was open
    pub fn dismiss_palette(&mut self) -> bool {
        let was_open = self.show_command_palette;
        self.close_command_palette();
        was_open
    }

    /// Rows needed to show the content, borders included
    pub fn desired_height(&self, max: u16) -> u16 {
        let lines = self.state.content.split('\n').count().max(1) as u16;
        (lines + 2).min(max)
    }

    /// Widget for the current frame
    pub fn widget(&self, pending: bool) -> ComposerWidget<'_> {
        ComposerWidget {
            composer: self,
            pending,
        }
    }
}

/// Composer rendering for one frame
pub struct ComposerWidget<'a> {
    composer: &'a ConversationComposer,
    pending: bool,
}

impl Widget for ComposerWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let composer = self.composer;
        let state = &composer.state;

        let title = if self.pending { " Waiting for reply " } else { " Message " };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .style(if composer.has_focus && !self.pending {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Gray)
            });

        let inner_area = block.inner(area);
        block.render(area, buf);

        // A squeezed terminal can leave no row inside the borders
        let has_room = inner_area.height > 0 && inner_area.width > 0;
        if has_room && state.content.is_empty() {
            let placeholder = if self.pending {
                "Please wait..."
            } else {
                composer.placeholder.as_str()
            };
            let placeholder_line = Line::from(vec![Span::styled(
                placeholder,
                Style::default().fg(Color::DarkGray),
            )]);
            buf.set_line(inner_area.x, inner_area.y, &placeholder_line, inner_area.width);
        } else if has_room {
            let mut content = state.content.clone();
            if composer.has_focus {
                content.insert(state.byte_index(), '▌');
            }

            // Keep the cursor line visible when the text is taller than the box
            let lines: Vec<&str> = content.split('\n').collect();
            let height = inner_area.height as usize;
            let start = lines.len().saturating_sub(height);
            for (i, line_text) in lines[start..].iter().enumerate() {
                let line = Line::from(vec![Span::raw(*line_text)]);
                buf.set_line(inner_area.x, inner_area.y + i as u16, &line, inner_area.width);
            }
        }

        if composer.show_command_palette {
            render_command_palette(composer, area, buf);
        }
    }
}

fn render_command_palette(composer: &ConversationComposer, area: Rect, buf: &mut Buffer) {
    let filtered = &composer.filtered_commands;
    let palette_height = (filtered.len().min(5) + 2) as u16;
    if area.y < palette_height {
        return;
    }
    let palette_area = Rect {
        x: area.x,
        y: area.y - palette_height,
        width: area.width,
        height: palette_height,
    };

    Clear.render(palette_area, buf);
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Commands")
        .style(Style::default().fg(Color::Blue));
    let inner = block.inner(palette_area);
    block.render(palette_area, buf);

    for (index, entry) in filtered.iter().enumerate().take(inner.height as usize) {
        let style = if composer.selected_command == Some(index) {
            Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };

        let line = Line::from(vec![
            Span::styled(format!("/{}", entry.keyword), style),
            Span::styled("  ", Style::default()),
            Span::styled(entry.description, Style::default().fg(Color::Gray)),
        ]);

        buf.set_line(inner.x, inner.y + index as u16, &line, inner.width);
    }
}
