use crate::clipboard::{Clipboard, ClipboardError};
use crate::config::UiConfig;
use crate::conversation::{ConversationController, Message, Sender, Snapshot};
use crate::events::TuiEvent;
use crate::gateway::Gateway;
use crate::ui::conversation::commands::{get_help_text, CopyTarget, ParsedCommand, SlashCommand};
use crate::ui::conversation::composer::{ConversationComposer, ConversationResult};
use crate::ui::conversation::header::ChatHeader;
use crate::ui::conversation::history::ConversationHistory;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};
use std::time::{Duration, Instant};

/// Actions that can be requested by the conversation manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    Exit,
}

/// Short-lived notice shown above the composer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusNotice {
    pub text: String,
    pub is_error: bool,
    pub expires_at: Instant,
}

/// Ties the controller to the widgets and routes terminal input
pub struct ConversationManager<G> {
    controller: ConversationController<G>,
    composer: ConversationComposer,
    clipboard: Box<dyn Clipboard>,
    ui: UiConfig,
    status: Option<StatusNotice>,
    show_help: bool,
}

impl<G: Gateway + 'static> ConversationManager<G> {
    pub fn new(
        controller: ConversationController<G>,
        clipboard: Box<dyn Clipboard>,
        ui: UiConfig,
    ) -> Self {
        let placeholder = format!("Message {}...", ui.assistant_name);
        Self {
            controller,
            composer: ConversationComposer::new(placeholder),
            clipboard,
            ui,
            status: None,
            show_help: false,
        }
    }

    /// Route one terminal event
    pub fn handle_event(&mut self, event: TuiEvent) -> ConversationAction {
        match event {
            TuiEvent::Key(key) => self.handle_key(key),
            TuiEvent::Paste(text) => {
                self.set_help(false);
                self.composer.paste(&text);
                ConversationAction::None
            }
            TuiEvent::Resize(..) | TuiEvent::Draw => {
                self.expire_status(Instant::now());
                ConversationAction::None
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return ConversationAction::Exit;
        }

        if self.show_help {
            self.set_help(false);
            return ConversationAction::None;
        }

        if key.code == KeyCode::Esc {
            return if self.composer.dismiss_palette() {
                ConversationAction::None
            } else {
                ConversationAction::Exit
            };
        }

        match self.composer.handle_key(key, self.controller.is_pending()) {
            ConversationResult::Submitted(text) => {
                self.submit(text);
                ConversationAction::None
            }
            ConversationResult::Command(command) => self.handle_slash_command(command),
            ConversationResult::None => ConversationAction::None,
        }
    }

    /// Append the user message now and resolve the gateway call on a task
    fn submit(&mut self, text: String) {
        match self.controller.begin_submit(&text) {
            Ok(submission) => {
                tokio::spawn(async move {
                    let outcome = submission.resolve().await;
                    tracing::debug!(?outcome, "submit resolved");
                });
            }
            Err(rejection) => {
                tracing::debug!(?rejection, "submit ignored");
            }
        }
    }

    /// Handle slash commands
    fn handle_slash_command(&mut self, command: ParsedCommand) -> ConversationAction {
        match command.command {
            SlashCommand::Quit => ConversationAction::Exit,
            SlashCommand::Help => {
                self.set_help(true);
                ConversationAction::None
            }
            SlashCommand::Copy => {
                match command.copy_target() {
                    Some(target) => self.copy(target),
                    None => self.set_status("Usage: /copy [N]", true),
                }
                ConversationAction::None
            }
        }
    }

    fn copy(&mut self, target: CopyTarget) {
        let snapshot = self.controller.snapshot();
        let result = select_copy_target(&snapshot.messages, target)
            .ok_or(ClipboardError::NothingToCopy)
            .and_then(|message| self.clipboard.set_text(message.display_text()));

        match result {
            Ok(()) => self.set_status("Copied", false),
            Err(err) => {
                tracing::warn!(error = %err, "copy to clipboard failed");
                self.set_status("Copy failed", true);
            }
        }
    }
}

impl<G> ConversationManager<G> {
    /// The help overlay takes focus from the composer while open
    fn set_help(&mut self, visible: bool) {
        self.show_help = visible;
        self.composer.set_focus(!visible);
    }

    fn set_status(&mut self, text: &str, is_error: bool) {
        self.status = Some(StatusNotice {
            text: text.to_string(),
            is_error,
            expires_at: Instant::now() + Duration::from_millis(self.ui.status_timeout_ms),
        });
    }

    /// Drop the status notice once its time is up
    pub fn expire_status(&mut self, now: Instant) {
        if self.status.as_ref().is_some_and(|s| s.expires_at <= now) {
            self.status = None;
        }
    }

    pub fn status(&self) -> Option<&StatusNotice> {
        self.status.as_ref()
    }

    pub fn composer(&self) -> &ConversationComposer {
        &self.composer
    }

    pub fn controller(&self) -> &ConversationController<G> {
        &self.controller
    }

    /// Render the whole chat screen from a fresh snapshot
    pub fn render(&self, area: Rect, buf: &mut Buffer, typing_frame: usize) {
        let snapshot = self.controller.snapshot();
        ChatView {
            snapshot: &snapshot,
            composer: &self.composer,
            status: self.status.as_ref(),
            ui: &self.ui,
            typing_frame,
            show_help: self.show_help,
        }
        .render(area, buf);
    }
}

/// Message that `/copy` refers to
pub fn select_copy_target(messages: &[Message], target: CopyTarget) -> Option<&Message> {
    match target {
        CopyTarget::LatestReply => messages.iter().rev().find(|m| m.sender() == Sender::Bot),
        CopyTarget::Number(n) => messages.get(n.checked_sub(1)?),
    }
}

/// One frame of the chat screen. Holds only borrowed state so drawing never
/// changes the conversation.
pub struct ChatView<'a> {
    pub snapshot: &'a Snapshot,
    pub composer: &'a ConversationComposer,
    pub status: Option<&'a StatusNotice>,
    pub ui: &'a UiConfig,
    pub typing_frame: usize,
    pub show_help: bool,
}

impl Widget for ChatView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let composer_height = self.composer.desired_height(8);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),               // Header
                Constraint::Min(3),                  // History
                Constraint::Length(1),               // Status
                Constraint::Length(composer_height), // Composer
            ])
            .split(area);

        ChatHeader::new(&self.ui.model_label).render(chunks[0], buf);

        ConversationHistory::new(
            &self.snapshot.messages,
            self.snapshot.pending,
            &self.ui.assistant_name,
        )
        .typing_frame(self.typing_frame)
        .render(chunks[1], buf);

        if let Some(status) = self.status.filter(|_| chunks[2].height > 0 && chunks[2].width > 1) {
            let color = if status.is_error { Color::Red } else { Color::Green };
            let line = Line::from(vec![Span::styled(
                status.text.clone(),
                Style::default().fg(color),
            )]);
            buf.set_line(chunks[2].x + 1, chunks[2].y, &line, chunks[2].width.saturating_sub(1));
        }

        self.composer
            .widget(self.snapshot.pending)
            .render(chunks[3], buf);

        if self.show_help {
            render_help(chunks[1], buf);
        }
    }
}

fn render_help(area: Rect, buf: &mut Buffer) {
    let help = get_help_text();
    let height = (help.lines().count() as u16 + 2).min(area.height);
    let width = area.width.saturating_sub(4).min(72);
    let popup = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    };

    Clear.render(popup, buf);
    Paragraph::new(help)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help (any key to close) ")
                .style(Style::default().fg(Color::Cyan)),
        )
        .render(popup, buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::FALLBACK_TEXT;
    use crate::gateway::GatewayError;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct EchoGateway;

    #[async_trait]
    impl Gateway for EchoGateway {
        async fn ask(&self, query: &str) -> Result<String, GatewayError> {
            Ok(format!("**Answer** to {query}…"))
        }
    }

    struct DownGateway;

    #[async_trait]
    impl Gateway for DownGateway {
        async fn ask(&self, _query: &str) -> Result<String, GatewayError> {
            Err(GatewayError::Decode("unreachable".to_string()))
        }
    }

    #[derive(Clone, Default)]
    struct RecordingClipboard {
        copied: Arc<Mutex<Vec<String>>>,
    }

    impl Clipboard for RecordingClipboard {
        fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
            self.copied.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    struct BrokenClipboard;

    impl Clipboard for BrokenClipboard {
        fn set_text(&mut self, _text: &str) -> Result<(), ClipboardError> {
            Err(ClipboardError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "no terminal",
            )))
        }
    }

    fn key(code: KeyCode) -> TuiEvent {
        TuiEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn send<G: Gateway + 'static>(
        manager: &mut ConversationManager<G>,
        text: &str,
    ) -> ConversationAction {
        manager.handle_event(TuiEvent::Paste(text.to_string()));
        let action = manager.handle_event(key(KeyCode::Enter));
        if action == ConversationAction::None && manager.composer().content().starts_with('/') {
            // first Enter only completed the highlighted command
            return manager.handle_event(key(KeyCode::Enter));
        }
        action
    }

    async fn settle<G: Gateway>(controller: &ConversationController<G>) {
        let mut revision = controller.subscribe();
        while controller.is_pending() {
            revision.changed().await.unwrap();
        }
    }

    fn manager_with<G: Gateway + 'static>(
        gateway: G,
        clipboard: Box<dyn Clipboard>,
    ) -> ConversationManager<G> {
        ConversationManager::new(
            ConversationController::new(gateway),
            clipboard,
            UiConfig::default(),
        )
    }

    #[tokio::test]
    async fn enter_appends_user_message_immediately() {
        let mut manager = manager_with(EchoGateway, Box::new(RecordingClipboard::default()));
        send(&mut manager, "  Best time to prune apple trees?  ");

        let snapshot = manager.controller().snapshot();
        assert_eq!(snapshot.messages.len(), 1);
        assert_eq!(snapshot.messages[0].text(), "Best time to prune apple trees?");
        assert!(snapshot.pending);
        assert_eq!(manager.composer().content(), "");

        settle(manager.controller()).await;
        let snapshot = manager.controller().snapshot();
        assert_eq!(snapshot.messages.len(), 2);
        assert!(!snapshot.pending);
    }

    #[tokio::test]
    async fn second_enter_while_pending_keeps_text() {
        let mut manager = manager_with(EchoGateway, Box::new(RecordingClipboard::default()));
        send(&mut manager, "first");
        send(&mut manager, "second");

        assert_eq!(manager.controller().message_count(), 1);
        assert_eq!(manager.composer().content(), "second");
        settle(manager.controller()).await;
    }

    #[tokio::test]
    async fn copy_places_sanitized_reply_on_clipboard() {
        let clipboard = RecordingClipboard::default();
        let copied = Arc::clone(&clipboard.copied);
        let mut manager = manager_with(EchoGateway, Box::new(clipboard));

        send(&mut manager, "soil pH");
        settle(manager.controller()).await;
        send(&mut manager, "/copy");
        send(&mut manager, "/copy 1");

        assert_eq!(
            *copied.lock().unwrap(),
            vec!["Answer to soil pH...".to_string(), "soil pH".to_string()]
        );
        assert_eq!(manager.status().map(|s| s.text.as_str()), Some("Copied"));
    }

    #[tokio::test]
    async fn copy_failure_sets_error_status() {
        let mut manager = manager_with(EchoGateway, Box::new(BrokenClipboard));
        send(&mut manager, "hello");
        settle(manager.controller()).await;
        send(&mut manager, "/copy");

        let status = manager.status().unwrap();
        assert_eq!(status.text, "Copy failed");
        assert!(status.is_error);
    }

    #[tokio::test]
    async fn copy_with_nothing_to_copy_fails() {
        let mut manager = manager_with(EchoGateway, Box::new(RecordingClipboard::default()));
        send(&mut manager, "/copy");
        assert_eq!(manager.status().map(|s| s.is_error), Some(true));
    }

    #[tokio::test]
    async fn status_expires() {
        let mut manager = manager_with(EchoGateway, Box::new(BrokenClipboard));
        send(&mut manager, "/copy");
        assert!(manager.status().is_some());

        manager.expire_status(Instant::now() + Duration::from_secs(10));
        assert!(manager.status().is_none());
    }

    #[tokio::test]
    async fn failed_backend_shows_fallback_message() {
        let mut manager = manager_with(DownGateway, Box::new(RecordingClipboard::default()));
        send(&mut manager, "hello");
        settle(manager.controller()).await;

        let snapshot = manager.controller().snapshot();
        assert_eq!(snapshot.messages[1].text(), FALLBACK_TEXT);
    }

    #[tokio::test]
    async fn quit_paths() {
        let mut manager = manager_with(EchoGateway, Box::new(RecordingClipboard::default()));

        assert_eq!(send(&mut manager, "/q"), ConversationAction::Exit);
        assert_eq!(send(&mut manager, "/exit"), ConversationAction::Exit);

        let ctrl_c = TuiEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(manager.handle_event(ctrl_c), ConversationAction::Exit);
        assert_eq!(manager.handle_event(key(KeyCode::Esc)), ConversationAction::Exit);
    }

    #[tokio::test]
    async fn esc_closes_palette_before_quitting() {
        let mut manager = manager_with(EchoGateway, Box::new(RecordingClipboard::default()));
        manager.handle_event(key(KeyCode::Char('/')));
        assert_eq!(manager.handle_event(key(KeyCode::Esc)), ConversationAction::None);
        assert_eq!(manager.handle_event(key(KeyCode::Esc)), ConversationAction::Exit);
    }

    #[tokio::test]
    async fn help_overlay_closes_on_any_key() {
        let mut manager = manager_with(EchoGateway, Box::new(RecordingClipboard::default()));
        assert_eq!(send(&mut manager, "/help"), ConversationAction::None);
        assert!(manager.show_help);

        // Esc closes the overlay instead of quitting
        assert_eq!(manager.handle_event(key(KeyCode::Esc)), ConversationAction::None);
        assert!(!manager.show_help);
    }

    #[tokio::test]
    async fn renders_into_tiny_terminals() {
        let mut manager = manager_with(EchoGateway, Box::new(BrokenClipboard));
        send(&mut manager, "/copy");
        assert!(manager.status().is_some());
        send(&mut manager, "Will it frost tonight?");

        for height in 1..=8 {
            for width in [1, 4, 40] {
                let area = Rect::new(0, 0, width, height);
                let mut buf = Buffer::empty(area);
                manager.render(area, &mut buf, 1);
            }
        }

        // palette and help overlay on a short screen
        manager.handle_event(key(KeyCode::Char('/')));
        assert!(manager.composer().is_palette_open());
        for height in 1..=8 {
            let area = Rect::new(0, 0, 40, height);
            let mut buf = Buffer::empty(area);
            manager.render(area, &mut buf, 2);
        }
        manager.handle_event(key(KeyCode::Esc));
        manager.handle_event(key(KeyCode::Backspace));
        send(&mut manager, "/help");
        assert!(manager.show_help);
        for height in 1..=8 {
            let area = Rect::new(0, 0, 40, height);
            let mut buf = Buffer::empty(area);
            manager.render(area, &mut buf, 3);
        }
        settle(manager.controller()).await;
    }

    #[test]
    fn copy_target_selection() {
        let messages = vec![
            Message::user("q1"),
            Message::bot("a1"),
            Message::user("q2"),
        ];
        assert_eq!(
            select_copy_target(&messages, CopyTarget::LatestReply).map(Message::text),
            Some("a1")
        );
        assert_eq!(
            select_copy_target(&messages, CopyTarget::Number(3)).map(Message::text),
            Some("q2")
        );
        assert!(select_copy_target(&messages, CopyTarget::Number(4)).is_none());
        assert!(select_copy_target(&[], CopyTarget::LatestReply).is_none());
    }

    #[tokio::test]
    async fn renders_loading_row_while_pending() {
        let mut manager = manager_with(EchoGateway, Box::new(RecordingClipboard::default()));
        send(&mut manager, "What is crop rotation?");

        let area = Rect::new(0, 0, 60, 20);
        let mut buf = Buffer::empty(area);
        manager.render(area, &mut buf, 0);

        let text: String = (0..area.height)
            .flat_map(|y| (0..area.width).map(move |x| (x, y)))
            .map(|(x, y)| buf.get(x, y).symbol().to_string())
            .collect();
        assert!(text.contains("What is crop rotation?"));
        assert!(text.contains("●∙∙"));
        assert!(text.contains("Please wait..."));
        settle(manager.controller()).await;
    }
}
