//! Terminal lifecycle and the interactive event loop

use crate::clipboard::Osc52Clipboard;
use crate::config::Config;
use crate::conversation::ConversationController;
use crate::events::TuiEvent;
use crate::gateway::HttpGateway;
use crate::ui::conversation::typing::current_frame;
use crate::ui::conversation::{ConversationAction, ConversationManager};
use anyhow::{Context, Result};
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste, EventStream},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::time::Duration;

/// Redraw cadence for the typing indicator and status expiry
const TICK: Duration = Duration::from_millis(120);

type Backend = CrosstermBackend<Stdout>;

/// Raw mode plus alternate screen, undone on drop so a panic or early
/// return leaves a usable shell
struct TerminalGuard {
    terminal: Terminal<Backend>,
}

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        let mut stdout = io::stdout();
        if let Err(err) = execute!(stdout, EnterAlternateScreen, EnableBracketedPaste) {
            let _ = disable_raw_mode();
            return Err(err).context("Failed to enter alternate screen");
        }

        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        terminal.hide_cursor()?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(
            self.terminal.backend_mut(),
            DisableBracketedPaste,
            LeaveAlternateScreen
        );
        let _ = self.terminal.show_cursor();
    }
}

/// Run the chat screen until the user quits
pub async fn run_tui(config: Config) -> Result<()> {
    let gateway = HttpGateway::new(&config.backend)?;
    tracing::info!(endpoint = %gateway.endpoint(), "starting chat session");

    let controller = ConversationController::new(gateway);
    let mut revision = controller.subscribe();
    let mut manager = ConversationManager::new(
        controller,
        Box::new(Osc52Clipboard::stdout()),
        config.ui.clone(),
    );

    let mut guard = TerminalGuard::enter()?;
    let mut events = EventStream::new();
    let mut ticker = tokio::time::interval(TICK);

    loop {
        guard.terminal.draw(|frame| {
            let area = frame.size();
            manager.render(area, frame.buffer_mut(), current_frame());
        })?;

        let event = tokio::select! {
            maybe_event = events.next() => match maybe_event {
                Some(Ok(event)) => match TuiEvent::from_terminal(event) {
                    Some(event) => event,
                    None => continue,
                },
                Some(Err(err)) => return Err(err).context("Failed to read terminal event"),
                None => break,
            },
            _ = ticker.tick() => TuiEvent::Draw,
            Ok(()) = revision.changed() => TuiEvent::Draw,
        };

        if manager.handle_event(event) == ConversationAction::Exit {
            break;
        }
    }

    tracing::info!(
        messages = manager.controller().message_count(),
        "chat session ended"
    );
    Ok(())
}
