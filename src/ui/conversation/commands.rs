use std::str::FromStr;

use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Commands that can be invoked by starting a message with a leading slash.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// Copy a message to the clipboard
    Copy,
    /// Show help
    Help,
    /// Exit the application
    Quit,
}

pub fn command_entries() -> Vec<CommandEntry> {
    SlashCommand::iter()
        .map(|command| CommandEntry {
            command,
            keyword: command.command(),
            description: command.description(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: SlashCommand,
    pub argument: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEntry {
    pub command: SlashCommand,
    pub keyword: &'static str,
    pub description: &'static str,
}

/// Which message `/copy` refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyTarget {
    /// Newest bot message
    LatestReply,
    /// 1-based position in the history
    Number(usize),
}

impl ParsedCommand {
    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    /// Target of a `/copy` command; `None` when the argument is not a
    /// positive number
    pub fn copy_target(&self) -> Option<CopyTarget> {
        if self.command != SlashCommand::Copy {
            return None;
        }

        match self.argument() {
            None => Some(CopyTarget::LatestReply),
            Some(arg) => arg
                .trim()
                .trim_start_matches('#')
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .map(CopyTarget::Number),
        }
    }
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::Copy => "copy the latest reply, or message N with /copy N",
            SlashCommand::Help => "show available commands",
            SlashCommand::Quit => "exit the application",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }
}

/// Parse a slash command from user input
pub fn parse_slash_command(input: &str) -> Option<ParsedCommand> {
    let body = input.trim().strip_prefix('/')?;

    let mut parts = body.split_whitespace();
    let head = parts.next()?.to_lowercase();
    let rest: Vec<&str> = parts.collect();

    let command = SlashCommand::from_str(&head).ok().or_else(|| match head.as_str() {
        "q" | "bye" | "exit" => Some(SlashCommand::Quit),
        "c" | "yank" => Some(SlashCommand::Copy),
        "h" | "?" => Some(SlashCommand::Help),
        _ => None,
    })?;

    let argument = if rest.is_empty() {
        None
    } else {
        Some(rest.join(" "))
    };

    Some(ParsedCommand { command, argument })
}

/// Get help text for all available commands
pub fn get_help_text() -> String {
    let mut help = String::from("Available commands:\n\n");
    for entry in command_entries() {
        help.push_str(&format!("/{} - {}\n", entry.keyword, entry.description));
    }

    help.push_str("\nAliases: /q for /quit, /c for /copy, /h for /help.");
    help.push_str("\nEnter sends, Shift+Enter adds a new line, Esc quits.");

    help
}
